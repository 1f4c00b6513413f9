//! Shared fixtures for tests.
//!
//! A small e-commerce schema (customers, orders, order items, products and
//! payments) in two flavours: in-memory DataFusion tables with declared primary
//! keys but no foreign keys, and a SQLite file that also declares every foreign
//! key. Both hold the same rows:
//!
//! | table         | rows | references                         |
//! |---------------|------|------------------------------------|
//! | `customers`   | 3    |                                    |
//! | `orders`      | 9    | `customers` (3 orders each)        |
//! | `products`    | 4    |                                    |
//! | `order_items` | 20   | `orders`, `products`               |
//! | `payments`    | 9    | `orders` (one payment per order)   |

use crate::error::Result;
use crate::sources::DataFusionSource;
use datafusion::prelude::SessionContext;

/// Tables of the e-commerce fixture in creation order.
pub const ECOMMERCE_TABLES: &[&str] = &["customers", "orders", "products", "order_items", "payments"];

const STATES: &[(&str, &str)] = &[("sao paulo", "SP"), ("rio de janeiro", "RJ"), ("belo horizonte", "MG")];
const CATEGORIES: &[&str] = &["toys", "books", "garden", "electronics"];
const STATUSES: &[&str] = &["delivered", "shipped", "canceled"];
const PAYMENT_TYPES: &[&str] = &["credit_card", "boleto", "voucher"];

/// Column type names for one SQL dialect.
struct Types {
    int: &'static str,
    text: &'static str,
    real: &'static str,
}

const DATAFUSION_TYPES: Types = Types {
    int: "BIGINT",
    text: "VARCHAR",
    real: "DOUBLE",
};

#[cfg(feature = "sqlite")]
const SQLITE_TYPES: Types = Types {
    int: "INTEGER",
    text: "TEXT",
    real: "REAL",
};

fn create_statements(t: &Types, foreign_keys: bool) -> Vec<String> {
    let fk = |column: &str, table: &str| {
        if foreign_keys {
            format!(", FOREIGN KEY ({column}) REFERENCES {table}({column})")
        } else {
            String::new()
        }
    };

    vec![
        format!(
            "CREATE TABLE customers (customer_id {int} PRIMARY KEY, customer_city {text}, \
             customer_state {text})",
            int = t.int,
            text = t.text
        ),
        format!(
            "CREATE TABLE orders (order_id {int} PRIMARY KEY, customer_id {int}, \
             order_status {text}, order_purchase_timestamp {text}, \
             order_delivered_customer_date {text}{fk})",
            int = t.int,
            text = t.text,
            fk = fk("customer_id", "customers")
        ),
        format!(
            "CREATE TABLE products (product_id {int} PRIMARY KEY, product_category_name {text}, \
             product_weight_g {int})",
            int = t.int,
            text = t.text
        ),
        format!(
            "CREATE TABLE order_items (order_item_id {int} PRIMARY KEY, order_id {int}, \
             product_id {int}, price {real}, freight_value {real}{fk_order}{fk_product})",
            int = t.int,
            real = t.real,
            fk_order = fk("order_id", "orders"),
            fk_product = fk("product_id", "products")
        ),
        format!(
            "CREATE TABLE payments (transaction_id {int} PRIMARY KEY, order_id {int}, \
             installments {int}, payment_type {text}, payment_value {real}{fk})",
            int = t.int,
            text = t.text,
            real = t.real,
            fk = fk("order_id", "orders")
        ),
    ]
}

fn insert_statements() -> Vec<String> {
    let values = |rows: Vec<String>| rows.join(", ");

    let customers: Vec<String> = (0..3)
        .map(|i| {
            let (city, state) = STATES[i];
            format!("({}, '{city}', '{state}')", i + 1)
        })
        .collect();
    let orders: Vec<String> = (0..9)
        .map(|i| {
            format!(
                "({}, {}, '{}', '2024-01-{:02} 10:00:00', '2024-01-{:02}')",
                i + 1,
                i % 3 + 1,
                STATUSES[i % STATUSES.len()],
                i + 1,
                i + 6
            )
        })
        .collect();
    let products: Vec<String> = (0..4)
        .map(|i| format!("({}, '{}', {})", i + 1, CATEGORIES[i], 100 * (i + 1)))
        .collect();
    let items: Vec<String> = (0..20)
        .map(|i| {
            format!(
                "({}, {}, {}, {}.5, {}.25)",
                i + 1,
                i % 9 + 1,
                i % 4 + 1,
                10 + i,
                i % 5 + 1
            )
        })
        .collect();
    let payments: Vec<String> = (0..9)
        .map(|i| {
            format!(
                "({}, {}, {}, '{}', {}.0)",
                i + 1,
                i + 1,
                i % 4 + 1,
                PAYMENT_TYPES[i % PAYMENT_TYPES.len()],
                20 + 3 * i
            )
        })
        .collect();

    vec![
        format!("INSERT INTO customers VALUES {}", values(customers)),
        format!("INSERT INTO orders VALUES {}", values(orders)),
        format!("INSERT INTO products VALUES {}", values(products)),
        format!("INSERT INTO order_items VALUES {}", values(items)),
        format!("INSERT INTO payments VALUES {}", values(payments)),
    ]
}

/// Creates a session holding the e-commerce tables.
pub async fn create_ecommerce_context() -> Result<SessionContext> {
    let ctx = SessionContext::new();
    for sql in create_statements(&DATAFUSION_TYPES, false)
        .into_iter()
        .chain(insert_statements())
    {
        ctx.sql(&sql).await?.collect().await?;
    }
    Ok(ctx)
}

/// The e-commerce fixture wrapped as a schema source on the default schema.
pub async fn ecommerce_source() -> Result<DataFusionSource> {
    let ctx = create_ecommerce_context().await?;
    DataFusionSource::new(ctx, None, None).await
}

/// Writes the e-commerce fixture, with declared foreign keys, to a new SQLite
/// database at `path`.
#[cfg(feature = "sqlite")]
pub fn create_ecommerce_sqlite(path: impl AsRef<std::path::Path>) -> Result<()> {
    let conn = rusqlite::Connection::open(path)?;
    let script = create_statements(&SQLITE_TYPES, true)
        .into_iter()
        .chain(insert_statements())
        .collect::<Vec<_>>()
        .join(";\n");
    conn.execute_batch(&script)?;
    Ok(())
}
