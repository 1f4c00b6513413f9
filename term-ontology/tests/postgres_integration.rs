//! Discovery against a live PostgreSQL server.
//!
//! Set `TERM_ONTOLOGY_POSTGRES_URL` (e.g. `postgres://postgres@localhost/postgres`)
//! to run these; without it every test returns early. Each test works in its
//! own schema and drops it afterwards.

#![cfg(feature = "postgres")]

use sqlx::postgres::PgPool;
use term_ontology::config::DiscoveryConfig;
use term_ontology::discovery::assembler::discover_ontology;
use term_ontology::error::OntologyError;
use term_ontology::model::{Cardinality, DiscoveryMethod};
use term_ontology::sources::{EngineKind, PostgresSource, SchemaSource, SourceConfig};

fn server_url() -> Option<String> {
    match std::env::var("TERM_ONTOLOGY_POSTGRES_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("TERM_ONTOLOGY_POSTGRES_URL not set, skipping");
            None
        }
    }
}

/// Creates a schema named `<prefix>_<pid>` holding a small shop.
async fn create_shop(url: &str, prefix: &str) -> (PgPool, String) {
    let pool = PgPool::connect(url).await.unwrap();
    let schema = format!("{prefix}_{}", std::process::id());
    sqlx::raw_sql(&format!(
        r#"DROP SCHEMA IF EXISTS {schema} CASCADE;
           CREATE SCHEMA {schema};
           CREATE TABLE {schema}."customer-accounts" (
               "customer id" INTEGER PRIMARY KEY,
               customer_state TEXT
           );
           CREATE TABLE {schema}.orders (
               order_id INTEGER PRIMARY KEY,
               "customer id" INTEGER REFERENCES {schema}."customer-accounts"("customer id"),
               order_status TEXT,
               price NUMERIC(10,2)
           );
           INSERT INTO {schema}."customer-accounts" VALUES (1, 'SP'), (2, 'RJ');
           INSERT INTO {schema}.orders VALUES
               (10, 1, 'delivered', 9.50), (11, 1, 'shipped', 3.00), (12, 1, 'delivered', 4.25),
               (13, 2, 'delivered', 1.00), (14, 2, 'canceled', 2.00);"#
    ))
    .execute(&pool)
    .await
    .unwrap();
    (pool, schema)
}

async fn drop_schema(pool: &PgPool, schema: &str) {
    sqlx::raw_sql(&format!("DROP SCHEMA IF EXISTS {schema} CASCADE"))
        .execute(pool)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_declared_foreign_keys_in_schema() {
    let Some(url) = server_url() else {
        return;
    };
    let (pool, schema) = create_shop(&url, "ontology_fk").await;

    let source = SourceConfig::new(EngineKind::Postgres, url.clone()).with_database(schema.clone());
    let doc = discover_ontology(&source, &DiscoveryConfig::default())
        .await
        .unwrap();

    assert_eq!(
        doc.nouns().keys().collect::<Vec<_>>(),
        vec!["CustomerAccounts", "Orders"]
    );
    assert_eq!(
        doc.nouns().get("CustomerAccounts").unwrap().primary_key,
        "customer id"
    );

    assert_eq!(doc.links().len(), 1);
    let link = &doc.links()[0];
    assert_eq!(link.join, "orders.customer id = customer-accounts.customer id");
    assert_eq!(link.method, DiscoveryMethod::DeclaredForeignKey);
    assert_eq!(link.confidence, 1.0);
    assert_eq!(link.cardinality, Cardinality::ManyToOne);

    assert!(doc.metrics().contains_key("Average Price"));
    assert!(doc.dimensions().contains_key("Orders_order_status"));

    drop_schema(&pool, &schema).await;
}

#[tokio::test]
async fn test_reflection_and_search_path() {
    let Some(url) = server_url() else {
        return;
    };
    let (pool, schema) = create_shop(&url, "ontology_reflect").await;

    let source = PostgresSource::connect(&url, None, Some(&schema))
        .await
        .unwrap();
    assert_eq!(source.schema(), schema);
    assert_eq!(
        source.table_names().await.unwrap(),
        vec!["customer-accounts", "orders"]
    );

    let columns = source.columns("orders").await.unwrap();
    assert_eq!(columns[3].name, "price");
    assert_eq!(columns[3].data_type, "NUMERIC(10,2)");

    // unqualified names resolve through the activated search_path
    let counts = source
        .query_counts("SELECT COUNT(*), COUNT(DISTINCT \"customer id\") FROM orders")
        .await
        .unwrap();
    assert_eq!(counts, vec![5, 2]);

    drop(source);
    drop_schema(&pool, &schema).await;
}

#[tokio::test]
async fn test_context_errors_are_fatal() {
    let Some(url) = server_url() else {
        return;
    };

    let missing_schema =
        SourceConfig::new(EngineKind::Postgres, url.clone()).with_database("no_such_schema_here");
    let err = discover_ontology(&missing_schema, &DiscoveryConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, OntologyError::Context { .. }));
    assert!(err.is_fatal());

    let other_catalog =
        SourceConfig::new(EngineKind::Postgres, url).with_catalog("no_such_database_here");
    let err = discover_ontology(&other_catalog, &DiscoveryConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, OntologyError::Context { .. }));
}
