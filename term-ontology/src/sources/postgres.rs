//! PostgreSQL-backed schema source.

use super::{ColumnInfo, ForeignKeyInfo, SchemaSource};
use crate::error::{OntologyError, Result};
use crate::logging::{truncate_field, MAX_LOGGED_SQL};
use crate::security::SqlSecurity;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// How long to wait for the server before giving up on the run.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const TABLES_SQL: &str = "\
    SELECT c.relname::text
    FROM pg_catalog.pg_class c
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1 AND c.relkind IN ('r', 'p') AND NOT c.relispartition
    ORDER BY c.relname";

const COLUMNS_SQL: &str = "\
    SELECT a.attname::text, format_type(a.atttypid, a.atttypmod)
    FROM pg_catalog.pg_attribute a
    JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1 AND c.relname = $2 AND a.attnum > 0 AND NOT a.attisdropped
    ORDER BY a.attnum";

const PRIMARY_KEY_SQL: &str = "\
    SELECT a.attname::text
    FROM pg_catalog.pg_index i
    JOIN pg_catalog.pg_class c ON c.oid = i.indrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    JOIN pg_catalog.pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = i.indkey[0]
    WHERE i.indisprimary AND n.nspname = $1 AND c.relname = $2";

// first column pair of each foreign key, in declaration order
const FOREIGN_KEYS_SQL: &str = "\
    SELECT a.attname::text, rc.relname::text, ra.attname::text
    FROM pg_catalog.pg_constraint con
    JOIN pg_catalog.pg_class c ON c.oid = con.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    JOIN pg_catalog.pg_class rc ON rc.oid = con.confrelid
    JOIN pg_catalog.pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = con.conkey[1]
    JOIN pg_catalog.pg_attribute ra ON ra.attrelid = con.confrelid AND ra.attnum = con.confkey[1]
    WHERE con.contype = 'f' AND n.nspname = $1 AND c.relname = $2
    ORDER BY con.oid";

/// Schema source over a PostgreSQL server.
///
/// The pool holds a single connection that lives for the whole run, so the
/// `search_path` set at construction stays in effect. Reflection queries and
/// sampled table references name the schema explicitly as well.
///
/// A PostgreSQL connection is bound to one database: a configured catalog must
/// name the database in the connection URL. The configured database selects
/// the schema (`public` or the server's `current_schema()` by default).
///
/// # Examples
///
/// ```rust,no_run
/// use term_ontology::sources::{PostgresSource, SchemaSource};
///
/// # async fn example() -> term_ontology::error::Result<()> {
/// let source = PostgresSource::connect(
///     "postgres://analyst@localhost/shop",
///     Some("shop"),
///     Some("sales"),
/// )
/// .await?;
/// println!("{:?}", source.table_names().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PostgresSource {
    pool: PgPool,
    database: String,
    schema: String,
}

impl PostgresSource {
    /// Connects and activates the configured context.
    pub async fn connect(url: &str, catalog: Option<&str>, schema: Option<&str>) -> Result<Self> {
        Self::connect_with_timeout(url, catalog, schema, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Like [`PostgresSource::connect`], waiting at most `timeout` for the server.
    #[instrument(skip(url))]
    pub async fn connect_with_timeout(
        url: &str,
        catalog: Option<&str>,
        schema: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(timeout)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to connect to PostgreSQL");
                OntologyError::connection_with_source(
                    "postgres",
                    "unable to connect to server",
                    Box::new(e),
                )
            })?;

        Self::from_pool(pool, catalog, schema).await
    }

    /// Wraps an open pool and activates the configured context.
    ///
    /// The pool should hold a single connection, otherwise `search_path` only
    /// applies to whichever connection ran the `SET`.
    pub async fn from_pool(pool: PgPool, catalog: Option<&str>, schema: Option<&str>) -> Result<Self> {
        let (database, current_schema): (String, Option<String>) =
            sqlx::query_as("SELECT current_database()::text, current_schema()::text")
                .fetch_one(&pool)
                .await
                .map_err(|e| {
                    OntologyError::connection_with_source(
                        "postgres",
                        "unable to read connection context",
                        Box::new(e),
                    )
                })?;

        if let Some(catalog) = catalog {
            if catalog != database {
                return Err(OntologyError::context(
                    catalog,
                    format!(
                        "connected to database '{database}'; PostgreSQL cannot switch databases on an open connection"
                    ),
                ));
            }
        }

        let schema = match schema {
            Some(name) => name.to_string(),
            None => current_schema.unwrap_or_else(|| "public".to_string()),
        };

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_namespace WHERE nspname = $1)",
        )
        .bind(&schema)
        .fetch_one(&pool)
        .await
        .map_err(|e| OntologyError::context(&schema, e.to_string()))?;
        if !exists {
            return Err(OntologyError::context(
                &schema,
                format!("schema does not exist in database '{database}'"),
            ));
        }

        let quoted =
            SqlSecurity::escape_identifier(&schema).map_err(|e| OntologyError::context(&schema, e.to_string()))?;
        sqlx::query(&format!("SET search_path TO {quoted}"))
            .execute(&pool)
            .await
            .map_err(|e| OntologyError::context(&schema, e.to_string()))?;

        info!(database = %database, schema = %schema, "PostgreSQL context ready");
        Ok(Self {
            pool,
            database,
            schema,
        })
    }

    /// The schema all reflection runs against.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// The database the connection is bound to.
    pub fn database(&self) -> &str {
        &self.database
    }
}

#[async_trait]
impl SchemaSource for PostgresSource {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        Ok(sqlx::query_scalar(TABLES_SQL)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let rows: Vec<(String, String)> = sqlx::query_as(COLUMNS_SQL)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Err(OntologyError::Query(format!("Table '{table}' not found")));
        }
        Ok(rows
            .into_iter()
            .map(|(name, data_type)| ColumnInfo::new(name, data_type.to_uppercase()))
            .collect())
    }

    async fn declared_primary_key(&self, table: &str) -> Result<Option<String>> {
        Ok(sqlx::query_scalar(PRIMARY_KEY_SQL)
            .bind(&self.schema)
            .bind(table)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(FOREIGN_KEYS_SQL)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(column, referred_table, referred_column)| ForeignKeyInfo {
                column,
                referred_table,
                referred_column,
            })
            .collect())
    }

    async fn query_counts(&self, sql: &str) -> Result<Vec<u64>> {
        debug!(sql = %truncate_field(sql, MAX_LOGGED_SQL), "Running sampling query");
        let row = sqlx::query(sql).fetch_one(&self.pool).await?;

        let mut counts = Vec::with_capacity(row.len());
        for i in 0..row.len() {
            let value: Option<i64> = row.try_get(i)?;
            counts.push(value.and_then(|v| u64::try_from(v).ok()).unwrap_or(0));
        }
        Ok(counts)
    }

    fn qualified_table(&self, table: &str) -> Result<String> {
        SqlSecurity::escape_qualified(Some(&self.schema), table)
    }
}
