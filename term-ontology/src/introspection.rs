//! Schema reflection over a [`SchemaSource`].
//!
//! The introspector answers the four reflection questions used by discovery and
//! captures them once per run as a [`SchemaSnapshot`], so later stages work on
//! plain data and only the relationship checks go back to the engine.

use crate::error::Result;
use crate::model::UNKNOWN_PRIMARY_KEY;
use crate::rules::RuleBook;
use crate::sources::{ColumnInfo, ForeignKeyInfo, SchemaSource};
use tracing::{debug, info, instrument, warn};

/// Reflected shape of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    /// Declared or inferred key column, or `"unknown"`
    pub primary_key: String,
    pub foreign_keys: Vec<ForeignKeyInfo>,
}

impl TableInfo {
    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_primary_key(&self) -> bool {
        self.primary_key != UNKNOWN_PRIMARY_KEY
    }
}

/// Every included table, in engine order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSnapshot {
    tables: Vec<TableInfo>,
}

impl SchemaSnapshot {
    pub fn new(tables: Vec<TableInfo>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &[TableInfo] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Reflects tables, columns and keys from a live source.
pub struct SchemaIntrospector<'a> {
    source: &'a dyn SchemaSource,
    rules: &'a RuleBook,
}

impl<'a> SchemaIntrospector<'a> {
    pub fn new(source: &'a dyn SchemaSource, rules: &'a RuleBook) -> Self {
        Self { source, rules }
    }

    /// Lists tables in engine order, keeping only allow-listed ones when the
    /// allow-list is non-empty.
    pub async fn list_tables(&self, allowlist: &[String]) -> Result<Vec<String>> {
        let all = self.source.table_names().await?;
        if allowlist.is_empty() {
            return Ok(all);
        }

        for wanted in allowlist {
            if !all.contains(wanted) {
                warn!(table = %wanted, "Allow-listed table does not exist");
            }
        }
        Ok(all.into_iter().filter(|t| allowlist.contains(t)).collect())
    }

    pub async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        self.source.columns(table).await
    }

    /// Declared primary key, else the first column matching the key fallback
    /// rule (`id` or `*_id`), else `"unknown"`.
    pub async fn primary_key(&self, table: &str) -> Result<String> {
        if let Some(pk) = self.source.declared_primary_key(table).await? {
            return Ok(pk);
        }
        let columns = self.columns(table).await?;
        Ok(self.fallback_primary_key(&columns))
    }

    pub async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        self.source.foreign_keys(table).await
    }

    fn fallback_primary_key(&self, columns: &[ColumnInfo]) -> String {
        columns
            .iter()
            .find(|c| self.rules.primary_key_fallback.matches(&c.name))
            .map(|c| c.name.clone())
            .unwrap_or_else(|| UNKNOWN_PRIMARY_KEY.to_string())
    }

    /// Reflects one table.
    pub async fn table(&self, name: &str) -> Result<TableInfo> {
        let columns = self.columns(name).await?;
        let primary_key = match self.source.declared_primary_key(name).await? {
            Some(pk) => pk,
            None => self.fallback_primary_key(&columns),
        };
        let foreign_keys = self.foreign_keys(name).await?;
        Ok(TableInfo {
            name: name.to_string(),
            columns,
            primary_key,
            foreign_keys,
        })
    }

    /// Reflects every included table.
    ///
    /// Only fatal errors abort the snapshot; a table whose reflection fails
    /// otherwise is left out and logged.
    #[instrument(skip(self), fields(engine = self.source.engine()))]
    pub async fn snapshot(&self, allowlist: &[String]) -> Result<SchemaSnapshot> {
        let names = self.list_tables(allowlist).await?;
        let mut tables = Vec::with_capacity(names.len());

        for name in names {
            let table = match self.table(&name).await {
                Ok(table) => table,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(table = %name, error = %e, "Skipping table that could not be reflected");
                    continue;
                }
            };
            debug!(
                table = %table.name,
                columns = table.columns.len(),
                primary_key = %table.primary_key,
                foreign_keys = table.foreign_keys.len(),
                "Reflected table"
            );
            tables.push(table);
        }

        info!(tables = tables.len(), "Schema reflected");
        Ok(SchemaSnapshot::new(tables))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OntologyError;
    use crate::sources::DataFusionSource;
    use datafusion::prelude::SessionContext;

    async fn source() -> DataFusionSource {
        let ctx = SessionContext::new();
        for sql in [
            "CREATE TABLE customers (id BIGINT PRIMARY KEY, customer_state VARCHAR)",
            "CREATE TABLE orders (order_id BIGINT, customer_id BIGINT, status VARCHAR)",
            "CREATE TABLE notes (body VARCHAR)",
        ] {
            ctx.sql(sql).await.unwrap().collect().await.unwrap();
        }
        DataFusionSource::new(ctx, None, None).await.unwrap()
    }

    #[tokio::test]
    async fn test_primary_key_fallbacks() {
        let source = source().await;
        let rules = RuleBook::default();
        let introspector = SchemaIntrospector::new(&source, &rules);

        assert_eq!(introspector.primary_key("customers").await.unwrap(), "id");
        assert_eq!(introspector.primary_key("orders").await.unwrap(), "order_id");
        assert_eq!(introspector.primary_key("notes").await.unwrap(), "unknown");
    }

    #[tokio::test]
    async fn test_allowlist_keeps_engine_order() {
        let source = source().await;
        let rules = RuleBook::default();
        let introspector = SchemaIntrospector::new(&source, &rules);

        let allow = vec!["orders".to_string(), "customers".to_string(), "ghost".to_string()];
        assert_eq!(
            introspector.list_tables(&allow).await.unwrap(),
            vec!["customers", "orders"]
        );

        let snapshot = introspector.snapshot(&[]).await.unwrap();
        assert_eq!(snapshot.len(), 3);
        let orders = snapshot.table("orders").unwrap();
        assert!(orders.has_primary_key());
        assert_eq!(orders.column("status").unwrap().data_type, "TEXT");
        assert!(!snapshot.table("notes").unwrap().has_primary_key());
    }

    /// Wraps a real source and fails column reflection for one table.
    #[derive(Debug)]
    struct FlakySource {
        inner: DataFusionSource,
        broken: &'static str,
        fatal: bool,
    }

    #[async_trait::async_trait]
    impl SchemaSource for FlakySource {
        fn engine(&self) -> &'static str {
            "flaky"
        }

        async fn table_names(&self) -> Result<Vec<String>> {
            self.inner.table_names().await
        }

        async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
            if table == self.broken {
                return Err(if self.fatal {
                    OntologyError::connection("flaky", "connection dropped")
                } else {
                    OntologyError::Query(format!("cannot describe '{table}'"))
                });
            }
            self.inner.columns(table).await
        }

        async fn declared_primary_key(&self, table: &str) -> Result<Option<String>> {
            self.inner.declared_primary_key(table).await
        }

        async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>> {
            self.inner.foreign_keys(table).await
        }

        async fn query_counts(&self, sql: &str) -> Result<Vec<u64>> {
            self.inner.query_counts(sql).await
        }
    }

    #[tokio::test]
    async fn test_unreflectable_table_is_skipped() {
        let rules = RuleBook::default();
        let flaky = FlakySource {
            inner: source().await,
            broken: "notes",
            fatal: false,
        };
        let snapshot = SchemaIntrospector::new(&flaky, &rules)
            .snapshot(&[])
            .await
            .unwrap();
        let names: Vec<_> = snapshot.tables().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["customers", "orders"]);

        let dead = FlakySource {
            inner: source().await,
            broken: "notes",
            fatal: true,
        };
        let err = SchemaIntrospector::new(&dead, &rules)
            .snapshot(&[])
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
