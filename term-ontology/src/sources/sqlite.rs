//! SQLite-backed schema source.

use super::{ColumnInfo, ForeignKeyInfo, SchemaSource};
use crate::error::{OntologyError, Result};
use crate::logging::{truncate_field, MAX_LOGGED_SQL};
use crate::security::SqlSecurity;
use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

/// Schema source over a SQLite database.
///
/// Statements run inline on the calling task; the connection is guarded by a
/// mutex and used by one discovery call at a time.
#[derive(Debug)]
pub struct SqliteSource {
    conn: Mutex<Connection>,
    /// Attached database name qualifying every statement
    database: String,
}

#[derive(Debug)]
struct TableColumn {
    name: String,
    data_type: String,
    pk_position: i64,
}

impl SqliteSource {
    /// Opens a database file read-only.
    ///
    /// Accepts a plain path, `:memory:` or a `sqlite:///relative/path` URL
    /// (`sqlite:////absolute/path`). SQLite has no
    /// catalogs, so a configured catalog is rejected; a configured database must
    /// be attached to the connection.
    #[instrument(skip(connection))]
    pub fn open(connection: &str, catalog: Option<&str>, database: Option<&str>) -> Result<Self> {
        let path = connection.strip_prefix("sqlite:///").unwrap_or(connection);

        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
            )
        }
        .map_err(|e| {
            OntologyError::connection_with_source(
                "sqlite",
                "unable to open database",
                Box::new(e),
            )
        })?;

        Self::from_connection(conn, catalog, database)
    }

    /// Wraps an open connection and activates the configured context.
    pub fn from_connection(
        conn: Connection,
        catalog: Option<&str>,
        database: Option<&str>,
    ) -> Result<Self> {
        if let Some(catalog) = catalog {
            return Err(OntologyError::context(
                catalog,
                "SQLite does not support catalogs",
            ));
        }

        let database = match database {
            Some(name) => {
                let attached = Self::attached_databases(&conn)?;
                if !attached.iter().any(|d| d == name) {
                    return Err(OntologyError::context(
                        name,
                        format!("database is not attached (available: {})", attached.join(", ")),
                    ));
                }
                name.to_string()
            }
            None => "main".to_string(),
        };

        info!(database = %database, "SQLite context ready");
        Ok(Self {
            conn: Mutex::new(conn),
            database,
        })
    }

    fn attached_databases(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt = conn
            .prepare("PRAGMA database_list")
            .map_err(|e| OntologyError::context("database_list", e.to_string()))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
            .map_err(|e| OntologyError::context("database_list", e.to_string()))?;
        Ok(names)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| OntologyError::Query("SQLite connection lock poisoned".to_string()))
    }

    fn table_columns(&self, table: &str) -> Result<Vec<TableColumn>> {
        let sql = format!(
            "PRAGMA {}.table_info({})",
            SqlSecurity::escape_identifier(&self.database)?,
            SqlSecurity::escape_identifier(table)?
        );
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let columns = stmt
            .query_map([], |row| {
                Ok(TableColumn {
                    name: row.get("name")?,
                    data_type: row.get("type")?,
                    pk_position: row.get("pk")?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(OntologyError::Query(format!("Table '{table}' not found")));
        }
        Ok(columns)
    }

    fn primary_key_of(&self, table: &str) -> Result<Option<String>> {
        let mut key: Vec<TableColumn> = self
            .table_columns(table)?
            .into_iter()
            .filter(|c| c.pk_position > 0)
            .collect();
        key.sort_by_key(|c| c.pk_position);
        Ok(key.into_iter().next().map(|c| c.name))
    }
}

#[async_trait]
impl SchemaSource for SqliteSource {
    fn engine(&self) -> &'static str {
        "sqlite"
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT name FROM {}.sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            SqlSecurity::escape_identifier(&self.database)?
        );
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        Ok(self
            .table_columns(table)?
            .into_iter()
            .map(|c| ColumnInfo::new(c.name, c.data_type))
            .collect())
    }

    async fn declared_primary_key(&self, table: &str) -> Result<Option<String>> {
        self.primary_key_of(table)
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        let sql = format!(
            "PRAGMA {}.foreign_key_list({})",
            SqlSecurity::escape_identifier(&self.database)?,
            SqlSecurity::escape_identifier(table)?
        );

        // (referred table, from column, to column) for the first pair of each key
        let raw: Vec<(String, String, Option<String>)> = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>("seq")?,
                        row.get::<_, String>("table")?,
                        row.get::<_, String>("from")?,
                        row.get::<_, Option<String>>("to")?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter()
                .filter(|(seq, ..)| *seq == 0)
                .map(|(_, referred, from, to)| (referred, from, to))
                .collect()
        };

        let mut keys = Vec::with_capacity(raw.len());
        for (referred_table, column, to) in raw {
            let referred_column = match to {
                Some(to) => to,
                None => match self.primary_key_of(&referred_table).ok().flatten() {
                    Some(pk) => pk,
                    None => {
                        debug!(table, referred_table = %referred_table, "Skipping foreign key without a target column");
                        continue;
                    }
                },
            };
            keys.push(ForeignKeyInfo {
                column,
                referred_table,
                referred_column,
            });
        }
        // PRAGMA lists keys in reverse declaration order
        keys.reverse();
        Ok(keys)
    }

    async fn query_counts(&self, sql: &str) -> Result<Vec<u64>> {
        debug!(sql = %truncate_field(sql, MAX_LOGGED_SQL), "Running sampling query");
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let width = stmt.column_count();
        let counts = stmt.query_row([], |row| {
            (0..width)
                .map(|i| row.get::<_, Option<i64>>(i))
                .collect::<std::result::Result<Vec<_>, _>>()
        })?;
        Ok(counts
            .into_iter()
            .map(|v| v.and_then(|v| u64::try_from(v).ok()).unwrap_or(0))
            .collect())
    }

    fn qualified_table(&self, table: &str) -> Result<String> {
        SqlSecurity::escape_qualified(Some(&self.database), table)
    }
}
