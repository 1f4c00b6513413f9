//! Schema sources for ontology discovery.
//!
//! A [`SchemaSource`] is one live connection to a relational engine. It answers
//! the reflection questions (tables, columns, keys) and runs the small integer
//! sampling queries issued by the relationship checks. Catalog/schema context is
//! switched once, when the source is constructed; every later call runs inside
//! that context.

use crate::error::{OntologyError, Result};
use crate::security::{SecureString, SqlSecurity};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

#[cfg(feature = "postgres")]
mod postgres;
mod session;
#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresSource, DEFAULT_CONNECT_TIMEOUT};
pub use session::{sql_type_name, DataFusionSource, FileFormat};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSource;

/// A column as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// SQL type name (e.g., `BIGINT`, `NUMERIC(10,2)`, `TEXT`)
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A declared single-column foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    pub column: String,
    pub referred_table: String,
    pub referred_column: String,
}

/// A live connection that can be reflected and sampled.
///
/// Implementations are awaited one call at a time by the discovery stages.
#[async_trait]
pub trait SchemaSource: Debug + Send + Sync {
    /// Engine family name used in logs and errors.
    fn engine(&self) -> &'static str;

    /// All user tables in the active context.
    async fn table_names(&self) -> Result<Vec<String>>;

    /// Columns of `table` in declaration order.
    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>>;

    /// The declared primary key of `table`, if any.
    ///
    /// For composite keys this is the first key column.
    async fn declared_primary_key(&self, table: &str) -> Result<Option<String>>;

    /// Declared foreign keys of `table`.
    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>>;

    /// Runs a query returning a single row of integer columns.
    async fn query_counts(&self, sql: &str) -> Result<Vec<u64>>;

    /// Escaped table reference usable in a `FROM` clause.
    fn qualified_table(&self, table: &str) -> Result<String> {
        SqlSecurity::escape_identifier(table)
    }
}

/// Engine family selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// A SQLite database file
    Sqlite,
    /// A PostgreSQL server
    Postgres,
    /// CSV files loaded into DataFusion
    Csv,
    /// Parquet files loaded into DataFusion
    Parquet,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings for one discovery run.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub engine: EngineKind,
    /// File path, directory, glob pattern or server URL; never logged
    pub connection: SecureString,
    /// Catalog (DataFusion catalog, PostgreSQL database name)
    pub catalog: Option<String>,
    /// Database (SQLite attached database, DataFusion or PostgreSQL schema)
    pub database: Option<String>,
    /// Optional table allow-list; empty means every table
    pub include_tables: Vec<String>,
}

impl SourceConfig {
    pub fn new(engine: EngineKind, connection: impl Into<SecureString>) -> Self {
        Self {
            engine,
            connection: connection.into(),
            catalog: None,
            database: None,
            include_tables: Vec::new(),
        }
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_tables(mut self, tables: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.include_tables = tables.into_iter().map(Into::into).collect();
        self
    }
}

/// Opens the source described by `config` and activates its context.
///
/// Any failure here is fatal for the run.
pub async fn connect(config: &SourceConfig) -> Result<Box<dyn SchemaSource>> {
    match config.engine {
        #[cfg(feature = "sqlite")]
        EngineKind::Sqlite => Ok(Box::new(SqliteSource::open(
            config.connection.expose(),
            config.catalog.as_deref(),
            config.database.as_deref(),
        )?)),
        #[cfg(not(feature = "sqlite"))]
        EngineKind::Sqlite => Err(OntologyError::Configuration(
            "SQLite support requires the 'sqlite' feature".to_string(),
        )),
        #[cfg(feature = "postgres")]
        EngineKind::Postgres => Ok(Box::new(
            PostgresSource::connect(
                config.connection.expose(),
                config.catalog.as_deref(),
                config.database.as_deref(),
            )
            .await?,
        )),
        #[cfg(not(feature = "postgres"))]
        EngineKind::Postgres => Err(OntologyError::Configuration(
            "PostgreSQL support requires the 'postgres' feature".to_string(),
        )),
        EngineKind::Csv | EngineKind::Parquet => {
            let format = if config.engine == EngineKind::Csv {
                FileFormat::Csv
            } else {
                FileFormat::Parquet
            };
            let source = DataFusionSource::from_files(
                config.connection.expose(),
                format,
                config.catalog.as_deref(),
                config.database.as_deref(),
            )
            .await?;
            Ok(Box::new(source))
        }
    }
}

/// Expands a directory or glob pattern into data files, sorted by path.
pub(crate) fn expand_files(location: &str, extension: &str) -> Result<Vec<std::path::PathBuf>> {
    use glob::glob;

    let pattern = if std::path::Path::new(location).is_dir() {
        format!("{}/*.{extension}", location.trim_end_matches('/'))
    } else {
        location.to_string()
    };

    let matches = glob(&pattern).map_err(|e| {
        OntologyError::Configuration(format!("Invalid glob pattern '{pattern}': {e}"))
    })?;

    let mut paths = Vec::new();
    for entry in matches {
        let path = entry.map_err(|e| OntologyError::Io(e.into_error()))?;
        if path.is_file() {
            paths.push(path);
        }
    }

    if paths.is_empty() {
        return Err(OntologyError::connection(
            "datafusion",
            format!("No .{extension} files found at the configured location"),
        ));
    }

    paths.sort();
    Ok(paths)
}

/// Reads a single-row integer result from Arrow batches.
pub(crate) fn first_row_counts(
    batches: &[arrow::record_batch::RecordBatch],
) -> Result<Vec<u64>> {
    use arrow::array::{Array, Int64Array};
    use arrow::compute::cast;
    use arrow::datatypes::DataType;

    let batch = batches
        .iter()
        .find(|b| b.num_rows() > 0)
        .ok_or_else(|| OntologyError::Query("Sampling query returned no rows".to_string()))?;

    let mut counts = Vec::with_capacity(batch.num_columns());
    for column in batch.columns() {
        let column = cast(column, &DataType::Int64)?;
        let values = column
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| OntologyError::Query("Expected an integer count".to_string()))?;
        let value = if values.is_null(0) { 0 } else { values.value(0) };
        counts.push(u64::try_from(value).unwrap_or(0));
    }
    Ok(counts)
}
