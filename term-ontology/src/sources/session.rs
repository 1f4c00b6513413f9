//! DataFusion-backed schema source.

use super::{expand_files, first_row_counts, ColumnInfo, ForeignKeyInfo, SchemaSource};
use crate::error::{OntologyError, Result};
use crate::logging::{truncate_field, MAX_LOGGED_SQL};
use crate::security::SqlSecurity;
use arrow::datatypes::DataType;
use async_trait::async_trait;
use datafusion::catalog::{SchemaProvider, TableProvider};
use datafusion::common::Constraint;
use datafusion::prelude::{CsvReadOptions, ParquetReadOptions, SessionContext};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// File format loaded by [`DataFusionSource::from_files`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Parquet,
}

impl FileFormat {
    fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }
}

/// Schema source over a DataFusion [`SessionContext`].
///
/// DataFusion keeps primary keys as table constraints but has no foreign key
/// catalog, so [`SchemaSource::foreign_keys`] is always empty and relationships
/// come from name inference.
///
/// # Examples
///
/// ```rust
/// use datafusion::prelude::SessionContext;
/// use term_ontology::sources::{DataFusionSource, SchemaSource};
///
/// # async fn example() -> term_ontology::error::Result<()> {
/// let ctx = SessionContext::new();
/// ctx.sql("CREATE TABLE customers (id INT PRIMARY KEY, customer_state VARCHAR)")
///     .await?
///     .collect()
///     .await?;
///
/// let source = DataFusionSource::new(ctx, None, None).await?;
/// assert_eq!(source.table_names().await?, vec!["customers"]);
/// # Ok(())
/// # }
/// ```
pub struct DataFusionSource {
    ctx: SessionContext,
    catalog: String,
    schema: String,
}

impl fmt::Debug for DataFusionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFusionSource")
            .field("catalog", &self.catalog)
            .field("schema", &self.schema)
            .finish()
    }
}

impl DataFusionSource {
    /// Wraps a context with pre-registered tables, switching to `catalog` and
    /// `schema` when given.
    #[instrument(skip(ctx))]
    pub async fn new(
        ctx: SessionContext,
        catalog: Option<&str>,
        schema: Option<&str>,
    ) -> Result<Self> {
        let (default_catalog, default_schema) = {
            let state = ctx.state();
            let options = &state.config().options().catalog;
            (options.default_catalog.clone(), options.default_schema.clone())
        };

        let catalog_name = catalog.map(str::to_string).unwrap_or(default_catalog);
        let schema_name = schema.map(str::to_string).unwrap_or(default_schema);

        let catalog_provider = ctx.catalog(&catalog_name).ok_or_else(|| {
            OntologyError::context(&catalog_name, "catalog is not registered")
        })?;
        if catalog_provider.schema(&schema_name).is_none() {
            return Err(OntologyError::context(
                &schema_name,
                format!("schema does not exist in catalog '{catalog_name}'"),
            ));
        }

        if let Some(catalog) = catalog {
            Self::set_option(&ctx, "datafusion.catalog.default_catalog", catalog).await?;
        }
        if let Some(schema) = schema {
            Self::set_option(&ctx, "datafusion.catalog.default_schema", schema).await?;
        }

        info!(catalog = %catalog_name, schema = %schema_name, "DataFusion context ready");
        Ok(Self {
            ctx,
            catalog: catalog_name,
            schema: schema_name,
        })
    }

    /// Registers every file matching `location` (a directory or glob) as a
    /// table named after the file stem, then activates the context.
    #[instrument(skip(location))]
    pub async fn from_files(
        location: &str,
        format: FileFormat,
        catalog: Option<&str>,
        schema: Option<&str>,
    ) -> Result<Self> {
        let ctx = SessionContext::new();
        let files = expand_files(location, format.extension())?;

        for path in &files {
            let Some(table) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let path_str = path.to_string_lossy();
            let registered = match format {
                FileFormat::Csv => {
                    ctx.register_csv(table, path_str.as_ref(), CsvReadOptions::new())
                        .await
                }
                FileFormat::Parquet => {
                    ctx.register_parquet(table, path_str.as_ref(), ParquetReadOptions::default())
                        .await
                }
            };
            registered.map_err(|e| {
                OntologyError::connection_with_source(
                    "datafusion",
                    format!("Failed to load table '{table}'"),
                    Box::new(e),
                )
            })?;
            debug!(table, "Registered file table");
        }

        info!(tables = files.len(), format = ?format, "Loaded file tables");
        Self::new(ctx, catalog, schema).await
    }

    /// The underlying session context.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    async fn set_option(ctx: &SessionContext, key: &str, value: &str) -> Result<()> {
        let literal = SqlSecurity::escape_literal(value)
            .map_err(|e| OntologyError::context(value, e.to_string()))?;
        ctx.sql(&format!("SET {key} = {literal}"))
            .await
            .map_err(|e| OntologyError::context(value, e.to_string()))?
            .collect()
            .await
            .map_err(|e| OntologyError::context(value, e.to_string()))?;
        Ok(())
    }

    fn schema_provider(&self) -> Result<Arc<dyn SchemaProvider>> {
        self.ctx
            .catalog(&self.catalog)
            .and_then(|c| c.schema(&self.schema))
            .ok_or_else(|| {
                OntologyError::context(&self.schema, "schema is no longer registered")
            })
    }

    async fn table(&self, table: &str) -> Result<Arc<dyn TableProvider>> {
        self.schema_provider()?
            .table(table)
            .await?
            .ok_or_else(|| OntologyError::Query(format!("Table '{table}' not found")))
    }
}

#[async_trait]
impl SchemaSource for DataFusionSource {
    fn engine(&self) -> &'static str {
        "datafusion"
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        let mut names = self.schema_provider()?.table_names();
        names.sort();
        Ok(names)
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let provider = self.table(table).await?;
        Ok(provider
            .schema()
            .fields()
            .iter()
            .map(|f| ColumnInfo::new(f.name(), sql_type_name(f.data_type())))
            .collect())
    }

    async fn declared_primary_key(&self, table: &str) -> Result<Option<String>> {
        let provider = self.table(table).await?;
        let schema = provider.schema();
        let Some(constraints) = provider.constraints() else {
            return Ok(None);
        };

        Ok(constraints.iter().find_map(|c| match c {
            Constraint::PrimaryKey(indices) => indices
                .first()
                .and_then(|&i| schema.fields().get(i))
                .map(|f| f.name().to_string()),
            _ => None,
        }))
    }

    async fn foreign_keys(&self, _table: &str) -> Result<Vec<ForeignKeyInfo>> {
        Ok(Vec::new())
    }

    async fn query_counts(&self, sql: &str) -> Result<Vec<u64>> {
        debug!(sql = %truncate_field(sql, MAX_LOGGED_SQL), "Running sampling query");
        let batches = self.ctx.sql(sql).await?.collect().await?;
        first_row_counts(&batches)
    }

    fn qualified_table(&self, table: &str) -> Result<String> {
        Ok(format!(
            "{}.{}",
            SqlSecurity::escape_identifier(&self.catalog)?,
            SqlSecurity::escape_qualified(Some(&self.schema), table)?
        ))
    }
}

/// Renders an Arrow type as the SQL type name used by the classification rules.
pub fn sql_type_name(data_type: &DataType) -> String {
    match data_type {
        DataType::Int8 | DataType::UInt8 => "TINYINT".to_string(),
        DataType::Int16 | DataType::UInt16 => "SMALLINT".to_string(),
        DataType::Int32 | DataType::UInt32 => "INTEGER".to_string(),
        DataType::Int64 | DataType::UInt64 => "BIGINT".to_string(),
        DataType::Float16 | DataType::Float32 | DataType::Float64 => "REAL".to_string(),
        DataType::Decimal128(p, s) | DataType::Decimal256(p, s) => format!("NUMERIC({p},{s})"),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "TEXT".to_string(),
        DataType::Boolean => "BOOLEAN".to_string(),
        DataType::Date32 | DataType::Date64 => "DATE".to_string(),
        DataType::Timestamp(_, _) => "TIMESTAMP".to_string(),
        DataType::Time32(_) | DataType::Time64(_) => "TIME".to_string(),
        DataType::Binary | DataType::LargeBinary | DataType::BinaryView => "BLOB".to_string(),
        DataType::Dictionary(_, value) => sql_type_name(value),
        other => other.to_string().to_uppercase(),
    }
}
