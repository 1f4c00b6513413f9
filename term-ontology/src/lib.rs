//! # Term Ontology - Schema-to-Ontology Discovery
//!
//! `term-ontology` reads a live relational schema and writes down what it
//! means: which tables are business entities (nouns), how they relate (links,
//! with sampled confidence and cardinality), which columns are worth grouping
//! by (dimensions), and which aggregates are worth computing (metrics, derived
//! fields and query templates). The result is a single JSON document consumed
//! by query planners and join validators.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use term_ontology::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let source = SourceConfig::new(EngineKind::Sqlite, "shop.db")
//!     .with_tables(["customers", "orders", "order_items"]);
//! let config = DiscoveryConfig::default();
//!
//! let document = discover_ontology(&source, &config).await?;
//! document.write_to("discovered_ontology.json")?;
//! println!("{}", SummaryFormatter::new().format(&document)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Engines
//!
//! Anything implementing [`sources::SchemaSource`] can be discovered. Three
//! are provided:
//!
//! - [`sources::DataFusionSource`]: CSV or Parquet files, or any tables already
//!   registered on a `SessionContext`. Primary keys come from table
//!   constraints; relationships are inferred from column names.
//! - [`sources::SqliteSource`] (feature `sqlite`, on by default): declared
//!   primary and foreign keys are read from the catalog.
//! - `sources::PostgresSource` (feature `postgres`): a live server, reflected
//!   through `pg_catalog`. The configured database selects the schema, which
//!   is activated with `SET search_path` before any reflection.
//!
//! ## Pipeline
//!
//! [`discovery::OntologyAssembler`] runs a fixed sequence of stages, each one a
//! small component borrowing the run's [`config::DiscoveryConfig`]:
//!
//! - **Nouns**: one per table, named by [`naming::ConceptNamer`]
//! - **Links**: declared foreign keys, plus name-inferred joins when keys are
//!   sparse; every join is sampled for overlap and cardinality
//! - **Dimensions, derived fields, metrics**: rule-driven column classification
//!   (see [`rules::RuleBook`])
//! - **Templates and quality flags**: group-by patterns and low-confidence
//!   links routed to review
//!
//! Connection and context failures abort the run before anything is written.
//! A failed sampling query only degrades the affected link.

pub mod config;
pub mod discovery;
pub mod error;
pub mod introspection;
pub mod logging;
pub mod model;
pub mod naming;
pub mod ordered;
pub mod prelude;
pub mod report;
pub mod rules;
pub mod security;
pub mod sources;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
