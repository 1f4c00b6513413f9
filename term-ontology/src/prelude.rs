//! Commonly used types for ontology discovery.

pub use crate::config::{DiscoveryConfig, DiscoveryConfigBuilder};
pub use crate::discovery::assembler::discover_ontology;
pub use crate::discovery::OntologyAssembler;
pub use crate::error::{ErrorContext, OntologyError, Result};
pub use crate::model::{Link, OntologyDocument};
pub use crate::report::{OntologyFormatter, SummaryFormatter};
pub use crate::sources::{connect, DataFusionSource, EngineKind, SchemaSource, SourceConfig};

#[cfg(feature = "postgres")]
pub use crate::sources::PostgresSource;
#[cfg(feature = "sqlite")]
pub use crate::sources::SqliteSource;
