//! Error types for ontology discovery.
//!
//! Errors returned from this crate are fatal for a discovery run: a connection
//! that cannot be opened, a catalog/schema that cannot be activated, or an output
//! file that cannot be written. Failures of individual sampling queries never
//! surface here; they are absorbed into the affected link (see
//! [`crate::discovery::validator`] and [`crate::discovery::cardinality`]).

use thiserror::Error;

/// The main error type for the ontology discovery engine.
#[derive(Error, Debug)]
pub enum OntologyError {
    /// The underlying engine could not be reached or opened.
    #[error("Connection to {engine} failed: {message}")]
    Connection {
        /// Engine family (e.g., "sqlite", "datafusion")
        engine: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The configured catalog or schema could not be activated.
    #[error("Failed to switch context to '{target}': {message}")]
    Context {
        /// Catalog or schema name that was requested
        target: String,
        /// Detailed error message
        message: String,
    },

    /// A reflection or sampling query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from SQLite operations.
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Error from PostgreSQL operations.
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Security-related error.
    #[error("Security error: {0}")]
    SecurityError(String),
}

/// A type alias for `Result<T, OntologyError>`.
pub type Result<T> = std::result::Result<T, OntologyError>;

impl OntologyError {
    /// Creates a new connection error.
    pub fn connection(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            engine: engine.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new connection error with a source error.
    pub fn connection_with_source(
        engine: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Connection {
            engine: engine.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new context switch error.
    pub fn context(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Context {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error must abort the whole discovery run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Context { .. } | Self::Configuration(_)
        )
    }
}

impl From<serde_json::Error> for OntologyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<OntologyError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            OntologyError::Query(format!("{msg}: {inner}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_display() {
        let err = OntologyError::connection("sqlite", "unable to open database file");
        assert_eq!(
            err.to_string(),
            "Connection to sqlite failed: unable to open database file"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_context_error_display() {
        let err = OntologyError::context("warehouse", "catalog not found");
        assert_eq!(
            err.to_string(),
            "Failed to switch context to 'warehouse': catalog not found"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_query_errors_are_not_fatal() {
        assert!(!OntologyError::Query("boom".to_string()).is_fatal());
        assert!(!OntologyError::SecurityError("bad identifier".to_string()).is_fatal());
    }

    #[test]
    fn test_error_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        let err = result.context("Failed to read config").unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
        assert!(err.to_string().contains("file not found"));
    }
}
