//! Logging utilities and configuration for ontology discovery.
//!
//! Discovery stages log through `tracing`. Progress goes out at `info`, degraded
//! link checks and heuristic overflows at `warn`, generated sampling SQL at
//! `debug`. Logs are written to stderr so the human summary printed by the
//! binary on stdout stays clean.

use tracing::Level;

/// Truncates a string to the maximum field length if needed.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        value.to_string()
    } else {
        let mut end = max_length;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        let truncated = &value[..end];
        format!("{truncated}...(truncated)")
    }
}

/// Maximum length of SQL text emitted in debug logs.
pub const MAX_LOGGED_SQL: usize = 512;

/// Utilities for setting up structured logging.
pub mod setup {
    use super::Level;

    /// Configuration for the logging setup.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for dependencies
        pub level: Level,
        /// Log level for term-ontology components specifically
        pub ontology_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::WARN,
                ontology_level: Level::INFO,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Creates a configuration for debugging discovery runs.
        pub fn development() -> Self {
            Self {
                level: Level::INFO,
                ontology_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        /// Creates a configuration for structured (JSON) logging.
        pub fn structured() -> Self {
            Self {
                level: Level::WARN,
                ontology_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Sets the log level for dependencies.
        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        /// Sets the log level for term-ontology components.
        pub fn with_ontology_level(mut self, level: Level) -> Self {
            self.ontology_level = level;
            self
        }

        /// Sets whether to use JSON output format.
        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        /// Sets a custom environment filter.
        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},term_ontology={},discover_ontology={}",
                    self.level.as_str().to_lowercase(),
                    self.ontology_level.as_str().to_lowercase(),
                    self.ontology_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Initializes logging to stderr.
    ///
    /// `RUST_LOG` takes precedence over the configured filter when set.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use term_ontology::logging::setup::{LoggingConfig, init_logging};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}
