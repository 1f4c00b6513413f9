//! Discovery configuration.
//!
//! A [`DiscoveryConfig`] is built once (defaults, optionally overlaid from a JSON
//! file) and passed by reference to every discovery stage. There is no global or
//! thread-local discovery state.
//!
//! # Examples
//!
//! ```rust
//! use term_ontology::config::{CardinalityBasis, DiscoveryConfig};
//!
//! let config = DiscoveryConfig::builder()
//!     .sample_size(5_000)
//!     .cardinality_basis(CardinalityBasis::DistinctGroups)
//!     .require_matching_types(true)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.sampling.sample_size, 5_000);
//! ```

use crate::error::{ErrorContext, OntologyError, Result};
use crate::rules::RuleBook;
use crate::security::InputValidator;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix/suffix stripping for concept names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub strip_prefixes: Vec<String>,
    pub strip_suffixes: Vec<String>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            strip_prefixes: vec!["olist_".to_string()],
            strip_suffixes: vec!["_dataset".to_string()],
        }
    }
}

/// Which per-side count the cardinality rule compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardinalityBasis {
    /// Non-null rows carrying the join key (`COUNT(col)`)
    #[default]
    ReferencingRows,
    /// Distinct join-key values (`COUNT(DISTINCT col)`)
    DistinctGroups,
}

/// Relationship sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Maximum distinct values drawn per side of a join
    pub sample_size: usize,
    /// Confidence at or above which the boost applies
    pub boost_threshold: f64,
    pub boost: f64,
    /// Post-boost confidence at or above which a link is `verified`
    pub verified_threshold: f64,
    /// One side must exceed the other by this factor to be called "many"
    pub cardinality_ratio: f64,
    pub cardinality_basis: CardinalityBasis,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_size: 10_000,
            boost_threshold: 0.8,
            boost: 0.10,
            verified_threshold: 0.5,
            cardinality_ratio: 2.0,
            cardinality_basis: CardinalityBasis::default(),
        }
    }
}

/// Link discovery options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Reject name-inferred links whose column types differ
    pub require_matching_types: bool,
}

/// Dimension discovery options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionConfig {
    pub max_dimensions: usize,
    /// Categorical dimensions used per metric when generating templates
    pub templates_per_metric: usize,
}

impl Default for DimensionConfig {
    fn default() -> Self {
        Self {
            max_dimensions: 15,
            templates_per_metric: 3,
        }
    }
}

/// How the two columns of the processing time field are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalOrder {
    /// First two date-like columns in declaration order
    #[default]
    Declaration,
    /// First two date-like columns ordered by lifecycle keywords
    /// (created, started, updated, processed, completed, ended)
    Lifecycle,
}

/// Derived field options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivedConfig {
    pub temporal_order: TemporalOrder,
}

/// Quality flag options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Links below this confidence need review
    pub review_threshold: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            review_threshold: 0.7,
        }
    }
}

/// Complete configuration for one discovery run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub naming: NamingConfig,
    pub sampling: SamplingConfig,
    pub links: LinkConfig,
    pub dimensions: DimensionConfig,
    pub derived: DerivedConfig,
    pub quality: QualityConfig,
    pub rules: RuleBook,
}

impl DiscoveryConfig {
    /// Creates a builder starting from defaults.
    pub fn builder() -> DiscoveryConfigBuilder {
        DiscoveryConfigBuilder::default()
    }

    /// Loads a configuration from a JSON file; missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .context(&format!("Failed to read config '{}'", path.display()))?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            OntologyError::Configuration(format!("Invalid config '{}': {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that thresholds are usable.
    pub fn validate(&self) -> Result<()> {
        if self.sampling.sample_size == 0 {
            return Err(OntologyError::Configuration(
                "sampling.sample_size must be greater than zero".to_string(),
            ));
        }
        InputValidator::validate_percentage(self.sampling.boost_threshold, "boost_threshold")?;
        InputValidator::validate_percentage(self.sampling.boost, "boost")?;
        InputValidator::validate_percentage(
            self.sampling.verified_threshold,
            "verified_threshold",
        )?;
        InputValidator::validate_threshold(self.sampling.cardinality_ratio, "cardinality_ratio")?;
        if self.sampling.cardinality_ratio < 1.0 {
            return Err(OntologyError::Configuration(format!(
                "cardinality_ratio must be at least 1.0, got {}",
                self.sampling.cardinality_ratio
            )));
        }
        InputValidator::validate_percentage(self.quality.review_threshold, "review_threshold")?;
        Ok(())
    }
}

/// Builder for [`DiscoveryConfig`].
#[derive(Debug, Default)]
pub struct DiscoveryConfigBuilder {
    config: DiscoveryConfig,
}

impl DiscoveryConfigBuilder {
    pub fn strip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.naming.strip_prefixes.push(prefix.into());
        self
    }

    pub fn strip_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.naming.strip_suffixes.push(suffix.into());
        self
    }

    pub fn sample_size(mut self, size: usize) -> Self {
        self.config.sampling.sample_size = size;
        self
    }

    pub fn cardinality_basis(mut self, basis: CardinalityBasis) -> Self {
        self.config.sampling.cardinality_basis = basis;
        self
    }

    pub fn require_matching_types(mut self, enabled: bool) -> Self {
        self.config.links.require_matching_types = enabled;
        self
    }

    pub fn max_dimensions(mut self, max: usize) -> Self {
        self.config.dimensions.max_dimensions = max;
        self
    }

    pub fn temporal_order(mut self, order: TemporalOrder) -> Self {
        self.config.derived.temporal_order = order;
        self
    }

    pub fn review_threshold(mut self, threshold: f64) -> Self {
        self.config.quality.review_threshold = threshold;
        self
    }

    pub fn rules(mut self, rules: RuleBook) -> Self {
        self.config.rules = rules;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<DiscoveryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
