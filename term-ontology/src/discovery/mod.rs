//! Discovery stages.
//!
//! Each stage is a small component taking the run's [`DiscoveryConfig`] by
//! reference. [`OntologyAssembler`] sequences them:
//!
//! 1. [`NounMetricSeeder`]: nouns and `Average <Column>` metrics
//! 2. [`LinkDiscoverer`]: declared foreign keys, then name inference, each
//!    checked by [`RelationshipValidator`] and [`CardinalityDetector`]
//! 3. [`DimensionDiscoverer`], [`DerivedFieldDiscoverer`],
//!    [`AdvancedMetricDiscoverer`]
//! 4. [`QueryTemplateGenerator`] and [`QualityFlagGenerator`]
//!
//! [`DiscoveryConfig`]: crate::config::DiscoveryConfig

pub mod advanced_metrics;
pub mod assembler;
pub mod cardinality;
pub mod derived;
pub mod dimensions;
pub mod links;
pub mod nouns;
pub mod quality;
pub mod templates;
pub mod validator;

pub use advanced_metrics::AdvancedMetricDiscoverer;
pub use assembler::OntologyAssembler;
pub use cardinality::{CardinalityDetector, CardinalityResult, SideCounts};
pub use derived::DerivedFieldDiscoverer;
pub use dimensions::DimensionDiscoverer;
pub use links::LinkDiscoverer;
pub use nouns::NounMetricSeeder;
pub use quality::QualityFlagGenerator;
pub use templates::QueryTemplateGenerator;
pub use validator::{LinkValidation, RelationshipValidator};

use std::fmt;

/// One side-by-side column pair to be sampled as a potential join.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinCandidate {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

impl JoinCandidate {
    pub fn new(
        from_table: impl Into<String>,
        from_column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        Self {
            from_table: from_table.into(),
            from_column: from_column.into(),
            to_table: to_table.into(),
            to_column: to_column.into(),
        }
    }

    /// Canonical `"from_table.from_col = to_table.to_col"` join string.
    pub fn join_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for JoinCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} = {}.{}",
            self.from_table, self.from_column, self.to_table, self.to_column
        )
    }
}
