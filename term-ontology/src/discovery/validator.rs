//! Sampled overlap scoring for candidate joins.
//!
//! A candidate join is scored by drawing up to `sample_size` distinct non-null
//! key values from each side and measuring how much the smaller sample overlaps
//! the other:
//!
//! ```text
//! match_rate = |from ∩ to| / min(|from|, |to|)      (0 when a side is empty)
//! confidence = round2(match_rate), boosted by +0.10 (capped at 1.0) when >= 0.8
//! ```

use super::JoinCandidate;
use crate::config::SamplingConfig;
use crate::error::{OntologyError, Result};
use crate::model::{round2, ValidationFlag};
use crate::sources::SchemaSource;
use crate::security::SqlSecurity;
use tracing::{debug, instrument, warn};

/// Outcome of one sampled join check.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkValidation {
    /// Post-boost confidence in `[0, 1]`
    pub confidence: f64,
    /// Raw overlap ratio before rounding and boost
    pub match_rate: f64,
    /// Sampling cap used for each side
    pub sample_size: usize,
    pub flag: ValidationFlag,
}

impl LinkValidation {
    /// Scores already-counted samples.
    pub fn from_counts(
        from_distinct: u64,
        to_distinct: u64,
        matched: u64,
        config: &SamplingConfig,
    ) -> Self {
        let smaller = from_distinct.min(to_distinct);
        let match_rate = if smaller > 0 {
            (matched.min(smaller)) as f64 / smaller as f64
        } else {
            0.0
        };

        let mut confidence = round2(match_rate);
        if confidence >= config.boost_threshold {
            confidence = round2((confidence + config.boost).min(1.0));
        }

        let flag = if confidence >= config.verified_threshold {
            ValidationFlag::Verified
        } else {
            ValidationFlag::ManualReview
        };

        Self {
            confidence,
            match_rate,
            sample_size: config.sample_size,
            flag,
        }
    }

    /// A check that could not run.
    pub fn failed(reason: impl Into<String>, config: &SamplingConfig) -> Self {
        Self {
            confidence: 0.0,
            match_rate: 0.0,
            sample_size: config.sample_size,
            flag: ValidationFlag::Error(reason.into()),
        }
    }
}

/// Scores candidate joins against live data. Never fails: query errors are
/// returned as an `error` flag with zero confidence.
pub struct RelationshipValidator<'a> {
    source: &'a dyn SchemaSource,
    config: &'a SamplingConfig,
}

impl<'a> RelationshipValidator<'a> {
    pub fn new(source: &'a dyn SchemaSource, config: &'a SamplingConfig) -> Self {
        Self { source, config }
    }

    #[instrument(skip(self), fields(join = %candidate))]
    pub async fn validate(&self, candidate: &JoinCandidate) -> LinkValidation {
        match self.sample(candidate).await {
            Ok(validation) => {
                debug!(
                    confidence = validation.confidence,
                    match_rate = validation.match_rate,
                    flag = %validation.flag,
                    "Link validated"
                );
                validation
            }
            Err(e) => {
                warn!(error = %e, "Link validation failed");
                LinkValidation::failed(e.to_string(), self.config)
            }
        }
    }

    async fn sample(&self, candidate: &JoinCandidate) -> Result<LinkValidation> {
        let sql = self.overlap_query(candidate)?;
        let counts = self.source.query_counts(&sql).await?;
        match counts.as_slice() {
            [from_distinct, to_distinct, matched, ..] => Ok(LinkValidation::from_counts(
                *from_distinct,
                *to_distinct,
                *matched,
                self.config,
            )),
            _ => Err(OntologyError::Query(format!(
                "Overlap query returned {} columns, expected 3",
                counts.len()
            ))),
        }
    }

    /// One query returning the two sample sizes and their intersection size.
    pub fn overlap_query(&self, candidate: &JoinCandidate) -> Result<String> {
        let from_table = self.source.qualified_table(&candidate.from_table)?;
        let to_table = self.source.qualified_table(&candidate.to_table)?;
        let from_col = SqlSecurity::escape_identifier(&candidate.from_column)?;
        let to_col = SqlSecurity::escape_identifier(&candidate.to_column)?;
        let limit = self.config.sample_size;

        Ok(format!(
            "WITH from_sample AS (
                SELECT DISTINCT {from_col} AS v FROM {from_table} WHERE {from_col} IS NOT NULL LIMIT {limit}
            ),
            to_sample AS (
                SELECT DISTINCT {to_col} AS v FROM {to_table} WHERE {to_col} IS NOT NULL LIMIT {limit}
            )
            SELECT f.from_distinct, t.to_distinct, m.matched
            FROM (SELECT COUNT(*) AS from_distinct FROM from_sample) f,
                 (SELECT COUNT(*) AS to_distinct FROM to_sample) t,
                 (SELECT COUNT(*) AS matched FROM from_sample INNER JOIN to_sample ON from_sample.v = to_sample.v) m"
        ))
    }
}
