//! Relationship shape detection.

use super::JoinCandidate;
use crate::config::{CardinalityBasis, SamplingConfig};
use crate::error::{OntologyError, Result};
use crate::model::Cardinality;
use crate::security::SqlSecurity;
use crate::sources::SchemaSource;
use tracing::{debug, instrument, warn};

/// Detected cardinality and the explanation stored on the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardinalityResult {
    pub cardinality: Cardinality,
    pub reason: String,
}

/// Key statistics of one side of a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SideCounts {
    /// Distinct non-null key values
    pub distinct_keys: u64,
    /// Non-null rows carrying a key
    pub key_rows: u64,
}

impl SideCounts {
    fn basis(&self, basis: CardinalityBasis) -> u64 {
        match basis {
            CardinalityBasis::ReferencingRows => self.key_rows,
            CardinalityBasis::DistinctGroups => self.distinct_keys,
        }
    }
}

impl CardinalityResult {
    /// Applies the many/one rule to counted sides.
    ///
    /// A side with no key groups yields `unknown`. Otherwise the `from` side is
    /// "many" when its count exceeds `ratio` times the `to` count, and vice versa;
    /// anything in between is `many_to_many`.
    pub fn classify(
        candidate: &JoinCandidate,
        from: SideCounts,
        to: SideCounts,
        config: &SamplingConfig,
    ) -> Self {
        if from.distinct_keys == 0 || to.distinct_keys == 0 {
            return Self {
                cardinality: Cardinality::Unknown,
                reason: "No valid data for cardinality detection".to_string(),
            };
        }

        let from_count = from.basis(config.cardinality_basis) as f64;
        let to_count = to.basis(config.cardinality_basis) as f64;
        let ratio = config.cardinality_ratio;

        if from_count > to_count * ratio {
            Self {
                cardinality: Cardinality::ManyToOne,
                reason: format!(
                    "Many {} reference fewer {}",
                    candidate.from_table, candidate.to_table
                ),
            }
        } else if to_count > from_count * ratio {
            Self {
                cardinality: Cardinality::OneToMany,
                reason: format!(
                    "One {} referenced by many {}",
                    candidate.from_table, candidate.to_table
                ),
            }
        } else {
            Self {
                cardinality: Cardinality::ManyToMany,
                reason: "Complex relationship detected".to_string(),
            }
        }
    }
}

/// Classifies a candidate join as many-to-one, one-to-many or many-to-many.
/// Query failures yield `unknown` with the failure as the reason.
///
/// Each side is counted twice: distinct key groups (`COUNT(DISTINCT c)`) and
/// non-null referencing rows (`COUNT(c)`). The ratio rule compares the count
/// picked by [`CardinalityBasis`]. The default is
/// [`CardinalityBasis::ReferencingRows`], not the distinct-group comparison:
/// on an intact foreign key the referencing side never has more distinct keys
/// than the referenced side, so distinct groups can never yield `many_to_one`
/// and `orders.customer_id -> customers` would come out `many_to_many`. Use [`CardinalityBasis::DistinctGroups`] for the literal
/// distinct-group comparison. Zero groups on either side is `unknown` under
/// both bases.
pub struct CardinalityDetector<'a> {
    source: &'a dyn SchemaSource,
    config: &'a SamplingConfig,
}

impl<'a> CardinalityDetector<'a> {
    pub fn new(source: &'a dyn SchemaSource, config: &'a SamplingConfig) -> Self {
        Self { source, config }
    }

    #[instrument(skip(self), fields(join = %candidate))]
    pub async fn detect(&self, candidate: &JoinCandidate) -> CardinalityResult {
        let counts = async {
            let from = self
                .side_counts(&candidate.from_table, &candidate.from_column)
                .await?;
            let to = self
                .side_counts(&candidate.to_table, &candidate.to_column)
                .await?;
            Ok::<_, OntologyError>((from, to))
        }
        .await;

        match counts {
            Ok((from, to)) => {
                let result = CardinalityResult::classify(candidate, from, to, self.config);
                debug!(
                    from_keys = from.distinct_keys,
                    from_rows = from.key_rows,
                    to_keys = to.distinct_keys,
                    to_rows = to.key_rows,
                    cardinality = %result.cardinality,
                    "Cardinality detected"
                );
                result
            }
            Err(e) => {
                warn!(error = %e, "Cardinality detection failed");
                CardinalityResult {
                    cardinality: Cardinality::Unknown,
                    reason: format!("Could not determine cardinality: {e}"),
                }
            }
        }
    }

    async fn side_counts(&self, table: &str, column: &str) -> Result<SideCounts> {
        let table = self.source.qualified_table(table)?;
        let column = SqlSecurity::escape_identifier(column)?;
        let sql = format!(
            "SELECT COUNT(DISTINCT {column}) AS distinct_keys, COUNT({column}) AS key_rows FROM {table}"
        );

        match self.source.query_counts(&sql).await?.as_slice() {
            [distinct_keys, key_rows, ..] => Ok(SideCounts {
                distinct_keys: *distinct_keys,
                key_rows: *key_rows,
            }),
            other => Err(OntologyError::Query(format!(
                "Cardinality query returned {} columns, expected 2",
                other.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::DataFusionSource;
    use datafusion::prelude::SessionContext;

    fn candidate() -> JoinCandidate {
        JoinCandidate::new("orders", "customer_id", "customers", "id")
    }

    fn side(distinct_keys: u64, key_rows: u64) -> SideCounts {
        SideCounts {
            distinct_keys,
            key_rows,
        }
    }

    #[test]
    fn test_classify_referencing_rows() {
        let config = SamplingConfig::default();

        let r = CardinalityResult::classify(&candidate(), side(100, 300), side(100, 100), &config);
        assert_eq!(r.cardinality, Cardinality::ManyToOne);
        assert_eq!(r.reason, "Many orders reference fewer customers");

        let r = CardinalityResult::classify(&candidate(), side(10, 10), side(50, 50), &config);
        assert_eq!(r.cardinality, Cardinality::OneToMany);
        assert_eq!(r.reason, "One orders referenced by many customers");

        let r = CardinalityResult::classify(&candidate(), side(10, 20), side(10, 10), &config);
        assert_eq!(r.cardinality, Cardinality::ManyToMany);
        assert_eq!(r.reason, "Complex relationship detected");
    }

    #[test]
    fn test_classify_distinct_groups() {
        let config = SamplingConfig {
            cardinality_basis: CardinalityBasis::DistinctGroups,
            ..SamplingConfig::default()
        };
        let r = CardinalityResult::classify(&candidate(), side(100, 300), side(100, 100), &config);
        assert_eq!(r.cardinality, Cardinality::ManyToMany);

        let r = CardinalityResult::classify(&candidate(), side(201, 201), side(100, 100), &config);
        assert_eq!(r.cardinality, Cardinality::ManyToOne);
    }

    #[test]
    fn test_zero_side_is_unknown() {
        let config = SamplingConfig::default();
        let r = CardinalityResult::classify(&candidate(), side(0, 0), side(5, 5), &config);
        assert_eq!(r.cardinality, Cardinality::Unknown);
        assert_eq!(r.reason, "No valid data for cardinality detection");
    }

    #[tokio::test]
    async fn test_detect_against_data() {
        let ctx = SessionContext::new();
        for sql in [
            "CREATE TABLE customers (id BIGINT)",
            "CREATE TABLE orders (order_id BIGINT, customer_id BIGINT)",
            "INSERT INTO customers VALUES (1), (2)",
            "INSERT INTO orders VALUES (1, 1), (2, 1), (3, 1), (4, 2), (5, 2), (6, 2)",
        ] {
            ctx.sql(sql).await.unwrap().collect().await.unwrap();
        }
        let source = DataFusionSource::new(ctx, None, None).await.unwrap();
        let config = SamplingConfig::default();
        let detector = CardinalityDetector::new(&source, &config);

        let r = detector.detect(&candidate()).await;
        assert_eq!(r.cardinality, Cardinality::ManyToOne);

        let r = detector
            .detect(&JoinCandidate::new("orders", "nope", "customers", "id"))
            .await;
        assert_eq!(r.cardinality, Cardinality::Unknown);
        assert!(r.reason.starts_with("Could not determine cardinality"));
    }

    #[tokio::test]
    async fn test_default_basis_on_intact_foreign_key() {
        let ctx = SessionContext::new();
        for sql in [
            r#"CREATE TABLE "customer-accounts" ("customer id" BIGINT)"#,
            r#"CREATE TABLE orders (order_id BIGINT, "customer id" BIGINT)"#,
            r#"INSERT INTO "customer-accounts" VALUES (1), (2), (3)"#,
            "INSERT INTO orders VALUES (1, 1), (2, 1), (3, 2), (4, 2), (5, 3), (6, 3), (7, 3)",
        ] {
            ctx.sql(sql).await.unwrap().collect().await.unwrap();
        }
        let source = DataFusionSource::new(ctx, None, None).await.unwrap();
        let join = JoinCandidate::new("orders", "customer id", "customer-accounts", "customer id");

        let config = SamplingConfig::default();
        assert_eq!(config.cardinality_basis, CardinalityBasis::ReferencingRows);
        let r = CardinalityDetector::new(&source, &config).detect(&join).await;
        assert_eq!(r.cardinality, Cardinality::ManyToOne);

        // same keys on both sides: distinct groups cannot tell the sides apart
        let distinct = SamplingConfig {
            cardinality_basis: CardinalityBasis::DistinctGroups,
            ..SamplingConfig::default()
        };
        let r = CardinalityDetector::new(&source, &distinct).detect(&join).await;
        assert_eq!(r.cardinality, Cardinality::ManyToMany);
    }
}
