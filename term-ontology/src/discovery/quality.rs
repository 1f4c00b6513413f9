//! Confidence-based review routing.

use crate::config::QualityConfig;
use crate::model::{Link, QualityFlags, ReviewItem};
use tracing::{info, instrument};

const LOW_CONFIDENCE_ISSUE: &str = "Low confidence match";

/// Splits links into those needing human review and high-confidence ones.
pub struct QualityFlagGenerator<'a> {
    config: &'a QualityConfig,
}

impl<'a> QualityFlagGenerator<'a> {
    pub fn new(config: &'a QualityConfig) -> Self {
        Self { config }
    }

    #[instrument(skip_all, fields(links = links.len()))]
    pub fn generate(&self, links: &[Link]) -> QualityFlags {
        let mut flags = QualityFlags::default();

        for link in links {
            if link.confidence < self.config.review_threshold {
                flags.links_needing_review.push(ReviewItem {
                    link: link.summary(),
                    confidence: link.confidence,
                    issue: LOW_CONFIDENCE_ISSUE.to_string(),
                });
            } else {
                flags.high_confidence_links.push(link.join.clone());
            }
        }

        info!(
            needing_review = flags.links_needing_review.len(),
            high_confidence = flags.high_confidence_links.len(),
            "Generated quality flags"
        );
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cardinality, DiscoveryMethod, ValidationFlag};

    fn link(from: &str, join: &str, confidence: f64) -> Link {
        Link {
            from_object: from.to_string(),
            to_object: "Customers".to_string(),
            join: join.to_string(),
            cardinality: Cardinality::ManyToOne,
            method: DiscoveryMethod::InferredByName,
            confidence,
            cardinality_info: String::new(),
            flag: ValidationFlag::Verified,
        }
    }

    #[test]
    fn test_partitions_at_threshold() {
        let links = vec![
            link("Orders", "orders.customer_id = customers.customer_id", 0.95),
            link("Reviews", "reviews.customer_id = customers.customer_id", 0.69),
            link("Payments", "payments.customer_id = customers.customer_id", 0.7),
        ];
        let config = QualityConfig::default();
        let flags = QualityFlagGenerator::new(&config).generate(&links);

        assert_eq!(
            flags.high_confidence_links,
            vec![
                "orders.customer_id = customers.customer_id",
                "payments.customer_id = customers.customer_id",
            ]
        );
        assert_eq!(
            flags.links_needing_review,
            vec![ReviewItem {
                link: "Reviews -> Customers".to_string(),
                confidence: 0.69,
                issue: "Low confidence match".to_string(),
            }]
        );
        assert!(flags.suggested_improvements.is_empty());
    }

    #[test]
    fn test_failed_checks_need_review() {
        let mut failed = link("Orders", "orders.x = customers.x", 0.0);
        failed.flag = ValidationFlag::Error("no such column".to_string());
        let config = QualityConfig::default();
        let flags = QualityFlagGenerator::new(&config).generate(&[failed]);
        assert_eq!(flags.links_needing_review.len(), 1);
        assert!(flags.high_confidence_links.is_empty());
    }
}
