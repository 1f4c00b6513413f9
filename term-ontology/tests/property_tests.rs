//! Property-based tests for link scoring, cardinality and dimension capping.
//!
//! The scoring and classification functions are pure, so the properties are
//! checked directly on counts rather than through generated tables.

use proptest::prelude::*;
use term_ontology::config::{CardinalityBasis, SamplingConfig};
use term_ontology::discovery::dimensions::cap_dimensions;
use term_ontology::discovery::{CardinalityResult, JoinCandidate, LinkValidation, SideCounts};
use term_ontology::model::{
    Cardinality, Dimension, DimensionPriority, DimensionType, ValidationFlag,
};
use term_ontology::ordered::OrderedMap;

fn candidate() -> JoinCandidate {
    JoinCandidate::new("orders", "customer_id", "customers", "customer_id")
}

/// (from_distinct, to_distinct, matched) with matched bounded by both sides.
fn overlap_counts() -> impl Strategy<Value = (u64, u64, u64)> {
    (0u64..500, 0u64..500).prop_flat_map(|(from, to)| {
        let max_matched = from.min(to);
        (Just(from), Just(to), 0..=max_matched)
    })
}

fn dimension_set() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 0..40)
}

fn build_dimensions(high_flags: &[bool]) -> OrderedMap<Dimension> {
    high_flags
        .iter()
        .enumerate()
        .map(|(i, high)| {
            let column = format!("column_{i}");
            (
                Dimension::key("Orders", &column),
                Dimension {
                    kind: DimensionType::Categorical,
                    priority: if *high {
                        DimensionPriority::High
                    } else {
                        DimensionPriority::Medium
                    },
                    noun: "Orders".to_string(),
                    column,
                    description: String::new(),
                },
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_confidence_is_bounded((from, to, matched) in overlap_counts()) {
        let config = SamplingConfig::default();
        let validation = LinkValidation::from_counts(from, to, matched, &config);

        prop_assert!(validation.confidence >= 0.0);
        prop_assert!(validation.confidence <= 1.0);
        prop_assert!(validation.match_rate >= 0.0 && validation.match_rate <= 1.0);
        if from == 0 || to == 0 {
            prop_assert_eq!(validation.confidence, 0.0);
        }
    }

    #[test]
    fn prop_high_overlap_is_boosted((from, to, matched) in overlap_counts()) {
        let config = SamplingConfig::default();
        let validation = LinkValidation::from_counts(from, to, matched, &config);
        let rounded = (validation.match_rate * 100.0).round() / 100.0;

        if rounded >= 0.8 {
            let expected = ((rounded + 0.1).min(1.0) * 100.0).round() / 100.0;
            prop_assert!((validation.confidence - expected).abs() < 1e-9);
            prop_assert!(validation.confidence >= 0.9);
        } else {
            prop_assert!((validation.confidence - rounded).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_flag_follows_confidence((from, to, matched) in overlap_counts()) {
        let config = SamplingConfig::default();
        let validation = LinkValidation::from_counts(from, to, matched, &config);

        if validation.confidence >= 0.5 {
            prop_assert_eq!(validation.flag, ValidationFlag::Verified);
        } else {
            prop_assert_eq!(validation.flag, ValidationFlag::ManualReview);
        }
    }

    #[test]
    fn prop_cardinality_rule(from in 0u64..1000, to in 0u64..1000) {
        let config = SamplingConfig {
            cardinality_basis: CardinalityBasis::DistinctGroups,
            ..SamplingConfig::default()
        };
        let side = |n: u64| SideCounts { distinct_keys: n, key_rows: n };
        let result = CardinalityResult::classify(&candidate(), side(from), side(to), &config);

        let expected = if from == 0 || to == 0 {
            Cardinality::Unknown
        } else if from > 2 * to {
            Cardinality::ManyToOne
        } else if to > 2 * from {
            Cardinality::OneToMany
        } else {
            Cardinality::ManyToMany
        };
        prop_assert_eq!(result.cardinality, expected);
    }

    #[test]
    fn prop_row_basis_keeps_zero_groups_unknown(rows in 0u64..1000, to in 1u64..1000) {
        let config = SamplingConfig::default();
        let empty = SideCounts { distinct_keys: 0, key_rows: rows };
        let other = SideCounts { distinct_keys: to, key_rows: to };
        let result = CardinalityResult::classify(&candidate(), empty, other, &config);
        prop_assert_eq!(result.cardinality, Cardinality::Unknown);
    }

    #[test]
    fn prop_dimension_cap(flags in dimension_set(), max in 1usize..20) {
        let dimensions = build_dimensions(&flags);
        let high: Vec<String> = dimensions
            .iter()
            .filter(|(_, d)| d.priority == DimensionPriority::High)
            .map(|(k, _)| k.to_string())
            .collect();

        let capped = cap_dimensions(dimensions.clone(), max);

        prop_assert!(capped.len() <= max.max(high.len()));
        for key in &high {
            prop_assert!(capped.contains_key(key));
        }
        if dimensions.len() <= max {
            prop_assert_eq!(&capped, &dimensions);
        }
        // kept mediums are the earliest ones
        let kept_medium: Vec<_> = capped
            .values()
            .filter(|d| d.priority == DimensionPriority::Medium)
            .map(|d| d.column.clone())
            .collect();
        let all_medium: Vec<_> = dimensions
            .values()
            .filter(|d| d.priority == DimensionPriority::Medium)
            .map(|d| d.column.clone())
            .collect();
        prop_assert_eq!(&kept_medium[..], &all_medium[..kept_medium.len()]);
    }
}

#[test]
fn test_boost_examples() {
    let config = SamplingConfig::default();
    // raw 0.85 -> 0.95
    let v = LinkValidation::from_counts(100, 100, 85, &config);
    assert_eq!(v.confidence, 0.95);
    // raw 0.95 -> 1.0, never 1.05
    let v = LinkValidation::from_counts(100, 100, 95, &config);
    assert_eq!(v.confidence, 1.0);
    // raw 0.5 stays and is verified
    let v = LinkValidation::from_counts(10, 20, 5, &config);
    assert_eq!(v.confidence, 0.5);
    assert_eq!(v.flag, ValidationFlag::Verified);
}
