//! Derived (computed) field discovery.

use crate::config::{DiscoveryConfig, TemporalOrder};
use crate::introspection::SchemaSnapshot;
use crate::model::{DerivedField, Noun};
use crate::ordered::OrderedMap;
use tracing::{debug, info, instrument};

/// Emits at most one `processing_time` and one `total_value` field per noun.
pub struct DerivedFieldDiscoverer<'a> {
    config: &'a DiscoveryConfig,
}

impl<'a> DerivedFieldDiscoverer<'a> {
    pub fn new(config: &'a DiscoveryConfig) -> Self {
        Self { config }
    }

    #[instrument(skip_all, fields(nouns = nouns.len()))]
    pub fn discover(
        &self,
        nouns: &OrderedMap<Noun>,
        snapshot: &SchemaSnapshot,
    ) -> OrderedMap<DerivedField> {
        let rules = &self.config.rules;
        let mut derived = OrderedMap::new();

        for (noun_name, noun) in nouns.iter() {
            let Some(table) = snapshot.table(&noun.table) else {
                continue;
            };

            let temporal: Vec<&str> = table
                .columns
                .iter()
                .filter(|c| rules.temporal_columns.matches(&c.name))
                .map(|c| c.name.as_str())
                .collect();
            if let Some((first, second)) = self.pick_temporal_pair(&temporal) {
                derived.insert(
                    format!("{noun_name}_processing_time"),
                    DerivedField {
                        logic: format!("DATEDIFF({second}, {first})"),
                        kind: "days".to_string(),
                        description: format!("Time between {first} and {second}"),
                        noun: noun_name.to_string(),
                    },
                );
            }

            let financial: Vec<&str> = table
                .columns
                .iter()
                .filter(|c| rules.financial_columns.matches(&c.name, &c.data_type))
                .map(|c| c.name.as_str())
                .collect();
            if let [first, second, ..] = financial.as_slice() {
                derived.insert(
                    format!("{noun_name}_total_value"),
                    DerivedField {
                        logic: format!("({first} + {second})"),
                        kind: "numeric".to_string(),
                        description: format!("Combined value from {first} and {second}"),
                        noun: noun_name.to_string(),
                    },
                );
            }
        }

        info!(derived_fields = derived.len(), "Discovered derived fields");
        derived
    }

    /// First two date-like columns in declaration order, swapped when lifecycle
    /// ordering is configured and the second one happens earlier.
    fn pick_temporal_pair<'c>(&self, columns: &[&'c str]) -> Option<(&'c str, &'c str)> {
        let [first, second, ..] = columns else {
            return None;
        };
        match self.config.derived.temporal_order {
            TemporalOrder::Declaration => Some((*first, *second)),
            TemporalOrder::Lifecycle if lifecycle_stage(second) < lifecycle_stage(first) => {
                debug!(first = *second, second = *first, "Reordered temporal columns by lifecycle");
                Some((*second, *first))
            }
            TemporalOrder::Lifecycle => Some((*first, *second)),
        }
    }
}

/// Position of a column name in a typical record lifecycle; unknown names sort last.
fn lifecycle_stage(column: &str) -> u8 {
    const STAGES: &[(&[&str], u8)] = &[
        (&["created", "purchase", "placed"], 0),
        (&["started", "approved"], 1),
        (&["updated", "modified"], 2),
        (&["processed", "shipped", "carrier"], 3),
        (&["completed", "finished", "delivered"], 4),
        (&["ended", "closed", "estimated"], 5),
    ];

    let lower = column.to_lowercase();
    STAGES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map_or(u8::MAX, |(_, stage)| *stage)
}
