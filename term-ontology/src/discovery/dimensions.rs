//! Dimension discovery and capping.

use crate::config::DiscoveryConfig;
use crate::introspection::SchemaSnapshot;
use crate::model::{Dimension, DimensionPriority, Noun};
use crate::ordered::OrderedMap;
use tracing::{info, instrument, warn};

/// Classifies noun columns into categorical, temporal and geographic
/// dimensions using the ordered dimension rules.
pub struct DimensionDiscoverer<'a> {
    config: &'a DiscoveryConfig,
}

impl<'a> DimensionDiscoverer<'a> {
    pub fn new(config: &'a DiscoveryConfig) -> Self {
        Self { config }
    }

    #[instrument(skip_all, fields(nouns = nouns.len()))]
    pub fn discover(&self, nouns: &OrderedMap<Noun>, snapshot: &SchemaSnapshot) -> OrderedMap<Dimension> {
        let rules = &self.config.rules;
        let mut dimensions = OrderedMap::new();

        for (noun_name, noun) in nouns.iter() {
            let Some(table) = snapshot.table(&noun.table) else {
                continue;
            };
            for column in &table.columns {
                let Some(rule) = rules.classify_dimension(&column.name) else {
                    continue;
                };
                dimensions.insert(
                    Dimension::key(noun_name, &column.name),
                    Dimension {
                        kind: rule.kind,
                        priority: rule.priority,
                        noun: noun_name.to_string(),
                        column: column.name.clone(),
                        description: format!("{}: {}", rule.label, column.name),
                    },
                );
            }
        }

        let found = dimensions.len();
        let dimensions = cap_dimensions(dimensions, self.config.dimensions.max_dimensions);
        info!(found, kept = dimensions.len(), "Discovered dimensions");
        dimensions
    }
}

/// Caps a dimension set at `max` entries.
///
/// Under the cap the set is returned unchanged. Over it, every high-priority
/// dimension is kept in discovery order, followed by medium-priority ones until
/// `max` is reached. High-priority dimensions are never dropped, even when they
/// alone exceed `max`.
pub fn cap_dimensions(dimensions: OrderedMap<Dimension>, max: usize) -> OrderedMap<Dimension> {
    if dimensions.len() <= max {
        return dimensions;
    }

    let (high, medium): (Vec<_>, Vec<_>) = dimensions
        .into_iter()
        .partition(|(_, d)| d.priority == DimensionPriority::High);

    if high.len() > max {
        warn!(
            high = high.len(),
            max, "High-priority dimensions exceed the cap; keeping all of them"
        );
    }

    let remaining = max.saturating_sub(high.len());
    high.into_iter()
        .chain(medium.into_iter().take(remaining))
        .collect()
}
