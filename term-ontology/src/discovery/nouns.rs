//! Noun and basic metric seeding.

use crate::config::DiscoveryConfig;
use crate::introspection::SchemaSnapshot;
use crate::model::{Metric, Noun};
use crate::naming::ConceptNamer;
use crate::ordered::OrderedMap;
use tracing::{info, instrument, warn};

/// Builds one noun per table plus `Average <Column>` metrics for measure-like
/// numeric columns.
///
/// Nouns are keyed by concept name. Two tables mapping to the same concept name
/// overwrite each other (the later table wins, the first position is kept).
pub struct NounMetricSeeder<'a> {
    config: &'a DiscoveryConfig,
}

impl<'a> NounMetricSeeder<'a> {
    pub fn new(config: &'a DiscoveryConfig) -> Self {
        Self { config }
    }

    #[instrument(skip_all, fields(tables = snapshot.len()))]
    pub fn seed(&self, snapshot: &SchemaSnapshot) -> (OrderedMap<Noun>, OrderedMap<Metric>) {
        let namer = ConceptNamer::new(&self.config.naming);
        let rules = &self.config.rules;
        let mut nouns = OrderedMap::new();
        let mut metrics = OrderedMap::new();

        for table in snapshot.tables() {
            let concept = namer.concept_name(&table.name);
            let attributes = table
                .columns
                .iter()
                .filter(|c| !rules.attribute_exclusion.matches(&c.name))
                .map(|c| c.name.clone())
                .collect();

            let noun = Noun {
                name: concept.clone(),
                table: table.name.clone(),
                primary_key: table.primary_key.clone(),
                attributes,
                description: format!("Represents the {concept} entity."),
            };
            if let Some(previous) = nouns.insert(concept.clone(), noun) {
                warn!(
                    noun = %concept,
                    replaced = %previous.table,
                    table = %table.name,
                    "Concept name collision, later table overwrites earlier one"
                );
            }

            for column in &table.columns {
                if !rules.metric_seed.matches(&column.name, &column.data_type) {
                    continue;
                }
                let name = format!("Average {}", namer.concept_name(&column.name));
                metrics.insert(
                    name.clone(),
                    Metric {
                        name,
                        logic: format!("AVG({}.{})", table.name, column.name),
                        dimensions: Vec::new(),
                        description: format!("Average of {} from {}.", column.name, table.name),
                        business_rule: None,
                    },
                );
            }
        }

        info!(nouns = nouns.len(), metrics = metrics.len(), "Seeded nouns and metrics");
        (nouns, metrics)
    }
}
