//! Business-rule metrics built on top of nouns and dimensions.

use crate::config::DiscoveryConfig;
use crate::introspection::{SchemaSnapshot, TableInfo};
use crate::model::{Dimension, Metric, Noun};
use crate::ordered::OrderedMap;
use crate::rules::ColumnRule;
use tracing::{info, instrument};

/// Emits a `<Noun>_total_spending` metric for every noun with payment- or
/// price-like numeric columns.
///
/// Payments are preferred; when a noun has both kinds the metric falls back to
/// the summed prices through `COALESCE`.
pub struct AdvancedMetricDiscoverer<'a> {
    config: &'a DiscoveryConfig,
}

impl<'a> AdvancedMetricDiscoverer<'a> {
    pub fn new(config: &'a DiscoveryConfig) -> Self {
        Self { config }
    }

    #[instrument(skip_all, fields(nouns = nouns.len()))]
    pub fn discover(
        &self,
        nouns: &OrderedMap<Noun>,
        snapshot: &SchemaSnapshot,
        dimensions: &OrderedMap<Dimension>,
    ) -> OrderedMap<Metric> {
        let rules = &self.config.rules;
        let mut metrics = OrderedMap::new();

        for (noun_name, noun) in nouns.iter() {
            let Some(table) = snapshot.table(&noun.table) else {
                continue;
            };
            let payments = matching_columns(table, &rules.payment_columns);
            let prices = matching_columns(table, &rules.price_columns);

            let logic = match (payments.first(), prices.as_slice()) {
                (Some(payment), [first, rest @ ..]) => {
                    let second = rest.first().unwrap_or(first);
                    format!("COALESCE(SUM({payment}), SUM({first} + {second}))")
                }
                (Some(payment), []) => format!("SUM({payment})"),
                (None, [first, ..]) => format!("SUM({first})"),
                (None, []) => continue,
            };

            let name = format!("{noun_name}_total_spending");
            let noun_dimensions = dimensions
                .iter()
                .filter(|(_, d)| d.noun == noun_name)
                .map(|(key, _)| key.to_string())
                .collect();

            metrics.insert(
                name.clone(),
                Metric {
                    name,
                    logic,
                    dimensions: noun_dimensions,
                    description: format!("Total spending for {noun_name} with fallback logic"),
                    business_rule: Some(true),
                },
            );
        }

        info!(metrics = metrics.len(), "Discovered advanced metrics");
        metrics
    }
}

fn matching_columns<'t>(table: &'t TableInfo, rule: &ColumnRule) -> Vec<&'t str> {
    table
        .columns
        .iter()
        .filter(|c| rule.matches(&c.name, &c.data_type))
        .map(|c| c.name.as_str())
        .collect()
}
