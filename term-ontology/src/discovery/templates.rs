//! Group-by query templates pairing metrics with categorical dimensions.

use crate::config::DiscoveryConfig;
use crate::model::{Dimension, DimensionType, Metric, Noun, QueryTemplate, TemplateComponents};
use crate::ordered::OrderedMap;
use tracing::{debug, info, instrument};

pub struct QueryTemplateGenerator<'a> {
    config: &'a DiscoveryConfig,
}

impl<'a> QueryTemplateGenerator<'a> {
    pub fn new(config: &'a DiscoveryConfig) -> Self {
        Self { config }
    }

    /// Emits one template per (metric, dimension) pair.
    ///
    /// A metric belongs to the first noun whose name it starts with or contains,
    /// otherwise to the first noun. Only that noun's categorical dimensions are
    /// used, at most `dimensions.templates_per_metric` of them.
    #[instrument(skip_all, fields(metrics = metrics.len(), dimensions = dimensions.len()))]
    pub fn generate(
        &self,
        nouns: &OrderedMap<Noun>,
        metrics: &OrderedMap<Metric>,
        dimensions: &OrderedMap<Dimension>,
    ) -> OrderedMap<QueryTemplate> {
        let mut templates = OrderedMap::new();
        let Some((default_noun, _)) = nouns.first() else {
            return templates;
        };
        let per_metric = self.config.dimensions.templates_per_metric;

        for metric_name in metrics.keys() {
            let owner = nouns
                .keys()
                .find(|noun| metric_name.starts_with(noun) || metric_name.contains(noun))
                .unwrap_or(default_noun);
            debug!(metric = metric_name, noun = owner, "Resolved owning noun");

            let columns = dimensions
                .values()
                .filter(|d| d.noun == owner && d.kind == DimensionType::Categorical)
                .map(|d| d.column.as_str())
                .take(per_metric);

            for column in columns {
                let name = format!("{metric_name}_by_{column}");
                templates.insert(
                    name.clone(),
                    QueryTemplate {
                        name,
                        description: format!("{metric_name} grouped by {column}"),
                        pattern: format!("{metric_name} by {column}"),
                        components: TemplateComponents {
                            metric: metric_name.to_string(),
                            dimension: column.to_string(),
                        },
                        sql_structure: format!(
                            "SELECT {column}, {metric_name} FROM {{table}} GROUP BY {column}"
                        ),
                    },
                );
            }
        }

        info!(templates = templates.len(), "Generated query templates");
        templates
    }
}
