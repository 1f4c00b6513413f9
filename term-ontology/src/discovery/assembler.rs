//! Runs every discovery stage in order and builds the ontology document.

use super::{
    AdvancedMetricDiscoverer, DerivedFieldDiscoverer, DimensionDiscoverer, LinkDiscoverer,
    NounMetricSeeder, QualityFlagGenerator, QueryTemplateGenerator,
};
use crate::config::DiscoveryConfig;
use crate::error::Result;
use crate::introspection::SchemaIntrospector;
use crate::model::{DocumentParts, OntologyDocument};
use crate::sources::{self, SchemaSource, SourceConfig};
use chrono::Utc;
use tracing::{info, instrument};

/// Single-pass discovery over one live source.
///
/// The stages run strictly one after another:
///
/// 1. reflect the schema once
/// 2. seed nouns and `Average <Column>` metrics
/// 3. discover links (declared keys, then name inference)
/// 4. dimensions, derived fields and advanced metrics
/// 5. merge metrics; advanced ones replace basic ones with the same name
/// 6. query templates and quality flags
///
/// Reflection errors abort the run. Failed link checks only degrade the
/// affected link. Nothing is retried.
///
/// # Examples
///
/// ```rust,no_run
/// use term_ontology::prelude::*;
/// use datafusion::prelude::SessionContext;
///
/// # async fn example() -> Result<()> {
/// let ctx = SessionContext::new();
/// ctx.register_csv("orders", "data/orders.csv", Default::default()).await?;
///
/// let source = DataFusionSource::new(ctx, None, None).await?;
/// let config = DiscoveryConfig::default();
/// let document = OntologyAssembler::new(&source, &config).discover(&[]).await?;
/// println!("{} nouns", document.nouns().len());
/// # Ok(())
/// # }
/// ```
pub struct OntologyAssembler<'a> {
    source: &'a dyn SchemaSource,
    config: &'a DiscoveryConfig,
}

impl<'a> OntologyAssembler<'a> {
    pub fn new(source: &'a dyn SchemaSource, config: &'a DiscoveryConfig) -> Self {
        Self { source, config }
    }

    /// Discovers the ontology of the allow-listed tables, or of every table
    /// when `allowlist` is empty.
    #[instrument(skip_all, fields(engine = self.source.engine(), allowlist = allowlist.len()))]
    pub async fn discover(&self, allowlist: &[String]) -> Result<OntologyDocument> {
        let config = self.config;

        info!("Reflecting schema");
        let snapshot = SchemaIntrospector::new(self.source, &config.rules)
            .snapshot(allowlist)
            .await?;

        info!("Discovering nouns");
        let (nouns, mut metrics) = NounMetricSeeder::new(config).seed(&snapshot);

        info!("Discovering links");
        let links = LinkDiscoverer::new(self.source, config)
            .discover(&nouns, &snapshot)
            .await;

        info!("Discovering dimensions");
        let dimensions = DimensionDiscoverer::new(config).discover(&nouns, &snapshot);

        info!("Discovering derived fields");
        let derived_fields = DerivedFieldDiscoverer::new(config).discover(&nouns, &snapshot);

        info!("Discovering advanced metrics");
        let advanced = AdvancedMetricDiscoverer::new(config).discover(&nouns, &snapshot, &dimensions);
        metrics.extend(advanced);

        let query_templates =
            QueryTemplateGenerator::new(config).generate(&nouns, &metrics, &dimensions);
        let quality_flags = QualityFlagGenerator::new(&config.quality).generate(&links);

        let document = OntologyDocument::assemble(
            DocumentParts {
                nouns,
                links,
                metrics,
                dimensions,
                derived_fields,
                query_templates,
                quality_flags,
            },
            Utc::now(),
        );

        let summary = document.usage_summary();
        info!(
            nouns = summary.total_nouns,
            links = summary.total_links,
            metrics = summary.total_metrics,
            dimensions = summary.total_dimensions,
            overall_confidence = document.metadata().overall_confidence,
            "Ontology discovery complete"
        );
        Ok(document)
    }
}

/// Connects to the configured source and runs a full discovery.
///
/// The source's `include_tables` is used as the allow-list.
pub async fn discover_ontology(
    source_config: &SourceConfig,
    config: &DiscoveryConfig,
) -> Result<OntologyDocument> {
    let source = sources::connect(source_config).await?;
    OntologyAssembler::new(source.as_ref(), config)
        .discover(&source_config.include_tables)
        .await
}
