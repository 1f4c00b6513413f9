//! Relationship discovery.
//!
//! Links come from two passes. Declared foreign keys are always used. When they
//! cover fewer than half of the nouns, a second pass infers links from naming:
//! a column named like another noun's primary key is taken to reference it.
//! Every candidate is sampled for confidence and cardinality, and no two links
//! share a join string.

use super::{CardinalityDetector, JoinCandidate, RelationshipValidator};
use crate::config::DiscoveryConfig;
use crate::introspection::SchemaSnapshot;
use crate::model::{DiscoveryMethod, Link, Noun, UNKNOWN_PRIMARY_KEY};
use crate::naming::ConceptNamer;
use crate::ordered::OrderedMap;
use crate::sources::SchemaSource;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Builds [`Link`]s from declared keys and naming conventions.
pub struct LinkDiscoverer<'a> {
    source: &'a dyn SchemaSource,
    config: &'a DiscoveryConfig,
}

impl<'a> LinkDiscoverer<'a> {
    pub fn new(source: &'a dyn SchemaSource, config: &'a DiscoveryConfig) -> Self {
        Self { source, config }
    }

    /// Runs both passes; declared links precede inferred ones.
    #[instrument(skip_all, fields(nouns = nouns.len()))]
    pub async fn discover(&self, nouns: &OrderedMap<Noun>, snapshot: &SchemaSnapshot) -> Vec<Link> {
        let namer = ConceptNamer::new(&self.config.naming);
        let mut links = Vec::new();
        let mut seen = HashSet::new();

        for table in snapshot.tables() {
            for fk in &table.foreign_keys {
                let candidate = JoinCandidate::new(
                    &table.name,
                    &fk.column,
                    &fk.referred_table,
                    &fk.referred_column,
                );
                if !seen.insert(candidate.join_string()) {
                    continue;
                }
                let link = self
                    .build_link(
                        namer.concept_name(&table.name),
                        namer.concept_name(&fk.referred_table),
                        candidate,
                        DiscoveryMethod::DeclaredForeignKey,
                    )
                    .await;
                links.push(link);
            }
        }
        info!(links = links.len(), "Found links from declared foreign keys");

        if (links.len() as f64) < nouns.len() as f64 / 2.0 {
            info!("Few foreign keys found, inferring links from naming conventions");
            let declared = links.len();
            for (from_noun, candidate) in self.inferred_candidates(nouns, snapshot) {
                if !seen.insert(candidate.join_string()) {
                    debug!(join = %candidate, "Skipping already discovered join");
                    continue;
                }
                let to_noun = namer.concept_name(&candidate.to_table);
                let link = self
                    .build_link(from_noun, to_noun, candidate, DiscoveryMethod::InferredByName)
                    .await;
                links.push(link);
            }
            info!(links = links.len() - declared, "Inferred links by name");
        }

        links
    }

    /// Name-inferred candidates in noun then column order.
    ///
    /// The primary key map is keyed by column name; when several nouns share a
    /// key column name, the last one wins.
    pub fn inferred_candidates(
        &self,
        nouns: &OrderedMap<Noun>,
        snapshot: &SchemaSnapshot,
    ) -> Vec<(String, JoinCandidate)> {
        let mut pk_map: OrderedMap<&str> = OrderedMap::new();
        for noun in nouns.values().filter(|n| n.primary_key != UNKNOWN_PRIMARY_KEY) {
            pk_map.insert(noun.primary_key.clone(), noun.table.as_str());
        }

        let mut candidates = Vec::new();
        for (noun_name, noun) in nouns.iter() {
            let Some(from_table) = snapshot.table(&noun.table) else {
                continue;
            };
            for column in &from_table.columns {
                let Some(&to_table) = pk_map.get(&column.name) else {
                    continue;
                };
                if to_table == from_table.name {
                    continue;
                }
                if self.config.links.require_matching_types
                    && !self.types_match(snapshot, to_table, &column.name, &column.data_type)
                {
                    debug!(
                        from = %from_table.name,
                        to = %to_table,
                        column = %column.name,
                        "Rejecting inferred link with mismatched column types"
                    );
                    continue;
                }
                candidates.push((
                    noun_name.to_string(),
                    JoinCandidate::new(&from_table.name, &column.name, to_table, &column.name),
                ));
            }
        }
        candidates
    }

    fn types_match(
        &self,
        snapshot: &SchemaSnapshot,
        to_table: &str,
        column: &str,
        from_type: &str,
    ) -> bool {
        snapshot
            .table(to_table)
            .and_then(|t| t.column(column))
            .is_some_and(|c| TypeFamily::of(&c.data_type) == TypeFamily::of(from_type))
    }

    async fn build_link(
        &self,
        from_object: String,
        to_object: String,
        candidate: JoinCandidate,
        method: DiscoveryMethod,
    ) -> Link {
        let validation = RelationshipValidator::new(self.source, &self.config.sampling)
            .validate(&candidate)
            .await;
        let cardinality = CardinalityDetector::new(self.source, &self.config.sampling)
            .detect(&candidate)
            .await;

        Link {
            from_object,
            to_object,
            join: candidate.join_string(),
            cardinality: cardinality.cardinality,
            method,
            confidence: validation.confidence,
            cardinality_info: cardinality.reason,
            flag: validation.flag,
        }
    }
}

/// Coarse SQL type family used to compare key columns across tables.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TypeFamily {
    Numeric,
    Text,
    Temporal,
    Boolean,
    Other(String),
}

impl TypeFamily {
    fn of(data_type: &str) -> Self {
        let upper = data_type.to_uppercase();
        let has = |tokens: &[&str]| tokens.iter().any(|t| upper.contains(t));
        if has(&["INT", "REAL", "FLOA", "DOUB", "NUMERIC", "DECIMAL"]) {
            Self::Numeric
        } else if has(&["CHAR", "TEXT", "CLOB", "STRING"]) {
            Self::Text
        } else if has(&["DATE", "TIME"]) {
            Self::Temporal
        } else if has(&["BOOL"]) {
            Self::Boolean
        } else {
            Self::Other(upper)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::NounMetricSeeder;
    use crate::introspection::SchemaIntrospector;
    use crate::model::{Cardinality, ValidationFlag};
    use crate::sources::DataFusionSource;
    use datafusion::prelude::SessionContext;

    async fn source(statements: &[&str]) -> DataFusionSource {
        let ctx = SessionContext::new();
        for sql in statements {
            ctx.sql(sql).await.unwrap().collect().await.unwrap();
        }
        DataFusionSource::new(ctx, None, None).await.unwrap()
    }

    #[test]
    fn test_type_families() {
        assert_eq!(TypeFamily::of("BIGINT"), TypeFamily::of("INTEGER"));
        assert_eq!(TypeFamily::of("varchar(32)"), TypeFamily::of("TEXT"));
        assert_ne!(TypeFamily::of("TEXT"), TypeFamily::of("BIGINT"));
    }

    #[tokio::test]
    async fn test_infers_links_by_primary_key_name() {
        let source = source(&[
            "CREATE TABLE customers (customer_id BIGINT PRIMARY KEY, customer_state VARCHAR)",
            "CREATE TABLE orders (order_id BIGINT PRIMARY KEY, customer_id BIGINT)",
            "INSERT INTO customers VALUES (1, 'SP'), (2, 'RJ')",
            "INSERT INTO orders VALUES (1, 1), (2, 1), (3, 1), (4, 1), (5, 2), (6, 2)",
        ])
        .await;
        let config = DiscoveryConfig::default();
        let snapshot = SchemaIntrospector::new(&source, &config.rules)
            .snapshot(&[])
            .await
            .unwrap();
        let (nouns, _) = NounMetricSeeder::new(&config).seed(&snapshot);

        let links = LinkDiscoverer::new(&source, &config)
            .discover(&nouns, &snapshot)
            .await;

        assert_eq!(links.len(), 1);
        let link = &links[0];
        assert_eq!(link.from_object, "Orders");
        assert_eq!(link.to_object, "Customers");
        assert_eq!(link.join, "orders.customer_id = customers.customer_id");
        assert_eq!(link.method, DiscoveryMethod::InferredByName);
        assert_eq!(link.confidence, 1.0);
        assert_eq!(link.flag, ValidationFlag::Verified);
        assert_eq!(link.cardinality, Cardinality::ManyToOne);
    }

    #[tokio::test]
    async fn test_type_check_rejects_mismatched_inference() {
        let source = source(&[
            "CREATE TABLE customers (customer_id BIGINT PRIMARY KEY)",
            "CREATE TABLE orders (order_id BIGINT PRIMARY KEY, customer_id VARCHAR)",
        ])
        .await;
        let mut config = DiscoveryConfig::default();
        let snapshot = SchemaIntrospector::new(&source, &config.rules)
            .snapshot(&[])
            .await
            .unwrap();
        let (nouns, _) = NounMetricSeeder::new(&config).seed(&snapshot);

        assert_eq!(
            LinkDiscoverer::new(&source, &config)
                .inferred_candidates(&nouns, &snapshot)
                .len(),
            1
        );

        config.links.require_matching_types = true;
        assert!(LinkDiscoverer::new(&source, &config)
            .inferred_candidates(&nouns, &snapshot)
            .is_empty());
    }
}
