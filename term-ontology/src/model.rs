//! Ontology document types.
//!
//! Everything here is plain data produced by the discovery stages and serialized
//! once at the end of a run. The JSON shape is the contract read by downstream
//! consumers (query planners, join validators), so field names are stable.

use crate::error::Result;
use crate::ordered::OrderedMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Format version written into [`Metadata::version`].
pub const ONTOLOGY_VERSION: &str = "3.0";

/// Primary key placeholder used when a table has neither a declared key nor an
/// id-shaped column.
pub const UNKNOWN_PRIMARY_KEY: &str = "unknown";

/// A business entity backed by one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Noun {
    /// Business concept name (e.g., "OrderItems")
    pub name: String,
    /// Physical source table
    pub table: String,
    /// Primary key column, or `"unknown"`
    pub primary_key: String,
    /// Descriptive, non-key-shaped columns in declaration order
    pub attributes: Vec<String>,
    pub description: String,
}

/// Shape of a relationship between two nouns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    ManyToOne,
    OneToMany,
    ManyToMany,
    Unknown,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManyToOne => "many_to_one",
            Self::OneToMany => "one_to_many",
            Self::ManyToMany => "many_to_many",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a link was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    DeclaredForeignKey,
    InferredByName,
}

impl DiscoveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeclaredForeignKey => "declared_foreign_key",
            Self::InferredByName => "inferred_by_name",
        }
    }
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of sampling a candidate join.
///
/// Serialized as a plain string: `"verified"`, `"manual_review"` or
/// `"error: <reason>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ValidationFlag {
    Verified,
    ManualReview,
    Error(String),
}

impl ValidationFlag {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for ValidationFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified => f.write_str("verified"),
            Self::ManualReview => f.write_str("manual_review"),
            Self::Error(reason) => write!(f, "error: {reason}"),
        }
    }
}

impl From<ValidationFlag> for String {
    fn from(flag: ValidationFlag) -> Self {
        flag.to_string()
    }
}

impl From<String> for ValidationFlag {
    fn from(value: String) -> Self {
        match value.as_str() {
            "verified" => Self::Verified,
            "manual_review" => Self::ManualReview,
            other => Self::Error(other.strip_prefix("error: ").unwrap_or(other).to_string()),
        }
    }
}

/// A discovered relationship between two nouns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub from_object: String,
    pub to_object: String,
    /// Canonical `"table.col = table.col"`; unique within a document
    pub join: String,
    #[serde(rename = "type")]
    pub cardinality: Cardinality,
    pub method: DiscoveryMethod,
    /// Sampled overlap score in `[0, 1]`
    pub confidence: f64,
    pub cardinality_info: String,
    pub flag: ValidationFlag,
}

impl Link {
    /// `"From -> To"` summary used in review lists and reports.
    pub fn summary(&self) -> String {
        format!("{} -> {}", self.from_object, self.to_object)
    }
}

/// A named aggregate expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub logic: String,
    /// Dimension keys this metric can be broken down by
    pub dimensions: Vec<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_rule: Option<bool>,
}

/// Kind of analytical breakdown a dimension supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionType {
    Categorical,
    Temporal,
    Geographic,
}

/// Eviction priority for the dimension cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionPriority {
    High,
    Medium,
}

/// A groupable attribute, keyed `{noun}_{column}` in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    #[serde(rename = "type")]
    pub kind: DimensionType,
    pub priority: DimensionPriority,
    pub noun: String,
    pub column: String,
    pub description: String,
}

impl Dimension {
    /// Document key for a noun/column pair.
    pub fn key(noun: &str, column: &str) -> String {
        format!("{noun}_{column}")
    }
}

/// A computed, non-stored column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedField {
    pub logic: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub noun: String,
}

/// Metric and dimension referenced by a query template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateComponents {
    pub metric: String,
    pub dimension: String,
}

/// A group-by query pattern pairing one metric with one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryTemplate {
    pub name: String,
    pub description: String,
    pub pattern: String,
    pub components: TemplateComponents,
    /// Parameterized SQL; `{table}` is left for the consumer to fill
    pub sql_structure: String,
}

/// A link routed to human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub link: String,
    pub confidence: f64,
    pub issue: String,
}

/// Links partitioned by confidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityFlags {
    pub links_needing_review: Vec<ReviewItem>,
    pub high_confidence_links: Vec<String>,
    pub suggested_improvements: Vec<String>,
}

/// Run-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    /// High-confidence links over all links, 0 when there are none
    pub overall_confidence: f64,
    /// Fraction of nouns that take part in at least one link
    pub link_coverage: f64,
}

/// Counts of everything in the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub total_nouns: usize,
    pub total_links: usize,
    pub high_confidence_links: usize,
    pub total_metrics: usize,
    pub total_dimensions: usize,
    pub total_derived_fields: usize,
    pub total_templates: usize,
}

/// The immutable result of one discovery run.
///
/// Built once by [`crate::discovery::OntologyAssembler`]; there are no mutating
/// methods. A later run produces a new document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyDocument {
    metadata: Metadata,
    nouns: OrderedMap<Noun>,
    links: Vec<Link>,
    metrics: OrderedMap<Metric>,
    dimensions: OrderedMap<Dimension>,
    derived_fields: OrderedMap<DerivedField>,
    query_templates: OrderedMap<QueryTemplate>,
    quality_flags: QualityFlags,
    usage_summary: UsageSummary,
}

/// Parts handed to [`OntologyDocument::assemble`].
#[derive(Debug, Clone)]
pub(crate) struct DocumentParts {
    pub nouns: OrderedMap<Noun>,
    pub links: Vec<Link>,
    pub metrics: OrderedMap<Metric>,
    pub dimensions: OrderedMap<Dimension>,
    pub derived_fields: OrderedMap<DerivedField>,
    pub query_templates: OrderedMap<QueryTemplate>,
    pub quality_flags: QualityFlags,
}

impl OntologyDocument {
    pub(crate) fn assemble(parts: DocumentParts, generated_at: DateTime<Utc>) -> Self {
        let total_links = parts.links.len();
        let high_confidence = parts.quality_flags.high_confidence_links.len();
        let overall_confidence = if total_links > 0 {
            round2(high_confidence as f64 / total_links as f64)
        } else {
            0.0
        };

        let linked = parts
            .nouns
            .keys()
            .filter(|name| {
                parts
                    .links
                    .iter()
                    .any(|l| l.from_object == *name || l.to_object == *name)
            })
            .count();
        let link_coverage = if parts.nouns.is_empty() {
            0.0
        } else {
            round2(linked as f64 / parts.nouns.len() as f64)
        };

        let usage_summary = UsageSummary {
            total_nouns: parts.nouns.len(),
            total_links,
            high_confidence_links: high_confidence,
            total_metrics: parts.metrics.len(),
            total_dimensions: parts.dimensions.len(),
            total_derived_fields: parts.derived_fields.len(),
            total_templates: parts.query_templates.len(),
        };

        Self {
            metadata: Metadata {
                version: ONTOLOGY_VERSION.to_string(),
                generated_at,
                overall_confidence,
                link_coverage,
            },
            nouns: parts.nouns,
            links: parts.links,
            metrics: parts.metrics,
            dimensions: parts.dimensions,
            derived_fields: parts.derived_fields,
            query_templates: parts.query_templates,
            quality_flags: parts.quality_flags,
            usage_summary,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn nouns(&self) -> &OrderedMap<Noun> {
        &self.nouns
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn metrics(&self) -> &OrderedMap<Metric> {
        &self.metrics
    }

    pub fn dimensions(&self) -> &OrderedMap<Dimension> {
        &self.dimensions
    }

    pub fn derived_fields(&self) -> &OrderedMap<DerivedField> {
        &self.derived_fields
    }

    pub fn query_templates(&self) -> &OrderedMap<QueryTemplate> {
        &self.query_templates
    }

    pub fn quality_flags(&self) -> &QualityFlags {
        &self.quality_flags
    }

    pub fn usage_summary(&self) -> &UsageSummary {
        &self.usage_summary
    }

    /// Serializes the document as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a previously persisted document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the document to `path`, replacing any existing file.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Rounds to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
