//! Ordered naming and type rules used to classify columns.
//!
//! Every keyword heuristic of the discovery stages is expressed as data here
//! instead of as inline `if` chains. Rule lists are evaluated in order and the
//! first match wins, so precedence (for example categorical before geographic
//! for a column named `customer_state`) is visible in the rule list itself.

use crate::model::{DimensionPriority, DimensionType};
use serde::{Deserialize, Serialize};

/// A single pattern matched against a lower-cased column or table name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamePattern {
    Contains(String),
    Prefix(String),
    Suffix(String),
    Exact(String),
}

impl NamePattern {
    fn matches(&self, lower: &str) -> bool {
        match self {
            Self::Contains(k) => lower.contains(k.as_str()),
            Self::Prefix(k) => lower.starts_with(k.as_str()),
            Self::Suffix(k) => lower.ends_with(k.as_str()),
            Self::Exact(k) => lower == k,
        }
    }
}

/// Matches a name if any of its patterns match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameRule(pub Vec<NamePattern>);

impl NameRule {
    /// Rule matching names that contain any of `keywords`.
    pub fn contains(keywords: &[&str]) -> Self {
        Self(
            keywords
                .iter()
                .map(|k| NamePattern::Contains(k.to_lowercase()))
                .collect(),
        )
    }

    /// Rule matching names that end with any of `suffixes`.
    pub fn suffix(suffixes: &[&str]) -> Self {
        Self(
            suffixes
                .iter()
                .map(|k| NamePattern::Suffix(k.to_lowercase()))
                .collect(),
        )
    }

    /// Adds a pattern to the rule.
    pub fn or(mut self, pattern: NamePattern) -> Self {
        self.0.push(pattern);
        self
    }

    /// Case-insensitive match against `name`.
    pub fn matches(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.0.iter().any(|p| p.matches(&lower))
    }
}

/// Matches a declared SQL type name by upper-cased substring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRule(pub Vec<String>);

impl TypeRule {
    pub fn tokens(tokens: &[&str]) -> Self {
        Self(tokens.iter().map(|t| t.to_uppercase()).collect())
    }

    pub fn matches(&self, data_type: &str) -> bool {
        let upper = data_type.to_uppercase();
        self.0.iter().any(|t| upper.contains(t.as_str()))
    }
}

/// A name rule optionally combined with a type rule; both must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRule {
    pub name: NameRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<TypeRule>,
}

impl ColumnRule {
    pub fn named(name: NameRule) -> Self {
        Self {
            name,
            data_type: None,
        }
    }

    pub fn typed(name: NameRule, data_type: TypeRule) -> Self {
        Self {
            name,
            data_type: Some(data_type),
        }
    }

    pub fn matches(&self, name: &str, data_type: &str) -> bool {
        self.name.matches(name)
            && self
                .data_type
                .as_ref()
                .map_or(true, |rule| rule.matches(data_type))
    }
}

/// One bucket of the dimension classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRule {
    pub when: NameRule,
    pub kind: DimensionType,
    pub priority: DimensionPriority,
    /// Prefix for the generated description, followed by `: <column>`
    pub label: String,
}

/// The complete, ordered rule set used by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleBook {
    /// Columns kept out of noun attributes
    pub attribute_exclusion: NameRule,
    /// Fallback primary key when none is declared; first matching column wins
    pub primary_key_fallback: NameRule,
    /// Columns that seed an "Average <Column>" metric
    pub metric_seed: ColumnRule,
    /// Columns never considered as dimensions
    pub dimension_exclusion: NameRule,
    /// Dimension buckets, first match wins
    pub dimension_rules: Vec<DimensionRule>,
    /// Date/time-like columns for the processing time field
    pub temporal_columns: NameRule,
    /// Financial columns for the total value field
    pub financial_columns: ColumnRule,
    /// Payment columns for total spending
    pub payment_columns: ColumnRule,
    /// Price-like columns for total spending
    pub price_columns: ColumnRule,
}

const SEED_NUMERIC_TYPES: &[&str] = &["INT", "REAL", "NUMERIC"];
const FINANCIAL_NUMERIC_TYPES: &[&str] = &["INT", "REAL", "NUMERIC", "DECIMAL", "FLOAT"];

impl Default for RuleBook {
    fn default() -> Self {
        Self {
            attribute_exclusion: NameRule::suffix(&["_id"]),
            primary_key_fallback: NameRule(vec![
                NamePattern::Exact("id".to_string()),
                NamePattern::Suffix("_id".to_string()),
            ]),
            metric_seed: ColumnRule::typed(
                NameRule::contains(&["price", "value", "score", "freight"]),
                TypeRule::tokens(SEED_NUMERIC_TYPES),
            ),
            dimension_exclusion: NameRule::contains(&[
                "id",
                "number",
                "sequential",
                "installments",
            ]),
            dimension_rules: vec![
                DimensionRule {
                    when: NameRule::contains(&["state", "category", "status", "type", "segment"]),
                    kind: DimensionType::Categorical,
                    priority: DimensionPriority::High,
                    label: "High-value categorical dimension".to_string(),
                },
                DimensionRule {
                    when: NameRule::contains(&["city", "country", "region"]),
                    kind: DimensionType::Categorical,
                    priority: DimensionPriority::Medium,
                    label: "Categorical dimension".to_string(),
                },
                DimensionRule {
                    when: NameRule::contains(&[
                        "purchase_timestamp",
                        "created_at",
                        "date",
                        "approved_at",
                    ]),
                    kind: DimensionType::Temporal,
                    priority: DimensionPriority::High,
                    label: "High-value temporal dimension".to_string(),
                },
                DimensionRule {
                    when: NameRule::contains(&["state", "city", "zip_code_prefix", "lat", "lng"]),
                    kind: DimensionType::Geographic,
                    priority: DimensionPriority::High,
                    label: "High-value geographic dimension".to_string(),
                },
            ],
            temporal_columns: NameRule::contains(&["date", "time"]),
            financial_columns: ColumnRule::typed(
                NameRule::contains(&["price", "payment", "freight", "value"]),
                TypeRule::tokens(FINANCIAL_NUMERIC_TYPES),
            ),
            payment_columns: ColumnRule::typed(
                NameRule::contains(&["payment"]),
                TypeRule::tokens(FINANCIAL_NUMERIC_TYPES),
            ),
            price_columns: ColumnRule::typed(
                NameRule::contains(&["price", "freight", "value"]),
                TypeRule::tokens(FINANCIAL_NUMERIC_TYPES),
            ),
        }
    }
}

impl RuleBook {
    /// Returns the first dimension rule matching `column`, unless excluded.
    pub fn classify_dimension(&self, column: &str) -> Option<&DimensionRule> {
        if self.dimension_exclusion.matches(column) {
            return None;
        }
        self.dimension_rules.iter().find(|r| r.when.matches(column))
    }
}
