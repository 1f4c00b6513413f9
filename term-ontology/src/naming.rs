//! Physical-to-business name mapping.

use crate::config::NamingConfig;

/// Maps table and column names to business concept names.
///
/// `olist_order_items_dataset` becomes `OrderItems`: configured prefixes and
/// suffixes are stripped, the remainder is split on `_`, `-`, `.` and spaces,
/// and each token is capitalized. The mapping is total and deterministic but not
/// injective; callers decide what happens on collisions.
///
/// # Examples
///
/// ```rust
/// use term_ontology::config::NamingConfig;
/// use term_ontology::naming::ConceptNamer;
///
/// let config = NamingConfig::default();
/// let namer = ConceptNamer::new(&config);
/// assert_eq!(namer.concept_name("olist_order_items_dataset"), "OrderItems");
/// assert_eq!(namer.concept_name("PRICE"), "Price");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ConceptNamer<'a> {
    config: &'a NamingConfig,
}

impl<'a> ConceptNamer<'a> {
    pub fn new(config: &'a NamingConfig) -> Self {
        Self { config }
    }

    /// Returns the concept name for a physical name.
    pub fn concept_name(&self, physical: &str) -> String {
        let mut name = physical;
        for prefix in &self.config.strip_prefixes {
            if let Some(rest) = name.strip_prefix(prefix.as_str()) {
                name = rest;
            }
        }
        for suffix in &self.config.strip_suffixes {
            if let Some(rest) = name.strip_suffix(suffix.as_str()) {
                name = rest;
            }
        }

        name.split(|c: char| matches!(c, '_' | '-' | '.') || c.is_whitespace())
            .map(capitalize)
            .collect()
    }
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(physical: &str) -> String {
        ConceptNamer::new(&NamingConfig::default()).concept_name(physical)
    }

    #[test]
    fn test_strips_prefix_and_suffix() {
        assert_eq!(name("olist_customers_dataset"), "Customers");
        assert_eq!(name("olist_order_payments_dataset"), "OrderPayments");
        assert_eq!(name("orders"), "Orders");
    }

    #[test]
    fn test_word_boundaries() {
        assert_eq!(name("product-category.name"), "ProductCategoryName");
        assert_eq!(name("order items"), "OrderItems");
        assert_eq!(name("freight__value"), "FreightValue");
        assert_eq!(name("customerID"), "Customerid");
    }

    #[test]
    fn test_custom_affixes() {
        let config = NamingConfig {
            strip_prefixes: vec!["stg_".to_string(), "raw_".to_string()],
            strip_suffixes: vec!["_v2".to_string()],
        };
        let namer = ConceptNamer::new(&config);
        assert_eq!(namer.concept_name("stg_raw_sellers_v2"), "Sellers");
        assert_eq!(namer.concept_name("olist_sellers"), "OlistSellers");
    }

    #[test]
    fn test_collisions_are_not_deduplicated() {
        assert_eq!(name("olist_orders_dataset"), name("orders"));
    }
}
