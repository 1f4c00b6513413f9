//! Security utilities for ontology discovery.
//!
//! Table and column names reach the sampling SQL through string interpolation, so
//! every identifier is validated and quoted here first. Connection descriptors can
//! carry credentials and are wrapped in [`SecureString`] so they never show up in
//! logs or `Debug` output.

use crate::error::{OntologyError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secure string that automatically clears its contents when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecureString(String);

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureString(***)")
    }
}

impl SecureString {
    /// Create a new secure string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the string value. Use carefully and avoid storing the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Convert to a regular string. The SecureString will be zeroized.
    pub fn into_string(mut self) -> String {
        let value = std::mem::take(&mut self.0);
        self.0.zeroize();
        value
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// SQL identifier validation and escaping utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates and escapes a single SQL identifier (table or column name).
    ///
    /// Identifiers are always double-quoted, with embedded quotes doubled, so
    /// names such as `order items` or `customer-accounts` are safe to
    /// interpolate. Quoting also keeps their case on engines that fold unquoted
    /// names (DataFusion lower-cases them).
    ///
    /// # Examples
    /// ```rust
    /// use term_ontology::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::escape_identifier("customer_id").unwrap(), "\"customer_id\"");
    /// assert_eq!(SqlSecurity::escape_identifier("order items").unwrap(), "\"order items\"");
    /// assert_eq!(
    ///     SqlSecurity::escape_identifier("id\"; DROP TABLE users--").unwrap(),
    ///     "\"id\"\"; DROP TABLE users--\""
    /// );
    /// ```
    pub fn escape_identifier(identifier: &str) -> Result<String> {
        Self::validate_identifier(identifier)?;

        let escaped = identifier.replace('"', "\"\"");
        Ok(format!("\"{escaped}\""))
    }

    /// Escapes a `schema.table` pair, or just the table when no schema is given.
    pub fn escape_qualified(schema: Option<&str>, table: &str) -> Result<String> {
        let table = Self::escape_identifier(table)?;
        match schema {
            Some(schema) => Ok(format!("{}.{table}", Self::escape_identifier(schema)?)),
            None => Ok(table),
        }
    }

    /// Escapes a value for use inside a single-quoted SQL string literal.
    pub fn escape_literal(value: &str) -> Result<String> {
        Self::validate_identifier(value)?;
        Ok(format!("'{}'", value.replace('\'', "''")))
    }

    /// Validates a SQL identifier without escaping it.
    ///
    /// Only the shape is checked: any name the engine accepts when quoted is
    /// allowed, except empty names, overlong names and control characters.
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.is_empty() || identifier.trim().is_empty() {
            return Err(OntologyError::SecurityError(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        if identifier.len() > 128 {
            return Err(OntologyError::SecurityError(
                "SQL identifier too long (max 128 characters)".to_string(),
            ));
        }

        static CONTROL_CHARS: Lazy<Regex> = Lazy::new(|| {
            // Hard-coded pattern, known to be valid
            #[allow(clippy::expect_used)]
            Regex::new(r"\p{Cc}").expect("Hard-coded regex pattern should be valid")
        });

        if CONTROL_CHARS.is_match(identifier) {
            return Err(OntologyError::SecurityError(format!(
                "SQL identifier cannot contain control characters: {identifier:?}"
            )));
        }

        Ok(())
    }
}

/// Input validation utilities for configuration values.
pub struct InputValidator;

impl InputValidator {
    /// Validates a numeric threshold value.
    pub fn validate_threshold(value: f64, name: &str) -> Result<()> {
        if !value.is_finite() {
            return Err(OntologyError::Configuration(format!(
                "Invalid {name} value: must be finite (not NaN or infinite)"
            )));
        }
        Ok(())
    }

    /// Validates a fraction value (0.0 to 1.0).
    pub fn validate_percentage(value: f64, name: &str) -> Result<()> {
        Self::validate_threshold(value, name)?;

        if !(0.0..=1.0).contains(&value) {
            return Err(OntologyError::Configuration(format!(
                "Invalid {name} value: must be between 0.0 and 1.0, got {value}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_string_debug_is_redacted() {
        let secure = SecureString::new("sqlite:///secret.db");
        assert_eq!(format!("{secure:?}"), "SecureString(***)");
        assert_eq!(secure.expose(), "sqlite:///secret.db");
        assert_eq!(secure.into_string(), "sqlite:///secret.db");
    }

    #[test]
    fn test_valid_sql_identifiers() {
        assert!(SqlSecurity::validate_identifier("customer_id").is_ok());
        assert!(SqlSecurity::validate_identifier("order_purchase_timestamp").is_ok());
        assert!(SqlSecurity::validate_identifier("_private_col").is_ok());
        assert!(SqlSecurity::validate_identifier("customer-accounts").is_ok());
        assert!(SqlSecurity::validate_identifier("order items").is_ok());
        assert!(SqlSecurity::validate_identifier("123col").is_ok());
        assert!(SqlSecurity::validate_identifier("préférence").is_ok());
    }

    #[test]
    fn test_invalid_sql_identifiers() {
        assert!(SqlSecurity::validate_identifier("").is_err());
        assert!(SqlSecurity::validate_identifier("   ").is_err());
        assert!(SqlSecurity::validate_identifier(&"a".repeat(200)).is_err());
        assert!(SqlSecurity::validate_identifier("col\0name").is_err());
        assert!(SqlSecurity::validate_identifier("col\nname").is_err());
    }

    #[test]
    fn test_sql_identifier_escaping() {
        assert_eq!(
            SqlSecurity::escape_identifier("customer_id").unwrap(),
            "\"customer_id\""
        );
        assert_eq!(
            SqlSecurity::escape_identifier("customer-accounts").unwrap(),
            "\"customer-accounts\""
        );
        // embedded quotes are doubled, so the name cannot close the identifier
        assert_eq!(
            SqlSecurity::escape_identifier("col\"with\"quotes").unwrap(),
            "\"col\"\"with\"\"quotes\""
        );
        assert_eq!(
            SqlSecurity::escape_identifier("x\"; DROP TABLE t; --").unwrap(),
            "\"x\"\"; DROP TABLE t; --\""
        );
    }

    #[test]
    fn test_literal_escaping() {
        assert_eq!(SqlSecurity::escape_literal("sales").unwrap(), "'sales'");
        assert_eq!(SqlSecurity::escape_literal("o'brien").unwrap(), "'o''brien'");
        assert!(SqlSecurity::escape_literal("").is_err());
    }

    #[test]
    fn test_qualified_escaping() {
        assert_eq!(
            SqlSecurity::escape_qualified(Some("main"), "orders").unwrap(),
            "\"main\".\"orders\""
        );
        assert_eq!(
            SqlSecurity::escape_qualified(None, "orders").unwrap(),
            "\"orders\""
        );
    }

    #[test]
    fn test_input_validation() {
        assert!(InputValidator::validate_percentage(0.7, "review_threshold").is_ok());
        assert!(InputValidator::validate_percentage(1.5, "review_threshold").is_err());
        assert!(InputValidator::validate_threshold(f64::NAN, "ratio").is_err());
    }
}
