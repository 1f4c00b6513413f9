//! Human-readable and JSON renderings of an ontology document.
//!
//! The CLI prints a [`SummaryFormatter`] report to stdout after the document
//! has been written. Library callers can implement [`OntologyFormatter`] for
//! their own layouts.
//!
//! # Examples
//!
//! ```rust,no_run
//! use term_ontology::report::{OntologyFormatter, ReportConfig, SummaryFormatter};
//! # use term_ontology::model::OntologyDocument;
//! # fn example(document: &OntologyDocument) -> term_ontology::error::Result<()> {
//! let formatter = SummaryFormatter::with_config(ReportConfig::default().with_max_links(10));
//! println!("{}", formatter.format(document)?);
//! # Ok(())
//! # }
//! ```

use crate::error::{OntologyError, Result};
use crate::model::OntologyDocument;
use std::fmt::{self, Write};

/// Options for the human summary.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Number of links listed before collapsing the rest
    pub max_links: usize,
    /// List every link routed to review
    pub include_review: bool,
    /// Include the generation timestamp in the header
    pub include_timestamp: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_links: 5,
            include_review: true,
            include_timestamp: false,
        }
    }
}

impl ReportConfig {
    /// Counts only.
    pub fn minimal() -> Self {
        Self {
            max_links: 0,
            include_review: false,
            include_timestamp: false,
        }
    }

    /// Sets how many links are listed before the rest are collapsed into an
    /// "... and N more links" line. Zero hides the link list.
    pub fn with_max_links(mut self, max: usize) -> Self {
        self.max_links = max;
        self
    }

    /// Sets whether links routed to review are listed individually.
    pub fn with_review(mut self, include: bool) -> Self {
        self.include_review = include;
        self
    }

    /// Sets whether the header shows when the document was generated.
    pub fn with_timestamp(mut self, include: bool) -> Self {
        self.include_timestamp = include;
        self
    }
}

/// Renders an [`OntologyDocument`] as text.
///
/// # Examples
///
/// ```rust
/// use term_ontology::model::OntologyDocument;
/// use term_ontology::report::OntologyFormatter;
///
/// struct CountsOnly;
///
/// impl OntologyFormatter for CountsOnly {
///     fn format(&self, document: &OntologyDocument) -> term_ontology::error::Result<String> {
///         let summary = document.usage_summary();
///         Ok(format!("{} nouns, {} links", summary.total_nouns, summary.total_links))
///     }
/// }
/// ```
pub trait OntologyFormatter {
    /// Formats a document into its string representation.
    ///
    /// # Errors
    ///
    /// Returns [`OntologyError::Serialization`] when the document cannot be
    /// rendered.
    fn format(&self, document: &OntologyDocument) -> Result<String>;
}

/// Console summary: counts, links needing review and the first few links.
#[derive(Debug, Clone, Default)]
pub struct SummaryFormatter {
    config: ReportConfig,
}

impl SummaryFormatter {
    /// Creates a formatter with the default [`ReportConfig`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a formatter with a custom configuration.
    pub fn with_config(config: ReportConfig) -> Self {
        Self { config }
    }

    fn render(&self, document: &OntologyDocument, output: &mut String) -> fmt::Result {
        let config = &self.config;
        let metadata = document.metadata();
        let summary = document.usage_summary();
        let quality = document.quality_flags();
        let links = document.links();

        writeln!(output, "{}", "=".repeat(60))?;
        writeln!(output, "ONTOLOGY DISCOVERY SUMMARY v{}", metadata.version)?;
        if config.include_timestamp {
            writeln!(output, "Generated: {}", metadata.generated_at.to_rfc3339())?;
        }
        writeln!(output, "Overall Confidence: {}", metadata.overall_confidence)?;
        writeln!(output, "Link Coverage: {}", metadata.link_coverage)?;

        writeln!(output)?;
        writeln!(output, "--- CORE DISCOVERY ---")?;
        writeln!(output, "Nouns Discovered: {}", summary.total_nouns)?;
        writeln!(
            output,
            "Links Discovered: {} ({} high confidence)",
            summary.total_links, summary.high_confidence_links
        )?;
        writeln!(output, "Metrics Discovered: {}", summary.total_metrics)?;

        writeln!(output)?;
        writeln!(output, "--- ENRICHMENT ---")?;
        writeln!(output, "Dimensions Found: {}", summary.total_dimensions)?;
        writeln!(output, "Derived Fields: {}", summary.total_derived_fields)?;
        writeln!(output, "Query Templates: {}", summary.total_templates)?;

        writeln!(output)?;
        writeln!(output, "--- QUALITY ASSESSMENT ---")?;
        writeln!(output, "Links Needing Review: {}", quality.links_needing_review.len())?;
        writeln!(output, "High Confidence Links: {}", quality.high_confidence_links.len())?;

        if config.include_review && !quality.links_needing_review.is_empty() {
            writeln!(output)?;
            writeln!(output, "Links requiring manual review:")?;
            for item in &quality.links_needing_review {
                writeln!(output, "  - {} (confidence: {})", item.link, item.confidence)?;
            }
        }

        if config.max_links > 0 && !links.is_empty() {
            writeln!(output)?;
            writeln!(output, "Links Found (with confidence):")?;
            for link in links.iter().take(config.max_links) {
                writeln!(
                    output,
                    "  - {} (Method: {}, Confidence: {}, Type: {})",
                    link.summary(),
                    link.method,
                    link.confidence,
                    link.cardinality
                )?;
            }
            if links.len() > config.max_links {
                writeln!(output, "  ... and {} more links", links.len() - config.max_links)?;
            }
        }

        Ok(())
    }
}

impl OntologyFormatter for SummaryFormatter {
    fn format(&self, document: &OntologyDocument) -> Result<String> {
        let mut output = String::new();
        self.render(document, &mut output)
            .map_err(|e| OntologyError::Serialization(format!("Failed to render summary: {e}")))?;
        Ok(output)
    }
}

/// The persisted JSON form.
///
/// Pretty output is byte-identical to what
/// [`OntologyDocument::write_to`] writes to disk.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a formatter producing pretty-printed JSON.
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// Sets whether to pretty-print. Compact output is a single line.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OntologyFormatter for JsonFormatter {
    fn format(&self, document: &OntologyDocument) -> Result<String> {
        if self.pretty {
            document.to_json_pretty()
        } else {
            Ok(serde_json::to_string(document)?)
        }
    }
}
