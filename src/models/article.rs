//! Article record types shared across search, extraction, and storage.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Source tag stamped into every persisted artifact.
pub const SOURCE_TAG: &str = "PMC";

/// A PMC accession identifier.
///
/// `esearch` on `db=pmc` returns bare numeric ids and `efetch` expects the
/// same numeric form, while filenames and display use the `PMC`-prefixed
/// accession. Both forms are derivable from either input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PmcId {
    numeric: String,
}

impl PmcId {
    /// Parse from either the bare numeric or the `PMC`-prefixed form.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let numeric = trimmed.strip_prefix("PMC").unwrap_or(trimmed).to_string();
        Self { numeric }
    }

    /// Bare numeric form, as `efetch` expects.
    pub fn numeric(&self) -> &str {
        &self.numeric
    }

    /// `PMC`-prefixed accession used for filenames and display.
    pub fn accession(&self) -> String {
        format!("PMC{}", self.numeric)
    }
}

impl std::fmt::Display for PmcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PMC{}", self.numeric)
    }
}

/// Output format for persisted artifacts. Every format saves as JSON; the
/// format selects which rendering of the article body is embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Metadata plus a plain-text rendering of the article.
    Text,
    /// Metadata plus the raw JATS XML string.
    Xml,
    /// Metadata plus both the XML and the plain-text rendering.
    Both,
}

impl OutputFormat {
    /// Whether the artifact should carry a plain-text body.
    ///
    /// `include_text` only matters when the raw XML is also kept: the sole
    /// payload of [`OutputFormat::Text`] is never dropped.
    pub fn wants_text(self, include_text: bool) -> bool {
        match self {
            OutputFormat::Text => true,
            OutputFormat::Both => include_text,
            OutputFormat::Xml => false,
        }
    }

    /// Whether the artifact should carry the raw XML.
    pub fn includes_xml(self) -> bool {
        matches!(self, OutputFormat::Xml | OutputFormat::Both)
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            // "json" and "txt" are legacy aliases
            "text" | "txt" | "json" => Ok(Self::Text),
            "xml" => Ok(Self::Xml),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Xml => "xml",
            Self::Both => "both",
        };
        write!(f, "{name}")
    }
}

/// Metadata extracted from one JATS document.
///
/// Every field is independently optional: a document missing a substructure
/// yields an absent value for that field, never an extraction failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Full journal title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,

    /// Abbreviated journal forms (`nlm-ta`, `iso-abbrev`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub journal_abbrevs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmcid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,

    /// Authors in citation order, formatted "Surname, Given".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,

    /// Abstract paragraphs joined by blank lines.
    #[serde(
        rename = "abstract",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub abstract_text: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub keywords: BTreeSet<String>,
}

impl ArticleMetadata {
    /// True when no field at all was recovered from the document.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.journal.is_none()
            && self.journal_abbrevs.is_empty()
            && self.doi.is_none()
            && self.pmid.is_none()
            && self.pmcid.is_none()
            && self.year.is_none()
            && self.authors.is_empty()
            && self.abstract_text.is_none()
            && self.keywords.is_empty()
    }
}

/// One self-contained persisted article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// `PMC`-prefixed accession.
    pub pmcid: String,

    /// Fixed source tag, see [`SOURCE_TAG`].
    pub source: String,

    /// ISO-8601 retrieval timestamp.
    pub retrieved_at: String,

    pub metadata: ArticleMetadata,

    /// Plain-text rendering of the article body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Raw JATS XML, byte-for-byte as served.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml: Option<String>,
}

impl ArticleRecord {
    /// Fresh record for `id`, stamped with the current retrieval time.
    pub fn new(id: &PmcId, metadata: ArticleMetadata) -> Self {
        Self {
            pmcid: id.accession(),
            source: SOURCE_TAG.to_string(),
            retrieved_at: chrono::Utc::now().to_rfc3339(),
            metadata,
            text: None,
            xml: None,
        }
    }

    pub fn with_text(mut self, text: String) -> Self {
        self.text = Some(text);
        self
    }

    pub fn with_xml(mut self, xml: String) -> Self {
        self.xml = Some(xml);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pmcid_forms() {
        let id = PmcId::parse("1234567");
        assert_eq!(id.numeric(), "1234567");
        assert_eq!(id.accession(), "PMC1234567");

        let prefixed = PmcId::parse(" PMC1234567 ");
        assert_eq!(prefixed, id);
        assert_eq!(prefixed.to_string(), "PMC1234567");
    }

    #[test]
    fn format_aliases() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("txt".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("XML".parse::<OutputFormat>().unwrap(), OutputFormat::Xml);
        assert_eq!("both".parse::<OutputFormat>().unwrap(), OutputFormat::Both);
        assert!("pdf".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn format_payload_selection() {
        assert!(OutputFormat::Text.wants_text(false));
        assert!(OutputFormat::Both.wants_text(true));
        assert!(!OutputFormat::Both.wants_text(false));
        assert!(!OutputFormat::Xml.wants_text(true));

        assert!(OutputFormat::Xml.includes_xml());
        assert!(OutputFormat::Both.includes_xml());
        assert!(!OutputFormat::Text.includes_xml());
    }

    #[test]
    fn record_serialization_omits_absent_payloads() {
        let id = PmcId::parse("42");
        let record = ArticleRecord::new(&id, ArticleMetadata::default());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["pmcid"], "PMC42");
        assert_eq!(json["source"], "PMC");
        assert!(json.get("text").is_none());
        assert!(json.get("xml").is_none());

        let with_text = ArticleRecord::new(&id, ArticleMetadata::default())
            .with_text("body".to_string());
        let json = serde_json::to_value(&with_text).unwrap();
        assert_eq!(json["text"], "body");
    }

    #[test]
    fn empty_metadata_detection() {
        assert!(ArticleMetadata::default().is_empty());

        let with_title = ArticleMetadata {
            title: Some("A title".to_string()),
            ..Default::default()
        };
        assert!(!with_title.is_empty());
    }
}
