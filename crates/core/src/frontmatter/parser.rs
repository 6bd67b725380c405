//! Frontmatter parsing from document text.

use thiserror::Error;

use super::types::{HeaderFormat, Metadata};
use super::value::{metadata_from_toml, metadata_from_yaml};

/// Errors produced while reading a document header.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("document does not start with the '{0}' marker")]
    MissingOpeningMarker(&'static str),

    #[error("closing '{0}' marker not found")]
    MissingClosingMarker(&'static str),

    #[error("invalid YAML header: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("invalid TOML header: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("failed to serialize TOML header: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("unsupported value for key '{key}': {detail}")]
    UnsupportedValue { key: String, detail: String },
}

/// A document split into its metadata block and body text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub metadata: Metadata,
    pub body: String,
}

/// Parse a document into metadata and body.
///
/// The document must open with the format's marker on the first line and
/// carry a matching closing marker; anything else is a `FormatError`. The
/// body is everything after the closing marker with the single separating
/// blank line removed.
pub fn parse(content: &str, format: HeaderFormat) -> Result<ParsedDocument, FormatError> {
    let marker = format.marker();

    let first_line_end = content.find('\n').unwrap_or(content.len());
    if content[..first_line_end].trim_end_matches('\r') != marker {
        return Err(FormatError::MissingOpeningMarker(marker));
    }

    let rest = if first_line_end < content.len() {
        &content[first_line_end + 1..]
    } else {
        ""
    };

    let block_end =
        find_marker_line(rest, marker).ok_or(FormatError::MissingClosingMarker(marker))?;
    let block = &rest[..block_end];

    // Skip the closing marker line itself.
    let after_marker = &rest[block_end..];
    let after_line = after_marker.find('\n').map_or("", |i| &after_marker[i + 1..]);
    // One blank line separates header from body; strip it if present.
    let body = after_line
        .strip_prefix("\r\n")
        .or_else(|| after_line.strip_prefix('\n'))
        .unwrap_or(after_line)
        .to_string();

    let metadata = parse_block(block, format)?;
    Ok(ParsedDocument { metadata, body })
}

fn parse_block(block: &str, format: HeaderFormat) -> Result<Metadata, FormatError> {
    if block.trim().is_empty() {
        return Ok(Metadata::new());
    }
    match format {
        HeaderFormat::Yaml => {
            let mapping: serde_yaml::Mapping = serde_yaml::from_str(block)?;
            metadata_from_yaml(&mapping)
        }
        HeaderFormat::Toml => {
            let table: toml::Table = toml::from_str(block)?;
            metadata_from_toml(&table)
        }
    }
}

/// Byte offset of the first line equal to `marker`, or None.
fn find_marker_line(content: &str, marker: &str) -> Option<usize> {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if line.trim_end_matches(['\n', '\r']) == marker {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter::types::FieldValue;

    #[test]
    fn parse_yaml_document() {
        let content = "---\ntitle: Hello\ncount: 2\n---\n\nBody text\n";
        let doc = parse(content, HeaderFormat::Yaml).unwrap();
        assert_eq!(doc.metadata.get("title").and_then(FieldValue::as_str), Some("Hello"));
        assert_eq!(doc.metadata.get("count").and_then(FieldValue::as_i64), Some(2));
        assert_eq!(doc.body, "Body text\n");
    }

    #[test]
    fn parse_toml_document() {
        let content = "+++\ntitle = \"Hello\"\n+++\n\nBody\n";
        let doc = parse(content, HeaderFormat::Toml).unwrap();
        assert_eq!(doc.metadata.get("title").and_then(FieldValue::as_str), Some("Hello"));
        assert_eq!(doc.body, "Body\n");
    }

    #[test]
    fn missing_opening_marker_fails() {
        let err = parse("title: Hello\n", HeaderFormat::Yaml).unwrap_err();
        assert!(matches!(err, FormatError::MissingOpeningMarker(_)));
    }

    #[test]
    fn missing_closing_marker_fails() {
        let err = parse("---\ntitle: Hello\n\nBody\n", HeaderFormat::Yaml).unwrap_err();
        assert!(matches!(err, FormatError::MissingClosingMarker(_)));
    }

    #[test]
    fn malformed_block_fails() {
        let content = "---\ntitle: [unclosed\n---\n\nBody\n";
        let err = parse(content, HeaderFormat::Yaml).unwrap_err();
        assert!(matches!(err, FormatError::InvalidYaml(_)));
    }

    #[test]
    fn empty_header_is_allowed() {
        let doc = parse("---\n---\n\nBody\n", HeaderFormat::Yaml).unwrap();
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.body, "Body\n");
    }

    #[test]
    fn wrong_marker_for_format_fails() {
        let err = parse("+++\ntitle = \"x\"\n+++\n\nBody\n", HeaderFormat::Yaml).unwrap_err();
        assert!(matches!(err, FormatError::MissingOpeningMarker("---")));
    }

    #[test]
    fn body_without_blank_line_survives() {
        let doc = parse("---\na: 1\n---\nBody\n", HeaderFormat::Yaml).unwrap();
        assert_eq!(doc.body, "Body\n");
    }
}
