//! Frontmatter serialization back to document text.

use super::parser::FormatError;
use super::types::{HeaderFormat, Metadata};
use super::value::{metadata_to_toml, metadata_to_yaml};

/// Serialize metadata and body into the on-disk document form.
///
/// Layout is fixed: marker, metadata block, marker, one blank line, body,
/// trailing newline. Key order follows the metadata's insertion order.
pub fn serialize(
    metadata: &Metadata,
    body: &str,
    format: HeaderFormat,
) -> Result<String, FormatError> {
    let marker = format.marker();
    let block = serialize_block(metadata, format)?;

    let mut out = String::with_capacity(block.len() + body.len() + 16);
    out.push_str(marker);
    out.push('\n');
    out.push_str(&block);
    if !block.is_empty() && !block.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(marker);
    out.push_str("\n\n");
    out.push_str(body);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

fn serialize_block(metadata: &Metadata, format: HeaderFormat) -> Result<String, FormatError> {
    if metadata.is_empty() {
        return Ok(String::new());
    }
    match format {
        HeaderFormat::Yaml => {
            let mapping = metadata_to_yaml(metadata);
            Ok(serde_yaml::to_string(&mapping)?)
        }
        HeaderFormat::Toml => {
            let table = metadata_to_toml(metadata);
            Ok(toml::to_string(&table)?)
        }
    }
}
