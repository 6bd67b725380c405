//! In-place metadata updates on serialized documents.

use super::parser::{parse, FormatError};
use super::serializer::serialize;
use super::types::{HeaderFormat, Metadata};

/// Apply a shallow metadata patch to a serialized document.
///
/// The document is parsed, the patch merged key-by-key, and the result
/// re-serialized; the body and untouched keys pass through unchanged.
/// Never a textual splice: a malformed document fails here rather than
/// producing a half-edited file.
pub fn update_metadata(
    content: &str,
    patch: &Metadata,
    format: HeaderFormat,
) -> Result<String, FormatError> {
    let mut doc = parse(content, format)?;
    doc.metadata.merge(patch);
    serialize(&doc.metadata, &doc.body, format)
}
