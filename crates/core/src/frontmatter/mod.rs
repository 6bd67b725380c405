//! Frontmatter parsing, modification, and serialization.
//!
//! Documents are stored as a marker-delimited metadata block followed by a
//! free-text body. The block format (YAML or TOML) is fixed per store.

pub mod modifier;
pub mod parser;
pub mod serializer;
pub mod types;
mod value;

pub use modifier::update_metadata;
pub use parser::{parse, FormatError, ParsedDocument};
pub use serializer::serialize;
pub use types::{FieldValue, HeaderFormat, Metadata};
