//! Document types stored in the file store.

pub mod note;
pub mod record;

pub use note::Note;
pub use record::Record;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::frontmatter::{FieldValue, FormatError};
use crate::kv::KvError;

pub(crate) const AUTHOR_HANDLE_KEY: &str = "author_handle";
pub(crate) const AUTHOR_EMAIL_KEY: &str = "author_email";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Kv(#[from] KvError),

    #[error("document {id} is missing required field '{field}'")]
    MissingField { id: String, field: &'static str },

    #[error("document {id} has invalid timestamp in '{field}': {value}")]
    BadTimestamp {
        id: String,
        field: String,
        value: String,
    },
}

pub(crate) fn parse_timestamp(
    id: &str,
    field: &str,
    value: &FieldValue,
) -> Result<DateTime<Utc>, DocumentError> {
    let text = match value {
        FieldValue::String(s) => s.as_str(),
        other => {
            return Err(DocumentError::BadTimestamp {
                id: id.to_string(),
                field: field.to_string(),
                value: format!("{other:?}"),
            })
        }
    };
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DocumentError::BadTimestamp {
            id: id.to_string(),
            field: field.to_string(),
            value: text.to_string(),
        })
}
