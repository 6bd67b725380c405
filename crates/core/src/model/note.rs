//! The note document type.

use chrono::{DateTime, Utc};

use super::record::{format_timestamp, scalar_text};
use super::{parse_timestamp, DocumentError, AUTHOR_EMAIL_KEY, AUTHOR_HANDLE_KEY};
use crate::frontmatter::{self, FieldValue, HeaderFormat, Metadata};
use crate::identity::Identity;
use crate::kv::TypedKv;

const CREATED_KEY: &str = "created_at";

/// A note attached to a record.
///
/// Notes are append-only: once written they are never rewritten, which is
/// why there is no modified timestamp. The parent record id comes from the
/// directory the note lives in, not from the header.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: String,
    pub record_id: String,
    pub author: Identity,
    pub created_at: DateTime<Utc>,
    pub kv: TypedKv,
    /// The message body.
    pub body: String,
}

impl Note {
    pub fn metadata(&self) -> Metadata {
        let mut meta = Metadata::new();
        meta.set(CREATED_KEY, FieldValue::from(format_timestamp(self.created_at)));
        meta.set(AUTHOR_HANDLE_KEY, FieldValue::from(self.author.handle.clone()));
        meta.set(AUTHOR_EMAIL_KEY, FieldValue::from(self.author.email.clone()));
        for (key, value) in self.kv.to_metadata_fields() {
            meta.set(key, value);
        }
        meta
    }

    pub fn to_document(&self, format: HeaderFormat) -> Result<String, DocumentError> {
        Ok(frontmatter::serialize(&self.metadata(), &self.body, format)?)
    }

    pub fn from_document(
        id: &str,
        record_id: &str,
        content: &str,
        format: HeaderFormat,
    ) -> Result<Self, DocumentError> {
        let doc = frontmatter::parse(content, format)?;
        let kv = TypedKv::from_metadata(&doc.metadata)?;

        let mut author = Identity::new("", "");
        let mut created_at = None;

        for (key, value) in doc.metadata.iter() {
            match key {
                CREATED_KEY => created_at = Some(parse_timestamp(id, key, value)?),
                AUTHOR_HANDLE_KEY => author.handle = scalar_text(value),
                AUTHOR_EMAIL_KEY => author.email = scalar_text(value),
                _ => {}
            }
        }

        let created_at = created_at.ok_or_else(|| DocumentError::MissingField {
            id: id.to_string(),
            field: CREATED_KEY,
        })?;

        Ok(Self {
            id: id.to_string(),
            record_id: record_id.to_string(),
            author,
            created_at,
            kv,
            body: doc.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_note() -> Note {
        let mut kv = TypedKv::new();
        kv.floats.insert("error_rate".into(), vec![0.35]);
        Note {
            id: "NT-A1B2C3D4".into(),
            record_id: "REC-00001".into(),
            author: Identity::new("bob", "bob@example.com"),
            created_at: Utc.with_ymd_and_hms(2026, 8, 3, 9, 15, 0).unwrap(),
            kv,
            body: "Rolled back the deploy.\n".into(),
        }
    }

    #[test]
    fn round_trips() {
        let note = sample_note();
        let text = note.to_document(HeaderFormat::Yaml).unwrap();
        let back =
            Note::from_document("NT-A1B2C3D4", "REC-00001", &text, HeaderFormat::Yaml).unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn missing_created_at_fails() {
        let content = "---\nauthor_handle: bob\n---\n\nMessage\n";
        let err =
            Note::from_document("NT-X", "REC-00001", content, HeaderFormat::Yaml).unwrap_err();
        assert!(matches!(err, DocumentError::MissingField { .. }));
    }
}
