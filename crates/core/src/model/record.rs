//! The record document type.

use chrono::{DateTime, SecondsFormat, Utc};

use super::{parse_timestamp, DocumentError, AUTHOR_EMAIL_KEY, AUTHOR_HANDLE_KEY};
use crate::frontmatter::{self, FieldValue, HeaderFormat, Metadata};
use crate::identity::Identity;
use crate::kv::TypedKv;

const TITLE_KEY: &str = "title";
const CREATED_KEY: &str = "created_at";
const MODIFIED_KEY: &str = "modified_at";

/// A record: the primary tracked document.
///
/// The identifier is the filename, never part of the header, so the file
/// can be renamed/copied by hand without the header lying about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub title: String,
    pub author: Identity,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub kv: TypedKv,
    /// Caller-defined scalar metadata, order preserved.
    pub extra: Vec<(String, FieldValue)>,
    pub body: String,
}

impl Record {
    /// Build the header mapping in canonical key order.
    pub fn metadata(&self) -> Metadata {
        let mut meta = Metadata::new();
        meta.set(TITLE_KEY, FieldValue::from(self.title.clone()));
        meta.set(CREATED_KEY, FieldValue::from(format_timestamp(self.created_at)));
        meta.set(MODIFIED_KEY, FieldValue::from(format_timestamp(self.modified_at)));
        meta.set(AUTHOR_HANDLE_KEY, FieldValue::from(self.author.handle.clone()));
        meta.set(AUTHOR_EMAIL_KEY, FieldValue::from(self.author.email.clone()));
        for (key, value) in &self.extra {
            meta.set(key.clone(), value.clone());
        }
        for (key, value) in self.kv.to_metadata_fields() {
            meta.set(key, value);
        }
        meta
    }

    /// Serialize to the on-disk document form.
    pub fn to_document(&self, format: HeaderFormat) -> Result<String, DocumentError> {
        Ok(frontmatter::serialize(&self.metadata(), &self.body, format)?)
    }

    /// Parse a record from its on-disk form. The id comes from the caller
    /// (it is the filename).
    pub fn from_document(
        id: &str,
        content: &str,
        format: HeaderFormat,
    ) -> Result<Self, DocumentError> {
        let doc = frontmatter::parse(content, format)?;
        let kv = TypedKv::from_metadata(&doc.metadata)?;

        let mut title = String::new();
        let mut author = Identity::new("", "");
        let mut created_at = None;
        let mut modified_at = None;
        let mut extra = Vec::new();

        for (key, value) in doc.metadata.iter() {
            match key {
                TITLE_KEY => title = scalar_text(value),
                CREATED_KEY => created_at = Some(parse_timestamp(id, key, value)?),
                MODIFIED_KEY => modified_at = Some(parse_timestamp(id, key, value)?),
                AUTHOR_HANDLE_KEY => author.handle = scalar_text(value),
                AUTHOR_EMAIL_KEY => author.email = scalar_text(value),
                crate::kv::STRINGS_KEY | crate::kv::INTEGERS_KEY | crate::kv::FLOATS_KEY => {}
                other => extra.push((other.to_string(), value.clone())),
            }
        }

        let created_at = created_at.ok_or_else(|| DocumentError::MissingField {
            id: id.to_string(),
            field: CREATED_KEY,
        })?;
        // A hand-edited file may drop modified_at; fall back to created_at
        // rather than inventing a newer time.
        let modified_at = modified_at.unwrap_or(created_at);

        Ok(Self {
            id: id.to_string(),
            title,
            author,
            created_at,
            modified_at,
            kv,
            extra,
            body: doc.body,
        })
    }
}

pub(super) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(super) fn scalar_text(value: &FieldValue) -> String {
    match value {
        FieldValue::String(s) => s.clone(),
        FieldValue::Integer(n) => n.to_string(),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::Bool(b) => b.to_string(),
        other => format!("{other:?}"),
    }
}
