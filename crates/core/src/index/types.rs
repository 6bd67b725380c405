//! Index row types.
//!
//! Rows are denormalized, disposable projections of documents: everything
//! here is derivable from the file store and carries no state of its own.

use chrono::{DateTime, Utc};

use crate::frontmatter::FieldValue;
use crate::identity::Identity;
use crate::model::{Note, Record};

/// Indexed projection of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    pub id: String,
    pub title: String,
    pub author: Identity,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub body: String,
    /// Caller-defined metadata as JSON, for display without re-parsing.
    pub extra_json: Option<String>,
}

impl From<&Record> for RecordRow {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            author: record.author.clone(),
            created_at: record.created_at,
            modified_at: record.modified_at,
            body: record.body.clone(),
            extra_json: extra_to_json(&record.extra),
        }
    }
}

/// Indexed projection of a note.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteRow {
    pub id: String,
    pub record_id: String,
    pub author: Identity,
    pub created_at: DateTime<Utc>,
    pub body: String,
}

impl From<&Note> for NoteRow {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            record_id: note.record_id.clone(),
            author: note.author.clone(),
            created_at: note.created_at,
            body: note.body.clone(),
        }
    }
}

fn extra_to_json(extra: &[(String, FieldValue)]) -> Option<String> {
    if extra.is_empty() {
        return None;
    }
    let map: serde_json::Map<String, serde_json::Value> = extra
        .iter()
        .map(|(k, v)| (k.clone(), field_to_json(v)))
        .collect();
    serde_json::to_string(&map).ok()
}

fn field_to_json(value: &FieldValue) -> serde_json::Value {
    match value {
        FieldValue::String(s) => serde_json::Value::String(s.clone()),
        FieldValue::Integer(n) => serde_json::Value::from(*n),
        FieldValue::Float(f) => serde_json::Value::from(*f),
        FieldValue::Bool(b) => serde_json::Value::Bool(*b),
        FieldValue::List(items) => {
            serde_json::Value::Array(items.iter().map(field_to_json).collect())
        }
        FieldValue::Mapping(m) => serde_json::Value::Object(
            m.iter().map(|(k, v)| (k.to_string(), field_to_json(v))).collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_json_is_none_when_empty() {
        assert_eq!(extra_to_json(&[]), None);
    }

    #[test]
    fn extra_json_serializes_scalars() {
        let extra = vec![
            ("severity".to_string(), FieldValue::from("high")),
            ("attempts".to_string(), FieldValue::Integer(3)),
        ];
        let json = extra_to_json(&extra).unwrap();
        assert!(json.contains("\"severity\":\"high\""));
        assert!(json.contains("\"attempts\":3"));
    }
}
