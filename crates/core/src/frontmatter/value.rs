//! Conversions between the metadata model and the YAML/TOML value trees.
//!
//! Both directions are total over the values casefile itself writes; nodes a
//! hand editor can produce but the model cannot hold (YAML tags, nulls)
//! are rejected with the offending key so the caller sees exactly what to fix.

use super::parser::FormatError;
use super::types::{FieldValue, Metadata};

pub(crate) fn metadata_from_yaml(
    mapping: &serde_yaml::Mapping,
) -> Result<Metadata, FormatError> {
    let mut meta = Metadata::new();
    for (key, value) in mapping {
        let key = match key {
            serde_yaml::Value::String(s) => s.clone(),
            other => {
                return Err(FormatError::UnsupportedValue {
                    key: format!("{other:?}"),
                    detail: "mapping keys must be strings".into(),
                })
            }
        };
        let field = field_from_yaml(value, &key)?;
        meta.set(key, field);
    }
    Ok(meta)
}

fn field_from_yaml(value: &serde_yaml::Value, key: &str) -> Result<FieldValue, FormatError> {
    match value {
        serde_yaml::Value::String(s) => Ok(FieldValue::String(s.clone())),
        serde_yaml::Value::Bool(b) => Ok(FieldValue::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(FieldValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(FieldValue::Float(f))
            } else {
                Err(FormatError::UnsupportedValue {
                    key: key.to_string(),
                    detail: "number out of range".into(),
                })
            }
        }
        serde_yaml::Value::Sequence(seq) => {
            let items = seq
                .iter()
                .map(|v| field_from_yaml(v, key))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(FieldValue::List(items))
        }
        serde_yaml::Value::Mapping(m) => Ok(FieldValue::Mapping(metadata_from_yaml(m)?)),
        serde_yaml::Value::Null => Err(FormatError::UnsupportedValue {
            key: key.to_string(),
            detail: "null values are not allowed".into(),
        }),
        serde_yaml::Value::Tagged(_) => Err(FormatError::UnsupportedValue {
            key: key.to_string(),
            detail: "tagged values are not allowed".into(),
        }),
    }
}

pub(crate) fn metadata_to_yaml(meta: &Metadata) -> serde_yaml::Mapping {
    let mut mapping = serde_yaml::Mapping::new();
    for (key, value) in meta.iter() {
        mapping.insert(serde_yaml::Value::String(key.to_string()), field_to_yaml(value));
    }
    mapping
}

fn field_to_yaml(value: &FieldValue) -> serde_yaml::Value {
    match value {
        FieldValue::String(s) => serde_yaml::Value::String(s.clone()),
        FieldValue::Integer(n) => serde_yaml::Value::Number((*n).into()),
        FieldValue::Float(f) => serde_yaml::Value::Number(serde_yaml::Number::from(*f)),
        FieldValue::Bool(b) => serde_yaml::Value::Bool(*b),
        FieldValue::List(items) => {
            serde_yaml::Value::Sequence(items.iter().map(field_to_yaml).collect())
        }
        FieldValue::Mapping(m) => serde_yaml::Value::Mapping(metadata_to_yaml(m)),
    }
}

pub(crate) fn metadata_from_toml(table: &toml::Table) -> Result<Metadata, FormatError> {
    let mut meta = Metadata::new();
    for (key, value) in table {
        let field = field_from_toml(value, key)?;
        meta.set(key.clone(), field);
    }
    Ok(meta)
}

fn field_from_toml(value: &toml::Value, key: &str) -> Result<FieldValue, FormatError> {
    match value {
        toml::Value::String(s) => Ok(FieldValue::String(s.clone())),
        toml::Value::Integer(n) => Ok(FieldValue::Integer(*n)),
        toml::Value::Float(f) => Ok(FieldValue::Float(*f)),
        toml::Value::Boolean(b) => Ok(FieldValue::Bool(*b)),
        // Unquoted datetimes in hand-edited headers read back as their
        // textual form; casefile itself always writes timestamps as strings.
        toml::Value::Datetime(dt) => Ok(FieldValue::String(dt.to_string())),
        toml::Value::Array(items) => {
            let items = items
                .iter()
                .map(|v| field_from_toml(v, key))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(FieldValue::List(items))
        }
        toml::Value::Table(t) => Ok(FieldValue::Mapping(metadata_from_toml(t)?)),
    }
}

pub(crate) fn metadata_to_toml(meta: &Metadata) -> toml::Table {
    let mut table = toml::Table::new();
    for (key, value) in meta.iter() {
        table.insert(key.to_string(), field_to_toml(value));
    }
    table
}

fn field_to_toml(value: &FieldValue) -> toml::Value {
    match value {
        FieldValue::String(s) => toml::Value::String(s.clone()),
        FieldValue::Integer(n) => toml::Value::Integer(*n),
        FieldValue::Float(f) => toml::Value::Float(*f),
        FieldValue::Bool(b) => toml::Value::Boolean(*b),
        FieldValue::List(items) => {
            toml::Value::Array(items.iter().map(field_to_toml).collect())
        }
        FieldValue::Mapping(m) => toml::Value::Table(metadata_to_toml(m)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_round_trip_preserves_order_and_types() {
        let yaml = "title: Fix login bug\ncount: 3\nratio: 0.5\nflag: true\ntags:\n- auth\n- web\n";
        let value: serde_yaml::Mapping = serde_yaml::from_str(yaml).unwrap();
        let meta = metadata_from_yaml(&value).unwrap();

        let keys: Vec<_> = meta.keys().collect();
        assert_eq!(keys, vec!["title", "count", "ratio", "flag", "tags"]);
        assert_eq!(meta.get("count").and_then(FieldValue::as_i64), Some(3));
        assert_eq!(meta.get("ratio").and_then(FieldValue::as_f64), Some(0.5));

        let back = metadata_to_yaml(&meta);
        assert_eq!(metadata_from_yaml(&back).unwrap(), meta);
    }

    #[test]
    fn yaml_null_is_rejected_with_key() {
        let value: serde_yaml::Mapping = serde_yaml::from_str("empty:\n").unwrap();
        let err = metadata_from_yaml(&value).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn toml_datetime_reads_as_string() {
        let table: toml::Table =
            toml::from_str("created_at = 2026-01-01T00:00:00Z").unwrap();
        let meta = metadata_from_toml(&table).unwrap();
        assert_eq!(
            meta.get("created_at").and_then(FieldValue::as_str),
            Some("2026-01-01T00:00:00Z")
        );
    }

    #[test]
    fn toml_round_trip() {
        let table: toml::Table =
            toml::from_str("title = \"x\"\nnums = [1, 2]\n[kv_strings]\ncomponent = [\"auth\"]\n")
                .unwrap();
        let meta = metadata_from_toml(&table).unwrap();
        let back = metadata_to_toml(&meta);
        assert_eq!(metadata_from_toml(&back).unwrap(), meta);
    }
}
