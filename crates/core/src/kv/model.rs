//! Typed multi-valued key-value fields.
//!
//! Three independent namespaces (string, integer, float). A field name holds
//! a list of values of exactly one scalar type; the same name may exist in
//! different namespaces on different documents but not within one document's
//! namespace twice.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::frontmatter::{FieldValue, Metadata};

/// Frontmatter key carrying the string namespace.
pub const STRINGS_KEY: &str = "kv_strings";
/// Frontmatter key carrying the integer namespace.
pub const INTEGERS_KEY: &str = "kv_integers";
/// Frontmatter key carrying the float namespace.
pub const FLOATS_KEY: &str = "kv_floats";

#[derive(Debug, Error)]
pub enum KvError {
    #[error("field '{field}' expects {expected} values, got {found} '{value}'")]
    Type {
        field: String,
        expected: &'static str,
        found: &'static str,
        value: String,
    },

    #[error("'{namespace}' must be a mapping, got {found}")]
    NamespaceNotMapping { namespace: String, found: &'static str },
}

/// A document's typed key-value fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypedKv {
    pub strings: BTreeMap<String, Vec<String>>,
    pub integers: BTreeMap<String, Vec<i64>>,
    pub floats: BTreeMap<String, Vec<f64>>,
}

impl TypedKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty() && self.integers.is_empty() && self.floats.is_empty()
    }

    /// Read the three namespaces out of a parsed metadata block.
    ///
    /// Missing namespaces and missing keys read as empty. Bare scalars are
    /// accepted as one-element lists (the serializer writes them that way).
    /// Textual numerics in the integer/float namespaces are coerced;
    /// anything else fails naming the field.
    pub fn from_metadata(meta: &Metadata) -> Result<Self, KvError> {
        let mut kv = Self::new();

        if let Some(ns) = meta.get(STRINGS_KEY) {
            for (field, value) in namespace_entries(STRINGS_KEY, ns)? {
                kv.strings.insert(field.to_string(), coerce_list(field, value, coerce_string)?);
            }
        }
        if let Some(ns) = meta.get(INTEGERS_KEY) {
            for (field, value) in namespace_entries(INTEGERS_KEY, ns)? {
                kv.integers.insert(field.to_string(), coerce_list(field, value, coerce_integer)?);
            }
        }
        if let Some(ns) = meta.get(FLOATS_KEY) {
            for (field, value) in namespace_entries(FLOATS_KEY, ns)? {
                kv.floats.insert(field.to_string(), coerce_list(field, value, coerce_float)?);
            }
        }
        Ok(kv)
    }

    /// Emit the namespace mappings for a frontmatter block.
    ///
    /// Empty namespaces are omitted entirely; single-element lists are
    /// written as bare scalars (readers normalize them back).
    pub fn to_metadata_fields(&self) -> Vec<(String, FieldValue)> {
        let mut fields = Vec::new();

        if !self.strings.is_empty() {
            let ns = self
                .strings
                .iter()
                .map(|(k, vs)| (k.clone(), scalar_or_list(vs, |v| FieldValue::String(v.clone()))))
                .collect();
            fields.push((STRINGS_KEY.to_string(), FieldValue::Mapping(ns)));
        }
        if !self.integers.is_empty() {
            let ns = self
                .integers
                .iter()
                .map(|(k, vs)| (k.clone(), scalar_or_list(vs, |v| FieldValue::Integer(*v))))
                .collect();
            fields.push((INTEGERS_KEY.to_string(), FieldValue::Mapping(ns)));
        }
        if !self.floats.is_empty() {
            let ns = self
                .floats
                .iter()
                .map(|(k, vs)| (k.clone(), scalar_or_list(vs, |v| FieldValue::Float(*v))))
                .collect();
            fields.push((FLOATS_KEY.to_string(), FieldValue::Mapping(ns)));
        }
        fields
    }

    /// Remove a key from every namespace.
    pub fn remove_key(&mut self, key: &str) {
        self.strings.remove(key);
        self.integers.remove(key);
        self.floats.remove(key);
    }
}

fn namespace_entries<'a>(
    namespace: &str,
    value: &'a FieldValue,
) -> Result<impl Iterator<Item = (&'a str, &'a FieldValue)>, KvError> {
    match value {
        FieldValue::Mapping(m) => Ok(m.iter()),
        other => Err(KvError::NamespaceNotMapping {
            namespace: namespace.to_string(),
            found: other.type_name(),
        }),
    }
}

fn coerce_list<T>(
    field: &str,
    value: &FieldValue,
    coerce: fn(&str, &FieldValue) -> Result<T, KvError>,
) -> Result<Vec<T>, KvError> {
    match value {
        FieldValue::List(items) => items.iter().map(|v| coerce(field, v)).collect(),
        scalar => Ok(vec![coerce(field, scalar)?]),
    }
}

fn coerce_string(field: &str, value: &FieldValue) -> Result<String, KvError> {
    match value {
        FieldValue::String(s) => Ok(s.clone()),
        // Bare numerics in the string namespace keep their textual form.
        FieldValue::Integer(n) => Ok(n.to_string()),
        FieldValue::Float(f) => Ok(f.to_string()),
        other => Err(type_error(field, "string", other)),
    }
}

fn coerce_integer(field: &str, value: &FieldValue) -> Result<i64, KvError> {
    match value {
        FieldValue::Integer(n) => Ok(*n),
        FieldValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| type_error(field, "integer", value)),
        other => Err(type_error(field, "integer", other)),
    }
}

fn coerce_float(field: &str, value: &FieldValue) -> Result<f64, KvError> {
    match value {
        FieldValue::Float(f) => Ok(*f),
        FieldValue::Integer(n) => Ok(*n as f64),
        FieldValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| type_error(field, "float", value)),
        other => Err(type_error(field, "float", other)),
    }
}

fn type_error(field: &str, expected: &'static str, value: &FieldValue) -> KvError {
    KvError::Type {
        field: field.to_string(),
        expected,
        found: value.type_name(),
        value: match value {
            FieldValue::String(s) => s.clone(),
            other => format!("{other:?}"),
        },
    }
}

fn scalar_or_list<T>(values: &[T], to_field: impl Fn(&T) -> FieldValue) -> FieldValue {
    if values.len() == 1 {
        to_field(&values[0])
    } else {
        FieldValue::List(values.iter().map(to_field).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_kv() -> TypedKv {
        let mut kv = TypedKv::new();
        kv.strings.insert("component".into(), vec!["auth".into()]);
        kv.strings.insert("env".into(), vec!["prod".into(), "staging".into()]);
        kv.integers.insert("affected".into(), vec![1500]);
        kv.floats.insert("error_rate".into(), vec![0.35, 0.5]);
        kv
    }

    #[test]
    fn round_trips_through_metadata() {
        let kv = sample_kv();
        let meta: Metadata = kv.to_metadata_fields().into_iter().collect();
        let back = TypedKv::from_metadata(&meta).unwrap();
        assert_eq!(back, kv);
    }

    #[test]
    fn single_element_lists_emit_bare_scalars() {
        let kv = sample_kv();
        let meta: Metadata = kv.to_metadata_fields().into_iter().collect();
        let strings = meta.get(STRINGS_KEY).unwrap().as_mapping().unwrap();
        assert!(matches!(strings.get("component"), Some(FieldValue::String(_))));
        assert!(matches!(strings.get("env"), Some(FieldValue::List(_))));
    }

    #[test]
    fn missing_namespaces_read_as_empty() {
        let kv = TypedKv::from_metadata(&Metadata::new()).unwrap();
        assert!(kv.is_empty());
    }

    #[test]
    fn textual_numerics_are_coerced() {
        let mut ns = Metadata::new();
        ns.set("count", FieldValue::List(vec![FieldValue::from("42")]));
        let mut meta = Metadata::new();
        meta.set(INTEGERS_KEY, FieldValue::Mapping(ns));

        let kv = TypedKv::from_metadata(&meta).unwrap();
        assert_eq!(kv.integers["count"], vec![42]);
    }

    #[test]
    fn malformed_numeric_names_the_field() {
        let mut ns = Metadata::new();
        ns.set("count", FieldValue::from("forty-two"));
        let mut meta = Metadata::new();
        meta.set(INTEGERS_KEY, FieldValue::Mapping(ns));

        let err = TypedKv::from_metadata(&meta).unwrap_err();
        assert!(err.to_string().contains("count"));
    }

    #[test]
    fn empty_kv_emits_no_fields() {
        assert!(TypedKv::new().to_metadata_fields().is_empty());
    }
}
