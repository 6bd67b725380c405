//! Typed key-value model shared by records and notes.
//!
//! The model round-trips losslessly through the frontmatter codec's mapping
//! form; [`expr`] holds the textual grammar the CLI exposes for it.

pub mod expr;
pub mod model;

pub use expr::{parse_assign, parse_assign_list, parse_filter, parse_sort};
pub use expr::{CmpOp, ExprError, KvAssign, KvFilter, KvScalar, KvSortKey};
pub use model::{KvError, TypedKv, FLOATS_KEY, INTEGERS_KEY, STRINGS_KEY};

/// Apply parsed assignment expressions to a KV set.
///
/// `Set` replaces every value under the key in all namespaces (a name holds
/// one type at a time); `RemoveKey`/`RemoveValue` mirror the removal forms.
pub fn apply_assigns(kv: &mut TypedKv, assigns: &[KvAssign]) {
    for assign in assigns {
        match assign {
            KvAssign::Set { key, value } => {
                kv.remove_key(key);
                match value {
                    KvScalar::Str(s) => {
                        kv.strings.insert(key.clone(), vec![s.clone()]);
                    }
                    KvScalar::Int(n) => {
                        kv.integers.insert(key.clone(), vec![*n]);
                    }
                    KvScalar::Float(f) => {
                        kv.floats.insert(key.clone(), vec![*f]);
                    }
                }
            }
            KvAssign::RemoveKey { key } => kv.remove_key(key),
            KvAssign::RemoveValue { key, value } => match value {
                KvScalar::Str(s) => {
                    if let Some(values) = kv.strings.get_mut(key) {
                        values.retain(|v| v != s);
                        if values.is_empty() {
                            kv.strings.remove(key);
                        }
                    }
                }
                KvScalar::Int(n) => {
                    if let Some(values) = kv.integers.get_mut(key) {
                        values.retain(|v| v != n);
                        if values.is_empty() {
                            kv.integers.remove(key);
                        }
                    }
                }
                KvScalar::Float(f) => {
                    if let Some(values) = kv.floats.get_mut(key) {
                        values.retain(|v| v != f);
                        if values.is_empty() {
                            kv.floats.remove(key);
                        }
                    }
                }
            },
        }
    }
}

/// Append values without replacing what a key already holds (multi-value
/// form). Duplicates are skipped.
pub fn apply_multi_assigns(kv: &mut TypedKv, assigns: &[KvAssign]) {
    for assign in assigns {
        match assign {
            KvAssign::Set { key, value } => match value {
                KvScalar::Str(s) => {
                    let values = kv.strings.entry(key.clone()).or_default();
                    if !values.contains(s) {
                        values.push(s.clone());
                    }
                }
                KvScalar::Int(n) => {
                    let values = kv.integers.entry(key.clone()).or_default();
                    if !values.contains(n) {
                        values.push(*n);
                    }
                }
                KvScalar::Float(f) => {
                    let values = kv.floats.entry(key.clone()).or_default();
                    if !values.contains(f) {
                        values.push(*f);
                    }
                }
            },
            removal => apply_assigns(kv, std::slice::from_ref(removal)),
        }
    }
}
