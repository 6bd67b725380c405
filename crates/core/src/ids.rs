//! Identifier generation for records and notes.
//!
//! Identifiers are a fixed kind prefix plus a fixed-width uppercase base-36
//! suffix: random ids pack ~41 bits of OS entropy into 8 characters,
//! sequential ids are 5-digit decimal counters scanned from what already
//! exists. The generator only proposes; the file store's atomic create is
//! the final arbiter, and callers retry with a fresh proposal on collision.

use thiserror::Error;
use uuid::Uuid;

/// How many fresh proposals a caller should burn through before giving up.
pub const MAX_ALLOC_ATTEMPTS: usize = 8;

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const RANDOM_SUFFIX_WIDTH: usize = 8;
const SEQUENTIAL_SUFFIX_WIDTH: usize = 5;

#[derive(Debug, Error)]
pub enum IdError {
    #[error("could not allocate a free {kind} identifier after {attempts} attempts")]
    Allocation { kind: &'static str, attempts: usize },

    #[error("'{0}' is not a valid identifier")]
    Invalid(String),
}

/// Document kind an identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Record,
    Note,
}

impl IdKind {
    /// Prefix including the separator, e.g. `REC-`.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Record => "REC-",
            Self::Note => "NT-",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::Note => "note",
        }
    }

    /// Infer the kind from an identifier's prefix.
    pub fn of(id: &str) -> Option<Self> {
        if id.starts_with(Self::Record.prefix()) {
            Some(Self::Record)
        } else if id.starts_with(Self::Note.prefix()) {
            Some(Self::Note)
        } else {
            None
        }
    }
}

/// Allocation scheme, fixed per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdScheme {
    /// Collision-resistant random suffix; needs no knowledge of siblings.
    #[default]
    Random,
    /// Human-readable counter derived by scanning existing identifiers.
    Sequential,
}

/// Propose a new identifier.
///
/// `existing` is only consulted by the sequential scheme; pass the current
/// listing for the kind. The proposal is not reserved anywhere — finalize
/// it with an atomic create and call again on collision.
pub fn new_id(kind: IdKind, scheme: IdScheme, existing: &[String]) -> String {
    let suffix = match scheme {
        IdScheme::Random => random_suffix(),
        IdScheme::Sequential => sequential_suffix(kind, existing),
    };
    format!("{}{}", kind.prefix(), suffix)
}

/// Check the text form: prefix plus 5..=8 uppercase base-36 characters.
pub fn is_valid(kind: IdKind, id: &str) -> bool {
    let Some(suffix) = id.strip_prefix(kind.prefix()) else {
        return false;
    };
    (SEQUENTIAL_SUFFIX_WIDTH..=RANDOM_SUFFIX_WIDTH).contains(&suffix.len())
        && suffix.bytes().all(|b| BASE36.contains(&b))
}

/// Encode a non-negative integer as uppercase base-36.
pub fn to_base36(mut n: u128) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

fn random_suffix() -> String {
    // 36^8 ≈ 2^41.3; the uuid's 122 random bits are far more than enough.
    let entropy = Uuid::new_v4().as_u128() % 36u128.pow(RANDOM_SUFFIX_WIDTH as u32);
    let encoded = to_base36(entropy);
    format!("{:0>width$}", encoded, width = RANDOM_SUFFIX_WIDTH)
}

fn sequential_suffix(kind: IdKind, existing: &[String]) -> String {
    let next = existing
        .iter()
        .filter_map(|id| id.strip_prefix(kind.prefix()))
        .filter_map(|suffix| suffix.parse::<u64>().ok())
        .max()
        .map_or(1, |max| max + 1);
    format!("{:0>width$}", next, width = SEQUENTIAL_SUFFIX_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn random_ids_have_fixed_width_and_prefix() {
        let id = new_id(IdKind::Record, IdScheme::Random, &[]);
        assert!(id.starts_with("REC-"));
        assert_eq!(id.len(), "REC-".len() + 8);
        assert!(is_valid(IdKind::Record, &id));
    }

    #[test]
    fn random_ids_do_not_repeat() {
        let ids: HashSet<_> = (0..1000)
            .map(|_| new_id(IdKind::Note, IdScheme::Random, &[]))
            .collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn sequential_starts_at_one() {
        assert_eq!(new_id(IdKind::Record, IdScheme::Sequential, &[]), "REC-00001");
    }

    #[test]
    fn sequential_scans_for_next_free() {
        let existing = vec![
            "REC-00001".to_string(),
            "REC-00007".to_string(),
            "REC-00003".to_string(),
        ];
        assert_eq!(
            new_id(IdKind::Record, IdScheme::Sequential, &existing),
            "REC-00008"
        );
    }

    #[test]
    fn sequential_ignores_foreign_and_random_ids() {
        let existing = vec!["NT-00004".to_string(), "REC-A1B2C3D4".to_string()];
        assert_eq!(
            new_id(IdKind::Record, IdScheme::Sequential, &existing),
            "REC-00001"
        );
    }

    #[test]
    fn validation_rejects_bad_forms() {
        assert!(is_valid(IdKind::Record, "REC-00001"));
        assert!(is_valid(IdKind::Note, "NT-A1B2C3D4"));
        assert!(!is_valid(IdKind::Record, "NT-00001"));
        assert!(!is_valid(IdKind::Record, "REC-"));
        assert!(!is_valid(IdKind::Record, "REC-abc"));
        assert!(!is_valid(IdKind::Record, "REC-123456789"));
    }

    #[test]
    fn kind_inference() {
        assert_eq!(IdKind::of("REC-00001"), Some(IdKind::Record));
        assert_eq!(IdKind::of("NT-A1B2C3D4"), Some(IdKind::Note));
        assert_eq!(IdKind::of("X-1"), None);
    }

    #[test]
    fn base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
    }
}
