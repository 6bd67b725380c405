//! Textual KV expressions used by the CLI and scripting surfaces.
//!
//! Assignment: `key$text`, `key#42`, `key%1.5`; removal: `key-` (whole key)
//! or `key$text-` (one value). Filters: `key OP value` with `< > = <= >=`.
//! Sort specs: comma-delimited keys with an optional `+`/`-` suffix.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExprError {
    #[error(
        "invalid key-value expression '{0}': expected 'key$string', 'key#integer' or 'key%float' \
         (append '-' to remove)"
    )]
    InvalidAssign(String),

    #[error("key cannot be empty in '{0}'")]
    EmptyKey(String),

    #[error("value cannot be empty for key '{0}'")]
    EmptyValue(String),

    #[error("invalid {expected} value '{value}' for key '{key}'")]
    InvalidNumber {
        key: String,
        expected: &'static str,
        value: String,
    },

    #[error("invalid filter '{0}': expected 'key OP value' with one of < > = <= >=")]
    InvalidFilter(String),

    #[error("invalid sort spec '{0}'")]
    InvalidSort(String),
}

/// A typed scalar carried by an assignment or removal.
#[derive(Debug, Clone, PartialEq)]
pub enum KvScalar {
    Str(String),
    Int(i64),
    Float(f64),
}

/// One parsed assignment expression.
#[derive(Debug, Clone, PartialEq)]
pub enum KvAssign {
    /// `key$v` / `key#1` / `key%1.5`
    Set { key: String, value: KvScalar },
    /// `key-`
    RemoveKey { key: String },
    /// `key$v-` / `key#1-` / `key%1.5-`
    RemoveValue { key: String, value: KvScalar },
}

/// Comparison operator for KV filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Gt,
    Eq,
    Le,
    Ge,
}

impl CmpOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Eq => "=",
            Self::Le => "<=",
            Self::Ge => ">=",
        }
    }
}

/// One parsed filter expression (`cost > 12.49`).
#[derive(Debug, Clone, PartialEq)]
pub struct KvFilter {
    pub key: String,
    pub op: CmpOp,
    pub value: String,
}

/// One parsed sort key (`priority-` sorts descending).
#[derive(Debug, Clone, PartialEq)]
pub struct KvSortKey {
    pub key: String,
    pub ascending: bool,
}

const TYPE_MARKERS: [char; 3] = ['$', '#', '%'];

/// Parse a single assignment/removal expression.
pub fn parse_assign(input: &str) -> Result<KvAssign, ExprError> {
    let trimmed = input.trim();
    let (expr, is_removal) = match trimmed.strip_suffix('-') {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };

    let marker_pos = expr
        .char_indices()
        .find(|(_, c)| TYPE_MARKERS.contains(c))
        .map(|(i, c)| (i, c));

    let Some((idx, marker)) = marker_pos else {
        if is_removal {
            if expr.is_empty() {
                return Err(ExprError::EmptyKey(input.to_string()));
            }
            return Ok(KvAssign::RemoveKey { key: expr.to_string() });
        }
        return Err(ExprError::InvalidAssign(input.to_string()));
    };

    let key = &expr[..idx];
    let value_str = &expr[idx + marker.len_utf8()..];

    if key.is_empty() {
        return Err(ExprError::EmptyKey(input.to_string()));
    }
    if value_str.is_empty() {
        return Err(ExprError::EmptyValue(key.to_string()));
    }

    let value = match marker {
        '$' => KvScalar::Str(value_str.to_string()),
        '#' => KvScalar::Int(value_str.parse().map_err(|_| ExprError::InvalidNumber {
            key: key.to_string(),
            expected: "integer",
            value: value_str.to_string(),
        })?),
        '%' => KvScalar::Float(value_str.parse().map_err(|_| ExprError::InvalidNumber {
            key: key.to_string(),
            expected: "float",
            value: value_str.to_string(),
        })?),
        _ => unreachable!("marker comes from TYPE_MARKERS"),
    };

    if is_removal {
        Ok(KvAssign::RemoveValue { key: key.to_string(), value })
    } else {
        Ok(KvAssign::Set { key: key.to_string(), value })
    }
}

/// Parse a list of assignment expressions, failing on the first bad one.
pub fn parse_assign_list(inputs: &[String]) -> Result<Vec<KvAssign>, ExprError> {
    inputs.iter().map(|s| parse_assign(s)).collect()
}

/// Parse a filter expression. Two-character operators win over their
/// one-character prefixes.
pub fn parse_filter(input: &str) -> Result<KvFilter, ExprError> {
    let trimmed = input.trim();
    for (text, op) in [
        ("<=", CmpOp::Le),
        (">=", CmpOp::Ge),
        ("<", CmpOp::Lt),
        (">", CmpOp::Gt),
        ("=", CmpOp::Eq),
    ] {
        if let Some(pos) = trimmed.find(text) {
            let key = trimmed[..pos].trim();
            let value = trimmed[pos + text.len()..].trim();
            if key.is_empty() || value.is_empty() {
                return Err(ExprError::InvalidFilter(input.to_string()));
            }
            return Ok(KvFilter {
                key: key.to_string(),
                op,
                value: value.to_string(),
            });
        }
    }
    Err(ExprError::InvalidFilter(input.to_string()))
}

/// Parse a comma-delimited sort spec. Empty input yields no keys.
pub fn parse_sort(input: &str) -> Result<Vec<KvSortKey>, ExprError> {
    let mut keys = Vec::new();
    for spec in input.split(',') {
        let spec = spec.trim();
        if spec.is_empty() {
            continue;
        }
        let (key, ascending) = match spec.strip_suffix('-') {
            Some(k) => (k, false),
            None => (spec.strip_suffix('+').unwrap_or(spec), true),
        };
        if key.is_empty() {
            return Err(ExprError::InvalidSort(input.to_string()));
        }
        keys.push(KvSortKey {
            key: key.to_string(),
            ascending,
        });
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_forms() {
        assert_eq!(
            parse_assign("component$auth").unwrap(),
            KvAssign::Set {
                key: "component".into(),
                value: KvScalar::Str("auth".into())
            }
        );
        assert_eq!(
            parse_assign("count#42").unwrap(),
            KvAssign::Set {
                key: "count".into(),
                value: KvScalar::Int(42)
            }
        );
        assert_eq!(
            parse_assign("rate%0.5").unwrap(),
            KvAssign::Set {
                key: "rate".into(),
                value: KvScalar::Float(0.5)
            }
        );
    }

    #[test]
    fn removal_forms() {
        assert_eq!(
            parse_assign("component-").unwrap(),
            KvAssign::RemoveKey {
                key: "component".into()
            }
        );
        assert_eq!(
            parse_assign("env$prod-").unwrap(),
            KvAssign::RemoveValue {
                key: "env".into(),
                value: KvScalar::Str("prod".into())
            }
        );
    }

    #[test]
    fn bad_assigns_are_rejected() {
        assert!(parse_assign("no-marker-here").is_err());
        assert!(parse_assign("$value").is_err());
        assert!(parse_assign("key$").is_err());
        assert!(parse_assign("count#twelve").is_err());
        assert!(parse_assign("rate%high").is_err());
    }

    #[test]
    fn filter_operators() {
        let f = parse_filter("cost > 12.49").unwrap();
        assert_eq!(f.key, "cost");
        assert_eq!(f.op, CmpOp::Gt);
        assert_eq!(f.value, "12.49");

        let f = parse_filter("count<=100").unwrap();
        assert_eq!(f.op, CmpOp::Le);

        let f = parse_filter("priority=high").unwrap();
        assert_eq!(f.op, CmpOp::Eq);

        assert!(parse_filter("nothing here").is_err());
        assert!(parse_filter("=value").is_err());
    }

    #[test]
    fn sort_specs() {
        let keys = parse_sort("cost,priority-,name+").unwrap();
        assert_eq!(keys.len(), 3);
        assert!(keys[0].ascending);
        assert!(!keys[1].ascending);
        assert!(keys[2].ascending);
        assert!(parse_sort("").unwrap().is_empty());
        assert!(parse_sort("-").is_err());
    }
}
