//! Record listing and search over the index.

use std::cmp::Ordering;
use std::collections::HashMap;

use rusqlite::types::Value as SqlValue;

use super::db::{row_to_record, IndexDb, IndexError};
use super::types::RecordRow;
use crate::kv::{CmpOp, KvFilter, KvSortKey};

/// Query parameters for record listing.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    /// Case-insensitive substring matched against title, body and KV
    /// string values.
    pub text: Option<String>,
    /// KV filters, combined with AND.
    pub filters: Vec<KvFilter>,
    /// KV sort keys, applied before the limit.
    pub sort: Vec<KvSortKey>,
    /// Maximum rows returned.
    pub limit: Option<usize>,
}

/// Execute a query.
///
/// Base ordering is most-recently-modified first with ties broken by id
/// ascending; KV sort keys re-sort stably on top of that, so rows equal
/// under every sort key keep the base ordering.
pub fn search_records(db: &IndexDb, query: &RecordQuery) -> Result<Vec<RecordRow>, IndexError> {
    let mut sql = String::from(
        "SELECT id, title, author_handle, author_email, created_at, modified_at, body, extra_json
         FROM records WHERE 1=1",
    );
    let mut params: Vec<SqlValue> = Vec::new();

    if let Some(text) = query.text.as_deref().filter(|t| !t.is_empty()) {
        sql.push_str(
            " AND (instr(lower(title), ?) > 0
               OR instr(lower(body), ?) > 0
               OR id IN (SELECT owner_id FROM kv_strings WHERE instr(lower(value), ?) > 0))",
        );
        let needle = text.to_lowercase();
        params.push(SqlValue::from(needle.clone()));
        params.push(SqlValue::from(needle.clone()));
        params.push(SqlValue::from(needle));
    }

    for filter in &query.filters {
        push_filter(&mut sql, &mut params, filter);
    }

    sql.push_str(" ORDER BY modified_at DESC, id ASC");

    let param_refs: Vec<&dyn rusqlite::ToSql> =
        params.iter().map(|p| p as &dyn rusqlite::ToSql).collect();

    let mut stmt = db.connection().prepare(&sql)?;
    let mut rows = stmt
        .query_map(param_refs.as_slice(), row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;

    if !query.sort.is_empty() {
        sort_by_kv(db, &mut rows, &query.sort)?;
    }

    if let Some(limit) = query.limit {
        rows.truncate(limit);
    }

    Ok(rows)
}

fn push_filter(sql: &mut String, params: &mut Vec<SqlValue>, filter: &KvFilter) {
    let op = filter.op.as_sql();

    if let Ok(num) = filter.value.parse::<f64>() {
        // Numeric comparisons consult both numeric namespaces; SQLite
        // compares INTEGER columns to REAL parameters numerically.
        sql.push_str(&format!(
            " AND id IN (SELECT owner_id FROM kv_integers WHERE key = ? AND value {op} ?
                 UNION SELECT owner_id FROM kv_floats WHERE key = ? AND value {op} ?"
        ));
        params.push(SqlValue::from(filter.key.clone()));
        params.push(SqlValue::from(num));
        params.push(SqlValue::from(filter.key.clone()));
        params.push(SqlValue::from(num));
        if filter.op == CmpOp::Eq {
            // `count=100` should also hit a string value "100".
            sql.push_str(
                " UNION SELECT owner_id FROM kv_strings WHERE key = ? AND value = ?",
            );
            params.push(SqlValue::from(filter.key.clone()));
            params.push(SqlValue::from(filter.value.clone()));
        }
        sql.push(')');
    } else {
        sql.push_str(&format!(
            " AND id IN (SELECT owner_id FROM kv_strings WHERE key = ? AND value {op} ?)"
        ));
        params.push(SqlValue::from(filter.key.clone()));
        params.push(SqlValue::from(filter.value.clone()));
    }
}

/// Sort value for one (record, key) pair. Numeric values order before
/// text, missing keys order last regardless of direction.
#[derive(Debug, Clone, PartialEq)]
enum SortValue {
    Num(f64),
    Text(String),
}

fn sort_by_kv(
    db: &IndexDb,
    rows: &mut [RecordRow],
    sort: &[KvSortKey],
) -> Result<(), IndexError> {
    let mut values: HashMap<(String, String), SortValue> = HashMap::new();
    for row in rows.iter() {
        for key in sort {
            if let Some(v) = first_kv_value(db, &row.id, &key.key)? {
                values.insert((row.id.clone(), key.key.clone()), v);
            }
        }
    }

    rows.sort_by(|a, b| {
        for key in sort {
            let va = values.get(&(a.id.clone(), key.key.clone()));
            let vb = values.get(&(b.id.clone(), key.key.clone()));
            let ord = compare_sort_values(va, vb, key.ascending);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    Ok(())
}

fn compare_sort_values(
    a: Option<&SortValue>,
    b: Option<&SortValue>,
    ascending: bool,
) -> Ordering {
    let ord = match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(SortValue::Num(x)), Some(SortValue::Num(y))) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (Some(SortValue::Num(_)), Some(SortValue::Text(_))) => Ordering::Less,
        (Some(SortValue::Text(_)), Some(SortValue::Num(_))) => Ordering::Greater,
        (Some(SortValue::Text(x)), Some(SortValue::Text(y))) => x.cmp(y),
    };
    if ascending {
        ord
    } else {
        ord.reverse()
    }
}

/// First value under a key, checking the numeric namespaces first the way
/// the sort comparator expects.
fn first_kv_value(
    db: &IndexDb,
    owner_id: &str,
    key: &str,
) -> Result<Option<SortValue>, IndexError> {
    use rusqlite::OptionalExtension;

    let conn = db.connection();
    let int: Option<i64> = conn
        .query_row(
            "SELECT value FROM kv_integers WHERE owner_id = ?1 AND key = ?2 ORDER BY value LIMIT 1",
            [owner_id, key],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(n) = int {
        return Ok(Some(SortValue::Num(n as f64)));
    }

    let float: Option<f64> = conn
        .query_row(
            "SELECT value FROM kv_floats WHERE owner_id = ?1 AND key = ?2 ORDER BY value LIMIT 1",
            [owner_id, key],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(f) = float {
        return Ok(Some(SortValue::Num(f)));
    }

    let text: Option<String> = conn
        .query_row(
            "SELECT value FROM kv_strings WHERE owner_id = ?1 AND key = ?2 ORDER BY value LIMIT 1",
            [owner_id, key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(text.map(SortValue::Text))
}
