//! Command implementations.

pub mod config;
pub mod create;
pub mod diagnose;
pub mod init;
pub mod io;
pub mod list;
pub mod note;
pub mod reindex;
pub mod update;
pub mod view;

use std::path::PathBuf;

use color_eyre::eyre::{eyre, Result};

use casefile_core::config::load_user_config;
use casefile_core::frontmatter::FieldValue;
use casefile_core::model::Record;
use casefile_core::tracker::TrackerError;
use casefile_core::{Identity, Tracker};

/// Directory name a store lives in when not given explicitly.
pub const STORE_DIR: &str = ".casefile";

/// Per-invocation context from the global flags.
pub struct Context {
    pub root: Option<PathBuf>,
    pub handle: Option<String>,
    pub email: Option<String>,
}

impl Context {
    /// Resolve the store root: the explicit `--root`, or the nearest
    /// `.casefile` directory at or above the working directory.
    pub fn store_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        let mut dir = std::env::current_dir()?;
        loop {
            let candidate = dir.join(STORE_DIR);
            if candidate.is_dir() {
                tracing::debug!("using store root {}", candidate.display());
                return Ok(candidate);
            }
            if !dir.pop() {
                return Err(eyre!(
                    "no store found; run `casefile init` or pass --root"
                ));
            }
        }
    }

    pub fn open_tracker(&self) -> Result<Tracker> {
        let root = self.store_root()?;
        Tracker::open(&root).map_err(report)
    }

    /// Resolve the author identity for this invocation: flag overrides
    /// merged over the configured default. Nothing is written back, so an
    /// override never outlives the invocation.
    pub fn identity(&self) -> Result<Identity> {
        let configured = load_user_config(None).ok().and_then(|c| c.user);
        let handle = self
            .handle
            .clone()
            .or_else(|| configured.as_ref().map(|u| u.handle.clone()));
        let email = self
            .email
            .clone()
            .or_else(|| configured.as_ref().map(|u| u.email.clone()));
        match (handle, email) {
            (Some(handle), Some(email)) => Ok(Identity::new(handle, email)),
            _ => Err(eyre!(
                "no author identity configured; run `casefile config set-user --handle <h> --email <e>` \
                 or pass --handle/--email"
            )),
        }
    }
}

/// Turn a core error into a report, appending a remediation hint where one
/// exists.
pub fn report(err: TrackerError) -> color_eyre::eyre::Report {
    let hint = match err.kind() {
        "consistency" => Some("hint: run `casefile reindex` to rebuild the index"),
        "busy" => Some("hint: the index is contended; retry, or run `casefile reindex`"),
        _ => None,
    };
    match hint {
        Some(hint) => eyre!("{err}\n{hint}"),
        None => eyre!("{err}"),
    }
}

/// Print a write outcome's index warning, if any. The write itself
/// succeeded — the file is authoritative.
pub fn warn_if_unindexed(warning: &Option<String>) {
    if let Some(warning) = warning {
        eprintln!("warning: {warning} (run `casefile reindex` to heal)");
    }
}

pub fn field_value_to_json(value: &FieldValue) -> serde_json::Value {
    match value {
        FieldValue::String(s) => serde_json::Value::String(s.clone()),
        FieldValue::Integer(n) => serde_json::Value::from(*n),
        FieldValue::Float(f) => serde_json::Value::from(*f),
        FieldValue::Bool(b) => serde_json::Value::Bool(*b),
        FieldValue::List(items) => {
            serde_json::Value::Array(items.iter().map(field_value_to_json).collect())
        }
        FieldValue::Mapping(m) => serde_json::Value::Object(
            m.iter()
                .map(|(k, v)| (k.to_string(), field_value_to_json(v)))
                .collect(),
        ),
    }
}

/// JSON projection of a record, shared by `view --format json` and io mode.
pub fn record_to_json(record: &Record) -> serde_json::Value {
    let extra: serde_json::Map<String, serde_json::Value> = record
        .extra
        .iter()
        .map(|(k, v)| (k.clone(), field_value_to_json(v)))
        .collect();
    serde_json::json!({
        "id": record.id,
        "title": record.title,
        "author": { "handle": record.author.handle, "email": record.author.email },
        "created_at": record.created_at.to_rfc3339(),
        "modified_at": record.modified_at.to_rfc3339(),
        "kv_strings": record.kv.strings,
        "kv_integers": record.kv.integers,
        "kv_floats": record.kv.floats,
        "extra": extra,
        "body": record.body,
    })
}
