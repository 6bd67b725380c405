//! Scripting mode: line-delimited JSON requests on stdin.
//!
//! One request per line, one response per line, served strictly in arrival
//! order. A request may carry an `id` object (handle + email) that
//! attributes that single request; the next request falls back to the
//! configured default.

use std::io::{BufRead, Write};

use serde::Deserialize;
use serde_json::{json, Value};

use casefile_core::config::StoreConfig;
use casefile_core::frontmatter::HeaderFormat;
use casefile_core::ids::IdScheme;
use casefile_core::index::RecordQuery;
use casefile_core::kv::{self, TypedKv};
use casefile_core::{Identity, RecordDraft, Tracker, TrackerError};

use super::{record_to_json, Context, STORE_DIR};

#[derive(Debug, Deserialize)]
struct Request {
    command: String,
    #[serde(default)]
    params: Value,
    /// Per-request identity override.
    id: Option<Identity>,
}

struct Failure {
    kind: &'static str,
    message: String,
}

impl From<TrackerError> for Failure {
    fn from(e: TrackerError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

fn invalid(message: impl Into<String>) -> Failure {
    Failure {
        kind: "invalid_request",
        message: message.into(),
    }
}

pub fn run(ctx: &Context) -> color_eyre::Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => match dispatch(ctx, &request) {
                Ok(result) => json!({ "success": true, "result": result }),
                Err(failure) => json!({
                    "success": false,
                    "error": { "kind": failure.kind, "message": failure.message },
                }),
            },
            Err(e) => json!({
                "success": false,
                "error": { "kind": "invalid_request", "message": e.to_string() },
            }),
        };

        let mut out = stdout.lock();
        serde_json::to_writer(&mut out, &response)?;
        out.write_all(b"\n")?;
        out.flush()?;
    }
    Ok(())
}

fn dispatch(ctx: &Context, request: &Request) -> Result<Value, Failure> {
    match request.command.as_str() {
        "init" => init(ctx, &request.params),
        "create" => create(ctx, request),
        "view" => view(ctx, &request.params),
        "list" => list(ctx, &request.params),
        "update" => update(ctx, &request.params),
        "add-note" => add_note(ctx, request),
        "list-notes" => list_notes(ctx, &request.params),
        "reindex" => reindex(ctx),
        "diagnose" => diagnose(ctx),
        other => Err(invalid(format!("unknown command '{other}'"))),
    }
}

/// The request's identity override, or the configured default.
fn request_identity(ctx: &Context, request: &Request) -> Result<Identity, Failure> {
    if let Some(identity) = &request.id {
        return Ok(identity.clone());
    }
    ctx.identity().map_err(|e| Failure {
        kind: "config",
        message: e.to_string(),
    })
}

fn open_tracker(ctx: &Context) -> Result<Tracker, Failure> {
    let root = ctx.store_root().map_err(|e| Failure {
        kind: "not_found",
        message: e.to_string(),
    })?;
    Tracker::open(&root).map_err(Into::into)
}

fn params<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, Failure> {
    serde_json::from_value(value.clone()).map_err(|e| invalid(format!("bad params: {e}")))
}

#[derive(Debug, Deserialize)]
struct InitParams {
    format: Option<String>,
    id_scheme: Option<String>,
}

fn init(ctx: &Context, raw: &Value) -> Result<Value, Failure> {
    let p: InitParams = params(raw)?;
    let root = match &ctx.root {
        Some(root) => root.clone(),
        None => std::env::current_dir()
            .map_err(|e| invalid(e.to_string()))?
            .join(STORE_DIR),
    };
    let format = match p.format.as_deref() {
        None => HeaderFormat::default(),
        Some(name) => HeaderFormat::parse(name)
            .ok_or_else(|| invalid(format!("unknown format '{name}'")))?,
    };
    let id_scheme = match p.id_scheme.as_deref() {
        None | Some("random") => IdScheme::Random,
        Some("sequential") => IdScheme::Sequential,
        Some(other) => return Err(invalid(format!("unknown id scheme '{other}'"))),
    };
    let tracker = Tracker::init(&root, StoreConfig::new(format, id_scheme))?;
    Ok(json!({ "root": tracker.root().display().to_string() }))
}

#[derive(Debug, Deserialize)]
struct CreateParams {
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    kv: Vec<String>,
    #[serde(default)]
    kmv: Vec<String>,
}

fn create(ctx: &Context, request: &Request) -> Result<Value, Failure> {
    let p: CreateParams = params(&request.params)?;
    let tracker = open_tracker(ctx)?;
    let author = request_identity(ctx, request)?;

    let mut typed = TypedKv::new();
    let single = kv::parse_assign_list(&p.kv).map_err(TrackerError::from)?;
    let multi = kv::parse_assign_list(&p.kmv).map_err(TrackerError::from)?;
    kv::apply_assigns(&mut typed, &single);
    kv::apply_multi_assigns(&mut typed, &multi);

    let outcome = tracker.create_record(
        RecordDraft {
            title: p.title,
            body: p.body,
            kv: typed,
            extra: vec![],
        },
        &author,
    )?;
    Ok(json!({
        "id": outcome.id,
        "indexed": outcome.index_warning.is_none(),
        "warning": outcome.index_warning,
    }))
}

#[derive(Debug, Deserialize)]
struct ViewParams {
    id: String,
}

fn view(ctx: &Context, raw: &Value) -> Result<Value, Failure> {
    let p: ViewParams = params(raw)?;
    let tracker = open_tracker(ctx)?;
    let record = tracker.get_record(&p.id)?;
    let notes = tracker.list_notes(&p.id)?;

    let mut value = record_to_json(&record);
    value["notes"] = Value::Array(
        notes
            .iter()
            .map(|n| {
                json!({
                    "id": n.id,
                    "author": { "handle": n.author.handle, "email": n.author.email },
                    "created_at": n.created_at.to_rfc3339(),
                    "body": n.body,
                })
            })
            .collect(),
    );
    Ok(value)
}

#[derive(Debug, Deserialize)]
struct ListParams {
    search: Option<String>,
    #[serde(default)]
    ksearch: Vec<String>,
    ksort: Option<String>,
    limit: Option<usize>,
}

fn list(ctx: &Context, raw: &Value) -> Result<Value, Failure> {
    let p: ListParams = params(raw)?;
    let tracker = open_tracker(ctx)?;

    let mut filters = Vec::new();
    for expr in &p.ksearch {
        filters.push(kv::parse_filter(expr).map_err(TrackerError::from)?);
    }
    let sort = match &p.ksort {
        Some(spec) => kv::parse_sort(spec).map_err(TrackerError::from)?,
        None => Vec::new(),
    };

    let rows = tracker.list_records(&RecordQuery {
        text: p.search,
        filters,
        sort,
        limit: p.limit,
    })?;

    let items: Vec<Value> = rows
        .iter()
        .map(|row| {
            json!({
                "id": row.id,
                "title": row.title,
                "author": { "handle": row.author.handle, "email": row.author.email },
                "created_at": row.created_at.to_rfc3339(),
                "modified_at": row.modified_at.to_rfc3339(),
            })
        })
        .collect();
    Ok(Value::Array(items))
}

#[derive(Debug, Deserialize)]
struct UpdateParams {
    id: String,
    title: Option<String>,
    #[serde(default)]
    kv: Vec<String>,
    #[serde(default)]
    kmv: Vec<String>,
}

fn update(ctx: &Context, raw: &Value) -> Result<Value, Failure> {
    let p: UpdateParams = params(raw)?;
    let tracker = open_tracker(ctx)?;

    let patch = casefile_core::RecordPatch {
        title: p.title,
        extra: vec![],
        kv_set: kv::parse_assign_list(&p.kv).map_err(TrackerError::from)?,
        kv_add: kv::parse_assign_list(&p.kmv).map_err(TrackerError::from)?,
    };
    let outcome = tracker.update_record(&p.id, &patch)?;
    Ok(json!({
        "id": outcome.id,
        "indexed": outcome.index_warning.is_none(),
        "warning": outcome.index_warning,
    }))
}

#[derive(Debug, Deserialize)]
struct NoteParams {
    record_id: String,
    message: String,
    #[serde(default)]
    kv: Vec<String>,
}

fn add_note(ctx: &Context, request: &Request) -> Result<Value, Failure> {
    let p: NoteParams = params(&request.params)?;
    let tracker = open_tracker(ctx)?;
    let author = request_identity(ctx, request)?;

    let mut typed = TypedKv::new();
    let assigns = kv::parse_assign_list(&p.kv).map_err(TrackerError::from)?;
    kv::apply_assigns(&mut typed, &assigns);

    let outcome = tracker.add_note(&p.record_id, &p.message, typed, &author)?;
    Ok(json!({
        "id": outcome.id,
        "indexed": outcome.index_warning.is_none(),
        "warning": outcome.index_warning,
    }))
}

#[derive(Debug, Deserialize)]
struct ListNotesParams {
    record_id: String,
}

fn list_notes(ctx: &Context, raw: &Value) -> Result<Value, Failure> {
    let p: ListNotesParams = params(raw)?;
    let tracker = open_tracker(ctx)?;
    let notes = tracker.list_notes(&p.record_id)?;

    let items: Vec<Value> = notes
        .iter()
        .map(|n| {
            json!({
                "id": n.id,
                "author": { "handle": n.author.handle, "email": n.author.email },
                "created_at": n.created_at.to_rfc3339(),
                "body": n.body,
            })
        })
        .collect();
    Ok(Value::Array(items))
}

fn reindex(ctx: &Context) -> Result<Value, Failure> {
    let tracker = open_tracker(ctx)?;
    let stats = tracker.rebuild_index(None)?;
    Ok(json!({
        "records_indexed": stats.records_indexed,
        "notes_indexed": stats.notes_indexed,
        "skipped": stats.skipped,
    }))
}

fn diagnose(ctx: &Context) -> Result<Value, Failure> {
    let tracker = open_tracker(ctx)?;
    let report = tracker.diagnose()?;
    Ok(json!({
        "clean": report.is_clean(),
        "orphaned_records": report.orphaned_records,
        "orphaned_notes": report.orphaned_notes,
        "unindexed_records": report.unindexed_records,
        "unindexed_notes": report.unindexed_notes,
    }))
}
