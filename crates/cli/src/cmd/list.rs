//! List command: filtered, searchable record listing.

use color_eyre::eyre::Result;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use casefile_core::index::RecordQuery;
use casefile_core::kv;

use super::{report, Context};
use crate::ListArgs;

#[derive(Tabled)]
struct RecordLine {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Modified")]
    modified: String,
}

pub fn run(ctx: &Context, args: &ListArgs) -> Result<()> {
    let tracker = ctx.open_tracker()?;

    let mut filters = Vec::new();
    for expr in &args.ksearch {
        filters.push(kv::parse_filter(expr).map_err(|e| report(e.into()))?);
    }
    let sort = match &args.ksort {
        Some(spec) => kv::parse_sort(spec).map_err(|e| report(e.into()))?,
        None => Vec::new(),
    };

    let query = RecordQuery {
        text: args.search.clone(),
        filters,
        sort,
        limit: Some(args.limit),
    };
    let rows = tracker.list_records(&query).map_err(report)?;

    if rows.is_empty() {
        println!("No records found");
        return Ok(());
    }

    let lines: Vec<RecordLine> = rows
        .iter()
        .map(|row| RecordLine {
            id: row.id.clone(),
            title: truncate(&row.title, 48),
            author: row.author.handle.clone(),
            modified: row.modified_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();

    println!("{}", Table::new(lines).with(Style::psql()));
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
