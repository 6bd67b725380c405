//! View command: show one record with its notes.

use color_eyre::eyre::Result;

use super::{record_to_json, report, Context};
use crate::ViewArgs;

pub fn run(ctx: &Context, args: &ViewArgs) -> Result<()> {
    let tracker = ctx.open_tracker()?;
    let record = tracker.get_record(&args.record_id).map_err(report)?;
    let notes = tracker.list_notes(&args.record_id).map_err(report)?;

    if args.format == "json" {
        let mut value = record_to_json(&record);
        value["notes"] = serde_json::Value::Array(
            notes
                .iter()
                .map(|n| {
                    serde_json::json!({
                        "id": n.id,
                        "author": { "handle": n.author.handle, "email": n.author.email },
                        "created_at": n.created_at.to_rfc3339(),
                        "body": n.body,
                    })
                })
                .collect(),
        );
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("ID:       {}", record.id);
    println!("Title:    {}", record.title);
    println!("Author:   {}", record.author);
    println!("Created:  {}", record.created_at.to_rfc3339());
    if record.modified_at != record.created_at {
        println!("Modified: {}", record.modified_at.to_rfc3339());
    }
    for (key, values) in &record.kv.strings {
        println!("{key}:  {}", values.join(", "));
    }
    for (key, values) in &record.kv.integers {
        let rendered: Vec<String> = values.iter().map(i64::to_string).collect();
        println!("{key}:  {}", rendered.join(", "));
    }
    for (key, values) in &record.kv.floats {
        let rendered: Vec<String> = values.iter().map(f64::to_string).collect();
        println!("{key}:  {}", rendered.join(", "));
    }
    if !record.body.trim().is_empty() {
        println!("\n{}", record.body.trim_end());
    }

    if !notes.is_empty() {
        println!("\nNotes ({}):", notes.len());
        for (i, note) in notes.iter().enumerate() {
            println!(
                "{}. [{}] {}",
                i + 1,
                note.created_at.to_rfc3339(),
                note.author.handle
            );
            for line in note.body.trim_end().lines() {
                println!("   {line}");
            }
        }
    }
    Ok(())
}
