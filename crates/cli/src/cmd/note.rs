//! Note commands: append-only notes under a record.

use std::io::{IsTerminal, Read};

use color_eyre::eyre::{eyre, Result};

use casefile_core::kv::{self, TypedKv};

use super::{report, warn_if_unindexed, Context};
use crate::NoteCommands;

pub fn run(ctx: &Context, command: &NoteCommands) -> Result<()> {
    match command {
        NoteCommands::Add {
            record_id,
            message,
            kv: kv_args,
        } => add(ctx, record_id, message.as_deref(), kv_args),
        NoteCommands::List { record_id } => list(ctx, record_id),
    }
}

fn add(
    ctx: &Context,
    record_id: &str,
    message: Option<&str>,
    kv_args: &[String],
) -> Result<()> {
    let tracker = ctx.open_tracker()?;
    let author = ctx.identity()?;

    let message = match message {
        Some(m) => m.to_string(),
        None => {
            // Piped input is the message; an interactive terminal gets an
            // error instead of hanging on a silent read.
            if std::io::stdin().is_terminal() {
                return Err(eyre!(
                    "no message given; pass --message or pipe the text on stdin"
                ));
            }
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    if message.trim().is_empty() {
        return Err(eyre!("note message is empty"));
    }

    let mut typed = TypedKv::new();
    let assigns = kv::parse_assign_list(kv_args).map_err(|e| report(e.into()))?;
    kv::apply_assigns(&mut typed, &assigns);

    let outcome = tracker
        .add_note(record_id, &message, typed, &author)
        .map_err(report)?;
    warn_if_unindexed(&outcome.index_warning);
    println!("Added {} to {record_id}", outcome.id);
    Ok(())
}

fn list(ctx: &Context, record_id: &str) -> Result<()> {
    let tracker = ctx.open_tracker()?;
    let notes = tracker.list_notes(record_id).map_err(report)?;

    if notes.is_empty() {
        println!("No notes on {record_id}");
        return Ok(());
    }
    for (i, note) in notes.iter().enumerate() {
        println!(
            "{}. {} [{}] {}",
            i + 1,
            note.id,
            note.created_at.to_rfc3339(),
            note.author.handle
        );
        for line in note.body.trim_end().lines() {
            println!("   {line}");
        }
    }
    Ok(())
}
