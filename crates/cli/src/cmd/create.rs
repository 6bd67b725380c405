//! Create command.

use std::io::Read;

use color_eyre::eyre::Result;

use casefile_core::kv::{self, TypedKv};
use casefile_core::RecordDraft;

use super::{report, warn_if_unindexed, Context};
use crate::CreateArgs;

pub fn run(ctx: &Context, args: &CreateArgs) -> Result<()> {
    let tracker = ctx.open_tracker()?;
    let author = ctx.identity()?;

    let body = match &args.body {
        Some(body) => body.clone(),
        None => read_piped_stdin(),
    };

    let mut typed = TypedKv::new();
    let single = kv::parse_assign_list(&args.kv).map_err(|e| report(e.into()))?;
    let multi = kv::parse_assign_list(&args.kmv).map_err(|e| report(e.into()))?;
    kv::apply_assigns(&mut typed, &single);
    kv::apply_multi_assigns(&mut typed, &multi);

    let outcome = tracker
        .create_record(
            RecordDraft {
                title: args.title.clone(),
                body,
                kv: typed,
                extra: vec![],
            },
            &author,
        )
        .map_err(report)?;

    warn_if_unindexed(&outcome.index_warning);
    println!("Created {}", outcome.id);
    Ok(())
}

/// Body text from stdin when it is piped; empty otherwise.
fn read_piped_stdin() -> String {
    use std::io::IsTerminal;
    if std::io::stdin().is_terminal() {
        return String::new();
    }
    let mut buf = String::new();
    if std::io::stdin().read_to_string(&mut buf).is_err() {
        return String::new();
    }
    buf
}
