//! Diagnose command: report drift without repairing it.

use color_eyre::eyre::{eyre, Result};

use super::{report, Context};
use crate::DiagnoseArgs;

pub fn run(ctx: &Context, args: &DiagnoseArgs) -> Result<()> {
    let tracker = ctx.open_tracker()?;
    let r = tracker.diagnose().map_err(report)?;

    if r.is_clean() {
        println!("Store and index are consistent");
        return Ok(());
    }

    println!("Drift detected ({} entries):", r.drift_count());
    print_section("orphaned index rows (file gone)", &r.orphaned_records);
    print_section("orphaned note rows (file gone)", &r.orphaned_notes);
    print_section("files missing from index", &r.unindexed_records);
    print_section("notes missing from index", &r.unindexed_notes);
    println!("hint: run `casefile reindex` to rebuild the index");

    if args.strict {
        return Err(eyre!("store and index have drifted apart"));
    }
    Ok(())
}

fn print_section(label: &str, ids: &[String]) {
    if ids.is_empty() {
        return;
    }
    println!("  {label}:");
    for id in ids {
        println!("    {id}");
    }
}
