//! Reindex command: full rebuild of the index from files.

use color_eyre::eyre::Result;

use super::{report, Context};

pub fn run(ctx: &Context) -> Result<()> {
    let tracker = ctx.open_tracker()?;
    let stats = tracker.rebuild_index(None).map_err(report)?;

    println!(
        "Reindexed {} records and {} notes",
        stats.records_indexed, stats.notes_indexed
    );
    if !stats.skipped.is_empty() {
        println!("Skipped {} unparseable documents:", stats.skipped.len());
        for id in &stats.skipped {
            println!("  {id}");
        }
    }
    Ok(())
}
