//! Update command: patch a record's metadata in place.

use color_eyre::eyre::Result;

use casefile_core::kv;
use casefile_core::RecordPatch;

use super::{report, warn_if_unindexed, Context};
use crate::UpdateArgs;

pub fn run(ctx: &Context, args: &UpdateArgs) -> Result<()> {
    let tracker = ctx.open_tracker()?;

    let patch = RecordPatch {
        title: args.title.clone(),
        extra: vec![],
        kv_set: kv::parse_assign_list(&args.kv).map_err(|e| report(e.into()))?,
        kv_add: kv::parse_assign_list(&args.kmv).map_err(|e| report(e.into()))?,
    };

    let outcome = tracker.update_record(&args.record_id, &patch).map_err(report)?;
    warn_if_unindexed(&outcome.index_warning);
    println!("Updated {}", outcome.id);
    Ok(())
}
