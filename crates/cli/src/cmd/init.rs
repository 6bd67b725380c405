//! Init command: lay out a fresh store.

use color_eyre::eyre::Result;

use casefile_core::config::StoreConfig;
use casefile_core::frontmatter::HeaderFormat;
use casefile_core::ids::IdScheme;
use casefile_core::Tracker;

use super::{report, Context, STORE_DIR};
use crate::InitArgs;

pub fn run(ctx: &Context, args: &InitArgs) -> Result<()> {
    let root = match &ctx.root {
        Some(root) => root.clone(),
        None => std::env::current_dir()?.join(STORE_DIR),
    };

    // The flag values are pre-validated by clap's value_parser.
    let format = HeaderFormat::parse(&args.format).unwrap_or_default();
    let id_scheme = match args.id_scheme.as_str() {
        "sequential" => IdScheme::Sequential,
        _ => IdScheme::Random,
    };

    let tracker = Tracker::init(&root, StoreConfig::new(format, id_scheme)).map_err(report)?;

    println!("Initialized store at {}", tracker.root().display());
    println!("  records: {}", tracker.store().records_dir().display());
    println!("  index:   {}", tracker.store().index_path().display());
    println!("  format:  {} / {} ids", format.as_str(), args.id_scheme);
    Ok(())
}
