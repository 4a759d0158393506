//! `desk snapshot` -- compute or show analytics snapshots.

use anyhow::Result;
use chrono::{NaiveDate, Utc};

use crate::cli::{DateRangeArgs, SnapshotArgs, SnapshotCommands};
use crate::context::RuntimeContext;
use crate::output::{SNAPSHOT_HEADERS, output_json, output_table, snapshot_rows};

/// `(from, to)` inclusive; a single `--date` or nothing means one day.
fn date_range(args: &DateRangeArgs) -> (NaiveDate, NaiveDate) {
    match (args.from, args.to) {
        (Some(from), Some(to)) => (from, to),
        _ => {
            let day = args.date.unwrap_or_else(|| Utc::now().date_naive());
            (day, day)
        }
    }
}

/// Execute the `desk snapshot` command.
pub fn run(ctx: &RuntimeContext, args: &SnapshotArgs) -> Result<()> {
    let tenant = ctx.require_tenant()?;
    let engine = ctx.open_engine()?;

    let snapshots = match &args.command {
        SnapshotCommands::Compute(range) => {
            let (from, to) = date_range(range);
            engine.compute_range(tenant, from, to)?
        }
        SnapshotCommands::Show(range) => {
            let (from, to) = date_range(range);
            engine.get_snapshots(tenant, from, to)?
        }
    };

    if ctx.json {
        output_json(&snapshots);
    } else if snapshots.is_empty() {
        println!("No snapshots for {}.", tenant);
    } else {
        output_table(SNAPSHOT_HEADERS, &snapshot_rows(&snapshots));
    }
    Ok(())
}
