//! `desk staff` -- roster sync, listing and counter reconciliation.

use anyhow::{Context, Result};

use crate::cli::{StaffArgs, StaffCommands};
use crate::context::RuntimeContext;
use crate::output::{STAFF_HEADERS, output_json, output_table, staff_rows};

/// Execute the `desk staff` command.
pub fn run(ctx: &RuntimeContext, args: &StaffArgs) -> Result<()> {
    let tenant = ctx.require_tenant()?;
    let engine = ctx.open_engine()?;

    match args.command {
        StaffCommands::Sync => {
            let report = engine
                .sync_staff(tenant)
                .context("failed to sync staff from directory.yaml")?;
            if ctx.json {
                output_json(&serde_json::json!({
                    "upserted": report.upserted,
                    "skipped": report
                        .skipped
                        .iter()
                        .map(|(id, reason)| serde_json::json!({ "id": id, "reason": reason }))
                        .collect::<Vec<_>>(),
                }));
            } else {
                for (id, reason) in &report.skipped {
                    eprintln!("Skipped {}: {}", id, reason);
                }
                if !ctx.quiet {
                    println!("Synced {} staff member(s) for {}", report.upserted, tenant);
                }
            }
        }
        StaffCommands::List => {
            let staff = engine.list_staff(tenant)?;
            if ctx.json {
                output_json(&staff);
            } else if staff.is_empty() {
                println!("No staff for {}. Run 'desk staff sync'.", tenant);
            } else {
                output_table(STAFF_HEADERS, &staff_rows(&staff));
            }
        }
        StaffCommands::Reconcile => {
            let corrections = engine.reconcile(tenant)?;
            if ctx.json {
                output_json(&corrections);
            } else if corrections.is_empty() {
                if !ctx.quiet {
                    println!("All capacity counters match.");
                }
            } else {
                for c in &corrections {
                    println!("Corrected {}: {} -> {}", c.staff_id, c.recorded, c.actual);
                }
            }
        }
    }
    Ok(())
}
