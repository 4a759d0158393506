//! `desk sweep` -- run one escalation pass.

use anyhow::Result;

use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `desk sweep` command.
pub fn run(ctx: &RuntimeContext) -> Result<()> {
    let engine = ctx.open_engine()?;
    let report = engine.sweep()?;

    if ctx.json {
        output_json(&report);
    } else if !ctx.quiet {
        println!(
            "Examined {} ticket(s): {} escalated, {} re-routed, {} assigned, {} error(s)",
            report.examined, report.escalated, report.rerouted, report.assigned, report.errors
        );
    }
    Ok(())
}
