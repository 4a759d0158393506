//! `desk escalate` -- raise a ticket's escalation level.

use anyhow::Result;

use crate::cli::EscalateArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `desk escalate` command.
pub fn run(ctx: &RuntimeContext, args: &EscalateArgs) -> Result<()> {
    let engine = ctx.open_engine()?;
    let level = match args.level {
        Some(level) => level,
        None => engine.get_ticket(&args.id)?.escalation_level + 1,
    };

    let outcome = engine.escalate(&args.id, &args.reason, level, &ctx.actor)?;

    if ctx.json {
        output_json(&outcome);
    } else if !ctx.quiet {
        println!(
            "Escalated {} from level {} to {}",
            outcome.ticket.id, outcome.from_level, outcome.ticket.escalation_level
        );
        if let Some(staff) = &outcome.rerouted_to {
            println!("  Re-routed to {}", staff);
        }
    }
    Ok(())
}
