//! `desk assign` -- assign a ticket to a staff member.

use anyhow::Result;

use crate::cli::AssignArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `desk assign` command.
pub fn run(ctx: &RuntimeContext, args: &AssignArgs) -> Result<()> {
    let engine = ctx.open_engine()?;
    let ticket = engine.assign(&args.id, &args.staff, &ctx.actor)?;

    if ctx.json {
        output_json(&ticket);
    } else if !ctx.quiet {
        println!("Assigned {} to {} ({})", ticket.id, args.staff, ticket.status);
    }
    Ok(())
}
