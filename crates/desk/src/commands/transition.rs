//! Status transitions: `desk start`, `desk resolve`, `desk close`,
//! `desk cancel`.

use anyhow::Result;

use desk_core::ticket::Ticket;

use crate::cli::{CancelArgs, CloseArgs, IdArgs, ResolveArgs};
use crate::context::RuntimeContext;
use crate::output::output_json;

fn report(ctx: &RuntimeContext, verb: &str, ticket: &Ticket) {
    if ctx.json {
        output_json(ticket);
    } else if !ctx.quiet {
        println!("{} {}: {}", verb, ticket.id, ticket.title);
    }
}

/// Execute the `desk start` command.
pub fn run_start(ctx: &RuntimeContext, args: &IdArgs) -> Result<()> {
    let engine = ctx.open_engine()?;
    let ticket = engine.start_work(&args.id, &ctx.actor)?;
    report(ctx, "Started", &ticket);
    Ok(())
}

/// Execute the `desk resolve` command.
pub fn run_resolve(ctx: &RuntimeContext, args: &ResolveArgs) -> Result<()> {
    let engine = ctx.open_engine()?;
    let ticket = engine.resolve(&args.id, &args.notes, &ctx.actor)?;
    report(ctx, "Resolved", &ticket);
    Ok(())
}

/// Execute the `desk close` command.
pub fn run_close(ctx: &RuntimeContext, args: &CloseArgs) -> Result<()> {
    let engine = ctx.open_engine()?;
    let ticket = engine.close(&args.id, args.force, &ctx.actor)?;
    report(ctx, "Closed", &ticket);
    Ok(())
}

/// Execute the `desk cancel` command.
pub fn run_cancel(ctx: &RuntimeContext, args: &CancelArgs) -> Result<()> {
    let engine = ctx.open_engine()?;
    let ticket = engine.cancel(&args.id, &args.reason, &ctx.actor)?;
    report(ctx, "Cancelled", &ticket);
    Ok(())
}
