//! `desk list` -- list tickets.

use anyhow::Result;

use desk_core::filter::TicketFilter;

use crate::cli::ListArgs;
use crate::context::RuntimeContext;
use crate::output::{format_ticket_compact, output_json};

/// Execute the `desk list` command.
///
/// Closed and cancelled tickets are hidden unless `--all` or an explicit
/// `--status` asks for them.
pub fn run(ctx: &RuntimeContext, args: &ListArgs) -> Result<()> {
    let tenant = ctx.require_tenant()?;
    let engine = ctx.open_engine()?;

    let filter = TicketFilter {
        status: args.status,
        priority: args.priority,
        category: args.category,
        assigned_to: args.assigned_to.clone(),
        unassigned: args.unassigned,
        non_terminal: !args.all && args.status.is_none(),
        search: args.search.clone(),
        limit: args.limit,
        ..TicketFilter::for_tenant(tenant)
    };
    let tickets = engine.list_tickets(&filter)?;

    if ctx.json {
        output_json(&tickets);
        return Ok(());
    }

    if tickets.is_empty() {
        if !ctx.quiet {
            println!("No tickets found.");
        }
        return Ok(());
    }
    for ticket in &tickets {
        println!("{}", format_ticket_compact(ticket));
    }
    if !ctx.quiet {
        println!();
        println!("{} ticket(s)", tickets.len());
    }
    Ok(())
}
