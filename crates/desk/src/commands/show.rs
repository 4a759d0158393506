//! `desk show` -- show ticket details.

use anyhow::{Result, bail};

use crate::cli::ShowArgs;
use crate::context::RuntimeContext;
use crate::output::{output_json, print_ticket_detail};

/// Execute the `desk show` command.
///
/// Unknown IDs are reported and skipped; the command fails only if none
/// of the requested tickets exist.
pub fn run(ctx: &RuntimeContext, args: &ShowArgs) -> Result<()> {
    let engine = ctx.open_engine()?;

    let mut tickets = Vec::new();
    for id in &args.ids {
        match engine.get_ticket(id) {
            Ok(ticket) => tickets.push(ticket),
            Err(e) if e.is_not_found() => {
                if !ctx.json {
                    eprintln!("Ticket {} not found", id);
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
    if tickets.is_empty() {
        bail!("no tickets found");
    }

    if ctx.json {
        output_json(&tickets);
    } else {
        for (i, ticket) in tickets.iter().enumerate() {
            if i > 0 {
                println!();
            }
            print_ticket_detail(ticket);
        }
    }
    Ok(())
}
