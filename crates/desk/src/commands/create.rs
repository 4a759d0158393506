//! `desk create` -- open a new ticket and route it.

use anyhow::{Context, Result};

use desk_core::ticket::TicketDraft;

use crate::cli::CreateArgs;
use crate::context::RuntimeContext;
use crate::output::{output_json, print_ticket_detail};

/// Execute the `desk create` command.
pub fn run(ctx: &RuntimeContext, args: &CreateArgs) -> Result<()> {
    let tenant = ctx.require_tenant()?;
    let engine = ctx.open_engine()?;

    // Handle comma-separated tags within a single argument
    let tags: Vec<String> = args
        .tags
        .iter()
        .flat_map(|t| t.split(','))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let draft = TicketDraft::new(tenant, args.title.as_str(), ctx.actor.as_str())
        .description(args.description.clone().unwrap_or_default())
        .priority(args.priority)
        .category(args.category)
        .reporter(
            args.reporter_name.clone().unwrap_or_default(),
            args.reporter_email.clone().unwrap_or_default(),
            args.reporter_phone.clone().unwrap_or_default(),
        )
        .tags(tags);

    let ticket = engine.create(draft).context("failed to create ticket")?;

    if args.silent {
        println!("{}", ticket.id);
    } else if ctx.json {
        output_json(&ticket);
    } else {
        println!("Created ticket {}", ticket.id);
        print_ticket_detail(&ticket);
    }
    Ok(())
}
