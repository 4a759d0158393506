//! `desk history` -- show the event history of a ticket.

use anyhow::Result;

use crate::cli::HistoryArgs;
use crate::context::RuntimeContext;
use crate::output::{format_time, output_json};

/// Execute the `desk history` command.
pub fn run(ctx: &RuntimeContext, args: &HistoryArgs) -> Result<()> {
    let engine = ctx.open_engine()?;
    let events = engine.get_events(&args.id, args.limit)?;
    let escalations = engine.get_escalations(&args.id)?;

    if ctx.json {
        output_json(&serde_json::json!({
            "ticket_id": args.id,
            "events": events,
            "escalations": escalations,
        }));
        return Ok(());
    }

    println!("History for {}:", args.id);
    for e in &events {
        let change = match (&e.old_value, &e.new_value) {
            (Some(old), Some(new)) => format!(" {} -> {}", old, new),
            (None, Some(new)) => format!(" {}", new),
            _ => String::new(),
        };
        let comment = e
            .comment
            .as_deref()
            .map(|c| format!(" ({})", c))
            .unwrap_or_default();
        println!(
            "  [{}] {} by {}{}{}",
            format_time(Some(e.created_at)),
            e.event_type,
            e.actor,
            change,
            comment
        );
    }

    if !escalations.is_empty() {
        println!();
        println!("Escalations:");
        for r in &escalations {
            println!(
                "  [{}] {} -> {} ({}): {}",
                format_time(Some(r.created_at)),
                r.from_level,
                r.to_level,
                r.kind,
                r.reason
            );
        }
    }
    Ok(())
}
