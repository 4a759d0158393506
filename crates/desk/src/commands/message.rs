//! `desk message` / `desk messages` -- add and list ticket messages.

use anyhow::Result;

use desk_core::message::NewMessage;

use crate::cli::{IdArgs, MessageArgs};
use crate::context::RuntimeContext;
use crate::output::{format_time, output_json};

/// Execute the `desk message` command. The actor is the sender.
pub fn run_add(ctx: &RuntimeContext, args: &MessageArgs) -> Result<()> {
    let engine = ctx.open_engine()?;
    let message = NewMessage::new(ctx.actor.as_str(), args.body.as_str())
        .internal(args.internal)
        .message_type(args.message_type);
    let stored = engine.add_message(&args.id, message)?;

    if ctx.json {
        output_json(&stored);
    } else if !ctx.quiet {
        println!("Added message to {}", args.id);
    }
    Ok(())
}

/// Execute the `desk messages` command.
pub fn run_list(ctx: &RuntimeContext, args: &IdArgs) -> Result<()> {
    let engine = ctx.open_engine()?;
    let messages = engine.get_messages(&args.id)?;

    if ctx.json {
        output_json(&messages);
        return Ok(());
    }

    if messages.is_empty() {
        println!("No messages on {}", args.id);
        return Ok(());
    }
    for m in &messages {
        let visibility = if m.is_internal { " (internal)" } else { "" };
        println!(
            "[{}] {} <{}>{}",
            format_time(Some(m.created_at)),
            m.sender,
            m.message_type,
            visibility
        );
        for line in m.body.lines() {
            println!("  {}", line);
        }
    }
    Ok(())
}
