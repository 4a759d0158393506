//! `desk rate` -- record a satisfaction rating.

use anyhow::Result;

use crate::cli::RateArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `desk rate` command.
pub fn run(ctx: &RuntimeContext, args: &RateArgs) -> Result<()> {
    let engine = ctx.open_engine()?;
    let ticket = engine.rate_satisfaction(&args.id, args.rating, &args.feedback, &ctx.actor)?;

    if ctx.json {
        output_json(&ticket);
    } else if !ctx.quiet {
        println!("Rated {}: {}/5", ticket.id, args.rating);
    }
    Ok(())
}
