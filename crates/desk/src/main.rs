//! `desk` -- support desk ticket routing and SLA engine CLI.
//!
//! Parses CLI arguments with clap, resolves the runtime context, and
//! dispatches to command handlers.

mod cli;
mod commands;
mod context;
mod output;

use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use context::RuntimeContext;

/// Tracks whether a Ctrl+C has already been received.
pub(crate) static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Set by `desk serve`: the first Ctrl+C then asks the loops to stop
/// instead of exiting on the spot.
pub(crate) static SERVING: AtomicBool = AtomicBool::new(false);

fn main() {
    // First Ctrl+C: exit cleanly (or stop `serve`). Second: force exit.
    let _ = ctrlc::set_handler(|| {
        if CTRLC_RECEIVED.swap(true, Ordering::SeqCst) {
            std::process::exit(1);
        }
        if !SERVING.load(Ordering::SeqCst) {
            std::process::exit(0);
        }
    });

    let cli = Cli::parse();
    let ctx = RuntimeContext::from_global_args(&cli.global);

    init_logging(ctx.verbose);

    let result = match cli.command {
        Some(Commands::Init(args)) => commands::init::run(&ctx, &args),
        Some(Commands::Create(args)) => commands::create::run(&ctx, &args),
        Some(Commands::Show(args)) => commands::show::run(&ctx, &args),
        Some(Commands::List(args)) => commands::list::run(&ctx, &args),
        Some(Commands::Assign(args)) => commands::assign::run(&ctx, &args),
        Some(Commands::Start(args)) => commands::transition::run_start(&ctx, &args),
        Some(Commands::Message(args)) => commands::message::run_add(&ctx, &args),
        Some(Commands::Messages(args)) => commands::message::run_list(&ctx, &args),
        Some(Commands::Resolve(args)) => commands::transition::run_resolve(&ctx, &args),
        Some(Commands::Close(args)) => commands::transition::run_close(&ctx, &args),
        Some(Commands::Cancel(args)) => commands::transition::run_cancel(&ctx, &args),
        Some(Commands::Rate(args)) => commands::rate::run(&ctx, &args),
        Some(Commands::Escalate(args)) => commands::escalate::run(&ctx, &args),
        Some(Commands::History(args)) => commands::history::run(&ctx, &args),
        Some(Commands::Staff(args)) => commands::staff::run(&ctx, &args),
        Some(Commands::Sla(args)) => commands::sla::run(&ctx, &args),
        Some(Commands::Sweep) => commands::sweep::run(&ctx),
        Some(Commands::Snapshot(args)) => commands::snapshot::run(&ctx, &args),
        Some(Commands::Serve(args)) => commands::serve::run(&ctx, &args),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        if ctx.json {
            let err_json = serde_json::json!({
                "error": format!("{:#}", e),
            });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

/// `--verbose` turns on debug output for the desk crates; otherwise
/// `RUST_LOG` decides, defaulting to warnings only.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("desk=debug,desk_engine=debug,desk_storage=debug,desk_config=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
