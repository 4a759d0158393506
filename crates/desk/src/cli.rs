//! Clap CLI definitions for the `desk` command.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use desk_core::duration::parse_duration;
use desk_core::enums::{Category, MessageType, Priority, TicketStatus};

/// desk -- Support desk ticket routing and SLA engine.
///
/// Routes tickets to staff with free capacity, escalates SLA breaches and
/// keeps daily analytics per tenant.
#[derive(Parser, Debug)]
#[command(
    name = "desk",
    about = "Support desk ticket routing and SLA engine",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Database path (default: .desk/desk.db, discovered upwards).
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Actor name for the audit trail (default: $DESK_ACTOR, config, $USER).
    #[arg(long, global = true, env = "DESK_ACTOR")]
    pub actor: Option<String>,

    /// Tenant the command acts on.
    #[arg(long, global = true, env = "DESK_TENANT")]
    pub tenant: Option<String>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output (errors only).
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // ===== Setup =====
    /// Initialize a .desk directory in the current directory.
    Init(InitArgs),

    // ===== Tickets =====
    /// Open a new ticket and route it.
    #[command(alias = "new")]
    Create(CreateArgs),

    /// Show ticket details.
    #[command(alias = "view")]
    Show(ShowArgs),

    /// List tickets.
    List(ListArgs),

    /// Assign a ticket to a staff member.
    Assign(AssignArgs),

    /// Start work on a pending ticket.
    Start(IdArgs),

    /// Add a message to a ticket.
    Message(MessageArgs),

    /// List a ticket's messages.
    Messages(IdArgs),

    /// Mark a ticket resolved.
    Resolve(ResolveArgs),

    /// Close a resolved ticket.
    Close(CloseArgs),

    /// Cancel a ticket.
    Cancel(CancelArgs),

    /// Record a satisfaction rating (1-5).
    Rate(RateArgs),

    /// Raise a ticket's escalation level.
    Escalate(EscalateArgs),

    /// Show the event history and escalations of a ticket.
    History(HistoryArgs),

    // ===== Staff & SLA =====
    /// Manage the staff roster and capacity counters.
    Staff(StaffArgs),

    /// Manage SLA policies.
    Sla(SlaArgs),

    // ===== Background work =====
    /// Run one escalation sweep.
    Sweep,

    /// Compute or show analytics snapshots.
    Snapshot(SnapshotArgs),

    /// Run the escalation and analytics loops until interrupted.
    Serve(ServeArgs),
}

fn duration_arg(s: &str) -> Result<chrono::Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

/// Arguments for `desk init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Ticket ID prefix.
    #[arg(short = 'p', long)]
    pub prefix: Option<String>,

    /// Display name for the --tenant being registered.
    #[arg(long)]
    pub tenant_name: Option<String>,

    /// Re-initialize even if a database already exists.
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

/// Arguments for `desk create`.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Ticket title.
    pub title: String,

    /// Ticket description.
    #[arg(short = 'd', long)]
    pub description: Option<String>,

    /// Priority (low|medium|high|critical).
    #[arg(short = 'p', long, default_value = "medium")]
    pub priority: Priority,

    /// Category (technical|reports|equipment|billing|data_export|...).
    #[arg(short = 'c', long, default_value = "general")]
    pub category: Category,

    /// Reporter name.
    #[arg(long)]
    pub reporter_name: Option<String>,

    /// Reporter email.
    #[arg(long)]
    pub reporter_email: Option<String>,

    /// Reporter phone.
    #[arg(long)]
    pub reporter_phone: Option<String>,

    /// Tags (comma-separated, repeatable).
    #[arg(short = 'l', long = "tag", num_args = 1..)]
    pub tags: Vec<String>,

    /// Output only the ticket ID (for scripting).
    #[arg(long)]
    pub silent: bool,
}

/// Arguments for `desk show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Ticket IDs to display.
    #[arg(required = true)]
    pub ids: Vec<String>,
}

/// Arguments for `desk list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by status.
    #[arg(short = 's', long)]
    pub status: Option<TicketStatus>,

    /// Filter by priority.
    #[arg(short = 'p', long)]
    pub priority: Option<Priority>,

    /// Filter by category.
    #[arg(short = 'c', long)]
    pub category: Option<Category>,

    /// Filter by assignee.
    #[arg(short = 'a', long)]
    pub assigned_to: Option<String>,

    /// Only tickets nobody is assigned to.
    #[arg(long, conflicts_with = "assigned_to")]
    pub unassigned: bool,

    /// Include closed and cancelled tickets.
    #[arg(long)]
    pub all: bool,

    /// Substring search over title and description.
    #[arg(long)]
    pub search: Option<String>,

    /// Maximum number of tickets.
    #[arg(short = 'n', long)]
    pub limit: Option<u32>,
}

/// Arguments for commands that take only a ticket ID.
#[derive(Args, Debug)]
pub struct IdArgs {
    /// Ticket ID.
    pub id: String,
}

/// Arguments for `desk assign`.
#[derive(Args, Debug)]
pub struct AssignArgs {
    /// Ticket ID.
    pub id: String,

    /// Staff member ID.
    pub staff: String,
}

/// Arguments for `desk message`.
#[derive(Args, Debug)]
pub struct MessageArgs {
    /// Ticket ID.
    pub id: String,

    /// Message text.
    pub body: String,

    /// Hide the message from the requester.
    #[arg(long)]
    pub internal: bool,

    /// Message type (user|support|system|escalation).
    #[arg(short = 't', long = "type", default_value = "user")]
    pub message_type: MessageType,
}

/// Arguments for `desk resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Ticket ID.
    pub id: String,

    /// Resolution notes.
    #[arg(short = 'n', long, default_value = "")]
    pub notes: String,
}

/// Arguments for `desk close`.
#[derive(Args, Debug)]
pub struct CloseArgs {
    /// Ticket ID.
    pub id: String,

    /// Close from any non-terminal status.
    #[arg(short = 'f', long)]
    pub force: bool,
}

/// Arguments for `desk cancel`.
#[derive(Args, Debug)]
pub struct CancelArgs {
    /// Ticket ID.
    pub id: String,

    /// Cancellation reason.
    #[arg(short = 'r', long, default_value = "")]
    pub reason: String,
}

/// Arguments for `desk rate`.
#[derive(Args, Debug)]
pub struct RateArgs {
    /// Ticket ID.
    pub id: String,

    /// Rating from 1 to 5.
    pub rating: u8,

    /// Free-text feedback.
    #[arg(long, default_value = "")]
    pub feedback: String,
}

/// Arguments for `desk escalate`.
#[derive(Args, Debug)]
pub struct EscalateArgs {
    /// Ticket ID.
    pub id: String,

    /// Target level (default: one above the current level).
    #[arg(short = 'l', long)]
    pub level: Option<u32>,

    /// Why the ticket is being escalated.
    #[arg(short = 'r', long)]
    pub reason: String,
}

/// Arguments for `desk history`.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Ticket ID.
    pub id: String,

    /// Show at most this many events (0 = all).
    #[arg(short = 'n', long, default_value_t = 0)]
    pub limit: u32,
}

// ---------------------------------------------------------------------------
// Staff
// ---------------------------------------------------------------------------

/// Arguments for `desk staff`.
#[derive(Args, Debug)]
pub struct StaffArgs {
    #[command(subcommand)]
    pub command: StaffCommands,
}

/// Staff subcommands.
#[derive(Subcommand, Debug)]
pub enum StaffCommands {
    /// Load the tenant's roster from .desk/directory.yaml.
    Sync,
    /// List staff with their current load.
    List,
    /// Recount assignments and repair drifted capacity counters.
    Reconcile,
}

// ---------------------------------------------------------------------------
// SLA
// ---------------------------------------------------------------------------

/// Arguments for `desk sla`.
#[derive(Args, Debug)]
pub struct SlaArgs {
    #[command(subcommand)]
    pub command: SlaCommands,
}

/// SLA subcommands.
#[derive(Subcommand, Debug)]
pub enum SlaCommands {
    /// Create or replace a policy.
    Set(SlaSetArgs),
    /// List the tenant's policies.
    List,
    /// Show the policy that applies to a priority and category.
    Resolve(SlaResolveArgs),
}

/// Arguments for `desk sla set`.
#[derive(Args, Debug)]
pub struct SlaSetArgs {
    /// Priority the policy covers.
    #[arg(short = 'p', long)]
    pub priority: Priority,

    /// Category the policy covers (omit for all categories).
    #[arg(short = 'c', long)]
    pub category: Option<Category>,

    /// First response target (e.g. 30m, 2h, 1d).
    #[arg(long, value_parser = duration_arg)]
    pub first_response: chrono::Duration,

    /// Resolution target.
    #[arg(long, value_parser = duration_arg)]
    pub resolution: chrono::Duration,

    /// Escalation timer (defaults to the first response target).
    #[arg(long, value_parser = duration_arg)]
    pub escalation_time: Option<chrono::Duration>,

    /// Level a breach escalates to.
    #[arg(long, default_value_t = 1)]
    pub level: u32,

    /// Display name.
    #[arg(long)]
    pub name: Option<String>,

    /// Store the policy disabled.
    #[arg(long)]
    pub inactive: bool,
}

/// Arguments for `desk sla resolve`.
#[derive(Args, Debug)]
pub struct SlaResolveArgs {
    #[arg(short = 'p', long)]
    pub priority: Priority,

    #[arg(short = 'c', long)]
    pub category: Category,
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Arguments for `desk snapshot`.
#[derive(Args, Debug)]
pub struct SnapshotArgs {
    #[command(subcommand)]
    pub command: SnapshotCommands,
}

/// Snapshot subcommands.
#[derive(Subcommand, Debug)]
pub enum SnapshotCommands {
    /// Compute and store snapshots.
    Compute(DateRangeArgs),
    /// Show stored snapshots.
    Show(DateRangeArgs),
}

/// A single day or an inclusive range; defaults to today (UTC).
#[derive(Args, Debug)]
pub struct DateRangeArgs {
    /// Day (YYYY-MM-DD).
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub date: Option<NaiveDate>,

    /// First day of a range.
    #[arg(long, requires = "to")]
    pub from: Option<NaiveDate>,

    /// Last day of a range.
    #[arg(long, requires = "from")]
    pub to: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Serve
// ---------------------------------------------------------------------------

/// Arguments for `desk serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Escalation sweep interval (default from config).
    #[arg(long, value_parser = duration_arg)]
    pub sweep_interval: Option<chrono::Duration>,

    /// Analytics rollup interval (default from config).
    #[arg(long, value_parser = duration_arg)]
    pub analytics_interval: Option<chrono::Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_enums_and_durations() {
        let cli = Cli::parse_from([
            "desk", "sla", "set", "-p", "high", "-c", "technical", "--first-response", "1h",
            "--resolution", "1d",
        ]);
        let Some(Commands::Sla(SlaArgs {
            command: SlaCommands::Set(args),
        })) = cli.command
        else {
            panic!("expected sla set");
        };
        assert_eq!(args.priority, Priority::High);
        assert_eq!(args.category, Some(Category::Technical));
        assert_eq!(args.first_response, chrono::Duration::hours(1));
        assert_eq!(args.resolution, chrono::Duration::days(1));
    }

    #[test]
    fn rejects_unknown_priority() {
        assert!(Cli::try_parse_from(["desk", "create", "x", "-p", "urgent"]).is_err());
    }
}
