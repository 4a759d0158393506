//! `desk sla` -- manage SLA policies.

use anyhow::Result;

use desk_core::duration::format_duration;
use desk_core::sla::SlaPolicy;

use crate::cli::{SlaArgs, SlaCommands, SlaSetArgs};
use crate::context::RuntimeContext;
use crate::output::{POLICY_HEADERS, output_json, output_table, policy_rows};

/// Execute the `desk sla` command.
pub fn run(ctx: &RuntimeContext, args: &SlaArgs) -> Result<()> {
    let tenant = ctx.require_tenant()?;
    let engine = ctx.open_engine()?;

    match &args.command {
        SlaCommands::Set(set) => {
            let stored = engine.set_policy(&policy_from_args(tenant, set))?;
            if ctx.json {
                output_json(&stored);
            } else if !ctx.quiet {
                println!(
                    "Stored SLA policy for {} / {}",
                    stored.priority,
                    stored
                        .category
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "*".to_string())
                );
            }
        }
        SlaCommands::List => {
            let policies = engine.list_policies(tenant)?;
            if ctx.json {
                output_json(&policies);
            } else if policies.is_empty() {
                println!("No SLA policies for {}.", tenant);
            } else {
                output_table(POLICY_HEADERS, &policy_rows(&policies));
            }
        }
        SlaCommands::Resolve(resolve) => {
            let policy = engine.resolve_policy(tenant, resolve.priority, resolve.category)?;
            if ctx.json {
                output_json(&policy);
            } else {
                println!(
                    "{} / {}: first response {}, resolution {}, escalates to level {}",
                    policy.priority,
                    policy
                        .category
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "*".to_string()),
                    format_duration(policy.first_response_target),
                    format_duration(policy.resolution_target),
                    policy.escalation_level
                );
            }
        }
    }
    Ok(())
}

fn policy_from_args(tenant: &str, args: &SlaSetArgs) -> SlaPolicy {
    let mut policy = SlaPolicy::new(
        tenant,
        args.priority,
        args.category,
        args.first_response,
        args.resolution,
        args.level,
    );
    if let Some(escalation_time) = args.escalation_time {
        policy.escalation_time = escalation_time;
    }
    if let Some(name) = &args.name {
        policy.name = name.clone();
    }
    policy.is_active = !args.inactive;
    policy
}
