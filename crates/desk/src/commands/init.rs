//! `desk init` -- initialize a `.desk` directory in the current directory.

use std::env;
use std::fs;

use anyhow::{bail, Context, Result};

use desk_config::DeskConfig;
use desk_core::staff::Tenant;
use desk_engine::YamlDirectory;
use desk_storage::SqliteStore;

use crate::cli::InitArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Default gitignore content for the `.desk` directory.
const GITIGNORE_CONTENT: &str = r#"# Desk database files
*.db
*.db-journal
*.db-wal
*.db-shm
"#;

/// Execute the `desk init` command.
pub fn run(ctx: &RuntimeContext, args: &InitArgs) -> Result<()> {
    let cwd = env::current_dir().context("failed to get current directory")?;
    let desk_dir = cwd.join(".desk");

    let mut config = DeskConfig::default();
    if let Some(prefix) = &args.prefix {
        config.ticket_prefix = prefix.trim_end_matches('-').to_string();
    }
    config
        .validate()
        .context("invalid ticket prefix")?;

    let db_path = desk_config::db_path(&desk_dir, &config);
    if !args.force && db_path.exists() {
        bail!(
            "Found existing database in {}\n\n\
            This directory is already initialized.\n\
            Use --force to re-initialize.",
            desk_dir.display()
        );
    }

    let desk_dir = desk_config::ensure_desk_dir(&cwd)
        .with_context(|| format!("failed to create directory: {}", desk_dir.display()))?;

    let gitignore_path = desk_dir.join(".gitignore");
    if !gitignore_path.exists() {
        fs::write(&gitignore_path, GITIGNORE_CONTENT).with_context(|| {
            format!("failed to create .gitignore: {}", gitignore_path.display())
        })?;
    }

    desk_config::save_config(&desk_dir, &config).context("failed to write config.yaml")?;

    // Opening the store creates the schema.
    SqliteStore::open(&db_path)
        .with_context(|| format!("failed to create database: {}", db_path.display()))?;

    let directory = YamlDirectory::new(desk_config::directory_path(&desk_dir));
    let mut roster = directory.load().context("failed to read directory.yaml")?;
    if let Some(tenant_id) = &ctx.tenant {
        if !roster.tenants.iter().any(|t| &t.id == tenant_id) {
            let name = args.tenant_name.clone().unwrap_or_else(|| tenant_id.clone());
            roster.tenants.push(Tenant::new(tenant_id.as_str(), name));
        }
    }
    directory
        .save(&roster)
        .context("failed to write directory.yaml")?;

    if ctx.json {
        output_json(&serde_json::json!({
            "desk_dir": desk_dir.display().to_string(),
            "database": db_path.display().to_string(),
            "ticket_prefix": config.ticket_prefix,
            "tenants": roster.tenants.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
        }));
    } else if !ctx.quiet {
        println!();
        println!("desk initialized successfully!");
        println!();
        println!("  Database: {}", db_path.display());
        println!("  Directory: {}", directory.path().display());
        println!("  Ticket prefix: {}", config.ticket_prefix);
        println!();
        println!("Add tenants and staff to directory.yaml, then run `desk staff sync --tenant <id>`.");
        println!();
    }

    Ok(())
}
