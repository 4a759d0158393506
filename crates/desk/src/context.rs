//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds all the state a command handler needs:
//! the discovered `.desk` directory and its configuration, the actor and
//! tenant, and global flags. [`RuntimeContext::open_engine`] wires the
//! store, directory file and notifier into an [`Engine`].

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use desk_config::{DeskConfig, NotifyMode};
use desk_engine::{Engine, EngineSettings, LogNotifier, Notifier, NullNotifier, YamlDirectory};
use desk_storage::SqliteStore;

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext {
    /// The `.desk` directory, if one was found.
    pub desk_dir: Option<PathBuf>,

    /// Configuration from `.desk/config.yaml` (defaults without one).
    pub config: DeskConfig,

    /// Why the configuration could not be loaded, reported on first use.
    config_error: Option<String>,

    /// `--db` override.
    pub db_override: Option<PathBuf>,

    /// Actor name for the audit trail.
    pub actor: String,

    /// Tenant from `--tenant` / `DESK_TENANT`.
    pub tenant: Option<String>,

    /// Whether to produce JSON output.
    pub json: bool,

    pub verbose: bool,

    /// Quiet mode: suppress non-essential output.
    pub quiet: bool,
}

impl RuntimeContext {
    /// Build a `RuntimeContext` from parsed global arguments.
    pub fn from_global_args(global: &GlobalArgs) -> Self {
        let desk_dir = env::current_dir()
            .ok()
            .and_then(|cwd| desk_config::find_desk_dir(&cwd));

        let (config, config_error) = match &desk_dir {
            Some(dir) => match desk_config::load_config(dir) {
                Ok(config) => (config, None),
                Err(e) => (DeskConfig::default(), Some(e.to_string())),
            },
            None => (DeskConfig::default(), None),
        };

        let actor = resolve_actor(global.actor.as_deref(), config.actor.as_deref());

        Self {
            desk_dir,
            json: global.json || config.json,
            config,
            config_error,
            db_override: global.db.as_ref().map(PathBuf::from),
            actor,
            tenant: global.tenant.clone().filter(|t| !t.is_empty()),
            verbose: global.verbose,
            quiet: global.quiet,
        }
    }

    /// The `.desk` directory, or an error with a hint to run `desk init`.
    pub fn require_desk_dir(&self) -> Result<&PathBuf> {
        if let Some(reason) = &self.config_error {
            bail!("invalid configuration: {}", reason);
        }
        self.desk_dir
            .as_ref()
            .context("no .desk directory found. Run 'desk init' to create one.")
    }

    /// The tenant every ticket, staff and policy command needs.
    pub fn require_tenant(&self) -> Result<&str> {
        self.tenant
            .as_deref()
            .context("no tenant given. Pass --tenant or set DESK_TENANT.")
    }

    /// Resolved database path.
    pub fn db_path(&self) -> Result<PathBuf> {
        if let Some(p) = &self.db_override {
            return Ok(p.clone());
        }
        let desk_dir = self.require_desk_dir()?;
        Ok(desk_config::db_path(desk_dir, &self.config))
    }

    /// Settings the engine takes from configuration.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            ticket_prefix: self.config.ticket_prefix.clone(),
            reassign_from_level: self.config.escalation.reassign_from_level,
            senior_levels: self.config.routing.senior_levels.clone(),
        }
    }

    /// Opens the database and directory file and builds the engine.
    pub fn open_engine(&self) -> Result<Engine> {
        let desk_dir = self.require_desk_dir()?;
        let db_path = self.db_path()?;
        if !db_path.exists() {
            bail!(
                "no desk database found at {}\nHint: run 'desk init' to create a database",
                db_path.display()
            );
        }

        let store = SqliteStore::open(&db_path)
            .with_context(|| format!("failed to open database: {}", db_path.display()))?;
        let directory = YamlDirectory::new(desk_config::directory_path(desk_dir));
        let notifier: Arc<dyn Notifier> = match self.config.notify.mode {
            NotifyMode::Log => Arc::new(LogNotifier),
            NotifyMode::None => Arc::new(NullNotifier),
        };

        Ok(Engine::new(Arc::new(store), Arc::new(directory))
            .with_settings(self.engine_settings())
            .with_notifier(notifier))
    }
}

/// Resolves the actor name.
///
/// Priority: explicit flag or `DESK_ACTOR` > config `actor` > `$USER` > "unknown".
fn resolve_actor(flag_value: Option<&str>, configured: Option<&str>) -> String {
    if let Some(actor) = flag_value.filter(|a| !a.is_empty()) {
        return actor.to_string();
    }

    if let Some(actor) = configured.filter(|a| !a.is_empty()) {
        return actor.to_string();
    }

    // USER env (Unix) or USERNAME env (Windows)
    if let Ok(user) = env::var("USER").or_else(|_| env::var("USERNAME")) {
        if !user.is_empty() {
            return user;
        }
    }

    "unknown".to_string()
}
