//! Configuration types and loading for the support desk.
//!
//! The main entry point is [`DeskConfig`], which represents the contents of
//! `.desk/config.yaml`. [`load_config`] layers the file over built-in
//! defaults and then applies `DESK_*` environment variables (`__` separates
//! nested keys, e.g. `DESK_ESCALATION__SWEEP_INTERVAL_SECS=60`).

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use desk_core::enums::StaffLevel;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The configuration file contained invalid YAML.
    #[error("failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// The layered configuration could not be extracted.
    #[error("invalid configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    /// The `.desk/` directory was not found.
    #[error("no .desk directory found (run 'desk init' first)")]
    DeskDirNotFound,

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue {
        /// The configuration key that had an invalid value.
        key: String,
        /// A description of why the value is invalid.
        reason: String,
    },
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Escalation monitor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Seconds between background sweeps.
    #[serde(
        default = "default_sweep_interval",
        rename = "sweep-interval-secs",
        alias = "sweep_interval_secs"
    )]
    pub sweep_interval_secs: u64,

    /// Escalating to this level or higher moves the ticket to the senior pool.
    #[serde(
        default = "default_reassign_from_level",
        rename = "reassign-from-level",
        alias = "reassign_from_level"
    )]
    pub reassign_from_level: u32,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            reassign_from_level: default_reassign_from_level(),
        }
    }
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_reassign_from_level() -> u32 {
    2
}

/// Analytics rollup settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(
        default = "default_analytics_interval",
        rename = "interval-secs",
        alias = "interval_secs"
    )]
    pub interval_secs: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_analytics_interval(),
        }
    }
}

fn default_analytics_interval() -> u64 {
    3600
}

/// Routing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Staff levels that form the senior pool for escalated tickets.
    #[serde(
        default = "default_senior_levels",
        rename = "senior-levels",
        alias = "senior_levels"
    )]
    pub senior_levels: Vec<StaffLevel>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            senior_levels: default_senior_levels(),
        }
    }
}

fn default_senior_levels() -> Vec<StaffLevel> {
    StaffLevel::SENIOR_POOL.to_vec()
}

/// How outbound ticket events are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifyMode {
    /// Write each event to the log (default).
    #[default]
    Log,
    /// Drop events.
    None,
}

/// Notification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NotifyConfig {
    #[serde(default)]
    pub mode: NotifyMode,
}

// ---------------------------------------------------------------------------
// Main config struct
// ---------------------------------------------------------------------------

/// The full desk configuration, corresponding to `.desk/config.yaml`.
///
/// All fields use `serde` defaults so that a partially-specified YAML file
/// will be deserialized correctly with sensible default values. Unknown keys
/// are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeskConfig {
    /// Ticket ID prefix (e.g., `"tk"` gives `tk-4f9a2c`).
    #[serde(
        default = "default_ticket_prefix",
        rename = "ticket-prefix",
        alias = "ticket_prefix"
    )]
    pub ticket_prefix: String,

    /// Output JSON instead of human-readable text.
    #[serde(default)]
    pub json: bool,

    /// Database path override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,

    /// Actor identity override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    #[serde(default)]
    pub escalation: EscalationConfig,

    #[serde(default)]
    pub analytics: AnalyticsConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            ticket_prefix: default_ticket_prefix(),
            json: false,
            db: None,
            actor: None,
            escalation: EscalationConfig::default(),
            analytics: AnalyticsConfig::default(),
            routing: RoutingConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

fn default_ticket_prefix() -> String {
    "tk".to_string()
}

impl DeskConfig {
    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.ticket_prefix.is_empty()
            || !self
                .ticket_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
        {
            return Err(invalid("ticket-prefix", "must be non-empty and alphanumeric"));
        }
        if self.escalation.sweep_interval_secs == 0 {
            return Err(invalid("escalation.sweep-interval-secs", "must be positive"));
        }
        if self.escalation.reassign_from_level == 0 {
            return Err(invalid("escalation.reassign-from-level", "must be at least 1"));
        }
        if self.analytics.interval_secs == 0 {
            return Err(invalid("analytics.interval-secs", "must be positive"));
        }
        if self.routing.senior_levels.is_empty() {
            return Err(invalid("routing.senior-levels", "must name at least one level"));
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "DESK_";

/// Load configuration from `config.yaml` inside the given `.desk/` directory,
/// with `DESK_*` environment overrides applied.
///
/// A missing or empty file yields the defaults.
///
/// # Errors
///
/// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
/// [`ConfigError::Extract`] if the layered values do not deserialize, or
/// [`ConfigError::InvalidValue`] if a value is out of range.
pub fn load_config(desk_dir: &Path) -> Result<DeskConfig> {
    load_layered(desk_dir, ENV_PREFIX)
}

fn load_layered(desk_dir: &Path, env_prefix: &str) -> Result<DeskConfig> {
    let config_path = desk_dir.join("config.yaml");

    let mut figment = Figment::new();
    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        if !content.trim().is_empty() {
            figment = figment.merge(Yaml::string(&content));
        }
    }
    figment = figment.merge(Env::prefixed(env_prefix).split("__"));

    let config: DeskConfig = figment.extract().map_err(Box::new)?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to `config.yaml` inside the given `.desk/` directory.
///
/// The directory is created if it does not exist.
pub fn save_config(desk_dir: &Path, config: &DeskConfig) -> Result<()> {
    std::fs::create_dir_all(desk_dir)?;

    let config_path = desk_dir.join("config.yaml");
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(config_path, yaml)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // Each test uses its own prefix so parallel tests never see each
    // other's variables.
    fn load_isolated(dir: &Path, prefix: &str) -> Result<DeskConfig> {
        load_layered(dir, prefix)
    }

    #[test]
    fn test_default_config() {
        let cfg = DeskConfig::default();
        assert_eq!(cfg.ticket_prefix, "tk");
        assert!(!cfg.json);
        assert_eq!(cfg.escalation.sweep_interval_secs, 300);
        assert_eq!(cfg.escalation.reassign_from_level, 2);
        assert_eq!(cfg.analytics.interval_secs, 3600);
        assert_eq!(
            cfg.routing.senior_levels,
            vec![StaffLevel::Senior, StaffLevel::Lead, StaffLevel::Manager]
        );
        assert_eq!(cfg.notify.mode, NotifyMode::Log);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_missing_config_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_isolated(dir.path(), "DESK_TEST_MISSING_").unwrap();
        assert_eq!(cfg, DeskConfig::default());
    }

    #[test]
    fn test_empty_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.yaml"), "\n  \n").unwrap();
        let cfg = load_isolated(dir.path(), "DESK_TEST_EMPTY_").unwrap();
        assert_eq!(cfg, DeskConfig::default());
    }

    #[test]
    fn test_roundtrip_config() {
        let dir = tempfile::tempdir().unwrap();
        let desk_dir = dir.path().join(".desk");

        let mut cfg = DeskConfig::default();
        cfg.ticket_prefix = "sup".to_string();
        cfg.escalation.reassign_from_level = 3;
        cfg.notify.mode = NotifyMode::None;

        save_config(&desk_dir, &cfg).unwrap();
        let loaded = load_isolated(&desk_dir, "DESK_TEST_ROUNDTRIP_").unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_partial_yaml_with_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "ticket-prefix: help\nescalation:\n  sweep-interval-secs: 60\nlegacy-flag: true\n",
        )
        .unwrap();
        let cfg = load_isolated(dir.path(), "DESK_TEST_PARTIAL_").unwrap();
        assert_eq!(cfg.ticket_prefix, "help");
        assert_eq!(cfg.escalation.sweep_interval_secs, 60);
        // Everything else should be default.
        assert_eq!(cfg.escalation.reassign_from_level, 2);
        assert_eq!(cfg.analytics.interval_secs, 3600);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "escalation:\n  sweep-interval-secs: 60\n",
        )
        .unwrap();
        // SAFETY: the variable name is unique to this test.
        unsafe {
            std::env::set_var("DESK_TEST_ENV_ESCALATION__REASSIGN_FROM_LEVEL", "4");
            std::env::set_var("DESK_TEST_ENV_ACTOR", "ops-bot");
        }
        let cfg = load_isolated(dir.path(), "DESK_TEST_ENV_").unwrap();
        assert_eq!(cfg.escalation.sweep_interval_secs, 60);
        assert_eq!(cfg.escalation.reassign_from_level, 4);
        assert_eq!(cfg.actor.as_deref(), Some("ops-bot"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "escalation:\n  reassign-from-level: 0\n",
        )
        .unwrap();
        match load_isolated(dir.path(), "DESK_TEST_INVALID_") {
            Err(ConfigError::InvalidValue { key, .. }) => {
                assert_eq!(key, "escalation.reassign-from-level")
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_senior_level_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "routing:\n  senior-levels: [senior, wizard]\n",
        )
        .unwrap();
        assert!(matches!(
            load_isolated(dir.path(), "DESK_TEST_LEVEL_"),
            Err(ConfigError::Extract(_))
        ));
    }
}
