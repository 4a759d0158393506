//! Configuration management for the support desk engine.
//!
//! This crate handles loading and saving `.desk/config.yaml`, layering
//! `DESK_*` environment overrides on top, and discovering `.desk/`
//! directories in the filesystem.

pub mod config;
pub mod desk_dir;

pub use config::{DeskConfig, ConfigError, NotifyMode, load_config, save_config};
pub use desk_dir::{db_path, directory_path, ensure_desk_dir, find_desk_dir, find_desk_dir_or_error};
