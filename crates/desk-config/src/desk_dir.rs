//! Discovery and management of the `.desk/` directory.
//!
//! The `.desk/` directory holds the database, `config.yaml`, and the staff
//! directory file `directory.yaml`. This module finds it by walking up the
//! directory tree and creates it on `desk init`.

use crate::config::{ConfigError, DeskConfig};
use std::path::{Path, PathBuf};

/// The name of the desk metadata directory.
const DESK_DIR_NAME: &str = ".desk";

/// Environment variable that overrides discovery.
const DESK_DIR_ENV: &str = "DESK_DIR";

const DB_FILE_NAME: &str = "desk.db";
const DIRECTORY_FILE_NAME: &str = "directory.yaml";

/// Walk up the directory tree from `start` looking for a `.desk/` directory.
///
/// The `DESK_DIR` environment variable is checked first.
pub fn find_desk_dir(start: &Path) -> Option<PathBuf> {
    if let Ok(env_dir) = std::env::var(DESK_DIR_ENV) {
        let env_path = PathBuf::from(&env_dir);
        if env_path.is_dir() {
            return Some(env_path);
        }
    }

    let start = start.canonicalize().ok()?;

    let mut current = start.as_path();
    loop {
        let candidate = current.join(DESK_DIR_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) if parent != current => current = parent,
            _ => break,
        }
    }

    None
}

/// Like [`find_desk_dir`], but returns [`ConfigError::DeskDirNotFound`]
/// instead of `None`.
pub fn find_desk_dir_or_error(start: &Path) -> Result<PathBuf, ConfigError> {
    find_desk_dir(start).ok_or(ConfigError::DeskDirNotFound)
}

/// Ensure a `.desk/` directory exists at (or under) the given path.
///
/// Returns the path to the `.desk/` directory.
pub fn ensure_desk_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    let desk_dir = if path.ends_with(DESK_DIR_NAME) {
        path.to_path_buf()
    } else {
        path.join(DESK_DIR_NAME)
    };

    std::fs::create_dir_all(&desk_dir)?;
    Ok(desk_dir)
}

/// The database path: the `db` override if set, otherwise `desk.db` inside
/// the desk directory. Relative overrides resolve against the desk directory.
pub fn db_path(desk_dir: &Path, config: &DeskConfig) -> PathBuf {
    match &config.db {
        Some(db) => {
            let p = PathBuf::from(db);
            if p.is_absolute() { p } else { desk_dir.join(p) }
        }
        None => desk_dir.join(DB_FILE_NAME),
    }
}

/// Path of the staff directory file.
pub fn directory_path(desk_dir: &Path) -> PathBuf {
    desk_dir.join(DIRECTORY_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_desk_dir_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let desk = dir.path().join(".desk");
        std::fs::create_dir(&desk).unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_desk_dir(&nested).unwrap();
        assert_eq!(found.canonicalize().unwrap(), desk.canonicalize().unwrap());
    }

    #[test]
    fn test_not_found_is_error() {
        let dir = tempfile::tempdir().unwrap();
        // Only meaningful when no ancestor of the temp dir has a .desk/.
        if find_desk_dir(dir.path()).is_none() {
            assert!(matches!(
                find_desk_dir_or_error(dir.path()),
                Err(ConfigError::DeskDirNotFound)
            ));
        }
    }

    #[test]
    fn test_ensure_desk_dir() {
        let dir = tempfile::tempdir().unwrap();
        let created = ensure_desk_dir(dir.path()).unwrap();
        assert!(created.is_dir());
        assert!(created.ends_with(".desk"));

        // Idempotent, and accepts the .desk path itself.
        let again = ensure_desk_dir(&created).unwrap();
        assert_eq!(again, created);
    }

    #[test]
    fn test_db_path_override() {
        let desk = Path::new("/srv/app/.desk");
        let mut cfg = DeskConfig::default();
        assert_eq!(db_path(desk, &cfg), desk.join("desk.db"));

        cfg.db = Some("other.db".into());
        assert_eq!(db_path(desk, &cfg), desk.join("other.db"));

        cfg.db = Some("/var/lib/desk.db".into());
        assert_eq!(db_path(desk, &cfg), PathBuf::from("/var/lib/desk.db"));
        assert_eq!(directory_path(desk), desk.join("directory.yaml"));
    }
}
