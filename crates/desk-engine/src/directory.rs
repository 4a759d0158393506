//! The identity collaborator: tenants and their staff rosters.
//!
//! The engine never authenticates anyone. It asks a [`Directory`] whether a
//! tenant exists and is active, and which staff members it has, then keeps
//! its own copy of the roster (with live capacity counters) in the store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use desk_core::staff::{StaffMember, Tenant};

/// Errors raised by a directory backend.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("failed to read directory file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse directory file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Read access to tenant and staff identity data.
pub trait Directory: Send + Sync {
    /// Looks up a tenant. `Ok(None)` means the tenant is unknown.
    fn get_tenant(&self, tenant_id: &str) -> Result<Option<Tenant>, DirectoryError>;

    /// Every staff member of a tenant.
    fn get_staff_directory(&self, tenant_id: &str) -> Result<Vec<StaffMember>, DirectoryError>;

    /// Every known tenant, ordered by id.
    fn list_tenants(&self) -> Result<Vec<Tenant>, DirectoryError>;
}

// ---------------------------------------------------------------------------
// In-memory directory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct DirectoryData {
    tenants: BTreeMap<String, Tenant>,
    staff: BTreeMap<String, StaffMember>,
}

/// A directory held in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    data: RwLock<DirectoryData>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`add_tenant`](Self::add_tenant).
    pub fn with_tenant(self, tenant: Tenant) -> Self {
        self.add_tenant(tenant);
        self
    }

    /// Builder-style [`add_staff`](Self::add_staff).
    pub fn with_staff(self, staff: StaffMember) -> Self {
        self.add_staff(staff);
        self
    }

    pub fn add_tenant(&self, tenant: Tenant) {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.tenants.insert(tenant.id.clone(), tenant);
    }

    /// Adds or replaces a staff member, keyed by id.
    pub fn add_staff(&self, staff: StaffMember) {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.staff.insert(staff.id.clone(), staff);
    }
}

impl Directory for InMemoryDirectory {
    fn get_tenant(&self, tenant_id: &str) -> Result<Option<Tenant>, DirectoryError> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        Ok(data.tenants.get(tenant_id).cloned())
    }

    fn get_staff_directory(&self, tenant_id: &str) -> Result<Vec<StaffMember>, DirectoryError> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        Ok(data
            .staff
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    fn list_tenants(&self) -> Result<Vec<Tenant>, DirectoryError> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        Ok(data.tenants.values().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// YAML file directory
// ---------------------------------------------------------------------------

/// On-disk layout of `.desk/directory.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryFile {
    #[serde(default)]
    pub tenants: Vec<Tenant>,
    #[serde(default)]
    pub staff: Vec<StaffMember>,
}

/// A directory backed by a YAML file.
///
/// The file is re-read on every call so edits are picked up by a running
/// `desk serve` without a restart. A missing file is an empty directory.
#[derive(Debug, Clone)]
pub struct YamlDirectory {
    path: PathBuf,
}

impl YamlDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses the file.
    pub fn load(&self) -> Result<DirectoryFile, DirectoryError> {
        if !self.path.exists() {
            return Ok(DirectoryFile::default());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|source| DirectoryError::Read {
            path: self.path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(DirectoryFile::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Writes `file` to the backing path, creating parent directories.
    pub fn save(&self, file: &DirectoryFile) -> Result<(), DirectoryError> {
        let io_err = |source| DirectoryError::Read {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let yaml = serde_yaml::to_string(file)?;
        std::fs::write(&self.path, yaml).map_err(io_err)
    }
}

impl Directory for YamlDirectory {
    fn get_tenant(&self, tenant_id: &str) -> Result<Option<Tenant>, DirectoryError> {
        Ok(self.load()?.tenants.into_iter().find(|t| t.id == tenant_id))
    }

    fn get_staff_directory(&self, tenant_id: &str) -> Result<Vec<StaffMember>, DirectoryError> {
        let mut staff: Vec<StaffMember> = self
            .load()?
            .staff
            .into_iter()
            .filter(|s| s.tenant_id == tenant_id)
            .collect();
        staff.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(staff)
    }

    fn list_tenants(&self) -> Result<Vec<Tenant>, DirectoryError> {
        let mut tenants = self.load()?.tenants;
        tenants.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tenants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_core::enums::{Category, StaffLevel};
    use pretty_assertions::assert_eq;

    #[test]
    fn in_memory_filters_by_tenant() {
        let dir = InMemoryDirectory::new()
            .with_tenant(Tenant::new("t1", "Acme Lab"))
            .with_staff(StaffMember::new("s1", "t1", Category::Technical, StaffLevel::Mid, 3))
            .with_staff(StaffMember::new("s2", "t2", Category::Billing, StaffLevel::Junior, 3));

        assert_eq!(dir.get_tenant("t1").unwrap().unwrap().name, "Acme Lab");
        assert!(dir.get_tenant("t9").unwrap().is_none());

        let staff = dir.get_staff_directory("t1").unwrap();
        assert_eq!(staff.len(), 1);
        assert_eq!(staff[0].id, "s1");
    }

    #[test]
    fn yaml_file_with_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("directory.yaml");
        std::fs::write(
            &path,
            r#"
tenants:
  - id: t1
    name: Acme Lab
  - id: t0
    is_active: false
staff:
  - id: s2
    tenant_id: t1
    specialization: technical
    level: senior
  - id: s1
    tenant_id: t1
    max_concurrent_tickets: 2
"#,
        )
        .unwrap();

        let dir = YamlDirectory::new(&path);
        let tenants = dir.list_tenants().unwrap();
        assert_eq!(tenants.len(), 2);
        assert_eq!(tenants[0].id, "t0");
        assert!(!tenants[0].is_active);
        assert!(tenants[1].is_active);

        let staff = dir.get_staff_directory("t1").unwrap();
        assert_eq!(staff[0].id, "s1");
        assert_eq!(staff[0].max_concurrent_tickets, 2);
        assert_eq!(staff[0].specialization, Category::General);
        assert_eq!(staff[1].level, StaffLevel::Senior);
        assert_eq!(staff[1].max_concurrent_tickets, 5);
    }

    #[test]
    fn yaml_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = YamlDirectory::new(tmp.path().join("nope.yaml"));
        assert!(dir.list_tenants().unwrap().is_empty());
        assert!(dir.get_tenant("t1").unwrap().is_none());
    }

    #[test]
    fn yaml_save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = YamlDirectory::new(tmp.path().join("sub").join("directory.yaml"));
        let file = DirectoryFile {
            tenants: vec![Tenant::new("t1", "Acme")],
            staff: vec![StaffMember::new("s1", "t1", Category::Reports, StaffLevel::Lead, 4)],
        };
        dir.save(&file).unwrap();
        assert_eq!(dir.load().unwrap(), file);
    }

    #[test]
    fn yaml_rejects_unknown_level() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("directory.yaml");
        std::fs::write(&path, "staff:\n  - id: s1\n    tenant_id: t1\n    level: wizard\n").unwrap();
        assert!(matches!(
            YamlDirectory::new(&path).get_staff_directory("t1"),
            Err(DirectoryError::Parse(_))
        ));
    }
}
