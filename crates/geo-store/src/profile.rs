use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::error::Result;
use crate::store::Store;

/// Environment variable overriding the base directory.
pub const DATA_DIR_ENV: &str = "GEOANCHOR_DATA_DIR";

pub const DEFAULT_PROFILE: &str = "default";

/// Default base directory for all geoanchor storage.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".geoanchor")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Explicit directory, then `GEOANCHOR_DATA_DIR`, then `~/.geoanchor`.
pub fn resolve_base_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    env::var(DATA_DIR_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(default_base_dir)
}

/// Sanitize a profile name for use as a filename.
fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn resolve_profile(name: Option<&str>) -> String {
    name.map(sanitize_name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
}

/// One store per device profile.
///
/// Layout:
/// ```text
/// ~/.geoanchor/
/// └── profiles/
///     ├── default.db
///     └── ...
/// ```
pub struct ProfileStore {
    store: Store,
    profile: String,
    path: PathBuf,
}

impl ProfileStore {
    /// Open the profile's database, creating directories as needed.
    /// `base_dir` overrides the resolved base directory.
    pub fn open(profile: Option<&str>, base_dir: Option<&Path>) -> Result<Self> {
        let base = resolve_base_dir(base_dir);
        let profiles_dir = base.join("profiles");
        fs::create_dir_all(&profiles_dir)?;

        let profile = resolve_profile(profile);
        let path = profiles_dir.join(format!("{profile}.db"));
        let store = Store::open(&path)?;
        tracing::info!("opened profile '{profile}' at {}", path.display());

        Ok(Self {
            store,
            profile,
            path,
        })
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Database file backing this profile.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn into_store(self) -> Store {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_directory_creation() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("nested");
        let ps = ProfileStore::open(None, Some(&base)).unwrap();
        assert_eq!(ps.profile(), DEFAULT_PROFILE);
        assert!(base.join("profiles").join("default.db").exists());
        assert_eq!(ps.path(), base.join("profiles/default.db").as_path());
    }

    #[test]
    fn test_unwritable_base_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();
        let err = ProfileStore::open(None, Some(&file)).err().unwrap();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn test_profile_isolation() {
        let dir = tempfile::tempdir().unwrap();
        let a = ProfileStore::open(Some("phone"), Some(dir.path())).unwrap();
        let b = ProfileStore::open(Some("tablet"), Some(dir.path())).unwrap();
        a.store().set_preference("k", "phone").unwrap();
        assert_eq!(b.store().get_preference("k").unwrap(), None);
    }

    #[test]
    fn test_profile_name_sanitization() {
        assert_eq!(sanitize_name("my phone/2"), "my_phone_2");
        assert_eq!(sanitize_name("  pixel-8_pro "), "pixel-8_pro");
    }

    #[test]
    fn test_empty_profile_falls_back_to_default() {
        assert_eq!(resolve_profile(Some("   ")), DEFAULT_PROFILE);
        assert_eq!(resolve_profile(None), DEFAULT_PROFILE);
        assert_eq!(resolve_profile(Some("field")), "field");
    }

    #[test]
    fn test_explicit_base_dir_wins() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_base_dir(Some(dir.path())), dir.path());
    }
}
