//! Locating and loading `osprey.toml`
//!
//! Search order:
//!
//! ```text
//! --config <path>
//! $OSPREY_CONFIG
//! ./osprey.toml
//! <config dir>/osprey/osprey.toml
//! ```

use std::path::{Path, PathBuf};

use osprey_fs::ConfigStore;

use crate::{Error, OspreyConfig, Result, validation};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "OSPREY_CONFIG";
/// Environment variable overriding `ledger.api_key`
pub const API_KEY_ENV: &str = "OSPREY_API_KEY";

const CONFIG_FILE: &str = "osprey.toml";

/// Loads and validates the worker configuration.
pub struct ConfigLoader {
    store: ConfigStore,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            store: ConfigStore::new(),
        }
    }

    /// Candidate config paths in search order.
    pub fn candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(path) = explicit {
            paths.push(path.to_path_buf());
            return paths;
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            paths.push(PathBuf::from(path));
        }
        paths.push(PathBuf::from(CONFIG_FILE));
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("osprey").join(CONFIG_FILE));
        }
        paths
    }

    /// Find the first existing config file, as an absolute path.
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
        let searched = Self::candidates(explicit);
        let found = searched
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .ok_or(Error::ConfigNotFound { searched })?;
        dunce::canonicalize(&found).map_err(|e| osprey_fs::Error::io(&found, e).into())
    }

    /// Load, apply environment overrides, and validate.
    pub fn load(&self, path: &Path) -> Result<OspreyConfig> {
        let mut config: OspreyConfig = self.store.load(path)?;
        apply_overrides(&mut config, |key| std::env::var(key).ok());
        validation::validate(&config, path)?;
        tracing::debug!(path = %path.display(), alias = %config.project.alias, "loaded config");
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_overrides(config: &mut OspreyConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.is_empty()) {
        config.ledger.api_key = key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_is_the_only_candidate() {
        let candidates = ConfigLoader::candidates(Some(Path::new("/etc/osprey.toml")));
        assert_eq!(candidates, vec![PathBuf::from("/etc/osprey.toml")]);
    }

    #[test]
    fn locate_reports_searched_paths() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        match ConfigLoader::locate(Some(&missing)) {
            Err(Error::ConfigNotFound { searched }) => assert_eq!(searched, vec![missing]),
            other => panic!("expected ConfigNotFound, got {other:?}"),
        }
    }

    #[test]
    fn located_path_is_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("osprey.toml");
        std::fs::write(&path, "").unwrap();
        let located = ConfigLoader::locate(Some(&path)).unwrap();
        assert!(located.is_absolute());
        assert!(located.ends_with("osprey.toml"));
    }

    #[test]
    fn api_key_override() {
        let mut config: OspreyConfig = toml::from_str(
            "[project]\nalias = \"p\"\nstorage = \"/s\"\n[ledger]\nurl = \"http://h\"\napi_key = \"file\"\n",
        )
        .unwrap();
        apply_overrides(&mut config, |_| None);
        assert_eq!(config.ledger.api_key, "file");
        apply_overrides(&mut config, |k| (k == API_KEY_ENV).then(|| "env".to_string()));
        assert_eq!(config.ledger.api_key, "env");
    }
}
