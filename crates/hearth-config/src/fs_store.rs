// SPDX-License-Identifier: Apache-2.0
//! Filesystem-backed [`ConfigStore`], rooted at the platform config
//! directory.

use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::ConfigError;
use crate::store::ConfigStore;

/// Stores configs as YAML files under the platform config directory (e.g.
/// `~/.config/hearth` on Linux).
pub struct FsConfigStore {
    base: PathBuf,
}

impl FsConfigStore {
    /// Create a store rooted at the user config directory.
    ///
    /// # Errors
    /// Returns [`ConfigError::Other`] if the platform config directory
    /// can't be resolved, or [`ConfigError::Io`] if it can't be created.
    pub fn new() -> Result<Self, ConfigError> {
        let proj = ProjectDirs::from("dev", "hearth", "hearth")
            .ok_or_else(|| ConfigError::Other("could not resolve config dir".into()))?;
        Self::at(proj.config_dir().to_path_buf())
    }

    /// Create a store rooted at an explicit directory (primarily for
    /// tests, or for an operator-supplied config root).
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the directory can't be created.
    pub fn at(base: PathBuf) -> Result<Self, ConfigError> {
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base.join(format!("{key}.yaml"))
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::NotFound),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::NodeConfig;

    #[test]
    fn round_trips_a_node_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::at(dir.path().to_path_buf()).unwrap();
        let service = crate::ConfigService::new(store);

        let cfg = NodeConfig::new("node-a", [0x02, 0, 0, 0, 0, 1]).unwrap();
        service.save("node", &cfg).unwrap();
        let loaded: NodeConfig = service.load("node").unwrap().unwrap();
        assert_eq!(loaded.name, "node-a");
    }

    #[test]
    fn missing_key_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsConfigStore::at(dir.path().to_path_buf()).unwrap();
        let service = crate::ConfigService::new(store);
        let loaded: Option<NodeConfig> = service.load("absent").unwrap();
        assert!(loaded.is_none());
    }
}
