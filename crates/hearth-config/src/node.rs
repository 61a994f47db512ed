// SPDX-License-Identifier: Apache-2.0
//! The configuration surface consumed (not defined as a DSL) by the node
//! and API layers.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mac::MacAddress;

/// `project.{name,version}` reported in `DeviceInfoResponse`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Project name, or empty if this node doesn't belong to one.
    #[serde(default)]
    pub name: String,
    /// Project version string, or empty.
    #[serde(default)]
    pub version: String,
}

/// One entry in the node's component list. Components may declare further
/// dependencies via `auto_load`, folded in by the node lifecycle before
/// instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// The component's registered constructor name.
    pub name: String,
    /// Component-specific parameters, opaque to the node lifecycle.
    #[serde(default)]
    pub params: serde_yaml::Mapping,
    /// Additional component names this one requires, auto-loaded with
    /// defaults if not otherwise present in the component list.
    #[serde(default)]
    pub auto_load: Vec<String>,
}

/// Node identity and the component set to instantiate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Machine-readable node name (used as the default YAML config key).
    pub name: String,
    /// Human-readable display name. Defaults to `name` if absent.
    #[serde(default)]
    pub friendly_name: String,
    /// Logical grouping/area name (e.g. `"living_room"`).
    #[serde(default)]
    pub area: String,
    /// Locally-administered MAC address identifying this node.
    pub mac: MacAddress,
    /// Project metadata surfaced in `DeviceInfoResponse`.
    #[serde(default)]
    pub project: ProjectInfo,
    /// Components to instantiate, in the order given (startup order is
    /// subsequently determined by `InitializationPriority`, not this order).
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
    /// The API server surface.
    pub api: ApiConfig,
}

impl NodeConfig {
    /// Construct a minimal node config with no components and no API
    /// authentication, primarily for tests and `util` subcommands.
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] if `mac` is not
    /// locally-administered.
    pub fn new(name: impl Into<String>, mac: [u8; 6]) -> Result<Self, ConfigError> {
        let name = name.into();
        Ok(Self {
            friendly_name: name.clone(),
            name,
            area: String::new(),
            mac: MacAddress::new(mac)?,
            project: ProjectInfo::default(),
            components: Vec::new(),
            api: ApiConfig::default(),
        })
    }
}

/// Noise encryption parameters for the API server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Base64-encoded 32-byte PSK.
    pub key: String,
}

/// The ESPHome-Native-API-compatible server surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind address, e.g. `"0.0.0.0"` or `"127.0.0.1"`.
    #[serde(default = "default_address")]
    pub address: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Plaintext connect password, if set. Hashed at load time into the
    /// session layer's `PasswordCheck` port; never compared in the clear.
    #[serde(default)]
    pub password: Option<String>,
    /// Noise transport parameters. Absent selects the plaintext transport.
    #[serde(default)]
    pub encryption: Option<EncryptionConfig>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            password: None,
            encryption: None,
        }
    }
}

fn default_address() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    6053
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_api_config_uses_standard_port() {
        assert_eq!(ApiConfig::default().port, 6053);
    }

    #[test]
    fn yaml_round_trip_preserves_shape() {
        let cfg = NodeConfig::new("node-a", [0x02, 0, 0, 0, 0, 1]).unwrap();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: NodeConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn malformed_yaml_is_reported() {
        let err = serde_yaml::from_str::<NodeConfig>("not: [valid").unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
