// SPDX-License-Identifier: Apache-2.0
//! Node identity reporting: builds `HelloResponse`/`DeviceInfoResponse` from
//! the node's static configuration.

use hearth_config::NodeConfig;
use hearth_proto::{DeviceInfoResponse, HelloResponse};

/// The API version this implementation speaks (major component).
pub const API_VERSION_MAJOR: u32 = 1;
/// See [`API_VERSION_MAJOR`].
pub const API_VERSION_MINOR: u32 = 10;

/// This implementation's free-form server identification string, reported
/// in `HelloResponse::server_info`.
pub const SERVER_INFO: &str = concat!("hearth ", env!("CARGO_PKG_VERSION"));

/// Build the `HelloResponse` for `config`.
#[must_use]
pub fn hello_response(config: &NodeConfig) -> HelloResponse {
    HelloResponse {
        api_version_major: API_VERSION_MAJOR,
        api_version_minor: API_VERSION_MINOR,
        name: config.name.clone(),
        server_info: SERVER_INFO.to_owned(),
    }
}

/// Build the `DeviceInfoResponse` for `config`.
#[must_use]
pub fn device_info_response(config: &NodeConfig) -> DeviceInfoResponse {
    DeviceInfoResponse {
        name: config.name.clone(),
        friendly_name: if config.friendly_name.is_empty() {
            config.name.clone()
        } else {
            config.friendly_name.clone()
        },
        model: "hearth-node".to_owned(),
        manufacturer: "hearth".to_owned(),
        mac_address: config.mac.to_hex_string(),
        api_source_version: env!("CARGO_PKG_VERSION").to_owned(),
        project_name: config.project.name.clone(),
        project_version: config.project.version.clone(),
        has_deep_sleep: false,
        webserver_port: 0,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn hello_response_reports_api_v1_10() {
        let config = NodeConfig::new("node-a", [0x02, 0, 0, 0, 0, 1]).unwrap();
        let hello = hello_response(&config);
        assert_eq!(hello.api_version_major, 1);
        assert_eq!(hello.api_version_minor, 10);
        assert_eq!(hello.name, "node-a");
    }

    #[test]
    fn device_info_falls_back_to_name_when_no_friendly_name() {
        let config = NodeConfig::new("node-a", [0x02, 0, 0, 0, 0, 1]).unwrap();
        let info = device_info_response(&config);
        assert_eq!(info.friendly_name, "node-a");
        assert_eq!(info.mac_address, "02:00:00:00:00:01");
    }
}
