// SPDX-License-Identifier: Apache-2.0
//! The message catalog's record types: every message the session layer must
//! handle explicitly, plus a generic pass-through for message types the core
//! only acknowledges and discards (camera/bluetooth-proxy/voice-assistant).

use serde::{Deserialize, Serialize};

use crate::domain::{Domain, EntityInfo, EntityState};

/// A length-tagged byte frame: the unit the transport layer moves. Type `0`
/// is reserved and never assigned to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// 16-bit message-type code.
    pub message_type: u16,
    /// Opaque, domain-specific payload bytes.
    pub payload: Vec<u8>,
}

/// Which side(s) of a session may legitimately send a given message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Only the client (controller) may send this.
    Client,
    /// Only the server (node) may send this.
    Server,
    /// Either side may send this.
    Both,
}

/// Client → server hello.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HelloRequest {
    /// Major API version the client speaks.
    pub api_version_major: u32,
    /// Minor API version the client speaks.
    pub api_version_minor: u32,
    /// Free-form client identifier string.
    pub client_info: String,
}

/// Server → client hello acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HelloResponse {
    /// Major API version the server speaks.
    pub api_version_major: u32,
    /// Minor API version the server speaks.
    pub api_version_minor: u32,
    /// Node name.
    pub name: String,
    /// Free-form server implementation string.
    pub server_info: String,
}

/// Client → server connect (authentication).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConnectRequest {
    /// Plaintext password, or empty when no password is configured.
    pub password: String,
}

/// Server → client connect result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConnectResponse {
    /// `true` when the supplied password was rejected.
    pub invalid: bool,
}

/// Either direction: request an orderly close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DisconnectRequest;

/// Either direction: acknowledge an orderly close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DisconnectResponse;

/// Either direction: keepalive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PingRequest;

/// Either direction: keepalive reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PingResponse;

/// Client → server: request wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GetTimeRequest;

/// Server → client: wall-clock time reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GetTimeResponse {
    /// Unix epoch seconds.
    pub epoch_seconds: u64,
}

/// Client → server: request node identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeviceInfoRequest;

/// Server → client: node identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeviceInfoResponse {
    /// Node name.
    pub name: String,
    /// Human-friendly display name.
    pub friendly_name: String,
    /// Hardware model string.
    pub model: String,
    /// Manufacturer string.
    pub manufacturer: String,
    /// Colon-separated MAC address.
    pub mac_address: String,
    /// Implementation version string (this node's analog of `esphome_version`).
    pub api_source_version: String,
    /// Project name, if configured.
    pub project_name: String,
    /// Project version, if configured.
    pub project_version: String,
    /// Whether the node supports deep sleep (always `false`; out of scope).
    pub has_deep_sleep: bool,
    /// Configured webserver port, `0` when not served (out of scope component).
    pub webserver_port: u32,
}

/// Client → server: list all non-internal entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ListEntitiesRequest;

/// Server → client: one non-internal entity's descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEntitiesResponse {
    /// The entity's domain.
    pub domain: Domain,
    /// The entity's invariant metadata.
    pub info: EntityInfo,
}

/// Server → client: entity listing is complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ListEntitiesDoneResponse;

/// Client → server: subscribe to state-change notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SubscribeStatesRequest;

/// Server → client: an entity's current or newly changed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateResponse {
    /// The entity's domain.
    pub domain: Domain,
    /// The entity's `hash_key`.
    pub key: u32,
    /// The state value.
    pub state: EntityState,
}

/// Client → server: subscribe to log messages at or above `level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SubscribeLogsRequest {
    /// Minimum severity to receive, 0 (trace) .. 5 (error).
    pub level: u8,
}

/// Server → client: a single log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SubscribeLogsResponse {
    /// Severity of this line, 0 (trace) .. 5 (error).
    pub level: u8,
    /// Formatted log message.
    pub message: String,
}

/// A command issued against one entity. `kind` carries the domain-specific
/// payload; domains with no implemented server-side handling surface as
/// [`CommandKind::Unimplemented`] and are logged, not silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// The target entity's domain.
    pub domain: Domain,
    /// The target entity's `hash_key`.
    pub key: u32,
    /// The command payload.
    pub kind: CommandKind,
}

/// Domain-specific command payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandKind {
    /// `switch.turn_on`/`turn_off`.
    Switch {
        /// Requested on/off state.
        state: bool,
    },
    /// `button.press`.
    Button,
    /// `number.set_value`.
    Number {
        /// Requested value.
        value: f32,
    },
    /// `climate.control`.
    Climate {
        /// Requested target temperature, if changing.
        target_temperature: Option<f32>,
        /// Requested HVAC mode, if changing.
        mode: Option<String>,
    },
    /// `select.set_option`.
    Select {
        /// Requested option.
        option: String,
    },
    /// `light.turn_on`/`turn_off`/color/brightness control.
    Light {
        /// Requested on/off state, if changing.
        state: Option<bool>,
        /// Requested brightness, 0.0 .. 1.0, if changing.
        brightness: Option<f32>,
        /// Requested color temperature in mireds, if changing.
        color_temp: Option<f32>,
    },
    /// A command for a domain with no server-side handler wired yet
    /// (`cover`, `light` beyond the above, `lock`, `media_player`, `date`,
    /// `time`, `datetime`, `valve`, `siren`, `select` beyond the above,
    /// `text`, `alarm_control_panel`). Carries the raw payload bytes so the
    /// catalog round-trips even though the core takes no domain-specific
    /// action.
    Unimplemented {
        /// Opaque payload, preserved for logging/diagnostics.
        raw: Vec<u8>,
    },
}

/// A message type the core acknowledges but never interprets (camera,
/// Bluetooth-proxy, voice-assistant sub-protocols). Carries the original
/// type code so it can still be echoed/logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledged {
    /// The original wire type code.
    pub message_type: u16,
}

/// Every message record the core knows about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// See [`HelloRequest`].
    HelloRequest(HelloRequest),
    /// See [`HelloResponse`].
    HelloResponse(HelloResponse),
    /// See [`ConnectRequest`].
    ConnectRequest(ConnectRequest),
    /// See [`ConnectResponse`].
    ConnectResponse(ConnectResponse),
    /// See [`DisconnectRequest`].
    DisconnectRequest(DisconnectRequest),
    /// See [`DisconnectResponse`].
    DisconnectResponse(DisconnectResponse),
    /// See [`PingRequest`].
    PingRequest(PingRequest),
    /// See [`PingResponse`].
    PingResponse(PingResponse),
    /// See [`GetTimeRequest`].
    GetTimeRequest(GetTimeRequest),
    /// See [`GetTimeResponse`].
    GetTimeResponse(GetTimeResponse),
    /// See [`DeviceInfoRequest`].
    DeviceInfoRequest(DeviceInfoRequest),
    /// See [`DeviceInfoResponse`].
    DeviceInfoResponse(DeviceInfoResponse),
    /// See [`ListEntitiesRequest`].
    ListEntitiesRequest(ListEntitiesRequest),
    /// See [`ListEntitiesResponse`].
    ListEntitiesResponse(ListEntitiesResponse),
    /// See [`ListEntitiesDoneResponse`].
    ListEntitiesDoneResponse(ListEntitiesDoneResponse),
    /// See [`SubscribeStatesRequest`].
    SubscribeStatesRequest(SubscribeStatesRequest),
    /// See [`StateResponse`].
    StateResponse(StateResponse),
    /// See [`SubscribeLogsRequest`].
    SubscribeLogsRequest(SubscribeLogsRequest),
    /// See [`SubscribeLogsResponse`].
    SubscribeLogsResponse(SubscribeLogsResponse),
    /// See [`Command`].
    Command(Command),
    /// See [`Acknowledged`].
    Acknowledged(Acknowledged),
}

impl Message {
    /// The 16-bit type code this message is registered under in the
    /// catalog. Never `0` (reserved).
    #[must_use]
    pub fn message_type_code(&self) -> u16 {
        match self {
            Message::HelloRequest(_) => 1,
            Message::HelloResponse(_) => 2,
            Message::ConnectRequest(_) => 3,
            Message::ConnectResponse(_) => 4,
            Message::DisconnectRequest(_) => 5,
            Message::DisconnectResponse(_) => 6,
            Message::PingRequest(_) => 7,
            Message::PingResponse(_) => 8,
            Message::GetTimeRequest(_) => 9,
            Message::GetTimeResponse(_) => 10,
            Message::DeviceInfoRequest(_) => 11,
            Message::DeviceInfoResponse(_) => 12,
            Message::ListEntitiesRequest(_) => 13,
            Message::ListEntitiesResponse(r) => 100 + domain_index(r.domain) as u16,
            Message::ListEntitiesDoneResponse(_) => 14,
            Message::SubscribeStatesRequest(_) => 15,
            Message::StateResponse(r) => 200 + domain_index(r.domain) as u16,
            Message::SubscribeLogsRequest(_) => 16,
            Message::SubscribeLogsResponse(_) => 17,
            Message::Command(c) => 300 + domain_index(c.domain) as u16,
            Message::Acknowledged(a) => a.message_type,
        }
    }

    /// Which side(s) may legitimately send this message.
    #[must_use]
    pub fn source(&self) -> Source {
        match self {
            Message::HelloRequest(_)
            | Message::ConnectRequest(_)
            | Message::GetTimeRequest(_)
            | Message::DeviceInfoRequest(_)
            | Message::ListEntitiesRequest(_)
            | Message::SubscribeStatesRequest(_)
            | Message::SubscribeLogsRequest(_)
            | Message::Command(_) => Source::Client,
            Message::HelloResponse(_)
            | Message::ConnectResponse(_)
            | Message::GetTimeResponse(_)
            | Message::DeviceInfoResponse(_)
            | Message::ListEntitiesResponse(_)
            | Message::ListEntitiesDoneResponse(_)
            | Message::StateResponse(_)
            | Message::SubscribeLogsResponse(_) => Source::Server,
            Message::DisconnectRequest(_)
            | Message::DisconnectResponse(_)
            | Message::PingRequest(_)
            | Message::PingResponse(_)
            | Message::Acknowledged(_) => Source::Both,
        }
    }
}

fn domain_index(domain: Domain) -> usize {
    Domain::ALL
        .iter()
        .position(|d| *d == domain)
        .unwrap_or(Domain::ALL.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn type_codes_are_never_zero() {
        let msgs = [
            Message::HelloRequest(HelloRequest::default()),
            Message::PingResponse(PingResponse::default()),
            Message::ListEntitiesDoneResponse(ListEntitiesDoneResponse::default()),
        ];
        for m in msgs {
            assert_ne!(m.message_type_code(), 0);
        }
    }

    #[test]
    fn per_domain_codes_are_distinct() {
        let a = Message::StateResponse(StateResponse {
            domain: Domain::BinarySensor,
            key: 1,
            state: EntityState::BinarySensor {
                on: false,
                missing: false,
            },
        });
        let b = Message::StateResponse(StateResponse {
            domain: Domain::Sensor,
            key: 2,
            state: EntityState::Sensor {
                value: 1.0,
                missing: false,
            },
        });
        assert_ne!(a.message_type_code(), b.message_type_code());
    }

    #[test]
    fn source_direction_is_enforced_by_caller() {
        assert!(matches!(
            Message::HelloRequest(HelloRequest::default()).source(),
            Source::Client
        ));
        assert!(matches!(
            Message::HelloResponse(HelloResponse::default()).source(),
            Source::Server
        ));
        assert!(matches!(
            Message::PingRequest(PingRequest::default()).source(),
            Source::Both
        ));
    }
}
