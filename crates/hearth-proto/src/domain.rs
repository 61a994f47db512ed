// SPDX-License-Identifier: Apache-2.0
//! Entity domain model: the 24 closed domain kinds, entity metadata, and the
//! per-domain state records.

use serde::{Deserialize, Serialize};

use crate::fnv::fnv1a32;

/// The 24 closed entity domains, in declaration order. Declaration order is
/// the fixed iteration order used by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Domain {
    /// Binary on/off sensor.
    BinarySensor,
    /// Window/garage-door style cover.
    Cover,
    /// Fan speed/oscillation control.
    Fan,
    /// Light with brightness/color.
    Light,
    /// Numeric measurement sensor.
    Sensor,
    /// On/off switch.
    Switch,
    /// Momentary button.
    Button,
    /// Free-text sensor.
    TextSensor,
    /// A bus-level callable service (no state).
    Service,
    /// Camera stream (acknowledged, not semantically handled; see Non-goals).
    Camera,
    /// Climate/thermostat control.
    Climate,
    /// Numeric input.
    Number,
    /// Date input.
    Date,
    /// Time input.
    Time,
    /// Combined date+time input.
    DateTime,
    /// Free-text input.
    Text,
    /// Enumerated selection input.
    Select,
    /// Lock/unlock control.
    Lock,
    /// Valve open/close control.
    Valve,
    /// Media player control.
    MediaPlayer,
    /// Alarm control panel.
    AlarmControlPanel,
    /// Siren control.
    Siren,
    /// Discrete event source (e.g. a physical button's press/hold events).
    Event,
    /// Firmware/software update availability.
    Update,
}

impl Domain {
    /// All 24 domains, in declaration order.
    pub const ALL: [Domain; 24] = [
        Domain::BinarySensor,
        Domain::Cover,
        Domain::Fan,
        Domain::Light,
        Domain::Sensor,
        Domain::Switch,
        Domain::Button,
        Domain::TextSensor,
        Domain::Service,
        Domain::Camera,
        Domain::Climate,
        Domain::Number,
        Domain::Date,
        Domain::Time,
        Domain::DateTime,
        Domain::Text,
        Domain::Select,
        Domain::Lock,
        Domain::Valve,
        Domain::MediaPlayer,
        Domain::AlarmControlPanel,
        Domain::Siren,
        Domain::Event,
        Domain::Update,
    ];

    /// Whether this domain carries a `state` mixin (all but `Service`).
    #[must_use]
    pub const fn is_stateful(self) -> bool {
        !matches!(self, Domain::Service)
    }

    /// The zero/unknown-value [`EntityState`] a stateful domain's cell is
    /// seeded with before any real value has been observed, used by the
    /// client-side mirror registry when it learns of an entity via
    /// `ListEntitiesResponse`, before the first `StateResponse` arrives.
    /// Returns `None` for [`Domain::Service`], which carries no state.
    #[must_use]
    pub fn default_state(self) -> Option<EntityState> {
        Some(match self {
            // Neither carries an `EntityState` variant: `Service` has no
            // state mixin, and `Camera` is acknowledged but not
            // semantically modeled.
            Domain::Service | Domain::Camera => return None,
            Domain::BinarySensor => EntityState::BinarySensor {
                on: false,
                missing: true,
            },
            Domain::Sensor => EntityState::Sensor {
                value: 0.0,
                missing: true,
            },
            Domain::TextSensor => EntityState::TextSensor {
                value: String::new(),
                missing: true,
            },
            Domain::Switch => EntityState::Switch { on: false },
            Domain::Button => EntityState::Button,
            Domain::Cover => EntityState::Cover {
                position: 0.0,
                tilt: 0.0,
                is_moving: false,
            },
            Domain::Fan => EntityState::Fan {
                on: false,
                speed: 0.0,
                oscillating: false,
            },
            Domain::Light => EntityState::Light {
                on: false,
                brightness: 0.0,
                color_temp: None,
            },
            Domain::Climate => EntityState::Climate {
                current_temperature: None,
                target_temperature: 0.0,
                mode: String::new(),
                action: String::new(),
            },
            Domain::Number => EntityState::Number {
                value: 0.0,
                missing: true,
            },
            Domain::Date => EntityState::Date {
                year: 1970,
                month: 1,
                day: 1,
            },
            Domain::Time => EntityState::Time {
                hour: 0,
                minute: 0,
                second: 0,
            },
            Domain::DateTime => EntityState::DateTime { epoch_seconds: 0 },
            Domain::Text => EntityState::Text {
                value: String::new(),
            },
            Domain::Select => EntityState::Select {
                value: String::new(),
            },
            Domain::Lock => EntityState::Lock {
                state: String::new(),
            },
            Domain::Valve => EntityState::Valve {
                position: 0.0,
                is_moving: false,
            },
            Domain::MediaPlayer => EntityState::MediaPlayer {
                state: String::new(),
                volume: 0.0,
                muted: false,
            },
            Domain::AlarmControlPanel => EntityState::AlarmControlPanel {
                state: String::new(),
            },
            Domain::Siren => EntityState::Siren { on: false },
            Domain::Event => EntityState::Event {
                event_type: String::new(),
            },
            Domain::Update => EntityState::Update {
                current_version: String::new(),
                latest_version: None,
                in_progress: false,
            },
        })
    }
}

/// Entity category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EntityCategory {
    /// No special category.
    #[default]
    None,
    /// Configuration entity, shown separately in controllers.
    Config,
    /// Diagnostic entity, shown separately in controllers.
    Diagnostic,
}

/// A device-class string. Validated (non-empty, ASCII, no whitespace) but
/// never semantically interpreted by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceClass(String);

/// Error returned when a `DeviceClass` or `icon` string fails validation.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Device class contained characters other than ASCII lowercase/underscore.
    #[error("invalid device class: {0:?}")]
    InvalidDeviceClass(String),
    /// Icon did not match `[pack]:[name]` or the empty string.
    #[error("invalid icon: {0:?}")]
    InvalidIcon(String),
    /// `object_id` was empty.
    #[error("object_id must not be empty")]
    EmptyObjectId,
}

impl DeviceClass {
    /// Validate and construct a device class string.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidDeviceClass`] if `raw` is empty or
    /// contains anything outside ASCII lowercase letters and underscores.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        let valid = !raw.is_empty()
            && raw
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b == b'_');
        if valid {
            Ok(Self(raw))
        } else {
            Err(ValidationError::InvalidDeviceClass(raw))
        }
    }

    /// The validated string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validate an `icon` string: either empty, or `[pack]:[name]` with
/// non-empty pack/name halves.
///
/// # Errors
/// Returns [`ValidationError::InvalidIcon`] when the shape doesn't match.
pub fn validate_icon(icon: &str) -> Result<(), ValidationError> {
    if icon.is_empty() {
        return Ok(());
    }
    match icon.split_once(':') {
        Some((pack, name)) if !pack.is_empty() && !name.is_empty() => Ok(()),
        _ => Err(ValidationError::InvalidIcon(icon.to_owned())),
    }
}

/// Invariant attributes shared by every entity, regardless of domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInfo {
    /// Non-empty ASCII slug, unique within its domain.
    pub object_id: String,
    /// `FNV-1a-32(object_id)`, the registry's lookup key.
    pub hash_key: u32,
    /// Human-readable display name.
    pub name: String,
    /// Whether controllers should hide this entity by default.
    pub disabled_by_default: bool,
    /// Whether this entity is internal (excluded from `ListEntities*`).
    pub internal: bool,
    /// Configuration/diagnostic grouping.
    pub entity_category: EntityCategory,
    /// `[pack]:[name]` icon override, or empty.
    pub icon: String,
    /// Device class (validated, not interpreted), or `None`.
    pub device_class: Option<DeviceClass>,
    /// Free-form unit string (e.g. `"°C"`), or empty.
    pub unit_of_measurement: String,
}

impl EntityInfo {
    /// Construct entity metadata, computing `hash_key` from `object_id`.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyObjectId`] if `object_id` is empty.
    pub fn new(object_id: impl Into<String>, name: impl Into<String>) -> Result<Self, ValidationError> {
        let object_id = object_id.into();
        if object_id.is_empty() {
            return Err(ValidationError::EmptyObjectId);
        }
        let hash_key = fnv1a32(&object_id);
        Ok(Self {
            object_id,
            hash_key,
            name: name.into(),
            disabled_by_default: false,
            internal: false,
            entity_category: EntityCategory::None,
            icon: String::new(),
            device_class: None,
            unit_of_measurement: String::new(),
        })
    }
}

/// Per-domain state records. A state cell stores exactly one of these,
/// matching the entity's domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityState {
    /// `BinarySensorState { on, missing }`.
    BinarySensor {
        /// Current on/off value.
        on: bool,
        /// Whether the sensor value is currently unavailable.
        missing: bool,
    },
    /// `SensorState { value, missing }`.
    Sensor {
        /// Current numeric value.
        value: f32,
        /// Whether the sensor value is currently unavailable.
        missing: bool,
    },
    /// Free-text sensor state.
    TextSensor {
        /// Current text value.
        value: String,
        /// Whether the value is currently unavailable.
        missing: bool,
    },
    /// Switch on/off state.
    Switch {
        /// Current on/off value.
        on: bool,
    },
    /// Momentary button has no persisted state; present for uniformity.
    Button,
    /// Cover position/tilt state.
    Cover {
        /// Position, 0.0 (closed) .. 1.0 (open).
        position: f32,
        /// Tilt, 0.0 .. 1.0, when supported.
        tilt: f32,
        /// Whether the cover is actively moving.
        is_moving: bool,
    },
    /// Fan on/off, speed, and oscillation state.
    Fan {
        /// Current on/off value.
        on: bool,
        /// Speed level, 0.0 .. 1.0.
        speed: f32,
        /// Whether oscillation is enabled.
        oscillating: bool,
    },
    /// Light state.
    Light {
        /// Current on/off value.
        on: bool,
        /// Brightness, 0.0 .. 1.0.
        brightness: f32,
        /// Color temperature in mireds, when supported.
        color_temp: Option<f32>,
    },
    /// Climate state.
    Climate {
        /// Current measured temperature, if known.
        current_temperature: Option<f32>,
        /// Target temperature.
        target_temperature: f32,
        /// Current HVAC mode (free string, validated upstream).
        mode: String,
        /// Current HVAC action (free string).
        action: String,
    },
    /// Numeric input state.
    Number {
        /// Current value.
        value: f32,
        /// Whether the value is currently unavailable.
        missing: bool,
    },
    /// Date input state, as an ISO-8601 calendar date.
    Date {
        /// Year.
        year: u16,
        /// Month, 1-12.
        month: u8,
        /// Day, 1-31.
        day: u8,
    },
    /// Time input state.
    Time {
        /// Hour, 0-23.
        hour: u8,
        /// Minute, 0-59.
        minute: u8,
        /// Second, 0-59.
        second: u8,
    },
    /// Combined date+time input state (epoch seconds, UTC).
    DateTime {
        /// Epoch seconds.
        epoch_seconds: u64,
    },
    /// Free-text input state.
    Text {
        /// Current text value.
        value: String,
    },
    /// Enumerated selection state.
    Select {
        /// Currently selected option.
        value: String,
    },
    /// Lock state.
    Lock {
        /// Free string lock state (e.g. `"locked"`, `"unlocked"`).
        state: String,
    },
    /// Valve position state.
    Valve {
        /// Position, 0.0 (closed) .. 1.0 (open).
        position: f32,
        /// Whether the valve is actively moving.
        is_moving: bool,
    },
    /// Media player state.
    MediaPlayer {
        /// Free string player state (e.g. `"playing"`, `"paused"`, `"idle"`).
        state: String,
        /// Volume, 0.0 .. 1.0.
        volume: f32,
        /// Whether playback is muted.
        muted: bool,
    },
    /// Alarm control panel state.
    AlarmControlPanel {
        /// Free string alarm state (e.g. `"armed_home"`, `"disarmed"`).
        state: String,
    },
    /// Siren state.
    Siren {
        /// Current on/off value.
        on: bool,
    },
    /// Discrete event; carries the most recently fired event type.
    Event {
        /// Free string event type (e.g. `"single_click"`).
        event_type: String,
    },
    /// Update availability state.
    Update {
        /// Currently installed version string.
        current_version: String,
        /// Latest available version string, if known.
        latest_version: Option<String>,
        /// Whether an update is actively in progress.
        in_progress: bool,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn all_domains_are_distinct_and_complete() {
        assert_eq!(Domain::ALL.len(), 24);
    }

    #[test]
    fn device_class_rejects_non_snake_case() {
        assert!(DeviceClass::new("Motion").is_err());
        assert!(DeviceClass::new("").is_err());
        assert!(DeviceClass::new("motion").is_ok());
        assert!(DeviceClass::new("carbon_dioxide").is_ok());
    }

    #[test]
    fn icon_validation() {
        assert!(validate_icon("").is_ok());
        assert!(validate_icon("mdi:motion-sensor").is_ok());
        assert!(validate_icon("mdi:").is_err());
        assert!(validate_icon(":motion").is_err());
        assert!(validate_icon("mdi").is_err());
    }

    #[test]
    fn entity_info_hash_key_matches_fnv1a32() {
        let e = EntityInfo::new("motion", "Motion").unwrap();
        assert_eq!(e.hash_key, fnv1a32("motion"));
    }

    #[test]
    fn entity_info_rejects_empty_object_id() {
        assert!(EntityInfo::new("", "x").is_err());
    }

    #[test]
    fn service_domain_is_not_stateful() {
        assert!(!Domain::Service.is_stateful());
        assert!(Domain::Sensor.is_stateful());
    }
}
