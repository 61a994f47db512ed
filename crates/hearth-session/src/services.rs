// SPDX-License-Identifier: Apache-2.0
//! Translates inbound `Command` records into bus service calls.
//!
//! `switch`, `button`, `number`, `climate`, `select`, and `light` have
//! concrete wire payloads and get a typed topic each. Every other domain
//! (`cover`, `lock`, `media_player`, `date`, `time`, `datetime`, `valve`,
//! `siren`, `text`, `alarm_control_panel`, and any `select`/`light` shape
//! the catalog couldn't parse into the handled variants) has no
//! server-side handler wired, since a node with no real hardware attached
//! has no meaningful action to take for them; those surface as
//! [`UnimplementedCommand`] and are only logged, never guessed at.

use hearth_bus::{Bus, Topic};
use hearth_proto::{Command, CommandKind, Domain};

/// `switch.turn_on`/`turn_off`.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCommand {
    /// Target entity's `hash_key`.
    pub key: u32,
    /// Requested on/off state.
    pub state: bool,
}

impl Topic for SwitchCommand {
    fn tag() -> String {
        "switch.command".to_owned()
    }
}

/// `button.press`.
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonPress {
    /// Target entity's `hash_key`.
    pub key: u32,
}

impl Topic for ButtonPress {
    fn tag() -> String {
        "button.press".to_owned()
    }
}

/// `number.set_value`.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberSetValue {
    /// Target entity's `hash_key`.
    pub key: u32,
    /// Requested value.
    pub value: f32,
}

impl Topic for NumberSetValue {
    fn tag() -> String {
        "number.set_value".to_owned()
    }
}

/// `climate.control`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateControl {
    /// Target entity's `hash_key`.
    pub key: u32,
    /// Requested target temperature, if changing.
    pub target_temperature: Option<f32>,
    /// Requested HVAC mode, if changing.
    pub mode: Option<String>,
}

impl Topic for ClimateControl {
    fn tag() -> String {
        "climate.control".to_owned()
    }
}

/// `select.set_option`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectSetOption {
    /// Target entity's `hash_key`.
    pub key: u32,
    /// Requested option.
    pub option: String,
}

impl Topic for SelectSetOption {
    fn tag() -> String {
        "select.set_option".to_owned()
    }
}

/// `light.turn_on`/`turn_off`/color/brightness control.
#[derive(Debug, Clone, PartialEq)]
pub struct LightCommand {
    /// Target entity's `hash_key`.
    pub key: u32,
    /// Requested on/off state, if changing.
    pub state: Option<bool>,
    /// Requested brightness, 0.0 .. 1.0, if changing.
    pub brightness: Option<f32>,
    /// Requested color temperature in mireds, if changing.
    pub color_temp: Option<f32>,
}

impl Topic for LightCommand {
    fn tag() -> String {
        "light.command".to_owned()
    }
}

/// A command whose domain has no server-side handler wired.
/// Logged via [`dispatch_command`], never dropped silently.
#[derive(Debug, Clone, PartialEq)]
pub struct UnimplementedCommand {
    /// The target entity's domain.
    pub domain: Domain,
    /// Target entity's `hash_key`.
    pub key: u32,
}

impl Topic for UnimplementedCommand {
    fn tag() -> String {
        "command.unimplemented".to_owned()
    }
}

/// Translate `command` into a call against the matching bus service topic.
/// No reply is ever emitted.
pub async fn dispatch_command(bus: &Bus, command: Command) {
    let key = command.key;
    match command.kind {
        CommandKind::Switch { state } => {
            bus.call_service(SwitchCommand { key, state }).await;
        }
        CommandKind::Button => {
            bus.call_service(ButtonPress { key }).await;
        }
        CommandKind::Number { value } => {
            bus.call_service(NumberSetValue { key, value }).await;
        }
        CommandKind::Climate {
            target_temperature,
            mode,
        } => {
            bus.call_service(ClimateControl {
                key,
                target_temperature,
                mode,
            })
            .await;
        }
        CommandKind::Select { option } => {
            bus.call_service(SelectSetOption { key, option }).await;
        }
        CommandKind::Light {
            state,
            brightness,
            color_temp,
        } => {
            bus.call_service(LightCommand {
                key,
                state,
                brightness,
                color_temp,
            })
            .await;
        }
        CommandKind::Unimplemented { raw } => {
            tracing::warn!(
                domain = ?command.domain,
                key,
                raw_len = raw.len(),
                "command for a domain with no server-side handler; logging, not acting"
            );
            crate::logging::log(
                bus,
                3,
                format!("command for {:?} (key {key}) has no server-side handler", command.domain),
            )
            .await;
            bus.call_service(UnimplementedCommand {
                domain: command.domain,
                key,
            })
            .await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use hearth_bus::ServiceRequest;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn switch_command_reaches_the_switch_topic() {
        let bus = Bus::new();
        let seen = Arc::new(AtomicBool::new(false));
        let seen_clone = Arc::clone(&seen);
        let _sub = bus
            .handle_service::<SwitchCommand, _, _>(move |req: ServiceRequest<SwitchCommand>| {
                let seen_clone = Arc::clone(&seen_clone);
                async move {
                    assert!(req.data.state);
                    seen_clone.store(true, Ordering::SeqCst);
                }
            })
            .unwrap();

        dispatch_command(
            &bus,
            Command {
                domain: Domain::Switch,
                key: 7,
                kind: CommandKind::Switch { state: true },
            },
        )
        .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unimplemented_domain_still_calls_its_own_topic() {
        let bus = Bus::new();
        let seen = Arc::new(AtomicBool::new(false));
        let seen_clone = Arc::clone(&seen);
        let _sub = bus
            .handle_service::<UnimplementedCommand, _, _>(move |_| {
                let seen_clone = Arc::clone(&seen_clone);
                async move {
                    seen_clone.store(true, Ordering::SeqCst);
                }
            })
            .unwrap();

        dispatch_command(
            &bus,
            Command {
                domain: Domain::Cover,
                key: 1,
                kind: CommandKind::Unimplemented { raw: vec![1, 2] },
            },
        )
        .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(seen.load(Ordering::SeqCst));
    }
}
