//! In-memory demo provider
//!
//! Keeps a few lights and a single AV receiver and applies whatever the
//! assistant asks for. Useful for linking a test account end to end.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::Result;
use crate::command::{Command, CommandKind};
use crate::device::{Device, DeviceInfo, DeviceName};
use crate::provider::{ExecuteRequest, ExecuteResponse, Provider, QueryRequest, QueryResponse, SyncResponse};
use crate::state::DeviceState;
use crate::traits::{ColorModel, DeviceInput, DeviceInputName};

/// Error code for ids this provider does not own
pub const DEVICE_NOT_FOUND: &str = "deviceNotFound";
/// Error code for commands a device has no trait for
pub const FUNCTION_NOT_SUPPORTED: &str = "functionNotSupported";

const ROOM: &str = "test room";
const MANUFACTURER: &str = "faltung systems";

#[derive(Debug, Clone, PartialEq)]
struct Light {
    name: String,
    on: bool,
    brightness: i64,
    hue: f64,
    saturation: f64,
    value: f64,
}

impl Light {
    fn state(&self) -> DeviceState {
        let mut state = DeviceState::new(true);
        state
            .record_on_off(self.on)
            .record_brightness(self.brightness)
            .record_color_hsv(self.hue, self.saturation, self.value);
        state
    }

    fn supports(kind: &CommandKind) -> bool {
        match kind {
            CommandKind::OnOff(_)
            | CommandKind::BrightnessAbsolute(_)
            | CommandKind::BrightnessRelative(_) => true,
            CommandKind::ColorAbsolute(p) => p.color.spectrum_hsv.is_some(),
            _ => false,
        }
    }

    /// Apply a supported `kind`, recording the result into `state`
    fn apply(&mut self, kind: &CommandKind, state: &mut DeviceState) {
        match kind {
            CommandKind::OnOff(p) => {
                self.on = p.on;
                state.record_on_off(self.on);
            }
            CommandKind::BrightnessAbsolute(p) => {
                self.brightness = p.brightness;
                state.record_brightness(self.brightness);
            }
            CommandKind::BrightnessRelative(p) => {
                let delta = p
                    .brightness_relative_weight
                    .or(p.brightness_relative_percent)
                    .unwrap_or_default();
                self.brightness = (self.brightness + delta).clamp(0, 100);
                state.record_brightness(self.brightness);
            }
            CommandKind::ColorAbsolute(p) => {
                if let Some(hsv) = p.color.spectrum_hsv {
                    self.hue = hsv.hue;
                    self.saturation = hsv.saturation;
                    self.value = hsv.value;
                    state.record_color_hsv(self.hue, self.saturation, self.value);
                }
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Receiver {
    id: String,
    name: String,
    on: bool,
    volume: i64,
    muted: bool,
    input: String,
}

impl Receiver {
    const MAX_VOLUME: u32 = 100;

    fn state(&self) -> DeviceState {
        let mut state = DeviceState::new(true);
        state
            .record_on_off(self.on)
            .record_input(self.input.clone())
            .record_volume(self.volume, self.muted);
        state
    }

    fn supports(kind: &CommandKind) -> bool {
        matches!(
            kind,
            CommandKind::OnOff(_)
                | CommandKind::SetVolume(_)
                | CommandKind::AdjustVolume(_)
                | CommandKind::Mute(_)
                | CommandKind::SetInput(_)
        )
    }

    fn apply(&mut self, kind: &CommandKind, state: &mut DeviceState) {
        match kind {
            CommandKind::OnOff(p) => {
                self.on = p.on;
                state.record_on_off(self.on);
            }
            CommandKind::SetVolume(p) => {
                self.volume = p.level.clamp(0, i64::from(Self::MAX_VOLUME));
                state.record_volume(self.volume, self.muted);
            }
            CommandKind::AdjustVolume(p) => {
                self.volume = (self.volume + p.steps).clamp(0, i64::from(Self::MAX_VOLUME));
                state.record_volume(self.volume, self.muted);
            }
            CommandKind::Mute(p) => {
                self.muted = p.mute;
                state.record_volume(self.volume, self.muted);
            }
            CommandKind::SetInput(p) => {
                self.input.clone_from(&p.new_input);
                state.record_input(self.input.clone());
            }
            _ => {}
        }
    }

    fn inputs() -> Vec<DeviceInput> {
        [
            ("input_1", ["Input 1", "Google Chromecast Audio"]),
            ("input_2", ["Input 2", "Raspberry Pi"]),
        ]
        .into_iter()
        .map(|(key, synonyms)| DeviceInput {
            key: key.to_string(),
            names: vec![DeviceInputName {
                language_code: "en".to_string(),
                synonyms: synonyms.iter().map(ToString::to_string).collect(),
            }],
        })
        .collect()
    }
}

struct Devices {
    lights: BTreeMap<String, Light>,
    receiver: Receiver,
}

/// Provider holding a small fixed set of simulated devices
pub struct EchoProvider {
    devices: Mutex<Devices>,
}

impl Default for EchoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl EchoProvider {
    /// Two lights (`123`, `456`) and a receiver (`789`)
    #[must_use]
    pub fn new() -> Self {
        let light = |name: &str| Light {
            name: name.to_string(),
            on: false,
            brightness: 40,
            hue: 100.0,
            saturation: 100.0,
            value: 10.0,
        };
        let lights = BTreeMap::from([
            ("123".to_string(), light("test device 1")),
            ("456".to_string(), light("test device 2")),
        ]);
        let receiver = Receiver {
            id: "789".to_string(),
            name: "test receiver".to_string(),
            on: false,
            volume: 20,
            muted: false,
            input: "input_1".to_string(),
        };

        Self {
            devices: Mutex::new(Devices { lights, receiver }),
        }
    }

    /// Current state of one device, if it exists
    pub async fn state(&self, id: &str) -> Option<DeviceState> {
        let devices = self.devices.lock().await;
        if devices.receiver.id == id {
            return Some(devices.receiver.state());
        }
        devices.lights.get(id).map(Light::state)
    }

    /// Run every command aimed at `id`
    ///
    /// A device that supports all of them is updated; otherwise none are applied
    /// and it lands in exactly one failure bucket.
    fn apply(
        devices: &mut Devices,
        id: &str,
        commands: &[&Command],
        response: &mut ExecuteResponse,
    ) {
        let unsupported = if devices.receiver.id == id {
            commands.iter().find(|c| !Receiver::supports(&c.kind))
        } else if devices.lights.contains_key(id) {
            commands.iter().find(|c| !Light::supports(&c.kind))
        } else {
            tracing::info!(device_id = %id, "device not found");
            response.fail(DEVICE_NOT_FOUND, id);
            return;
        };

        if let Some(command) = unsupported {
            tracing::info!(device_id = %id, command = command.name(), "unsupported command");
            response.fail(FUNCTION_NOT_SUPPORTED, id);
            return;
        }

        for command in commands {
            if devices.receiver.id == id {
                devices
                    .receiver
                    .apply(&command.kind, &mut response.updated_state);
            } else if let Some(light) = devices.lights.get_mut(id) {
                light.apply(&command.kind, &mut response.updated_state);
            }
        }
        response.updated_devices.push(id.to_string());
    }
}

#[async_trait]
impl Provider for EchoProvider {
    async fn sync(&self, agent_user_id: &str) -> Result<SyncResponse> {
        tracing::debug!(agent_user_id, "sync");
        let devices = self.devices.lock().await;

        let mut response = SyncResponse::default();
        for (id, light) in &devices.lights {
            let mut device = Device::light(id.clone())
                .with_brightness(false)
                .with_color(ColorModel::Hsv, false);
            device.name = DeviceName {
                default_names: vec!["Test lamp".to_string()],
                name: light.name.clone(),
                nicknames: Vec::new(),
            };
            device.room_hint = ROOM.to_string();
            device.device_info = DeviceInfo {
                manufacturer: MANUFACTURER.to_string(),
                model: "tl001".to_string(),
                hw_version: "0.2".to_string(),
                sw_version: "0.3".to_string(),
            };
            response.devices.push(device);
        }

        let receiver = &devices.receiver;
        let mut device = Device::av_receiver(
            receiver.id.clone(),
            Receiver::inputs(),
            Receiver::MAX_VOLUME,
            true,
            false,
        );
        device.name = DeviceName {
            default_names: vec!["Test receiver".to_string()],
            name: receiver.name.clone(),
            nicknames: Vec::new(),
        };
        device.will_report_state = true;
        device.room_hint = ROOM.to_string();
        device.device_info = DeviceInfo {
            manufacturer: MANUFACTURER.to_string(),
            model: "tavr001".to_string(),
            hw_version: "0.2".to_string(),
            sw_version: "0.3".to_string(),
        };
        response.devices.push(device);

        Ok(response)
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        tracing::debug!(agent_user_id = %request.agent_user_id, devices = request.devices.len(), "query");
        let devices = self.devices.lock().await;

        let mut response = QueryResponse::default();
        for arg in &request.devices {
            let state = if devices.receiver.id == arg.id {
                Some(devices.receiver.state())
            } else {
                devices.lights.get(&arg.id).map(Light::state)
            };
            if let Some(state) = state {
                response.states.insert(arg.id.clone(), state);
            }
        }
        Ok(response)
    }

    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse> {
        tracing::debug!(agent_user_id = %request.agent_user_id, "execute");
        let mut devices = self.devices.lock().await;

        let mut response = ExecuteResponse {
            updated_state: DeviceState::new(true),
            ..ExecuteResponse::default()
        };
        // Commands per target id, in request order
        let mut planned: Vec<(&str, Vec<&Command>)> = Vec::new();
        for arg in &request.commands {
            for target in &arg.target_devices {
                let index = match planned.iter().position(|(id, _)| *id == target.id) {
                    Some(index) => index,
                    None => {
                        planned.push((target.id.as_str(), Vec::new()));
                        planned.len() - 1
                    }
                };
                planned[index].1.extend(&arg.commands);
            }
        }

        for (id, commands) in &planned {
            tracing::debug!(device_id = %id, commands = commands.len(), "received commands");
            Self::apply(&mut devices, id, commands, &mut response);
        }
        Ok(response)
    }

    async fn disconnect(&self, agent_user_id: &str) -> Result<()> {
        tracing::debug!(agent_user_id, "disconnect");
        Ok(())
    }
}
