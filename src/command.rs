//! EXECUTE command codec
//!
//! On the wire a command is `{command, params}` where the `command` string picks
//! the shape of `params`. Each well-known command name maps to one
//! [`CommandKind`] variant; anything else lands in [`CommandKind::Generic`] so
//! commands this crate does not model are still delivered to the provider.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Wire identifiers of the well-known commands
pub mod names {
    pub const BRIGHTNESS_ABSOLUTE: &str = "action.devices.commands.BrightnessAbsolute";
    pub const BRIGHTNESS_RELATIVE: &str = "action.devices.commands.BrightnessRelative";
    pub const COLOR_ABSOLUTE: &str = "action.devices.commands.ColorAbsolute";
    pub const ON_OFF: &str = "action.devices.commands.OnOff";
    pub const MUTE: &str = "action.devices.commands.mute";
    pub const SET_VOLUME: &str = "action.devices.commands.setVolume";
    pub const ADJUST_VOLUME: &str = "action.devices.commands.volumeRelative";
    pub const SET_INPUT: &str = "action.devices.commands.SetInput";
    pub const NEXT_INPUT: &str = "action.devices.commands.NextInput";
    pub const PREVIOUS_INPUT: &str = "action.devices.commands.PreviousInput";
}

/// Set brightness to an absolute level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrightnessAbsolute {
    pub brightness: i64,
}

/// Change brightness relative to the current level
///
/// Only one of the two fields is expected to be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrightnessRelative {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness_relative_percent: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness_relative_weight: Option<i64>,
}

/// Set the color of a light
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorAbsolute {
    pub color: Color,
}

/// Target color; one of temperature, RGB or HSV is set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Kelvin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<u32>,
    #[serde(rename = "spectrumRGB", default, skip_serializing_if = "Option::is_none")]
    pub spectrum_rgb: Option<u32>,
    #[serde(rename = "spectrumHSV", default, skip_serializing_if = "Option::is_none")]
    pub spectrum_hsv: Option<Hsv>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hsv {
    pub hue: f64,
    pub saturation: f64,
    pub value: f64,
}

/// Turn the device on or off
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnOff {
    pub on: bool,
}

/// Mute or unmute the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mute {
    pub mute: bool,
}

/// Set volume to an absolute level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetVolume {
    #[serde(rename = "volumeLevel")]
    pub level: i64,
}

/// Raise or lower volume by a number of steps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustVolume {
    #[serde(rename = "relativeSteps")]
    pub steps: i64,
}

/// Switch to a named input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetInput {
    #[serde(rename = "newInput")]
    pub new_input: String,
}

#[derive(Serialize, Deserialize)]
struct NoParams {}

/// The payload of a command, selected by its wire name
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    BrightnessAbsolute(BrightnessAbsolute),
    BrightnessRelative(BrightnessRelative),
    ColorAbsolute(ColorAbsolute),
    OnOff(OnOff),
    Mute(Mute),
    SetVolume(SetVolume),
    AdjustVolume(AdjustVolume),
    SetInput(SetInput),
    NextInput,
    PreviousInput,
    /// A command name this crate does not model
    Generic {
        command: String,
        params: Option<Map<String, Value>>,
    },
}

impl CommandKind {
    /// Wire discriminant of this command
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::BrightnessAbsolute(_) => names::BRIGHTNESS_ABSOLUTE,
            Self::BrightnessRelative(_) => names::BRIGHTNESS_RELATIVE,
            Self::ColorAbsolute(_) => names::COLOR_ABSOLUTE,
            Self::OnOff(_) => names::ON_OFF,
            Self::Mute(_) => names::MUTE,
            Self::SetVolume(_) => names::SET_VOLUME,
            Self::AdjustVolume(_) => names::ADJUST_VOLUME,
            Self::SetInput(_) => names::SET_INPUT,
            Self::NextInput => names::NEXT_INPUT,
            Self::PreviousInput => names::PREVIOUS_INPUT,
            Self::Generic { command, .. } => command,
        }
    }

    /// Pick the payload shape for `command` and parse `params` into it
    fn decode(command: String, params: Option<Value>) -> serde_json::Result<Self> {
        let kind = match command.as_str() {
            names::BRIGHTNESS_ABSOLUTE => Self::BrightnessAbsolute(parse_params(params)?),
            names::BRIGHTNESS_RELATIVE => Self::BrightnessRelative(parse_params(params)?),
            names::COLOR_ABSOLUTE => Self::ColorAbsolute(parse_params(params)?),
            names::ON_OFF => Self::OnOff(parse_params(params)?),
            names::MUTE => Self::Mute(parse_params(params)?),
            names::SET_VOLUME => Self::SetVolume(parse_params(params)?),
            names::ADJUST_VOLUME => Self::AdjustVolume(parse_params(params)?),
            names::SET_INPUT => Self::SetInput(parse_params(params)?),
            names::NEXT_INPUT => {
                parse_params::<NoParams>(params)?;
                Self::NextInput
            }
            names::PREVIOUS_INPUT => {
                parse_params::<NoParams>(params)?;
                Self::PreviousInput
            }
            _ => Self::Generic {
                command: command.clone(),
                params: params.map(serde_json::from_value).transpose()?,
            },
        };
        Ok(kind)
    }
}

/// Absent and `null` params parse as an empty object, so missing fields take
/// their zero values
fn parse_params<P: DeserializeOwned>(params: Option<Value>) -> serde_json::Result<P> {
    match params {
        None | Some(Value::Null) => serde_json::from_value(Value::Object(Map::new())),
        Some(value) => serde_json::from_value(value),
    }
}

/// A single command inside an EXECUTE request
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,

    /// Opaque confirmation data for commands that need a second factor
    pub challenge: Option<Map<String, Value>>,
}

impl Command {
    #[must_use]
    pub const fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            challenge: None,
        }
    }

    /// Wire discriminant of this command
    #[must_use]
    pub fn name(&self) -> &str {
        self.kind.name()
    }
}

impl From<CommandKind> for Command {
    fn from(kind: CommandKind) -> Self {
        Self::new(kind)
    }
}

#[derive(Serialize)]
struct EnvelopeOut<'a, P> {
    command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a P>,
    #[serde(skip_serializing_if = "Option::is_none")]
    challenge: Option<&'a Map<String, Value>>,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    command: String,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    challenge: Option<Map<String, Value>>,
}

fn write<S: Serializer, P: Serialize>(
    serializer: S,
    command: &str,
    params: Option<&P>,
    challenge: Option<&Map<String, Value>>,
) -> Result<S::Ok, S::Error> {
    EnvelopeOut {
        command,
        params,
        challenge,
    }
    .serialize(serializer)
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let name = self.kind.name();
        let challenge = self.challenge.as_ref();
        match &self.kind {
            CommandKind::BrightnessAbsolute(p) => write(serializer, name, Some(p), challenge),
            CommandKind::BrightnessRelative(p) => write(serializer, name, Some(p), challenge),
            CommandKind::ColorAbsolute(p) => write(serializer, name, Some(p), challenge),
            CommandKind::OnOff(p) => write(serializer, name, Some(p), challenge),
            CommandKind::Mute(p) => write(serializer, name, Some(p), challenge),
            CommandKind::SetVolume(p) => write(serializer, name, Some(p), challenge),
            CommandKind::AdjustVolume(p) => write(serializer, name, Some(p), challenge),
            CommandKind::SetInput(p) => write(serializer, name, Some(p), challenge),
            CommandKind::NextInput | CommandKind::PreviousInput => {
                write(serializer, name, Some(&NoParams {}), challenge)
            }
            CommandKind::Generic { params, .. } => {
                write(serializer, name, params.as_ref(), challenge)
            }
        }
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let envelope = EnvelopeIn::deserialize(deserializer)?;
        let kind = CommandKind::decode(envelope.command, envelope.params).map_err(D::Error::custom)?;
        Ok(Self {
            kind,
            challenge: envelope.challenge,
        })
    }
}
