//! Trait registration for device profiles
//!
//! Each builder adds a trait name to the device's trait set and merges that
//! trait's attributes into the shared attributes object. Builders do not
//! validate combinations: adding a trait twice keeps one entry in the set, and
//! overlapping attribute keys are overwritten by the later call.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::device::{Device, types};

pub const BRIGHTNESS: &str = "action.devices.traits.Brightness";
pub const COLOR_SETTING: &str = "action.devices.traits.ColorSetting";
pub const INPUT_SELECTOR: &str = "action.devices.traits.InputSelector";
pub const ON_OFF: &str = "action.devices.traits.OnOff";
pub const VOLUME: &str = "action.devices.traits.Volume";

/// Color wheel model supported by a color-setting device
///
/// RGB and HSV are mutually exclusive. Either may coexist with a color
/// temperature range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    Rgb,
    Hsv,
}

impl ColorModel {
    /// Wire representation of the model
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Rgb => "rgb",
            Self::Hsv => "hsv",
        }
    }
}

/// A selectable input on a device with the input-selector trait
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInput {
    pub key: String,
    pub names: Vec<DeviceInputName>,
}

/// Localized names for one input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInputName {
    #[serde(rename = "lang")]
    pub language_code: String,
    #[serde(rename = "name_synonym")]
    pub synonyms: Vec<String>,
}

impl DeviceInput {
    fn to_value(&self) -> Value {
        let names: Vec<Value> = self
            .names
            .iter()
            .map(|n| json!({ "lang": n.language_code, "name_synonym": n.synonyms }))
            .collect();
        json!({ "key": self.key, "names": names })
    }
}

impl Device {
    /// Register an arbitrary trait by its fully qualified name
    #[must_use]
    pub fn with_trait(mut self, name: impl Into<String>) -> Self {
        self.traits.insert(name.into());
        self
    }

    /// Set an attribute directly, overwriting any previous value
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Device can be turned on and off
    ///
    /// `command_only` marks a write-only device (it cannot be queried).
    /// `query_only` marks a sensor-like device (it cannot be commanded).
    #[must_use]
    pub fn with_on_off(self, command_only: bool, query_only: bool) -> Self {
        let mut device = self.with_trait(ON_OFF);
        if command_only {
            device = device.with_attribute("commandOnlyOnOff", true);
        }
        if query_only {
            device = device.with_attribute("queryOnlyOnOff", true);
        }
        device
    }

    /// Device brightness can be controlled
    #[must_use]
    pub fn with_brightness(self, command_only: bool) -> Self {
        let device = self.with_trait(BRIGHTNESS);
        if command_only {
            return device.with_attribute("commandOnlyBrightness", true);
        }
        device
    }

    /// Device color can be set using the given color wheel model
    #[must_use]
    pub fn with_color(self, model: ColorModel, command_only: bool) -> Self {
        let mut device = self
            .with_trait(COLOR_SETTING)
            .with_attribute("colorModel", model.as_str());
        if command_only {
            device = device.with_attribute("commandOnlyColorSetting", true);
        }
        device
    }

    /// Device color can be set as a temperature within `[min_k, max_k]` Kelvin
    #[must_use]
    pub fn with_color_temperature(self, min_k: u32, max_k: u32, command_only: bool) -> Self {
        self.with_trait(COLOR_SETTING)
            .with_attribute("commandOnlyColorSetting", command_only)
            .with_attribute(
                "colorTemperatureRange",
                json!({ "temperatureMinK": min_k, "temperatureMaxK": max_k }),
            )
    }

    /// Device input can be selected from `inputs`
    #[must_use]
    pub fn with_input_selector(self, inputs: &[DeviceInput], ordered: bool) -> Self {
        let available: Vec<Value> = inputs.iter().map(DeviceInput::to_value).collect();
        self.with_trait(INPUT_SELECTOR)
            .with_attribute("availableInputs", available)
            .with_attribute("orderedInputs", ordered)
    }

    /// Device volume can be controlled up to `max_level`
    #[must_use]
    pub fn with_volume(self, max_level: u32, can_mute: bool, command_only: bool) -> Self {
        let mut device = self
            .with_trait(VOLUME)
            .with_attribute("volumeMaxLevel", max_level)
            .with_attribute("volumeCanMuteAndUnmute", can_mute);
        if command_only {
            device = device.with_attribute("commandOnlyVolume", true);
        }
        device
    }

    /// On-off light; add brightness or color traits as needed
    #[must_use]
    pub fn light(id: impl Into<String>) -> Self {
        Self::new(id, types::LIGHT).with_on_off(false, false)
    }

    /// On-off outlet
    #[must_use]
    pub fn outlet(id: impl Into<String>) -> Self {
        Self::new(id, types::OUTLET).with_on_off(false, false)
    }

    /// On-off switch; add the brightness trait for dimmers
    #[must_use]
    pub fn switch(id: impl Into<String>) -> Self {
        Self::new(id, types::SWITCH).with_on_off(false, false)
    }

    /// AV receiver with power, input selection and volume
    #[must_use]
    pub fn av_receiver(
        id: impl Into<String>,
        inputs: Vec<DeviceInput>,
        max_level: u32,
        can_mute: bool,
        command_only: bool,
    ) -> Self {
        Self::new(id, types::AUDIO_VIDEO_RECEIVER)
            .with_on_off(false, false)
            .with_input_selector(&inputs, true)
            .with_volume(max_level, can_mute, command_only)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trait_set_is_idempotent() {
        let device = Device::light("1").with_on_off(false, false).with_on_off(false, false);

        assert_eq!(device.traits.len(), 1);
        assert!(device.has_trait(ON_OFF));
    }

    #[test]
    fn test_false_flags_are_omitted() {
        let device = Device::switch("1")
            .with_brightness(false)
            .with_volume(11, true, false);

        let attrs = device.attributes();
        assert!(!attrs.contains_key("commandOnlyOnOff"));
        assert!(!attrs.contains_key("queryOnlyOnOff"));
        assert!(!attrs.contains_key("commandOnlyBrightness"));
        assert!(!attrs.contains_key("commandOnlyVolume"));
        assert_eq!(attrs["volumeMaxLevel"], json!(11));
        assert_eq!(attrs["volumeCanMuteAndUnmute"], json!(true));
    }

    #[test]
    fn test_true_flags_are_emitted() {
        let device = Device::new("1", types::SENSOR)
            .with_on_off(true, true)
            .with_brightness(true)
            .with_volume(5, false, true);

        let attrs = device.attributes();
        assert_eq!(attrs["commandOnlyOnOff"], json!(true));
        assert_eq!(attrs["queryOnlyOnOff"], json!(true));
        assert_eq!(attrs["commandOnlyBrightness"], json!(true));
        assert_eq!(attrs["commandOnlyVolume"], json!(true));
    }

    #[test]
    fn test_color_model_last_write_wins() {
        let device = Device::light("1")
            .with_color(ColorModel::Rgb, false)
            .with_color(ColorModel::Hsv, false);

        assert_eq!(device.attributes()["colorModel"], json!("hsv"));
        assert_eq!(device.traits.len(), 2);
    }

    #[test]
    fn test_color_temperature_coexists_with_rgb() {
        let device = Device::light("456")
            .with_brightness(false)
            .with_color(ColorModel::Rgb, false)
            .with_color_temperature(2000, 9000, false);

        assert_eq!(
            serde_json::Value::Object(device.attributes().clone()),
            json!({
                "colorModel": "rgb",
                "colorTemperatureRange": {"temperatureMaxK": 9000, "temperatureMinK": 2000},
                "commandOnlyColorSetting": false,
            })
        );
    }

    #[test]
    fn test_input_selector_attributes() {
        let inputs = vec![DeviceInput {
            key: "input_1".to_string(),
            names: vec![DeviceInputName {
                language_code: "en".to_string(),
                synonyms: vec!["Input 1".to_string()],
            }],
        }];
        let device = Device::new("r", types::AUDIO_VIDEO_RECEIVER).with_input_selector(&inputs, false);

        assert!(device.has_trait(INPUT_SELECTOR));
        assert_eq!(
            device.attributes()["availableInputs"],
            json!([{"key": "input_1", "names": [{"lang": "en", "name_synonym": ["Input 1"]}]}])
        );
        assert_eq!(device.attributes()["orderedInputs"], json!(false));
    }

    #[test]
    fn test_custom_trait_escape_hatch() {
        let device = Device::new("t", "action.devices.types.THERMOSTAT")
            .with_trait("action.devices.traits.TemperatureSetting")
            .with_attribute("thermostatTemperatureUnit", "C");

        assert!(device.has_trait("action.devices.traits.TemperatureSetting"));
        assert_eq!(device.attributes()["thermostatTemperatureUnit"], json!("C"));
    }
}
