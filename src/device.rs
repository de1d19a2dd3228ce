//! Device profiles reported during SYNC
//!
//! A [`Device`] is built fresh by the provider for every SYNC call and only lives
//! for the duration of one response. Capabilities are layered on with the trait
//! builders in [`crate::traits`].

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Device type identifiers
pub mod types {
    pub const AUDIO_VIDEO_RECEIVER: &str = "action.devices.types.AUDIO_VIDEO_RECEIVER";
    pub const FAN: &str = "action.devices.types.FAN";
    pub const LIGHT: &str = "action.devices.types.LIGHT";
    pub const OUTLET: &str = "action.devices.types.OUTLET";
    pub const SENSOR: &str = "action.devices.types.SENSOR";
    pub const SPEAKER: &str = "action.devices.types.SPEAKER";
    pub const SWITCH: &str = "action.devices.types.SWITCH";
    pub const TV: &str = "action.devices.types.TV";
}

/// Names the assistant can use to refer to a device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceName {
    /// Names chosen by the manufacturer (not user settable)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_names: Vec<String>,
    /// Name supplied by the user for display purposes
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Other ways the user refers to the device
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nicknames: Vec<String>,
}

/// Physical properties of the device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub manufacturer: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hw_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sw_version: String,
}

/// Alternate identifier linking this device to one known by another agent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherDeviceId {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub device_id: String,
}

/// A single provider-supplied device profile
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Device {
    pub id: String,

    /// Device category, one of [`types`]
    pub device_type: String,

    /// Fully qualified trait names; dictates which commands the device accepts
    pub traits: BTreeSet<String>,

    pub name: DeviceName,

    /// Whether state changes are pushed through report-state
    pub will_report_state: bool,

    /// Room the device is in
    pub room_hint: String,

    /// Merged attributes contributed by each registered trait
    pub(crate) attributes: Map<String, Value>,

    pub device_info: DeviceInfo,

    pub other_device_ids: Vec<OtherDeviceId>,

    /// Opaque data echoed back unmodified on QUERY and EXECUTE
    pub custom_data: Map<String, Value>,
}

impl Device {
    /// Create an empty device of the given type
    #[must_use]
    pub fn new(id: impl Into<String>, device_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            device_type: device_type.into(),
            ..Self::default()
        }
    }

    /// Attributes merged from every registered trait
    #[must_use]
    pub const fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Whether the named trait has been registered
    #[must_use]
    pub fn has_trait(&self, name: &str) -> bool {
        self.traits.contains(name)
    }
}

/// Wire shape of a device descriptor
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    id: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    device_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    traits: Vec<String>,
    #[serde(default)]
    name: DeviceName,
    #[serde(default)]
    will_report_state: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    room_hint: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    attributes: Map<String, Value>,
    #[serde(default)]
    device_info: DeviceInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    other_device_ids: Vec<OtherDeviceId>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    custom_data: Map<String, Value>,
}

impl From<&Device> for DeviceRecord {
    fn from(device: &Device) -> Self {
        // BTreeSet iteration is already lexicographic
        Self {
            id: device.id.clone(),
            device_type: device.device_type.clone(),
            traits: device.traits.iter().cloned().collect(),
            name: device.name.clone(),
            will_report_state: device.will_report_state,
            room_hint: device.room_hint.clone(),
            attributes: device.attributes.clone(),
            device_info: device.device_info.clone(),
            other_device_ids: device.other_device_ids.clone(),
            custom_data: device.custom_data.clone(),
        }
    }
}

impl From<DeviceRecord> for Device {
    fn from(record: DeviceRecord) -> Self {
        Self {
            id: record.id,
            device_type: record.device_type,
            traits: record.traits.into_iter().collect(),
            name: record.name,
            will_report_state: record.will_report_state,
            room_hint: record.room_hint,
            attributes: record.attributes,
            device_info: record.device_info,
            other_device_ids: record.other_device_ids,
            custom_data: record.custom_data,
        }
    }
}

impl Serialize for Device {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DeviceRecord::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Device {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        DeviceRecord::deserialize(deserializer).map(Self::from)
    }
}
