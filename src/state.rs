//! Device state reported on QUERY, EXECUTE and report-state
//!
//! On the wire a state is one flat object: `online`, an optional `status`, and
//! whatever trait fields the provider recorded. Encoding performs an explicit
//! merge into a single map so a trait field can never silently duplicate
//! `online` or `status`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};

pub const STATUS_SUCCESS: &str = "SUCCESS";
pub const STATUS_PENDING: &str = "PENDING";
pub const STATUS_OFFLINE: &str = "OFFLINE";
pub const STATUS_EXCEPTIONS: &str = "EXCEPTIONS";
pub const STATUS_ERROR: &str = "ERROR";

/// State of a single device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceState {
    pub online: bool,

    /// Outcome marker, written only when non-empty
    pub status: Option<String>,

    fields: Map<String, Value>,
}

impl DeviceState {
    /// Create a state with no trait fields recorded
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self {
            online,
            status: None,
            fields: Map::new(),
        }
    }

    /// Set the status marker
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Trait fields recorded so far
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Look up a single trait field
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Record an arbitrary trait field, replacing any previous value
    ///
    /// `online` and `status` are never stored as trait fields. A boolean
    /// `online` or a string `status` updates the typed field instead; any other
    /// value under those keys is dropped with a warning.
    pub fn record(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match (key.as_str(), value) {
            ("online", Value::Bool(online)) => self.online = online,
            ("status", Value::String(status)) => self.status = Some(status),
            ("online" | "status", other) => {
                tracing::warn!(key = %key, value = %other, "ignoring mistyped state field");
            }
            (_, value) => {
                self.fields.insert(key.clone(), value);
            }
        }
        self
    }

    /// Current on/off state (OnOff trait)
    pub fn record_on_off(&mut self, on: bool) -> &mut Self {
        self.record("on", on)
    }

    /// Current brightness (Brightness trait)
    pub fn record_brightness(&mut self, brightness: i64) -> &mut Self {
        self.record("brightness", brightness)
    }

    /// Current color temperature in Kelvin (ColorSetting trait)
    pub fn record_color_temperature(&mut self, temperature_k: u32) -> &mut Self {
        self.record("color", json!({ "temperatureK": temperature_k }))
    }

    /// Current color as a packed RGB integer (ColorSetting trait)
    pub fn record_color_rgb(&mut self, spectrum_rgb: u32) -> &mut Self {
        self.record("color", json!({ "spectrumRgb": spectrum_rgb }))
    }

    /// Current color in HSV (ColorSetting trait)
    pub fn record_color_hsv(&mut self, hue: f64, saturation: f64, value: f64) -> &mut Self {
        self.record(
            "color",
            json!({
                "spectrumHsv": { "hue": hue, "saturation": saturation, "value": value }
            }),
        )
    }

    /// Currently active input (InputSelector trait)
    pub fn record_input(&mut self, input: impl Into<String>) -> &mut Self {
        let input: String = input.into();
        self.record("input", input)
    }

    /// Current volume and mute state (Volume trait)
    pub fn record_volume(&mut self, level: i64, muted: bool) -> &mut Self {
        self.record("currentVolume", level).record("isMuted", muted)
    }

    /// Merge `online`, `status` and trait fields into one ordered object
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.fields.clone();
        map.insert("online".to_string(), Value::Bool(self.online));
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
            map.insert("status".to_string(), Value::String(status.to_string()));
        }
        map
    }

    /// Split a flat object back into `online`, `status` and trait fields
    ///
    /// # Errors
    ///
    /// Returns an error message if `online` is missing or not a boolean, or if
    /// `status` is present but not a string
    pub fn from_map(mut map: Map<String, Value>) -> Result<Self, String> {
        let online = match map.remove("online") {
            Some(Value::Bool(online)) => online,
            Some(other) => return Err(format!("online must be a boolean, got {other}")),
            None => return Err("missing field `online`".to_string()),
        };
        let status = match map.remove("status") {
            Some(Value::String(status)) => Some(status),
            Some(Value::Null) | None => None,
            Some(other) => return Err(format!("status must be a string, got {other}")),
        };
        Ok(Self {
            online,
            status,
            fields: map,
        })
    }
}

impl Serialize for DeviceState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DeviceState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::deserialize(deserializer)?;
        Self::from_map(map).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_roundtrip() {
        let mut original = DeviceState::new(true).with_status("ONLINE");
        original
            .record_brightness(50)
            .record_color_hsv(100.0, 100.0, 100.0)
            .record_on_off(true);

        let encoded = serde_json::to_string(&original).unwrap();
        let decoded: DeviceState = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, original);

        let reencoded = serde_json::to_string(&decoded).unwrap();
        assert_eq!(reencoded, encoded);
    }

    #[test]
    fn test_state_is_flat_and_sorted() {
        let mut state = DeviceState::new(true);
        state
            .record_on_off(true)
            .record_brightness(80)
            .record_color_rgb(31655);

        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"brightness":80,"color":{"spectrumRgb":31655},"on":true,"online":true}"#
        );
    }

    #[test]
    fn test_empty_status_omitted() {
        let state = DeviceState::new(false).with_status("");

        assert_eq!(serde_json::to_value(&state).unwrap(), json!({"online": false}));
    }

    #[test]
    fn test_recorders_overwrite_same_key() {
        let mut state = DeviceState::new(true);
        state.record_color_rgb(1).record_color_temperature(2700);

        assert_eq!(state.get("color"), Some(&json!({"temperatureK": 2700})));
        assert_eq!(state.fields().len(), 1);
    }

    #[test]
    fn test_record_reserved_keys_update_typed_fields() {
        let mut state = DeviceState::new(true);
        state
            .record("online", false)
            .record("status", STATUS_PENDING)
            .record("online", "maybe")
            .record("status", 3)
            .record_on_off(true);

        assert!(!state.online);
        assert_eq!(state.status.as_deref(), Some(STATUS_PENDING));
        assert_eq!(state.fields().len(), 1);
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"on":true,"online":false,"status":"PENDING"}"#
        );
    }

    #[test]
    fn test_volume_recorder() {
        let mut state = DeviceState::new(true);
        state.record_volume(42, true).record_input("input_2");

        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({"currentVolume": 42, "input": "input_2", "isMuted": true, "online": true})
        );
    }

    #[test]
    fn test_decode_keeps_unknown_fields_verbatim() {
        let state: DeviceState = serde_json::from_value(json!({
            "online": true,
            "status": "SUCCESS",
            "thermostatMode": "heat",
            "color": {"spectrumHsv": {"hue": 1.5, "saturation": 0.5, "value": 1.0}}
        }))
        .unwrap();

        assert!(state.online);
        assert_eq!(state.status.as_deref(), Some(STATUS_SUCCESS));
        assert_eq!(state.get("thermostatMode"), Some(&json!("heat")));
        assert!(state.get("online").is_none());
        assert!(state.get("status").is_none());
    }

    #[test]
    fn test_decode_requires_online() {
        let result = serde_json::from_value::<DeviceState>(json!({"on": true}));
        assert!(result.is_err());

        let result = serde_json::from_value::<DeviceState>(json!({"online": "yes"}));
        assert!(result.is_err());
    }
}
