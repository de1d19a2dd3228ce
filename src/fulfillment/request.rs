//! Inbound fulfillment envelope

use serde::de::Error as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::provider::{CommandArg, DeviceArg};

/// Intent identifiers
pub mod intents {
    pub const SYNC: &str = "action.devices.SYNC";
    pub const QUERY: &str = "action.devices.QUERY";
    pub const EXECUTE: &str = "action.devices.EXECUTE";
    pub const DISCONNECT: &str = "action.devices.DISCONNECT";
}

/// A fulfillment request as posted by the assistant platform
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub inputs: Vec<Input>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryPayload {
    #[serde(default)]
    pub devices: Vec<DeviceArg>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExecutePayload {
    #[serde(default)]
    pub commands: Vec<CommandArg>,
}

/// One intent of the envelope with its payload
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Sync,
    Query(QueryPayload),
    Execute(ExecutePayload),
    Disconnect,
    /// Intent name not handled by this service
    Unknown(String),
}

impl Input {
    /// Wire name of the intent
    #[must_use]
    pub fn intent(&self) -> &str {
        match self {
            Self::Sync => intents::SYNC,
            Self::Query(_) => intents::QUERY,
            Self::Execute(_) => intents::EXECUTE,
            Self::Disconnect => intents::DISCONNECT,
            Self::Unknown(intent) => intent,
        }
    }
}

#[derive(Deserialize)]
struct RawInput {
    intent: String,
    #[serde(default)]
    payload: Option<Value>,
}

fn required_payload<P: DeserializeOwned>(intent: &str, payload: Option<Value>) -> Result<P, String> {
    let payload = payload.ok_or_else(|| format!("{intent} requires a payload"))?;
    serde_json::from_value(payload).map_err(|e| e.to_string())
}

impl<'de> Deserialize<'de> for Input {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawInput::deserialize(deserializer)?;
        let input = match raw.intent.as_str() {
            intents::SYNC => Self::Sync,
            intents::QUERY => {
                Self::Query(required_payload(intents::QUERY, raw.payload).map_err(D::Error::custom)?)
            }
            intents::EXECUTE => Self::Execute(
                required_payload(intents::EXECUTE, raw.payload).map_err(D::Error::custom)?,
            ),
            intents::DISCONNECT => Self::Disconnect,
            _ => Self::Unknown(raw.intent.clone()),
        };
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::command::{CommandKind, OnOff};

    #[test]
    fn test_decode_sync() {
        let request: Request = serde_json::from_value(json!({
            "requestId": "ff36a3cc-ec34-11e6-b1a0-64510650abcf",
            "inputs": [{"intent": "action.devices.SYNC"}]
        }))
        .unwrap();

        assert_eq!(request.request_id, "ff36a3cc-ec34-11e6-b1a0-64510650abcf");
        assert_eq!(request.inputs, [Input::Sync]);
    }

    #[test]
    fn test_decode_query() {
        let request: Request = serde_json::from_value(json!({
            "requestId": "1",
            "inputs": [{
                "intent": "action.devices.QUERY",
                "payload": {"devices": [{"id": "123", "customData": {"fooValue": 74}}]}
            }]
        }))
        .unwrap();

        let Input::Query(payload) = &request.inputs[0] else {
            panic!("expected QUERY, got {:?}", request.inputs[0]);
        };
        assert_eq!(payload.devices[0].id, "123");
        assert_eq!(payload.devices[0].custom_data["fooValue"], json!(74));
    }

    #[test]
    fn test_decode_execute() {
        let request: Request = serde_json::from_str(
            r#"{
                "requestId": "1",
                "inputs": [{
                    "intent": "action.devices.EXECUTE",
                    "payload": {"commands": [{
                        "devices": [{"id": "123"}],
                        "execution": [{"command": "action.devices.commands.OnOff", "params": {"on": true}}]
                    }]}
                }]
            }"#,
        )
        .unwrap();

        let Input::Execute(payload) = &request.inputs[0] else {
            panic!("expected EXECUTE, got {:?}", request.inputs[0]);
        };
        assert_eq!(payload.commands[0].target_devices[0].id, "123");
        assert_eq!(
            payload.commands[0].commands[0].kind,
            CommandKind::OnOff(OnOff { on: true })
        );
    }

    #[test]
    fn test_unknown_intent_is_kept() {
        let input: Input =
            serde_json::from_value(json!({"intent": "action.devices.GOOGLE", "payload": 7})).unwrap();

        assert_eq!(input, Input::Unknown("action.devices.GOOGLE".to_string()));
        assert_eq!(input.intent(), "action.devices.GOOGLE");
    }

    #[test]
    fn test_query_without_payload_is_error() {
        let result = serde_json::from_value::<Input>(json!({"intent": "action.devices.QUERY"}));
        assert!(result.is_err());

        let result = serde_json::from_value::<Input>(json!({"intent": "action.devices.EXECUTE"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_inputs_decodes_empty() {
        let request: Request = serde_json::from_str(r#"{"requestId":"1"}"#).unwrap();
        assert!(request.inputs.is_empty());
    }
}
