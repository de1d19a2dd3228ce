//! Collaborator interfaces plugged into the fulfillment service
//!
//! A [`Provider`] answers the four intents for the devices it owns, an
//! [`AccessTokenValidator`] resolves bearer tokens to user identifiers and a
//! [`StateNotifier`] pushes changes back to the assistant platform.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;
use crate::command::Command;
use crate::device::Device;
use crate::state::DeviceState;

/// Resolves an access token to the identifier of the user who owns it
#[async_trait]
pub trait AccessTokenValidator: Send + Sync {
    /// Validate `token` and return the user identifier
    ///
    /// An empty identifier is treated the same as an error.
    async fn validate(&self, token: &str) -> Result<String>;
}

/// Device backend answering SYNC, QUERY, EXECUTE and DISCONNECT
#[async_trait]
pub trait Provider: Send + Sync {
    /// Describe every device linked to `agent_user_id`
    async fn sync(&self, agent_user_id: &str) -> Result<SyncResponse>;

    /// Report the current state of the requested devices
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse>;

    /// Apply commands to the targeted devices
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse>;

    /// The user unlinked their account
    async fn disconnect(&self, agent_user_id: &str) -> Result<()>;
}

/// Outward push interface for asynchronous state changes
#[async_trait]
pub trait StateNotifier: Send + Sync {
    /// Push the latest state of one or more devices
    async fn report_state(
        &self,
        agent_user_id: &str,
        states: &BTreeMap<String, DeviceState>,
    ) -> Result<()>;

    /// Ask the platform to issue a fresh SYNC for `agent_user_id`
    async fn request_sync(&self, agent_user_id: &str) -> Result<()>;
}

/// A device referenced by a QUERY or EXECUTE request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceArg {
    pub id: String,

    /// The opaque data the provider attached during SYNC
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom_data: Map<String, Value>,
}

/// A batch of commands applied to a set of devices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandArg {
    #[serde(rename = "devices", default)]
    pub target_devices: Vec<DeviceArg>,
    #[serde(rename = "execution", default)]
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    pub agent_user_id: String,
    pub devices: Vec<DeviceArg>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteRequest {
    pub agent_user_id: String,
    pub commands: Vec<CommandArg>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncResponse {
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    /// Device id to current state
    pub states: BTreeMap<String, DeviceState>,
}

/// Outcome of an EXECUTE request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteResponse {
    /// State shared by every id in `updated_devices`
    pub updated_state: DeviceState,
    pub updated_devices: Vec<String>,
    pub offline_devices: Vec<String>,

    /// Error code to the ids that failed with it
    pub failed_devices: BTreeMap<String, Vec<String>>,
}

impl ExecuteResponse {
    /// Record `id` as failed with `reason`; repeated failures are recorded once
    pub fn fail(&mut self, reason: impl Into<String>, id: impl Into<String>) {
        let id = id.into();
        let ids = self.failed_devices.entry(reason.into()).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::command::{CommandKind, OnOff};

    #[test]
    fn test_command_arg_wire_shape() {
        let arg: CommandArg = serde_json::from_value(json!({
            "devices": [{"id": "123", "customData": {"fooValue": 74}}, {"id": "456"}],
            "execution": [{"command": "action.devices.commands.OnOff", "params": {"on": true}}]
        }))
        .unwrap();

        assert_eq!(arg.target_devices.len(), 2);
        assert_eq!(arg.target_devices[0].custom_data["fooValue"], json!(74));
        assert!(arg.target_devices[1].custom_data.is_empty());
        assert_eq!(
            arg.commands[0].kind,
            CommandKind::OnOff(OnOff { on: true })
        );
    }

    #[test]
    fn test_fail_groups_by_reason() {
        let mut response = ExecuteResponse::default();
        response.fail("deviceNotFound", "7");
        response.fail("deviceTurnedOff", "456");
        response.fail("deviceNotFound", "8");
        response.fail("deviceNotFound", "7");

        assert_eq!(
            response.failed_devices.keys().collect::<Vec<_>>(),
            ["deviceNotFound", "deviceTurnedOff"]
        );
        assert_eq!(response.failed_devices["deviceNotFound"], ["7", "8"]);
    }
}
