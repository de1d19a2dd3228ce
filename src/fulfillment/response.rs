//! Outbound fulfillment envelope

use std::collections::BTreeMap;

use serde::Serialize;

use crate::device::Device;
use crate::provider::ExecuteResponse;
use crate::state::{DeviceState, STATUS_ERROR, STATUS_OFFLINE, STATUS_SUCCESS};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<'a, P> {
    pub request_id: &'a str,
    pub payload: P,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload<'a> {
    pub agent_user_id: &'a str,
    pub devices: &'a [Device],
}

#[derive(Debug, Serialize)]
pub struct QueryPayload<'a> {
    pub devices: &'a BTreeMap<String, DeviceState>,
}

#[derive(Debug, Serialize)]
pub struct ExecutePayload {
    pub commands: Vec<CommandStatus>,
}

/// Outcome shared by a group of device ids
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandStatus {
    pub ids: Vec<String>,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub states: Option<DeviceState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ExecutePayload {
    /// Group an execute outcome into success, offline and per-reason error entries
    #[must_use]
    pub fn from_response(response: ExecuteResponse) -> Self {
        let mut commands = Vec::new();

        if !response.updated_devices.is_empty() {
            let mut states = response.updated_state;
            states.online = true;
            commands.push(CommandStatus {
                ids: response.updated_devices,
                status: STATUS_SUCCESS,
                states: Some(states),
                error_code: None,
            });
        }

        if !response.offline_devices.is_empty() {
            commands.push(CommandStatus {
                ids: response.offline_devices,
                status: STATUS_OFFLINE,
                states: None,
                error_code: None,
            });
        }

        for (reason, ids) in response.failed_devices {
            if ids.is_empty() {
                continue;
            }
            commands.push(CommandStatus {
                ids,
                status: STATUS_ERROR,
                states: None,
                error_code: Some(reason),
            });
        }

        Self { commands }
    }
}
