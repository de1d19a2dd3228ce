//! Smart home fulfillment for cloud assistant platforms
//!
//! This library implements the fulfillment side of a smart home integration:
//! - A single HTTP endpoint answering SYNC, QUERY, EXECUTE and DISCONNECT
//! - Device profile, device state and command codecs
//! - A pluggable device [`Provider`] and [`AccessTokenValidator`]
//! - A HomeGraph client for pushing state changes and sync requests
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Assistant platform (HTTPS)              │
//! └────────────────────┬────────────────────────────────┘
//!                      │ POST /fulfillment
//! ┌────────────────────▼────────────────────────────────┐
//! │               FulfillmentService                     │
//! │   auth  │  envelope decode  │  intent dispatch       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Provider                            │
//! │   devices  │  state  │  commands  ──▶ HomeGraph     │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod command;
pub mod config;
pub mod device;
pub mod echo;
pub mod error;
pub mod fulfillment;
pub mod homegraph;
pub mod provider;
pub mod server;
pub mod state;
pub mod traits;

pub use auth::{StaticTokenValidator, UserInfoValidator};
pub use command::{Command, CommandKind};
pub use config::Config;
pub use device::Device;
pub use echo::EchoProvider;
pub use error::{Error, Result};
pub use fulfillment::{FULFILLMENT_PATH, FulfillmentService, Rejection};
pub use homegraph::HomeGraphClient;
pub use provider::{
    AccessTokenValidator, CommandArg, DeviceArg, ExecuteRequest, ExecuteResponse, Provider,
    QueryRequest, QueryResponse, StateNotifier, SyncResponse,
};
pub use server::FulfillmentServer;
pub use state::DeviceState;
