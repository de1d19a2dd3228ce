//! Fulfillment endpoint
//!
//! Validates the request, decodes the single intent it carries and routes it
//! to the [`Provider`]. Every rejection is answered with a fixed status code and
//! plain-text message; per-device failures during EXECUTE are reported inside a
//! 200 response.

pub mod request;
mod response;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};

use crate::provider::{AccessTokenValidator, ExecuteRequest, Provider, QueryRequest};
use crate::state::STATUS_SUCCESS;
use request::{Input, Request};
use response::{Envelope, ExecutePayload, QueryPayload, SyncPayload};

/// Path the fulfillment handler is mounted on
pub const FULFILLMENT_PATH: &str = "/fulfillment";

/// Reason a fulfillment request was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotJson,
    MissingToken,
    NotBearer,
    InvalidToken,
    MalformedBody,
    InputCount,
    UnknownIntent,
    SyncFailed,
    QueryFailed,
    ExecuteFailed,
}

impl Rejection {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotJson => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::MissingToken | Self::NotBearer | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::MalformedBody | Self::InputCount | Self::UnknownIntent => StatusCode::BAD_REQUEST,
            Self::SyncFailed | Self::QueryFailed | Self::ExecuteFailed => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::NotJson => "Request not JSON",
            Self::MissingToken => "Access Token Required",
            Self::NotBearer => "Access Token Must Be Bearer",
            Self::InvalidToken => "Access Token Invalid",
            Self::MalformedBody => "JSON Deserialization Failed",
            Self::InputCount => "Unsupported number of inputs",
            Self::UnknownIntent => "Unsupported intent name specified",
            Self::SyncFailed => "Fail to sync",
            Self::QueryFailed => "Fail to query",
            Self::ExecuteFailed => "Fail to execute",
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (self.status(), self.message()).into_response()
    }
}

/// Extract the token from a `Bearer <token>` authorization value
///
/// The value must split into exactly two space-separated parts and the scheme
/// is matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Result<&str, Rejection> {
    let value = headers
        .get(header::AUTHORIZATION)
        .filter(|v| !v.is_empty())
        .ok_or(Rejection::MissingToken)?;
    let value = value.to_str().map_err(|_| Rejection::NotBearer)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(Rejection::NotBearer),
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"))
}

/// Dispatches fulfillment intents to a provider
#[derive(Clone)]
pub struct FulfillmentService {
    validator: Arc<dyn AccessTokenValidator>,
    provider: Arc<dyn Provider>,
}

impl FulfillmentService {
    #[must_use]
    pub fn new(validator: Arc<dyn AccessTokenValidator>, provider: Arc<dyn Provider>) -> Self {
        Self {
            validator,
            provider,
        }
    }

    /// Router serving this service at [`FULFILLMENT_PATH`]
    pub fn router(self) -> Router {
        Router::new()
            .route(FULFILLMENT_PATH, post(fulfillment_handler))
            .with_state(Arc::new(self))
    }

    /// Handle one fulfillment request
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] for the first validation step that fails, or
    /// for a provider failure during SYNC, QUERY or EXECUTE
    pub async fn fulfill(&self, headers: &HeaderMap, body: &[u8]) -> Result<Response, Rejection> {
        if !is_json(headers) {
            return Err(Rejection::NotJson);
        }

        let token = bearer_token(headers)?;
        let agent_user_id = match self.validator.validate(token).await {
            Ok(user_id) if !user_id.is_empty() => user_id,
            Ok(_) => {
                tracing::info!("access token resolved to an empty user id");
                return Err(Rejection::InvalidToken);
            }
            Err(e) => {
                tracing::info!(error = %e, "error validating token");
                return Err(Rejection::InvalidToken);
            }
        };

        let request: Request = serde_json::from_slice(body).map_err(|e| {
            tracing::info!(error = %e, "error deserializing body");
            Rejection::MalformedBody
        })?;

        let Request {
            request_id,
            mut inputs,
        } = request;
        if inputs.len() != 1 {
            tracing::debug!(request_id = %request_id, inputs = inputs.len(), "unsupported number of inputs");
            return Err(Rejection::InputCount);
        }
        let input = inputs.remove(0);

        tracing::debug!(
            request_id = %request_id,
            intent = input.intent(),
            agent_user_id = %agent_user_id,
            "processing intent"
        );

        match input {
            Input::Sync => {
                let response = self.provider.sync(&agent_user_id).await.map_err(|e| {
                    tracing::warn!(error = %e, agent_user_id = %agent_user_id, "sync failed");
                    Rejection::SyncFailed
                })?;
                Ok(Json(Envelope {
                    request_id: &request_id,
                    payload: SyncPayload {
                        agent_user_id: &agent_user_id,
                        devices: &response.devices,
                    },
                })
                .into_response())
            }
            Input::Query(payload) => {
                let query = QueryRequest {
                    agent_user_id: agent_user_id.clone(),
                    devices: payload.devices,
                };
                let mut response = self.provider.query(&query).await.map_err(|e| {
                    tracing::warn!(error = %e, agent_user_id = %agent_user_id, "query failed");
                    Rejection::QueryFailed
                })?;
                for state in response.states.values_mut() {
                    state.status = Some(STATUS_SUCCESS.to_string());
                    state.online = true;
                }
                Ok(Json(Envelope {
                    request_id: &request_id,
                    payload: QueryPayload {
                        devices: &response.states,
                    },
                })
                .into_response())
            }
            Input::Execute(payload) => {
                let execute = ExecuteRequest {
                    agent_user_id: agent_user_id.clone(),
                    commands: payload.commands,
                };
                let response = self.provider.execute(&execute).await.map_err(|e| {
                    tracing::warn!(error = %e, agent_user_id = %agent_user_id, "execute failed");
                    Rejection::ExecuteFailed
                })?;
                Ok(Json(Envelope {
                    request_id: &request_id,
                    payload: ExecutePayload::from_response(response),
                })
                .into_response())
            }
            Input::Disconnect => {
                if let Err(e) = self.provider.disconnect(&agent_user_id).await {
                    tracing::warn!(error = %e, agent_user_id = %agent_user_id, "disconnect failed");
                }
                Ok(Json(serde_json::json!({})).into_response())
            }
            Input::Unknown(intent) => {
                tracing::info!(request_id = %request_id, intent = %intent, "unsupported intent name specified");
                Err(Rejection::UnknownIntent)
            }
        }
    }
}

async fn fulfillment_handler(
    State(service): State<Arc<FulfillmentService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, Rejection> {
    service.fulfill(&headers, &body).await
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn with_auth(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&HeaderMap::new()), Err(Rejection::MissingToken));
        assert_eq!(bearer_token(&with_auth("Bearer tokenOK")), Ok("tokenOK"));
        assert_eq!(bearer_token(&with_auth("bEaReR tokenOK")), Ok("tokenOK"));
        assert_eq!(bearer_token(&with_auth("Basic creds")), Err(Rejection::NotBearer));
        assert_eq!(bearer_token(&with_auth("Bearer")), Err(Rejection::NotBearer));
        assert_eq!(bearer_token(&with_auth("Bearer a b")), Err(Rejection::NotBearer));
        assert_eq!(bearer_token(&with_auth("Bearer  tokenOK")), Err(Rejection::NotBearer));
    }

    #[test]
    fn test_content_type_check() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!is_json(&headers));

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert!(is_json(&headers));
    }

    #[test]
    fn test_rejection_table() {
        assert_eq!(Rejection::NotJson.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(Rejection::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Rejection::UnknownIntent.status(), StatusCode::BAD_REQUEST);
        assert_eq!(Rejection::ExecuteFailed.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(Rejection::InputCount.message(), "Unsupported number of inputs");
    }
}
