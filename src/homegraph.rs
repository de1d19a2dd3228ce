//! HomeGraph push client
//!
//! Authenticates with a Google service account (OAuth2 JWT-bearer grant) and
//! calls the request-sync and report-state endpoints.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::provider::StateNotifier;
use crate::state::DeviceState;
use crate::{Error, Result};

const HOMEGRAPH_API_URL: &str = "https://homegraph.googleapis.com";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const TOKEN_SCOPE: &str = "https://www.googleapis.com/auth/homegraph";

/// Seconds before expiry at which a cached token is refreshed
const TOKEN_REFRESH_MARGIN: u64 = 300;

struct TokenInfo {
    access_token: String,
    expires_at: u64,
}

#[derive(Debug, Deserialize)]
struct ServiceAccount {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: u64,
    iat: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestSyncBody<'a> {
    agent_user_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportStateBody<'a> {
    request_id: String,
    agent_user_id: &'a str,
    payload: ReportStatePayload<'a>,
}

#[derive(Debug, Serialize)]
struct ReportStatePayload<'a> {
    devices: ReportStateDevices<'a>,
}

#[derive(Debug, Serialize)]
struct ReportStateDevices<'a> {
    states: &'a BTreeMap<String, DeviceState>,
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Client for the HomeGraph API
pub struct HomeGraphClient {
    service_account_path: PathBuf,
    base_url: String,
    client: reqwest::Client,
    access_token: Mutex<Option<TokenInfo>>,
}

impl HomeGraphClient {
    /// Create a client using the service account key at `service_account_path`
    #[must_use]
    pub fn new(service_account_path: PathBuf) -> Self {
        Self {
            service_account_path,
            base_url: HOMEGRAPH_API_URL.to_string(),
            client: reqwest::Client::new(),
            access_token: Mutex::new(None),
        }
    }

    /// Override the API root
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn load_service_account(&self) -> Result<ServiceAccount> {
        let content = std::fs::read_to_string(&self.service_account_path).map_err(|e| {
            Error::HomeGraph(format!(
                "failed to read service account {}: {e}",
                self.service_account_path.display()
            ))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| Error::HomeGraph(format!("failed to parse service account: {e}")))
    }

    fn create_jwt(service_account: &ServiceAccount, token_url: &str) -> Result<String> {
        use jsonwebtoken::{Algorithm, EncodingKey, Header};

        let now = now();
        let claims = JwtClaims {
            iss: &service_account.client_email,
            scope: TOKEN_SCOPE,
            aud: token_url,
            exp: now + 3600,
            iat: now,
        };

        let key = EncodingKey::from_rsa_pem(service_account.private_key.as_bytes())
            .map_err(|e| Error::HomeGraph(format!("invalid private key: {e}")))?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| Error::HomeGraph(format!("JWT encoding failed: {e}")))
    }

    /// Get or refresh the OAuth access token
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.access_token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > now() + TOKEN_REFRESH_MARGIN {
                return Ok(token.access_token.clone());
            }
        }

        let service_account = self.load_service_account()?;
        let token_url = service_account
            .token_uri
            .clone()
            .unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string());
        let jwt = Self::create_jwt(&service_account, &token_url)?;

        let response = self
            .client
            .post(&token_url)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::HomeGraph(format!(
                "token request failed: {status} - {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        *cached = Some(TokenInfo {
            access_token: token.access_token.clone(),
            expires_at: now() + token.expires_in,
        });
        Ok(token.access_token)
    }

    /// POST `body` to `{base}/v1/devices:{method}`
    async fn post<B: Serialize + Sync>(
        &self,
        method: &str,
        agent_user_id: &str,
        body: &B,
        failed: fn(String) -> Error,
    ) -> Result<()> {
        let token = self.access_token().await?;
        let response = self
            .client
            .post(format!("{}/v1/devices:{method}", self.base_url))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(agent_user_id, %status, method, "homegraph call failed");
            return Err(failed(format!("{status} - {body}")));
        }
        Ok(())
    }
}

fn report_state_body<'a>(
    agent_user_id: &'a str,
    states: &'a BTreeMap<String, DeviceState>,
) -> ReportStateBody<'a> {
    ReportStateBody {
        request_id: uuid::Uuid::new_v4().to_string(),
        agent_user_id,
        payload: ReportStatePayload {
            devices: ReportStateDevices { states },
        },
    }
}

#[async_trait]
impl StateNotifier for HomeGraphClient {
    async fn report_state(
        &self,
        agent_user_id: &str,
        states: &BTreeMap<String, DeviceState>,
    ) -> Result<()> {
        let body = report_state_body(agent_user_id, states);
        tracing::debug!(agent_user_id, request_id = %body.request_id, devices = states.len(), "reporting state");

        self.post(
            "reportStateAndNotification",
            agent_user_id,
            &body,
            Error::ReportStateFailed,
        )
        .await
    }

    async fn request_sync(&self, agent_user_id: &str) -> Result<()> {
        tracing::debug!(agent_user_id, "requesting sync");

        self.post(
            "requestSync",
            agent_user_id,
            &RequestSyncBody { agent_user_id },
            Error::RequestSyncFailed,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_report_state_body_shape() {
        let mut state = DeviceState::new(true);
        state.record_on_off(false);
        let states = BTreeMap::from([("123".to_string(), state)]);

        let body = report_state_body("1836.15267389", &states);
        let value = serde_json::to_value(&body).unwrap();

        assert!(uuid::Uuid::parse_str(value["requestId"].as_str().unwrap()).is_ok());
        assert_eq!(value["agentUserId"], json!("1836.15267389"));
        assert_eq!(
            value["payload"],
            json!({"devices": {"states": {"123": {"on": false, "online": true}}}})
        );
    }

    #[test]
    fn test_request_ids_are_unique() {
        let states = BTreeMap::new();
        let first = report_state_body("u", &states);
        let second = report_state_body("u", &states);

        assert_ne!(first.request_id, second.request_id);
    }

    #[test]
    fn test_request_sync_body_shape() {
        let value = serde_json::to_value(RequestSyncBody {
            agent_user_id: "user-1",
        })
        .unwrap();

        assert_eq!(value, json!({"agentUserId": "user-1"}));
    }

    #[tokio::test]
    async fn test_missing_service_account() {
        let client = HomeGraphClient::new(PathBuf::from("/nonexistent/service-account.json"));

        let result = client.request_sync("user-1").await;
        assert!(matches!(result, Err(Error::HomeGraph(_))));
    }

    #[tokio::test]
    async fn test_malformed_service_account() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sa.json");
        std::fs::write(&path, r#"{"client_email": "svc@example.iam.gserviceaccount.com"}"#).unwrap();
        let client = HomeGraphClient::new(path);

        let result = client.report_state("user-1", &BTreeMap::new()).await;
        assert!(matches!(result, Err(Error::HomeGraph(_))));
    }
}
