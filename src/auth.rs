//! Access token validators

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::provider::AccessTokenValidator;
use crate::{Error, Result};

/// Validator backed by a fixed token table
#[derive(Debug, Clone, Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, String>,
}

impl StaticTokenValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as belonging to `user_id`
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), user_id.into());
        self
    }
}

#[async_trait]
impl AccessTokenValidator for StaticTokenValidator {
    async fn validate(&self, token: &str) -> Result<String> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| Error::Auth("unknown access token".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

/// Validator that resolves tokens through an OpenID Connect `userinfo` endpoint
///
/// Resolved tokens are remembered for the lifetime of the validator.
pub struct UserInfoValidator {
    url: String,
    client: reqwest::Client,
    tokens: RwLock<HashMap<String, String>>,
}

impl UserInfoValidator {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            tokens: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl AccessTokenValidator for UserInfoValidator {
    async fn validate(&self, token: &str) -> Result<String> {
        if let Some(user_id) = self.tokens.read().await.get(token) {
            return Ok(user_id.clone());
        }

        let response = self
            .client
            .get(&self.url)
            .bearer_auth(token)
            .send()
            .await?;

        // Rejected tokens resolve to no user
        if response.status() != reqwest::StatusCode::OK {
            tracing::debug!(status = %response.status(), "userinfo rejected token");
            return Ok(String::new());
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));
        if !is_json {
            return Err(Error::Auth("userinfo response is not JSON".to_string()));
        }

        let info: UserInfo = response.json().await?;
        tracing::info!(
            user_id = %info.sub,
            email = info.email.as_deref().unwrap_or_default(),
            "token validated"
        );

        if !info.sub.is_empty() {
            self.tokens
                .write()
                .await
                .insert(token.to_string(), info.sub.clone());
        }
        Ok(info.sub)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{Json, Router, extract::State, http::HeaderMap, http::StatusCode, routing::get};
    use serde_json::{Value, json};

    use super::*;

    async fn userinfo(
        State(calls): State<Arc<AtomicUsize>>,
        headers: HeaderMap,
    ) -> std::result::Result<Json<Value>, StatusCode> {
        calls.fetch_add(1, Ordering::SeqCst);
        match headers.get("authorization").and_then(|v| v.to_str().ok()) {
            Some("Bearer good") => Ok(Json(json!({"sub": "user-1", "email": "a@example.com"}))),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }

    async fn spawn_userinfo() -> (String, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/userinfo", get(userinfo))
            .with_state(calls.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/userinfo"), calls)
    }

    #[tokio::test]
    async fn test_static_validator() {
        let validator = StaticTokenValidator::new().with_token("tokenOK", "1836.15267389");

        assert_eq!(validator.validate("tokenOK").await.unwrap(), "1836.15267389");
        assert!(validator.validate("tokenBad").await.is_err());
    }

    #[tokio::test]
    async fn test_userinfo_resolves_and_caches() {
        let (url, calls) = spawn_userinfo().await;
        let validator = UserInfoValidator::new(url);

        assert_eq!(validator.validate("good").await.unwrap(), "user-1");
        assert_eq!(validator.validate("good").await.unwrap(), "user-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_userinfo_rejection_yields_empty_user() {
        let (url, calls) = spawn_userinfo().await;
        let validator = UserInfoValidator::new(url);

        assert_eq!(validator.validate("bad").await.unwrap(), "");
        assert_eq!(validator.validate("bad").await.unwrap(), "");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
