//! Shared fixtures for fulfillment integration tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use smarthome_fulfillment::{
    Error, ExecuteRequest, ExecuteResponse, FULFILLMENT_PATH, FulfillmentService, Provider,
    QueryRequest, QueryResponse, Result, StaticTokenValidator, SyncResponse,
};
use tokio::sync::Mutex;
use tower::ServiceExt;

pub const REQUEST_ID: &str = "ff36a3cc-ec34-11e6-b1a0-64510650abcf";
pub const AGENT_USER_ID: &str = "1836.15267389";

/// Provider returning canned responses and recording what it was asked
#[derive(Default)]
pub struct TestProvider {
    pub sync_response: SyncResponse,
    pub query_response: QueryResponse,
    pub execute_response: ExecuteResponse,
    pub fail: bool,

    pub sync_user: Mutex<Option<String>>,
    pub query_request: Mutex<Option<QueryRequest>>,
    pub execute_request: Mutex<Option<ExecuteRequest>>,
    pub disconnected: Mutex<Option<String>>,
}

impl TestProvider {
    fn check(&self) -> Result<()> {
        if self.fail {
            return Err(Error::Provider("backend unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Provider for TestProvider {
    async fn sync(&self, agent_user_id: &str) -> Result<SyncResponse> {
        *self.sync_user.lock().await = Some(agent_user_id.to_string());
        self.check()?;
        Ok(self.sync_response.clone())
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        *self.query_request.lock().await = Some(request.clone());
        self.check()?;
        Ok(self.query_response.clone())
    }

    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse> {
        *self.execute_request.lock().await = Some(request.clone());
        self.check()?;
        Ok(self.execute_response.clone())
    }

    async fn disconnect(&self, agent_user_id: &str) -> Result<()> {
        *self.disconnected.lock().await = Some(agent_user_id.to_string());
        self.check()
    }
}

/// Build a fulfillment router accepting `asdf` and `tokenOK`
pub fn build_router(provider: Arc<dyn Provider>) -> Router {
    let validator = StaticTokenValidator::new()
        .with_token("asdf", AGENT_USER_ID)
        .with_token("tokenOK", "userOK");
    FulfillmentService::new(Arc::new(validator), provider).router()
}

/// POST `body` to the fulfillment path with the given headers
pub async fn post(
    app: Router,
    content_type: Option<&str>,
    authorization: Option<&str>,
    body: &str,
) -> Response<Body> {
    let mut request = Request::builder().method("POST").uri(FULFILLMENT_PATH);
    if let Some(content_type) = content_type {
        request = request.header("content-type", content_type);
    }
    if let Some(authorization) = authorization {
        request = request.header("authorization", authorization);
    }

    app.oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

/// POST a well-formed, authorized request
pub async fn post_json(app: Router, body: &str) -> Response<Body> {
    post(app, Some("application/json"), Some("bearer asdf"), body).await
}

/// Read the full response body as a string
pub async fn body_string(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}
