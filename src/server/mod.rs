//! HTTP server hosting the fulfillment endpoint

pub mod health;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::fulfillment::FulfillmentService;
use crate::provider::{AccessTokenValidator, Provider};
use crate::{Error, Result};

/// Fulfillment HTTP server
pub struct FulfillmentServer {
    service: FulfillmentService,
    port: u16,
}

impl FulfillmentServer {
    #[must_use]
    pub fn new(
        validator: Arc<dyn AccessTokenValidator>,
        provider: Arc<dyn Provider>,
        port: u16,
    ) -> Self {
        Self {
            service: FulfillmentService::new(validator, provider),
            port,
        }
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        self.service
            .clone()
            .router()
            .merge(health::router())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind fulfillment server: {e}")))?;

        tracing::info!(port = self.port, "fulfillment server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| Error::Config(format!("fulfillment server error: {e}")))?;

        Ok(())
    }

    /// Run the server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
