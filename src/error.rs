//! Error types for the fulfillment layer

use thiserror::Error;

/// Result type alias for fulfillment operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fulfilling or pushing device updates
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Access token could not be validated
    #[error("auth error: {0}")]
    Auth(String),

    /// Device provider failed to answer an intent
    #[error("provider error: {0}")]
    Provider(String),

    /// HomeGraph rejected a request-sync call
    #[error("request sync failed: {0}")]
    RequestSyncFailed(String),

    /// HomeGraph rejected a report-state call
    #[error("report state failed: {0}")]
    ReportStateFailed(String),

    /// HomeGraph credentials or token exchange error
    #[error("homegraph error: {0}")]
    HomeGraph(String),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
