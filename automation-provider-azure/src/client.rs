//! Azure Automation management API client
//!
//! The REST client itself lives outside this crate. The provider only needs
//! the handful of ARM operations below, addressed by full resource ID, and
//! the host injects an implementation.

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by the management API client
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API answered with a non-success status
    #[error("unexpected status {status} ({code}): {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(String),
}

impl ClientError {
    pub fn status(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// ARM operations used by the Automation provider
#[async_trait]
pub trait AutomationClient: Send + Sync {
    /// GET a resource; `None` when it does not exist (404)
    async fn get(&self, id: &str) -> ClientResult<Option<serde_json::Value>>;

    /// PUT (create or replace) a resource and return the response body
    async fn put(&self, id: &str, body: serde_json::Value) -> ClientResult<serde_json::Value>;

    /// DELETE a resource; a missing resource is not an error
    async fn delete(&self, id: &str) -> ClientResult<()>;

    /// List every item of a collection (e.g. `.../automationAccounts/acct/jobSchedules`),
    /// following `nextLink` pages
    async fn list(&self, collection_id: &str) -> ClientResult<Vec<serde_json::Value>>;

    /// PUT a raw text body (runbook draft content)
    async fn put_content(&self, id: &str, content: &str) -> ClientResult<()>;

    /// POST an action without a body (e.g. `.../runbooks/rb/publish`)
    async fn post(&self, id: &str) -> ClientResult<()>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_error_display() {
        let err = ClientError::status(409, "Conflict", "runbook is being published");
        assert_eq!(
            err.to_string(),
            "unexpected status 409 (Conflict): runbook is being published"
        );
        assert_eq!(
            ClientError::transport("dns failure").to_string(),
            "transport error: dns failure"
        );
    }
}
