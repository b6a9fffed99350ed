//! Provisioning-state source backed by ARM GET requests

use async_trait::async_trait;
use automation_core::poller::{ProvisioningStatus, StatusSource};

use crate::client::{AutomationClient, ClientError};
use crate::utils::json_path;

/// How a resource reports the progress of a long-running provisioning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisioningSpec {
    pub target: &'static str,
    /// States expected while provisioning is in progress
    pub pending: &'static [&'static str],
    /// States that mean provisioning failed even without an error message
    pub failed: &'static [&'static str],
}

/// Reads `properties.provisioningState` and `properties.error.message` of one resource
pub struct ArmStatusSource<'a> {
    client: &'a dyn AutomationClient,
    id: &'a str,
    failed: &'static [&'static str],
}

impl<'a> ArmStatusSource<'a> {
    pub fn new(client: &'a dyn AutomationClient, id: &'a str, spec: &ProvisioningSpec) -> Self {
        Self {
            client,
            id,
            failed: spec.failed,
        }
    }
}

/// Status carried by one GET response body
pub fn status_from_body(body: &serde_json::Value, failed: &[&str]) -> ProvisioningStatus {
    let state = json_path(body, "properties.provisioningState")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let status = ProvisioningStatus::new(state);

    let message = json_path(body, "properties.error.message")
        .and_then(|v| v.as_str())
        .filter(|m| !m.is_empty());
    match message {
        Some(message) => status.with_error(message),
        None if failed.iter().any(|f| *f == state) => {
            status.with_error(format!("provisioning state is {}", state))
        }
        None => status,
    }
}

#[async_trait]
impl StatusSource for ArmStatusSource<'_> {
    type Error = ClientError;

    async fn fetch(&self) -> Result<ProvisioningStatus, ClientError> {
        // A resource that is not visible yet is still provisioning
        match self.client.get(self.id).await? {
            Some(body) => Ok(status_from_body(&body, self.failed)),
            None => Ok(ProvisioningStatus::new("")),
        }
    }
}
