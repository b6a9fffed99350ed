//! Azure Automation Provider
//!
//! Manages Azure Automation accounts and their children (runbooks,
//! schedules, modules, assets, watchers, job schedules and software update
//! configurations) through the ARM management API.
//!
//! ## Module Structure
//!
//! - `client` - The management API operations the provider needs
//! - `config` - Provider configuration and timeouts
//! - `polling` - Provisioning-state source for long-running resources
//! - `provider` - AutomationProvider implementation
//! - `resources` - Resource type definitions and the registry
//! - `types` - Custom attribute types and shared attributes
//! - `utils` - ARM ID and JSON body helpers

pub mod client;
pub mod config;
pub mod polling;
pub mod provider;
pub mod resources;
pub mod types;
pub mod utils;

// Re-export main types
pub use client::{AutomationClient, ClientError, ClientResult};
pub use config::{ProviderConfig, SUBSCRIPTION_ID_ENV, Timeouts};
pub use provider::AutomationProvider;

use automation_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use automation_core::resource::{Resource, ResourceId, State};

use resources::resource_types;

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for AutomationProvider {
    fn name(&self) -> &'static str {
        "azure_automation"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        Box::pin(async move { self.read_resource(&id, identifier.as_deref()).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(id, &identifier, &from, to).await })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_resource(&id, &identifier).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeClient;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_provider_through_trait_object() {
        let client = Arc::new(FakeClient::new());
        let provider: Box<dyn Provider> =
            Box::new(AutomationProvider::new(client.clone(), ProviderConfig::new("sub")));

        assert_eq!(provider.name(), "azure_automation");
        assert!(
            provider
                .resource_types()
                .iter()
                .any(|t| t.name() == "automation_watcher")
        );

        let resource = Resource::new("automation_credential", "deploy")
            .with_attribute("name", "deploy")
            .with_attribute("resource_group_name", "rg-ops")
            .with_attribute("automation_account_name", "acct1")
            .with_attribute("username", "svc-deploy")
            .with_attribute("password", "s3cret");
        let state = provider.create(&resource).await.unwrap();
        let identifier = state.identifier.clone().unwrap();

        let read = provider.read(&resource.id, Some(&identifier)).await.unwrap();
        assert!(read.exists);
        assert!(!read.attributes.contains_key("password"));

        provider.delete(&resource.id, &identifier).await.unwrap();
        let read = provider.read(&resource.id, Some(&identifier)).await.unwrap();
        assert!(!read.exists);
    }
}
