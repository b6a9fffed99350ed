//! Resource type definitions for Azure Automation
//!
//! This module defines:
//! - The `AutomationResource` trait: how a resource type maps desired
//!   attributes onto an ARM request and reads a response body back
//! - The registry of every resource type the provider handles

mod account;
mod connection;
mod credential;
mod job_schedule;
mod module;
mod runbook;
mod schedule;
mod software_update;
mod variable;
mod watcher;

pub use account::AccountType;
pub use connection::ConnectionType;
pub use credential::CredentialType;
pub use job_schedule::JobScheduleType;
pub use module::ModuleType;
pub use runbook::RunbookType;
pub use schedule::ScheduleType;
pub use software_update::SoftwareUpdateConfigurationType;
pub use variable::{VariableKind, VariableType};
pub use watcher::WatcherType;

use automation_core::provider::{ProviderError, ProviderResult, ResourceType};
use automation_core::resource::Attributes;
use automation_core::schema::ResourceSchema;
use serde::de::DeserializeOwned;

use crate::config::ProviderConfig;
use crate::polling::ProvisioningSpec;
use crate::types::{account_name_attribute, name_attribute, resource_group_attribute};
use crate::utils::{account_id, child_id};

// =============================================================================
// ARM Requests
// =============================================================================

/// Request issued after the main PUT succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// Upload a raw text body
    PutContent { path: String, content: String },
    /// Trigger an action
    Post { path: String },
}

/// Everything needed to create or update one resource
#[derive(Debug, Clone, PartialEq)]
pub struct ArmRequest {
    /// ARM resource ID the body is PUT to
    pub id: String,
    pub body: serde_json::Value,
    pub follow_ups: Vec<FollowUp>,
}

impl ArmRequest {
    pub fn new(id: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            body,
            follow_ups: Vec::new(),
        }
    }

    pub fn with_follow_up(mut self, follow_up: FollowUp) -> Self {
        self.follow_ups.push(follow_up);
        self
    }
}

// =============================================================================
// Resource Definition Trait
// =============================================================================

/// A resource type managed through the Automation management API
pub trait AutomationResource: ResourceType {
    /// Build the ARM request for the desired attributes
    fn prepare(&self, attributes: &Attributes, config: &ProviderConfig)
    -> ProviderResult<ArmRequest>;

    /// Desired attributes for an in-place update, filled in from the prior
    /// state where the server picked a value the configuration leaves out
    fn carry_over(&self, desired: &Attributes, _prior: &Attributes) -> Attributes {
        desired.clone()
    }

    /// Attributes read back from a GET response body
    fn flatten(&self, id: &str, body: &serde_json::Value) -> Attributes;

    /// Long-running provisioning to wait for after create and update
    fn provisioning(&self) -> Option<ProvisioningSpec> {
        None
    }

    /// Collection to scan before create for an equivalent resource stored
    /// under a different ID
    fn duplicate_scan(&self, _request: &ArmRequest) -> Option<String> {
        None
    }

    /// Whether a listed resource is equivalent to the one being created
    fn is_duplicate(&self, _request: &ArmRequest, _existing: &serde_json::Value) -> bool {
        false
    }
}

/// Validate the attributes against the resource schema and decode them into a model
pub(crate) fn decode<T: DeserializeOwned>(
    schema: &ResourceSchema,
    attributes: &Attributes,
) -> ProviderResult<T> {
    schema.decode(attributes).map_err(|e| {
        ProviderError::new(format!("Invalid {} configuration: {}", schema.resource_type, e))
            .with_cause(e)
    })
}

/// Adds `name`, `resource_group_name` and `automation_account_name`
pub(crate) fn account_scoped(schema: ResourceSchema) -> ResourceSchema {
    schema
        .attribute(name_attribute())
        .attribute(resource_group_attribute())
        .attribute(account_name_attribute())
}

/// ARM ID of an account-scoped child resource
pub(crate) fn scoped_id(
    config: &ProviderConfig,
    resource_group: &str,
    account: &str,
    collection: &str,
    name: &str,
) -> String {
    child_id(
        &account_id(&config.subscription_id, resource_group, account),
        collection,
        name,
    )
}

// =============================================================================
// Registry
// =============================================================================

static DEFINITIONS: &[&dyn AutomationResource] = &[
    &AccountType,
    &RunbookType,
    &ScheduleType,
    &ModuleType,
    &ConnectionType,
    &VariableType::STRING,
    &VariableType::INT,
    &VariableType::BOOL,
    &VariableType::DATETIME,
    &CredentialType,
    &WatcherType,
    &JobScheduleType,
    &SoftwareUpdateConfigurationType,
];

/// Every resource definition of this provider
pub fn resource_definitions() -> &'static [&'static dyn AutomationResource] {
    DEFINITIONS
}

/// Look up a resource definition by type name
pub fn get_resource(resource_type: &str) -> Option<&'static dyn AutomationResource> {
    DEFINITIONS
        .iter()
        .copied()
        .find(|d| d.name() == resource_type)
}

struct Registered(&'static dyn AutomationResource);

impl ResourceType for Registered {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn schema(&self) -> ResourceSchema {
        self.0.schema()
    }
}

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    DEFINITIONS
        .iter()
        .map(|d| Box::new(Registered(*d)) as Box<dyn ResourceType>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_get_resource() {
        assert!(get_resource("automation_account").is_some());
        assert!(get_resource("automation_variable_datetime").is_some());
        assert!(get_resource("automation_software_update_configuration").is_some());
        assert!(get_resource("vpc").is_none());
    }

    #[test]
    fn test_resource_type_names_are_unique() {
        let names: HashSet<&str> = resource_definitions().iter().map(|d| d.name()).collect();
        assert_eq!(names.len(), resource_definitions().len());
        assert_eq!(resource_types().len(), resource_definitions().len());
    }

    #[test]
    fn test_schema_type_matches_definition() {
        for definition in resource_definitions() {
            assert_eq!(definition.schema().resource_type, definition.name());
        }
    }

    #[test]
    fn test_only_long_running_types_poll() {
        let polling: Vec<&str> = resource_definitions()
            .iter()
            .filter(|d| d.provisioning().is_some())
            .map(|d| d.name())
            .collect();
        assert_eq!(
            polling,
            vec!["automation_module", "automation_software_update_configuration"]
        );
    }
}
