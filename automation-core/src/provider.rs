//! Provider - Trait abstracting resource operations
//!
//! A Provider maps declared resources onto a management API. It is
//! responsible for turning create/read/update/delete requests into actual
//! API calls and for translating responses back into state.

use std::error::Error;
use std::fmt;
use std::pin::Pin;

use crate::resource::{Resource, ResourceId, State};
use crate::schema::ResourceSchema;

type Cause = Box<dyn Error + Send + Sync>;

/// Failure of a provider operation, optionally tied to the resource it concerns
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Cause>,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource_id {
            Some(id) => write!(f, "[{}] {}", id, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl Error for ProviderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    /// `context: cause`, keeping `cause` as the error source
    pub fn wrap(context: impl fmt::Display, cause: impl Error + Send + Sync + 'static) -> Self {
        Self::new(format!("{}: {}", context, cause)).with_cause(cause)
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "automation_runbook")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;
}

/// Main Provider trait
///
/// All operations are async and involve side effects.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "azure_automation")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Get the current state of a resource
    ///
    /// Without an identifier the resource has never been created, so
    /// `State::not_found()` is returned. It is also returned when the API
    /// reports the resource as gone.
    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the ARM resource ID
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource
    ///
    /// The identifier is the ARM resource ID returned by `create`
    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource
    ///
    /// The identifier is the ARM resource ID returned by `create`
    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(id, identifier)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(id, identifier, from, to)
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(id, identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display_names_resource() {
        let err = ProviderError::new("boom")
            .for_resource(ResourceId::new("automation_module", "az_accounts"));
        assert_eq!(err.to_string(), "[automation_module.az_accounts] boom");
    }

    #[test]
    fn provider_error_keeps_cause() {
        let io = std::io::Error::other("connection reset");
        let err = ProviderError::new("reading runbook").with_cause(io);
        assert_eq!(err.source().unwrap().to_string(), "connection reset");
    }

    #[test]
    fn wrap_appends_cause_message() {
        let io = std::io::Error::other("connection reset");
        let err = ProviderError::wrap("Failed to read runbooks/nightly", io);
        assert_eq!(err.to_string(), "Failed to read runbooks/nightly: connection reset");
        assert!(err.source().is_some());
        assert!(err.resource_id.is_none());
    }
}
