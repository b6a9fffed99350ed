//! Azure Automation Provider implementation
//!
//! This module contains the main provider implementation that turns resource
//! operations into ARM requests against the Automation management API.

use std::sync::Arc;
use std::time::Duration;

use automation_core::differ::{Diff, diff};
use automation_core::poller::ProvisioningPoll;
use automation_core::provider::{ProviderError, ProviderResult};
use automation_core::resource::{Attributes, Resource, ResourceId, State};
use automation_core::schema::ResourceSchema;
use log::{debug, info};
use tokio::time::Instant;

use crate::client::{AutomationClient, ClientError};
use crate::config::ProviderConfig;
use crate::polling::ArmStatusSource;
use crate::resources::{ArmRequest, AutomationResource, FollowUp, get_resource};

/// Azure Automation Provider
pub struct AutomationProvider {
    client: Arc<dyn AutomationClient>,
    config: ProviderConfig,
}

/// `type/name` tail of an ARM ID, used to label poll errors
fn short_id(arm_id: &str) -> String {
    let mut tail: Vec<&str> = arm_id.rsplit('/').filter(|p| !p.is_empty()).take(2).collect();
    tail.reverse();
    tail.join("/")
}

fn api_error(id: &ResourceId, action: &str, target: &str, e: ClientError) -> ProviderError {
    ProviderError::wrap(format!("Failed to {} {}", action, target), e).for_resource(id.clone())
}

fn already_exists(id: &ResourceId, arm_id: &str) -> ProviderError {
    ProviderError::new(format!(
        "A resource with the ID \"{}\" already exists and must be imported to be managed",
        arm_id
    ))
    .for_resource(id.clone())
}

/// Carry write-only attributes over from the configuration, since reads never return them
fn merge_write_only(state: &mut State, schema: &ResourceSchema, desired: &Attributes) {
    for name in schema.write_only_attributes() {
        if !state.attributes.contains_key(name)
            && let Some(value) = desired.get(name)
        {
            state.attributes.insert(name.to_string(), value.clone());
        }
    }
}

impl AutomationProvider {
    pub fn new(client: Arc<dyn AutomationClient>, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Deadline for a create or update, taken when the operation starts
    fn deadline(id: &ResourceId, action: &str, timeout: Duration) -> ProviderResult<Instant> {
        Instant::now().checked_add(timeout).ok_or_else(|| {
            ProviderError::new(format!("{} timeout of {:?} is out of range", action, timeout))
                .for_resource(id.clone())
        })
    }

    fn definition(id: &ResourceId) -> ProviderResult<&'static dyn AutomationResource> {
        get_resource(&id.resource_type).ok_or_else(|| {
            ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
                .for_resource(id.clone())
        })
    }

    // =========================================================================
    // ARM Request Helpers
    // =========================================================================

    /// Fail when the resource, or an equivalent one, already exists
    async fn ensure_absent(
        &self,
        id: &ResourceId,
        definition: &dyn AutomationResource,
        request: &ArmRequest,
    ) -> ProviderResult<()> {
        debug!("Checking for existing {}", request.id);
        let existing = self
            .client
            .get(&request.id)
            .await
            .map_err(|e| api_error(id, "check for existing", &request.id, e))?;
        if existing.is_some() {
            return Err(already_exists(id, &request.id));
        }

        if let Some(collection) = definition.duplicate_scan(request) {
            debug!("Scanning {} for an equivalent resource", collection);
            let items = self
                .client
                .list(&collection)
                .await
                .map_err(|e| api_error(id, "list", &collection, e))?;
            if let Some(found) = items.iter().find(|item| definition.is_duplicate(request, item)) {
                let found_id = found
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&collection);
                return Err(already_exists(id, found_id));
            }
        }

        Ok(())
    }

    /// PUT the request, run its follow-ups and wait for provisioning to finish
    async fn apply(
        &self,
        id: &ResourceId,
        definition: &dyn AutomationResource,
        request: &ArmRequest,
        deadline: Instant,
    ) -> ProviderResult<()> {
        debug!("PUT {}", request.id);
        self.client
            .put(&request.id, request.body.clone())
            .await
            .map_err(|e| api_error(id, "write", &request.id, e))?;

        for follow_up in &request.follow_ups {
            match follow_up {
                FollowUp::PutContent { path, content } => {
                    debug!("PUT content {}", path);
                    self.client
                        .put_content(path, content)
                        .await
                        .map_err(|e| api_error(id, "upload content to", path, e))?;
                }
                FollowUp::Post { path } => {
                    debug!("POST {}", path);
                    self.client
                        .post(path)
                        .await
                        .map_err(|e| api_error(id, "post", path, e))?;
                }
            }
        }

        if let Some(spec) = definition.provisioning() {
            let poll = ProvisioningPoll::new(short_id(&request.id), spec.target, deadline)
                .with_pending(spec.pending.iter().copied())
                .with_interval(self.config.poll_interval);
            let source = ArmStatusSource::new(self.client.as_ref(), &request.id, &spec);
            poll.wait(&source).await.map_err(|e| {
                ProviderError::new(e.to_string())
                    .with_cause(e)
                    .for_resource(id.clone())
            })?;
        }

        Ok(())
    }

    /// Read the resource back after a write and restore its write-only attributes
    async fn read_back(
        &self,
        id: &ResourceId,
        definition: &dyn AutomationResource,
        arm_id: &str,
        desired: &Attributes,
    ) -> ProviderResult<State> {
        let mut state = self.read_resource(id, Some(arm_id)).await?;
        if !state.exists {
            return Err(ProviderError::new(format!(
                "{} was not found after it was written",
                arm_id
            ))
            .for_resource(id.clone()));
        }
        merge_write_only(&mut state, &definition.schema(), desired);
        Ok(state)
    }

    async fn bounded<T>(
        &self,
        id: &ResourceId,
        action: &str,
        timeout: Duration,
        operation: impl Future<Output = ProviderResult<T>>,
    ) -> ProviderResult<T> {
        tokio::time::timeout(timeout, operation)
            .await
            .map_err(|e| {
                ProviderError::new(format!("Timed out after {:?} waiting to {}", timeout, action))
                    .with_cause(e)
                    .for_resource(id.clone())
            })?
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Read a resource by its ARM ID
    pub async fn read_resource(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> ProviderResult<State> {
        let definition = Self::definition(id)?;

        let identifier = match identifier {
            Some(identifier) => identifier,
            None => return Ok(State::not_found(id.clone())),
        };

        debug!("GET {}", identifier);
        let body = self
            .bounded(id, "read", self.config.timeouts.read, async {
                self.client
                    .get(identifier)
                    .await
                    .map_err(|e| api_error(id, "read", identifier, e))
            })
            .await?;

        match body {
            Some(body) => Ok(State::existing(id.clone(), definition.flatten(identifier, &body))
                .with_identifier(identifier)),
            None => Ok(State::not_found(id.clone())),
        }
    }

    /// Create a resource
    pub async fn create_resource(&self, resource: Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let deadline = Self::deadline(id, "create", self.config.timeouts.create)?;
        let definition = Self::definition(id)?;

        let request = definition
            .prepare(&resource.attributes, &self.config)
            .map_err(|e| e.for_resource(id.clone()))?;

        self.ensure_absent(id, definition, &request).await?;
        self.apply(id, definition, &request, deadline).await?;

        let state = self
            .read_back(id, definition, &request.id, &resource.attributes)
            .await?;
        info!("Created {} ({})", id, request.id);
        Ok(state)
    }

    /// Update a resource in place
    pub async fn update_resource(
        &self,
        id: ResourceId,
        identifier: &str,
        from: &State,
        to: Resource,
    ) -> ProviderResult<State> {
        let deadline = Self::deadline(&id, "update", self.config.timeouts.update)?;
        let definition = Self::definition(&id)?;
        let schema = definition.schema();

        match diff(&to, from, &schema) {
            Diff::Replace {
                changed_attributes, ..
            } => {
                return Err(ProviderError::new(format!(
                    "Cannot update in place, changing these attributes requires replacement: {}",
                    changed_attributes.join(", ")
                ))
                .for_resource(id));
            }
            Diff::Create(_) => {
                return Err(ProviderError::new(format!(
                    "{} no longer exists and must be created again",
                    identifier
                ))
                .for_resource(id));
            }
            Diff::Update {
                changed_attributes, ..
            } => debug!("Updating {} attributes: {:?}", id, changed_attributes),
            Diff::NoChange(_) => debug!("No changes for {}, reapplying", id),
        }

        let desired = definition.carry_over(&to.attributes, &from.attributes);
        let mut request = definition
            .prepare(&desired, &self.config)
            .map_err(|e| e.for_resource(id.clone()))?;
        request.id = identifier.to_string();

        self.apply(&id, definition, &request, deadline).await?;

        let state = self
            .read_back(&id, definition, identifier, &to.attributes)
            .await?;
        info!("Updated {} ({})", id, identifier);
        Ok(state)
    }

    /// Delete a resource
    pub async fn delete_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        Self::definition(id)?;

        debug!("DELETE {}", identifier);
        self.bounded(id, "delete", self.config.timeouts.delete, async {
            self.client
                .delete(identifier)
                .await
                .map_err(|e| api_error(id, "delete", identifier, e))
        })
        .await?;

        info!("Deleted {} ({})", id, identifier);
        Ok(())
    }
}
