//! automation_connection

use std::collections::HashMap;

use automation_core::provider::{ProviderResult, ResourceType};
use automation_core::resource::Attributes;
use automation_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use serde::Deserialize;
use serde_json::json;

use super::{ArmRequest, AutomationResource, account_scoped, decode, scoped_id};
use crate::config::ProviderConfig;
use crate::types::description_attribute;
use crate::utils::{prune_nulls, set_account_scope, set_from};

pub struct ConnectionType;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Connection {
    name: String,
    resource_group_name: String,
    automation_account_name: String,
    #[serde(rename = "type")]
    connection_type: String,
    values: HashMap<String, String>,
    description: Option<String>,
}

impl ResourceType for ConnectionType {
    fn name(&self) -> &'static str {
        "automation_connection"
    }

    fn schema(&self) -> ResourceSchema {
        account_scoped(ResourceSchema::new(self.name()))
            .with_description("Connection asset holding the fields of a connection type")
            .attribute(
                AttributeSchema::new("type", AttributeType::String)
                    .required()
                    .force_new()
                    .with_description("Connection type name (e.g., AzureServicePrincipal)"),
            )
            .attribute(AttributeSchema::new("values", AttributeType::string_map()).required())
            .attribute(description_attribute())
    }
}

impl AutomationResource for ConnectionType {
    fn prepare(
        &self,
        attributes: &Attributes,
        config: &ProviderConfig,
    ) -> ProviderResult<ArmRequest> {
        let connection: Connection = decode(&self.schema(), attributes)?;

        let body = prune_nulls(json!({
            "name": connection.name,
            "properties": {
                "connectionType": {"name": connection.connection_type},
                "fieldDefinitionValues": connection.values,
                "description": connection.description,
            }
        }));

        Ok(ArmRequest::new(
            scoped_id(
                config,
                &connection.resource_group_name,
                &connection.automation_account_name,
                "connections",
                &connection.name,
            ),
            body,
        ))
    }

    fn flatten(&self, id: &str, body: &serde_json::Value) -> Attributes {
        let mut attributes = HashMap::new();
        set_account_scope(&mut attributes, id);
        set_from(&mut attributes, "type", body, "properties.connectionType.name");
        set_from(&mut attributes, "values", body, "properties.fieldDefinitionValues");
        set_from(&mut attributes, "description", body, "properties.description");
        attributes
    }
}
