//! automation_account

use std::collections::HashMap;

use automation_core::provider::{ProviderResult, ResourceType};
use automation_core::resource::{Attributes, Value};
use automation_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use serde::Deserialize;
use serde_json::json;

use super::{ArmRequest, AutomationResource, decode};
use crate::config::ProviderConfig;
use crate::types::{location_attribute, name_attribute, resource_group_attribute, tags_attribute};
use crate::utils::{account_id, expand_tags, flatten_tags, id_segment, json_path, set_from};

pub struct AccountType;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Account {
    name: String,
    resource_group_name: String,
    location: String,
    sku_name: String,
    public_network_access_enabled: bool,
    local_authentication_enabled: bool,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl ResourceType for AccountType {
    fn name(&self) -> &'static str {
        "automation_account"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.name())
            .with_description("Azure Automation account")
            .attribute(name_attribute())
            .attribute(resource_group_attribute())
            .attribute(location_attribute())
            .attribute(
                AttributeSchema::new("sku_name", AttributeType::enumeration(&["Basic", "Free"]))
                    .required(),
            )
            .attribute(
                AttributeSchema::new("public_network_access_enabled", AttributeType::Bool)
                    .with_default(true),
            )
            .attribute(
                AttributeSchema::new("local_authentication_enabled", AttributeType::Bool)
                    .with_default(true),
            )
            .attribute(tags_attribute())
            .attribute(
                AttributeSchema::new("hybrid_service_url", AttributeType::String)
                    .read_only()
                    .with_description("Endpoint Hybrid Runbook Workers register with"),
            )
    }
}

impl AutomationResource for AccountType {
    fn prepare(
        &self,
        attributes: &Attributes,
        config: &ProviderConfig,
    ) -> ProviderResult<ArmRequest> {
        let account: Account = decode(&self.schema(), attributes)?;

        let body = json!({
            "location": account.location,
            "properties": {
                "sku": {"name": account.sku_name},
                "publicNetworkAccess": account.public_network_access_enabled,
                "disableLocalAuth": !account.local_authentication_enabled,
            },
            "tags": expand_tags(&account.tags),
        });

        Ok(ArmRequest::new(
            account_id(
                &config.subscription_id,
                &account.resource_group_name,
                &account.name,
            ),
            body,
        ))
    }

    fn flatten(&self, id: &str, body: &serde_json::Value) -> Attributes {
        let mut attributes = HashMap::new();

        if let Some(name) = id_segment(id, "automationAccounts") {
            attributes.insert("name".to_string(), Value::from(name));
        }
        if let Some(rg) = id_segment(id, "resourceGroups") {
            attributes.insert("resource_group_name".to_string(), Value::from(rg));
        }
        set_from(&mut attributes, "location", body, "location");
        set_from(&mut attributes, "sku_name", body, "properties.sku.name");
        set_from(
            &mut attributes,
            "public_network_access_enabled",
            body,
            "properties.publicNetworkAccess",
        );
        set_from(
            &mut attributes,
            "hybrid_service_url",
            body,
            "properties.automationHybridServiceUrl",
        );

        // The API exposes the negation
        let disable_local_auth = json_path(body, "properties.disableLocalAuth")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        attributes.insert(
            "local_authentication_enabled".to_string(),
            Value::Bool(!disable_local_auth),
        );

        flatten_tags(&mut attributes, body);
        attributes
    }
}
