//! automation_credential

use std::collections::HashMap;

use automation_core::provider::{ProviderResult, ResourceType};
use automation_core::resource::Attributes;
use automation_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use serde::Deserialize;
use serde_json::json;

use super::{ArmRequest, AutomationResource, account_scoped, decode, scoped_id};
use crate::config::ProviderConfig;
use crate::types::description_attribute;
use crate::utils::{prune_nulls, set_account_scope, set_from};

pub struct CredentialType;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Credential {
    name: String,
    resource_group_name: String,
    automation_account_name: String,
    username: String,
    password: String,
    description: Option<String>,
}

impl ResourceType for CredentialType {
    fn name(&self) -> &'static str {
        "automation_credential"
    }

    fn schema(&self) -> ResourceSchema {
        account_scoped(ResourceSchema::new(self.name()))
            .with_description("Credential asset of an Automation account")
            .attribute(AttributeSchema::new("username", types::non_empty_string()).required())
            .attribute(
                AttributeSchema::new("password", AttributeType::String)
                    .required()
                    .write_only(),
            )
            .attribute(description_attribute())
    }
}

impl AutomationResource for CredentialType {
    fn prepare(
        &self,
        attributes: &Attributes,
        config: &ProviderConfig,
    ) -> ProviderResult<ArmRequest> {
        let credential: Credential = decode(&self.schema(), attributes)?;

        let body = prune_nulls(json!({
            "name": credential.name,
            "properties": {
                "userName": credential.username,
                "password": credential.password,
                "description": credential.description,
            }
        }));

        Ok(ArmRequest::new(
            scoped_id(
                config,
                &credential.resource_group_name,
                &credential.automation_account_name,
                "credentials",
                &credential.name,
            ),
            body,
        ))
    }

    fn flatten(&self, id: &str, body: &serde_json::Value) -> Attributes {
        let mut attributes = HashMap::new();
        set_account_scope(&mut attributes, id);
        set_from(&mut attributes, "username", body, "properties.userName");
        set_from(&mut attributes, "description", body, "properties.description");
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automation_core::resource::Value;

    #[test]
    fn test_prepare_and_flatten() {
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::from("deploy"));
        attrs.insert("resource_group_name".to_string(), Value::from("rg-ops"));
        attrs.insert("automation_account_name".to_string(), Value::from("acct1"));
        attrs.insert("username".to_string(), Value::from("svc-deploy"));
        attrs.insert("password".to_string(), Value::from("s3cret"));

        let request = CredentialType.prepare(&attrs, &ProviderConfig::new("sub")).unwrap();
        assert!(request.id.ends_with("/automationAccounts/acct1/credentials/deploy"));
        assert_eq!(request.body["properties"]["password"], json!("s3cret"));

        // the API never echoes the password
        let response = json!({"properties": {"userName": "svc-deploy"}});
        let read = CredentialType.flatten(&request.id, &response);
        assert_eq!(read.get("username"), Some(&Value::from("svc-deploy")));
        assert!(!read.contains_key("password"));
    }

    #[test]
    fn test_password_is_write_only() {
        let schema = CredentialType.schema();
        assert!(schema.get("password").unwrap().write_only);
        assert!(!schema.get("username").unwrap().write_only);
    }
}
