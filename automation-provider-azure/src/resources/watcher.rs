//! automation_watcher

use std::collections::HashMap;

use automation_core::provider::{ProviderError, ProviderResult, ResourceType};
use automation_core::resource::{Attributes, Value};
use automation_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use serde::Deserialize;
use serde_json::json;

use super::{ArmRequest, AutomationResource, decode};
use crate::config::ProviderConfig;
use crate::types::{
    account_id_attribute, description_attribute, location_attribute, name_attribute,
    tags_attribute,
};
use crate::utils::{
    child_id, expand_tags, flatten_tags, parent_account_id, prune_nulls, set_from,
};

pub struct WatcherType;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Watcher {
    automation_account_id: String,
    name: String,
    location: String,
    script_name: String,
    script_run_on: String,
    execution_frequency_in_seconds: i64,
    #[serde(default)]
    script_parameters: HashMap<String, String>,
    description: Option<String>,
    etag: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl ResourceType for WatcherType {
    fn name(&self) -> &'static str {
        "automation_watcher"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.name())
            .with_description("Watcher task running a script on a Hybrid Runbook Worker group")
            .attribute(account_id_attribute())
            .attribute(name_attribute())
            .attribute(location_attribute())
            .attribute(AttributeSchema::new("script_name", AttributeType::String).required())
            .attribute(
                AttributeSchema::new("script_run_on", AttributeType::String)
                    .required()
                    .with_description("Hybrid worker group the script runs on"),
            )
            .attribute(
                AttributeSchema::new("execution_frequency_in_seconds", types::positive_int())
                    .required(),
            )
            .attribute(AttributeSchema::new(
                "script_parameters",
                AttributeType::string_map(),
            ))
            .attribute(description_attribute())
            .attribute(AttributeSchema::new("etag", AttributeType::String))
            .attribute(tags_attribute())
            .attribute(AttributeSchema::new("status", AttributeType::String).read_only())
    }
}

impl AutomationResource for WatcherType {
    fn prepare(
        &self,
        attributes: &Attributes,
        _config: &ProviderConfig,
    ) -> ProviderResult<ArmRequest> {
        let watcher: Watcher = decode(&self.schema(), attributes)?;

        if parent_account_id(&watcher.automation_account_id).as_deref()
            != Some(watcher.automation_account_id.trim_end_matches('/'))
        {
            return Err(ProviderError::new(format!(
                "automation_account_id '{}' is not an Automation account ID",
                watcher.automation_account_id
            )));
        }

        let body = prune_nulls(json!({
            "location": watcher.location,
            "etag": watcher.etag,
            "properties": {
                "executionFrequencyInSeconds": watcher.execution_frequency_in_seconds,
                "scriptName": watcher.script_name,
                "scriptParameters": watcher.script_parameters,
                "scriptRunOn": watcher.script_run_on,
                "description": watcher.description,
            },
            "tags": expand_tags(&watcher.tags),
        }));

        Ok(ArmRequest::new(
            child_id(&watcher.automation_account_id, "watchers", &watcher.name),
            body,
        ))
    }

    fn flatten(&self, id: &str, body: &serde_json::Value) -> Attributes {
        let mut attributes = HashMap::new();
        if let Some(account) = parent_account_id(id) {
            attributes.insert("automation_account_id".to_string(), Value::String(account));
        }
        if let Some(name) = id.rsplit('/').find(|p| !p.is_empty()) {
            attributes.insert("name".to_string(), Value::from(name));
        }
        set_from(&mut attributes, "location", body, "location");
        set_from(&mut attributes, "etag", body, "etag");
        set_from(
            &mut attributes,
            "execution_frequency_in_seconds",
            body,
            "properties.executionFrequencyInSeconds",
        );
        set_from(&mut attributes, "script_name", body, "properties.scriptName");
        set_from(&mut attributes, "script_parameters", body, "properties.scriptParameters");
        set_from(&mut attributes, "script_run_on", body, "properties.scriptRunOn");
        set_from(&mut attributes, "description", body, "properties.description");
        set_from(&mut attributes, "status", body, "properties.status");
        flatten_tags(&mut attributes, body);
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "/subscriptions/sub/resourceGroups/rg-ops/providers/Microsoft.Automation/automationAccounts/acct1";

    fn attrs() -> Attributes {
        let mut attrs = HashMap::new();
        attrs.insert("automation_account_id".to_string(), Value::from(ACCOUNT));
        attrs.insert("name".to_string(), Value::from("disk-watch"));
        attrs.insert("location".to_string(), Value::from("westeurope"));
        attrs.insert("script_name".to_string(), Value::from("Watch-Disk"));
        attrs.insert("script_run_on".to_string(), Value::from("hybrid-group"));
        attrs.insert("execution_frequency_in_seconds".to_string(), Value::Int(60));
        attrs
    }

    #[test]
    fn test_prepare() {
        let request = WatcherType.prepare(&attrs(), &ProviderConfig::new("other")).unwrap();
        assert_eq!(request.id, format!("{}/watchers/disk-watch", ACCOUNT));
        assert_eq!(
            request.body["properties"]["executionFrequencyInSeconds"],
            json!(60)
        );
        assert!(request.body.get("etag").is_none());
    }

    #[test]
    fn test_prepare_rejects_non_account_id() {
        let mut attrs = attrs();
        attrs.insert(
            "automation_account_id".to_string(),
            Value::from("/subscriptions/sub/resourceGroups/rg-ops"),
        );
        let err = WatcherType
            .prepare(&attrs, &ProviderConfig::new("sub"))
            .unwrap_err();
        assert!(err.message.contains("is not an Automation account ID"));
    }

    #[test]
    fn test_frequency_must_be_positive() {
        let mut attrs = attrs();
        attrs.insert("execution_frequency_in_seconds".to_string(), Value::Int(0));
        assert!(WatcherType.prepare(&attrs, &ProviderConfig::new("sub")).is_err());
    }

    #[test]
    fn test_flatten() {
        let id = format!("{}/watchers/disk-watch", ACCOUNT);
        let body = json!({
            "location": "westeurope",
            "etag": "W/\"1\"",
            "properties": {
                "executionFrequencyInSeconds": 60,
                "scriptName": "Watch-Disk",
                "scriptRunOn": "hybrid-group",
                "status": "Running",
            }
        });
        let attrs = WatcherType.flatten(&id, &body);
        assert_eq!(attrs.get("automation_account_id"), Some(&Value::from(ACCOUNT)));
        assert_eq!(attrs.get("name"), Some(&Value::from("disk-watch")));
        assert_eq!(attrs.get("status"), Some(&Value::from("Running")));
        assert_eq!(
            attrs.get("execution_frequency_in_seconds"),
            Some(&Value::Int(60))
        );
    }
}
