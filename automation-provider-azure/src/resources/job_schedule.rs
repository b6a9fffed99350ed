//! automation_job_schedule
//!
//! A job schedule links a runbook to a schedule. Its ID segment is a UUID
//! chosen by the client, so a link created outside this provider lives
//! under an unrelated ID; create scans the account's job schedules for the
//! same runbook/schedule pair before issuing the PUT.

use std::collections::HashMap;

use automation_core::provider::{ProviderResult, ResourceType};
use automation_core::resource::{Attributes, Value};
use automation_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{ArmRequest, AutomationResource, decode, scoped_id};
use crate::config::ProviderConfig;
use crate::types::{account_name_attribute, lowercase_keys_map, resource_group_attribute};
use crate::utils::{account_id, id_segment, json_path, prune_nulls, set_from};

pub struct JobScheduleType;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobSchedule {
    resource_group_name: String,
    automation_account_name: String,
    schedule_name: String,
    runbook_name: String,
    #[serde(default)]
    parameters: HashMap<String, String>,
    run_on: Option<String>,
    job_schedule_id: Option<String>,
}

fn uuid_type() -> AttributeType {
    AttributeType::Custom {
        name: "Uuid".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) => Uuid::parse_str(s)
                .map(|_| ())
                .map_err(|e| format!("'{}' is not a UUID: {}", s, e)),
            _ => Err("Expected string".to_string()),
        },
    }
}

fn linked_name<'a>(body: &'a serde_json::Value, link: &str) -> Option<&'a str> {
    json_path(body, &format!("properties.{}.name", link)).and_then(|v| v.as_str())
}

impl ResourceType for JobScheduleType {
    fn name(&self) -> &'static str {
        "automation_job_schedule"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.name())
            .with_description("Link between a runbook and a schedule")
            .attribute(resource_group_attribute())
            .attribute(account_name_attribute())
            .attribute(
                AttributeSchema::new("schedule_name", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("runbook_name", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("parameters", lowercase_keys_map())
                    .force_new()
                    .with_description("Runbook parameters; names must be lowercase"),
            )
            .attribute(
                AttributeSchema::new("run_on", AttributeType::String)
                    .force_new()
                    .with_description("Hybrid worker group to run on"),
            )
            .attribute(
                AttributeSchema::new("job_schedule_id", uuid_type())
                    .force_new()
                    .with_description("Generated when not set"),
            )
    }
}

impl AutomationResource for JobScheduleType {
    fn prepare(
        &self,
        attributes: &Attributes,
        config: &ProviderConfig,
    ) -> ProviderResult<ArmRequest> {
        let link: JobSchedule = decode(&self.schema(), attributes)?;

        let job_schedule_id = link
            .job_schedule_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let body = prune_nulls(json!({
            "properties": {
                "schedule": {"name": link.schedule_name},
                "runbook": {"name": link.runbook_name},
                "parameters": link.parameters,
                "runOn": link.run_on,
            }
        }));

        Ok(ArmRequest::new(
            scoped_id(
                config,
                &link.resource_group_name,
                &link.automation_account_name,
                "jobSchedules",
                &job_schedule_id,
            ),
            body,
        ))
    }

    fn flatten(&self, id: &str, body: &serde_json::Value) -> Attributes {
        let mut attributes = HashMap::new();
        if let Some(rg) = id_segment(id, "resourceGroups") {
            attributes.insert("resource_group_name".to_string(), Value::from(rg));
        }
        if let Some(account) = id_segment(id, "automationAccounts") {
            attributes.insert("automation_account_name".to_string(), Value::from(account));
        }
        if let Some(job_schedule_id) = id_segment(id, "jobSchedules") {
            attributes.insert("job_schedule_id".to_string(), Value::from(job_schedule_id));
        }
        set_from(&mut attributes, "schedule_name", body, "properties.schedule.name");
        set_from(&mut attributes, "runbook_name", body, "properties.runbook.name");
        set_from(&mut attributes, "run_on", body, "properties.runOn");

        // Parameter names come back in whatever case the service stored
        if let Some(params) = json_path(body, "properties.parameters").and_then(|v| v.as_object())
            && !params.is_empty()
        {
            let params = params
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.to_lowercase(), Value::from(s))))
                .collect();
            attributes.insert("parameters".to_string(), Value::Map(params));
        }
        attributes
    }

    fn duplicate_scan(&self, request: &ArmRequest) -> Option<String> {
        let subscription = id_segment(&request.id, "subscriptions")?;
        let rg = id_segment(&request.id, "resourceGroups")?;
        let account = id_segment(&request.id, "automationAccounts")?;
        Some(format!(
            "{}/jobSchedules",
            account_id(subscription, rg, account)
        ))
    }

    fn is_duplicate(&self, request: &ArmRequest, existing: &serde_json::Value) -> bool {
        let same = |link: &str| match (linked_name(&request.body, link), linked_name(existing, link)) {
            (Some(wanted), Some(found)) => wanted.eq_ignore_ascii_case(found),
            _ => false,
        };
        same("schedule") && same("runbook")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "/subscriptions/sub/resourceGroups/rg-ops/providers/Microsoft.Automation/automationAccounts/acct1";

    fn attrs() -> Attributes {
        let mut attrs = HashMap::new();
        attrs.insert("resource_group_name".to_string(), Value::from("rg-ops"));
        attrs.insert("automation_account_name".to_string(), Value::from("acct1"));
        attrs.insert("schedule_name".to_string(), Value::from("nightly"));
        attrs.insert("runbook_name".to_string(), Value::from("cleanup"));
        attrs
    }

    fn prepare(attrs: &Attributes) -> ArmRequest {
        JobScheduleType
            .prepare(attrs, &ProviderConfig::new("sub"))
            .unwrap()
    }

    #[test]
    fn test_prepare_generates_uuid() {
        let first = prepare(&attrs());
        let second = prepare(&attrs());

        let prefix = format!("{}/jobSchedules/", ACCOUNT);
        let segment = first.id.strip_prefix(&prefix).unwrap();
        assert!(Uuid::parse_str(segment).is_ok());
        assert_ne!(first.id, second.id);
        assert_eq!(
            first.body,
            json!({"properties": {
                "schedule": {"name": "nightly"},
                "runbook": {"name": "cleanup"},
                "parameters": {},
            }})
        );
    }

    #[test]
    fn test_prepare_uses_given_id() {
        let mut attrs = attrs();
        attrs.insert(
            "job_schedule_id".to_string(),
            Value::from("5f2ae5a4-5e5a-4a43-9d53-b1e6f1f3a9a1"),
        );
        let request = prepare(&attrs);
        assert_eq!(
            request.id,
            format!("{}/jobSchedules/5f2ae5a4-5e5a-4a43-9d53-b1e6f1f3a9a1", ACCOUNT)
        );

        attrs.insert("job_schedule_id".to_string(), Value::from("not-a-uuid"));
        assert!(JobScheduleType.prepare(&attrs, &ProviderConfig::new("sub")).is_err());
    }

    #[test]
    fn test_parameter_names_must_be_lowercase() {
        let mut params = HashMap::new();
        params.insert("VMName".to_string(), Value::from("web-1"));
        let mut attrs = attrs();
        attrs.insert("parameters".to_string(), Value::Map(params));

        let err = JobScheduleType
            .prepare(&attrs, &ProviderConfig::new("sub"))
            .unwrap_err();
        assert!(err.message.contains("must be lowercase"));
    }

    #[test]
    fn test_all_attributes_force_new() {
        let schema = JobScheduleType.schema();
        assert!(schema.attributes.values().all(|a| a.force_new));
    }

    #[test]
    fn test_duplicate_detection() {
        let request = prepare(&attrs());
        assert_eq!(
            JobScheduleType.duplicate_scan(&request),
            Some(format!("{}/jobSchedules", ACCOUNT))
        );

        let same = json!({"properties": {"schedule": {"name": "Nightly"}, "runbook": {"name": "cleanup"}}});
        let other = json!({"properties": {"schedule": {"name": "nightly"}, "runbook": {"name": "backup"}}});
        assert!(JobScheduleType.is_duplicate(&request, &same));
        assert!(!JobScheduleType.is_duplicate(&request, &other));
    }

    #[test]
    fn test_flatten() {
        let id = format!("{}/jobSchedules/5f2ae5a4-5e5a-4a43-9d53-b1e6f1f3a9a1", ACCOUNT);
        let body = json!({"properties": {
            "schedule": {"name": "nightly"},
            "runbook": {"name": "cleanup"},
            "parameters": {"VMName": "web-1"},
            "runOn": null,
        }});
        let attrs = JobScheduleType.flatten(&id, &body);
        assert_eq!(
            attrs.get("job_schedule_id"),
            Some(&Value::from("5f2ae5a4-5e5a-4a43-9d53-b1e6f1f3a9a1"))
        );
        assert_eq!(attrs.get("runbook_name"), Some(&Value::from("cleanup")));
        assert!(!attrs.contains_key("run_on"));
        let Some(Value::Map(params)) = attrs.get("parameters") else {
            panic!("Expected parameters map");
        };
        assert_eq!(params.get("vmname"), Some(&Value::from("web-1")));
    }
}
