//! automation_software_update_configuration
//!
//! Update deployments for Linux or Windows machines. The configuration is
//! validated and scheduled asynchronously by the service, so create and
//! update wait for the provisioning state to reach `Succeeded`.

use std::collections::HashMap;

use automation_core::provider::{ProviderError, ProviderResult, ResourceType};
use automation_core::resource::{Attributes, Value};
use automation_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use serde::Deserialize;
use serde_json::json;

use super::schedule::{
    DEFAULT_TIMEZONE, FREQUENCIES, MonthlyOccurrence, Recurrence, flatten_advanced_schedule,
    monthly_occurrence_type, normalize_timestamp,
};
use super::{ArmRequest, AutomationResource, decode};
use crate::config::ProviderConfig;
use crate::polling::ProvisioningSpec;
use crate::types::{
    WEEK_DAYS, account_id_attribute, iso8601_duration, month_day, name_attribute,
    rfc3339_timestamp,
};
use crate::utils::{child_id, json_path, parent_account_id, prune_nulls, set_from};

pub const REBOOT_SETTINGS: &[&str] = &["IfRequired", "Never", "Always", "RebootOnly"];

pub const LINUX_CLASSIFICATIONS: &[&str] = &["Critical", "Security", "Other", "Unclassified"];

pub const WINDOWS_CLASSIFICATIONS: &[&str] = &[
    "Unclassified",
    "Critical",
    "Security",
    "UpdateRollup",
    "FeaturePack",
    "ServicePack",
    "Definition",
    "Tools",
    "Updates",
];

pub const DEFAULT_DURATION: &str = "PT2H";

pub struct SoftwareUpdateConfigurationType;

// =============================================================================
// Model
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SoftwareUpdateConfiguration {
    automation_account_id: String,
    name: String,
    linux: Option<Linux>,
    windows: Option<Windows>,
    duration: String,
    #[serde(default)]
    virtual_machine_ids: Vec<String>,
    #[serde(default)]
    non_azure_computer_names: Vec<String>,
    target: Option<Target>,
    schedule: Schedule,
    pre_task: Option<Task>,
    post_task: Option<Task>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Linux {
    reboot: String,
    #[serde(default)]
    classifications_included: Vec<String>,
    #[serde(default)]
    excluded_packages: Vec<String>,
    #[serde(default)]
    included_packages: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Windows {
    reboot: String,
    #[serde(default)]
    classifications_included: Vec<String>,
    #[serde(default)]
    excluded_knowledge_base_numbers: Vec<String>,
    #[serde(default)]
    included_knowledge_base_numbers: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Target {
    #[serde(default)]
    azure_query: Vec<AzureQuery>,
    #[serde(default)]
    non_azure_query: Vec<NonAzureQuery>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AzureQuery {
    #[serde(default)]
    scope: Vec<String>,
    #[serde(default)]
    locations: Vec<String>,
    #[serde(default)]
    tags: Vec<TagValues>,
    tag_filter: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TagValues {
    tag: String,
    values: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NonAzureQuery {
    function_alias: Option<String>,
    workspace_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Schedule {
    frequency: String,
    interval: Option<i64>,
    start_time: Option<String>,
    start_time_offset_minutes: Option<i64>,
    expiry_time: Option<String>,
    expiry_time_offset_minutes: Option<i64>,
    next_run: Option<String>,
    next_run_offset_minutes: Option<i64>,
    time_zone: String,
    is_enabled: bool,
    description: Option<String>,
    #[serde(default)]
    advanced_week_days: Vec<String>,
    #[serde(default)]
    advanced_month_days: Vec<i64>,
    #[serde(default)]
    monthly_occurrence: Vec<MonthlyOccurrence>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Task {
    source: String,
    #[serde(default)]
    parameters: HashMap<String, String>,
}

// =============================================================================
// Schema
// =============================================================================

fn block(name: &str, fields: Vec<AttributeSchema>) -> AttributeType {
    AttributeType::Struct {
        name: name.to_string(),
        fields,
    }
}

fn list_of(inner: AttributeType) -> AttributeType {
    AttributeType::List(Box::new(inner))
}

fn task_block() -> AttributeType {
    block(
        "UpdateTask",
        vec![
            AttributeSchema::new("source", AttributeType::String).required(),
            AttributeSchema::new("parameters", AttributeType::string_map()),
        ],
    )
}

fn schedule_block() -> AttributeType {
    block(
        "UpdateSchedule",
        vec![
            AttributeSchema::new("frequency", AttributeType::enumeration(FREQUENCIES)).required(),
            AttributeSchema::new("interval", types::positive_int()),
            AttributeSchema::new("start_time", rfc3339_timestamp()),
            AttributeSchema::new("start_time_offset_minutes", AttributeType::Int),
            AttributeSchema::new("expiry_time", rfc3339_timestamp()),
            AttributeSchema::new("expiry_time_offset_minutes", AttributeType::Int),
            AttributeSchema::new("next_run", rfc3339_timestamp()),
            AttributeSchema::new("next_run_offset_minutes", AttributeType::Int),
            AttributeSchema::new("time_zone", AttributeType::String).with_default(DEFAULT_TIMEZONE),
            AttributeSchema::new("is_enabled", AttributeType::Bool).with_default(true),
            AttributeSchema::new("description", AttributeType::String),
            // The service does not return the advanced schedule
            AttributeSchema::new(
                "advanced_week_days",
                list_of(AttributeType::enumeration(WEEK_DAYS)),
            )
            .write_only(),
            AttributeSchema::new("advanced_month_days", list_of(month_day())).write_only(),
            AttributeSchema::new("monthly_occurrence", monthly_occurrence_type()).write_only(),
            AttributeSchema::new("creation_time", AttributeType::String).read_only(),
            AttributeSchema::new("last_modified_time", AttributeType::String).read_only(),
        ],
    )
}

fn target_block() -> AttributeType {
    let azure_query = block(
        "AzureQuery",
        vec![
            AttributeSchema::new("scope", AttributeType::string_list()),
            AttributeSchema::new("locations", AttributeType::string_list()),
            AttributeSchema::new(
                "tags",
                list_of(block(
                    "TagValues",
                    vec![
                        AttributeSchema::new("tag", AttributeType::String).required(),
                        AttributeSchema::new("values", AttributeType::string_list()).required(),
                    ],
                )),
            ),
            AttributeSchema::new("tag_filter", AttributeType::enumeration(&["All", "Any"])),
        ],
    );
    let non_azure_query = block(
        "NonAzureQuery",
        vec![
            AttributeSchema::new("function_alias", AttributeType::String),
            AttributeSchema::new("workspace_id", AttributeType::String),
        ],
    );

    block(
        "UpdateTarget",
        vec![
            AttributeSchema::new("azure_query", list_of(azure_query)),
            AttributeSchema::new("non_azure_query", list_of(non_azure_query)),
        ],
    )
}

impl ResourceType for SoftwareUpdateConfigurationType {
    fn name(&self) -> &'static str {
        "automation_software_update_configuration"
    }

    fn schema(&self) -> ResourceSchema {
        let classifications = |allowed: &[&str]| list_of(AttributeType::enumeration(allowed));
        let reboot = || {
            AttributeSchema::new("reboot", AttributeType::enumeration(REBOOT_SETTINGS))
                .with_default("IfRequired")
        };

        let linux = block(
            "Linux",
            vec![
                reboot(),
                AttributeSchema::new(
                    "classifications_included",
                    classifications(LINUX_CLASSIFICATIONS),
                ),
                AttributeSchema::new("excluded_packages", AttributeType::string_list()),
                AttributeSchema::new("included_packages", AttributeType::string_list()),
            ],
        );
        let windows = block(
            "Windows",
            vec![
                reboot(),
                AttributeSchema::new(
                    "classifications_included",
                    classifications(WINDOWS_CLASSIFICATIONS),
                ),
                AttributeSchema::new(
                    "excluded_knowledge_base_numbers",
                    AttributeType::string_list(),
                ),
                AttributeSchema::new(
                    "included_knowledge_base_numbers",
                    AttributeType::string_list(),
                ),
            ],
        );

        ResourceSchema::new(self.name())
            .with_description("Software update deployment of an Automation account")
            .attribute(account_id_attribute())
            .attribute(name_attribute())
            .attribute(AttributeSchema::new("linux", linux))
            .attribute(AttributeSchema::new("windows", windows))
            .attribute(
                AttributeSchema::new("duration", iso8601_duration())
                    .with_default(DEFAULT_DURATION)
                    .with_description("Maintenance window length"),
            )
            .attribute(AttributeSchema::new(
                "virtual_machine_ids",
                AttributeType::string_list(),
            ))
            .attribute(AttributeSchema::new(
                "non_azure_computer_names",
                AttributeType::string_list(),
            ))
            .attribute(AttributeSchema::new("target", target_block()))
            .attribute(AttributeSchema::new("schedule", schedule_block()).required())
            .attribute(AttributeSchema::new("pre_task", task_block()))
            .attribute(AttributeSchema::new("post_task", task_block()))
            .attribute(AttributeSchema::new("operating_system", AttributeType::String).read_only())
            .attribute(AttributeSchema::new("error_code", AttributeType::String).read_only())
            .attribute(AttributeSchema::new("error_message", AttributeType::String).read_only())
    }
}

// =============================================================================
// Request Body
// =============================================================================

/// `None` for empty lists so they are left out of the request
fn non_empty<T>(items: &[T]) -> Option<&[T]> {
    if items.is_empty() { None } else { Some(items) }
}

fn joined(items: &[String]) -> Option<String> {
    non_empty(items).map(|items| items.join(","))
}

fn expand_targets(target: &Target) -> serde_json::Value {
    let azure_queries: Vec<serde_json::Value> = target
        .azure_query
        .iter()
        .map(|q| {
            let tag_settings = if q.tags.is_empty() && q.tag_filter.is_none() {
                None
            } else {
                let tags: serde_json::Map<String, serde_json::Value> = q
                    .tags
                    .iter()
                    .map(|t| (t.tag.clone(), json!(t.values)))
                    .collect();
                Some(json!({"tags": tags, "filterOperator": q.tag_filter}))
            };
            json!({
                "scope": non_empty(&q.scope),
                "locations": non_empty(&q.locations),
                "tagSettings": tag_settings,
            })
        })
        .collect();
    let non_azure_queries: Vec<serde_json::Value> = target
        .non_azure_query
        .iter()
        .map(|q| json!({"functionAlias": q.function_alias, "workspaceId": q.workspace_id}))
        .collect();

    json!({
        "azureQueries": non_empty(&azure_queries),
        "nonAzureQueries": non_empty(&non_azure_queries),
    })
}

fn expand_schedule(schedule: &Schedule) -> ProviderResult<serde_json::Value> {
    let recurrence = Recurrence {
        frequency: &schedule.frequency,
        interval: schedule.interval,
        week_days: &schedule.advanced_week_days,
        month_days: &schedule.advanced_month_days,
        monthly_occurrence: &schedule.monthly_occurrence,
    };
    let interval = recurrence.validate()?;

    Ok(json!({
        "frequency": schedule.frequency,
        "interval": interval,
        "startTime": schedule.start_time.as_deref().map(normalize_timestamp),
        "startTimeOffsetMinutes": schedule.start_time_offset_minutes,
        "expiryTime": schedule.expiry_time.as_deref().map(normalize_timestamp),
        "expiryTimeOffsetMinutes": schedule.expiry_time_offset_minutes,
        "nextRun": schedule.next_run.as_deref().map(normalize_timestamp),
        "nextRunOffsetMinutes": schedule.next_run_offset_minutes,
        "timeZone": schedule.time_zone,
        "isEnabled": schedule.is_enabled,
        "description": schedule.description,
        "advancedSchedule": recurrence.advanced_schedule(),
    }))
}

fn expand_task(task: &Task) -> serde_json::Value {
    json!({"source": task.source, "parameters": task.parameters})
}

impl AutomationResource for SoftwareUpdateConfigurationType {
    fn prepare(
        &self,
        attributes: &Attributes,
        _config: &ProviderConfig,
    ) -> ProviderResult<ArmRequest> {
        let suc: SoftwareUpdateConfiguration = decode(&self.schema(), attributes)?;

        if parent_account_id(&suc.automation_account_id).as_deref()
            != Some(suc.automation_account_id.trim_end_matches('/'))
        {
            return Err(ProviderError::new(format!(
                "automation_account_id '{}' is not an Automation account ID",
                suc.automation_account_id
            )));
        }

        let (operating_system, linux, windows) = match (&suc.linux, &suc.windows) {
            (Some(linux), None) => (
                "Linux",
                Some(json!({
                    "rebootSetting": linux.reboot,
                    "includedPackageClassifications": joined(&linux.classifications_included),
                    "excludedPackageNameMasks": non_empty(&linux.excluded_packages),
                    "includedPackageNameMasks": non_empty(&linux.included_packages),
                })),
                None,
            ),
            (None, Some(windows)) => (
                "Windows",
                None,
                Some(json!({
                    "rebootSetting": windows.reboot,
                    "includedUpdateClassifications": joined(&windows.classifications_included),
                    "excludedKbNumbers": non_empty(&windows.excluded_knowledge_base_numbers),
                    "includedKbNumbers": non_empty(&windows.included_knowledge_base_numbers),
                })),
            ),
            _ => {
                return Err(ProviderError::new(
                    "Exactly one of linux or windows must be set",
                ));
            }
        };

        let tasks = if suc.pre_task.is_none() && suc.post_task.is_none() {
            None
        } else {
            Some(json!({
                "preTask": suc.pre_task.as_ref().map(expand_task),
                "postTask": suc.post_task.as_ref().map(expand_task),
            }))
        };

        let body = prune_nulls(json!({
            "properties": {
                "updateConfiguration": {
                    "operatingSystem": operating_system,
                    "linux": linux,
                    "windows": windows,
                    "duration": suc.duration,
                    "azureVirtualMachines": non_empty(&suc.virtual_machine_ids),
                    "nonAzureComputerNames": non_empty(&suc.non_azure_computer_names),
                    "targets": suc.target.as_ref().map(expand_targets),
                },
                "scheduleInfo": expand_schedule(&suc.schedule)?,
                "tasks": tasks,
            }
        }));

        Ok(ArmRequest::new(
            child_id(
                &suc.automation_account_id,
                "softwareUpdateConfigurations",
                &suc.name,
            ),
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

        let update = json_path(body, "properties.updateConfiguration");
        if let Some(update) = update {
            set_from(&mut attributes, "duration", update, "duration");
            set_from(&mut attributes, "virtual_machine_ids", update, "azureVirtualMachines");
            set_from(&mut attributes, "non_azure_computer_names", update, "nonAzureComputerNames");
            set_from(&mut attributes, "operating_system", update, "operatingSystem");
            if let Some(linux) = update.get("linux").filter(|v| !v.is_null()) {
                attributes.insert("linux".to_string(), flatten_linux(linux));
            }
            if let Some(windows) = update.get("windows").filter(|v| !v.is_null()) {
                attributes.insert("windows".to_string(), flatten_windows(windows));
            }
            if let Some(targets) = update.get("targets").filter(|v| !v.is_null()) {
                attributes.insert("target".to_string(), flatten_targets(targets));
            }
        }

        if let Some(schedule) = json_path(body, "properties.scheduleInfo") {
            attributes.insert("schedule".to_string(), flatten_schedule(schedule));
        }
        for (name, key) in [("pre_task", "preTask"), ("post_task", "postTask")] {
            if let Some(task) = json_path(body, &format!("properties.tasks.{}", key))
                && let Some(source) = task.get("source").and_then(|v| v.as_str())
            {
                let mut fields = HashMap::new();
                fields.insert("source".to_string(), Value::from(source));
                set_from(&mut fields, "parameters", task, "parameters");
                attributes.insert(name.to_string(), Value::Map(fields));
            }
        }

        set_from(&mut attributes, "error_code", body, "properties.error.code");
        set_from(&mut attributes, "error_message", body, "properties.error.message");
        attributes
    }

    fn provisioning(&self) -> Option<ProvisioningSpec> {
        Some(ProvisioningSpec {
            target: "Succeeded",
            pending: &["Provisioning", "Creating", "Updating"],
            failed: &["Failed"],
        })
    }
}

// =============================================================================
// Response Flattening
// =============================================================================

/// Classifications come back as "Critical, Security"
fn split_classifications(value: Option<&serde_json::Value>) -> Option<Value> {
    let items: Vec<Value> = value?
        .as_str()?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Value::from)
        .collect();
    if items.is_empty() { None } else { Some(Value::List(items)) }
}

fn flatten_linux(linux: &serde_json::Value) -> Value {
    let mut fields = HashMap::new();
    set_from(&mut fields, "reboot", linux, "rebootSetting");
    set_from(&mut fields, "excluded_packages", linux, "excludedPackageNameMasks");
    set_from(&mut fields, "included_packages", linux, "includedPackageNameMasks");
    if let Some(c) = split_classifications(linux.get("includedPackageClassifications")) {
        fields.insert("classifications_included".to_string(), c);
    }
    Value::Map(fields)
}

fn flatten_windows(windows: &serde_json::Value) -> Value {
    let mut fields = HashMap::new();
    set_from(&mut fields, "reboot", windows, "rebootSetting");
    set_from(&mut fields, "excluded_knowledge_base_numbers", windows, "excludedKbNumbers");
    set_from(&mut fields, "included_knowledge_base_numbers", windows, "includedKbNumbers");
    if let Some(c) = split_classifications(windows.get("includedUpdateClassifications")) {
        fields.insert("classifications_included".to_string(), c);
    }
    Value::Map(fields)
}

fn flatten_targets(targets: &serde_json::Value) -> Value {
    let azure_queries: Vec<Value> = targets
        .get("azureQueries")
        .and_then(|v| v.as_array())
        .map(|queries| {
            queries
                .iter()
                .map(|q| {
                    let mut fields = HashMap::new();
                    set_from(&mut fields, "scope", q, "scope");
                    set_from(&mut fields, "locations", q, "locations");
                    set_from(&mut fields, "tag_filter", q, "tagSettings.filterOperator");
                    if let Some(tags) = json_path(q, "tagSettings.tags").and_then(|t| t.as_object())
                    {
                        let mut entries: Vec<(&String, &serde_json::Value)> = tags.iter().collect();
                        entries.sort_by(|a, b| a.0.cmp(b.0));
                        let tags: Vec<Value> = entries
                            .into_iter()
                            .map(|(tag, values)| {
                                let mut entry = HashMap::new();
                                entry.insert("tag".to_string(), Value::from(tag.as_str()));
                                entry.insert(
                                    "values".to_string(),
                                    Value::from_json(values).unwrap_or(Value::List(Vec::new())),
                                );
                                Value::Map(entry)
                            })
                            .collect();
                        fields.insert("tags".to_string(), Value::List(tags));
                    }
                    Value::Map(fields)
                })
                .collect()
        })
        .unwrap_or_default();

    let non_azure_queries: Vec<Value> = targets
        .get("nonAzureQueries")
        .and_then(|v| v.as_array())
        .map(|queries| {
            queries
                .iter()
                .map(|q| {
                    let mut fields = HashMap::new();
                    set_from(&mut fields, "function_alias", q, "functionAlias");
                    set_from(&mut fields, "workspace_id", q, "workspaceId");
                    Value::Map(fields)
                })
                .collect()
        })
        .unwrap_or_default();

    let mut fields = HashMap::new();
    fields.insert("azure_query".to_string(), Value::List(azure_queries));
    fields.insert("non_azure_query".to_string(), Value::List(non_azure_queries));
    Value::Map(fields)
}

fn flatten_schedule(schedule: &serde_json::Value) -> Value {
    let mut fields = HashMap::new();
    set_from(&mut fields, "frequency", schedule, "frequency");
    set_from(&mut fields, "time_zone", schedule, "timeZone");
    set_from(&mut fields, "is_enabled", schedule, "isEnabled");
    set_from(&mut fields, "description", schedule, "description");
    if schedule.get("frequency").and_then(|v| v.as_str()) != Some("OneTime") {
        set_from(&mut fields, "interval", schedule, "interval");
    }
    for (name, key) in [
        ("start_time_offset_minutes", "startTimeOffsetMinutes"),
        ("expiry_time_offset_minutes", "expiryTimeOffsetMinutes"),
        ("next_run_offset_minutes", "nextRunOffsetMinutes"),
    ] {
        set_from(&mut fields, name, schedule, key);
    }
    for (name, key) in [
        ("start_time", "startTime"),
        ("expiry_time", "expiryTime"),
        ("next_run", "nextRun"),
        ("creation_time", "creationTime"),
        ("last_modified_time", "lastModifiedTime"),
    ] {
        if let Some(t) = schedule.get(key).and_then(|v| v.as_str()) {
            fields.insert(name.to_string(), Value::String(normalize_timestamp(t)));
        }
    }
    flatten_advanced_schedule(
        &mut fields,
        schedule.get("advancedSchedule"),
        ["advanced_week_days", "advanced_month_days", "monthly_occurrence"],
    );
    Value::Map(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use automation_core::differ::find_changed_attributes;

    const ACCOUNT: &str = "/subscriptions/sub/resourceGroups/rg-ops/providers/Microsoft.Automation/automationAccounts/acct1";

    fn map(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    fn strings(items: &[&str]) -> Value {
        Value::List(items.iter().map(|s| Value::from(*s)).collect())
    }

    fn attrs() -> Attributes {
        let mut attrs = HashMap::new();
        attrs.insert("automation_account_id".to_string(), Value::from(ACCOUNT));
        attrs.insert("name".to_string(), Value::from("patch-tuesday"));
        attrs.insert(
            "linux".to_string(),
            map(vec![(
                "classifications_included",
                strings(&["Critical", "Security"]),
            )]),
        );
        attrs.insert(
            "schedule".to_string(),
            map(vec![
                ("frequency", Value::from("Week")),
                ("start_time", Value::from("2026-10-20T02:00:00Z")),
                ("advanced_week_days", strings(&["Tuesday"])),
            ]),
        );
        attrs.insert(
            "target".to_string(),
            map(vec![(
                "azure_query",
                Value::List(vec![map(vec![
                    ("scope", strings(&["/subscriptions/sub"])),
                    (
                        "tags",
                        Value::List(vec![map(vec![
                            ("tag", Value::from("patch")),
                            ("values", strings(&["weekly"])),
                        ])]),
                    ),
                    ("tag_filter", Value::from("Any")),
                ])]),
            )]),
        );
        attrs
    }

    fn prepare(attrs: &Attributes) -> ProviderResult<ArmRequest> {
        SoftwareUpdateConfigurationType.prepare(attrs, &ProviderConfig::new("sub"))
    }

    #[test]
    fn test_prepare_linux() {
        let request = prepare(&attrs()).unwrap();
        assert_eq!(
            request.id,
            format!("{}/softwareUpdateConfigurations/patch-tuesday", ACCOUNT)
        );

        let update = &request.body["properties"]["updateConfiguration"];
        assert_eq!(update["operatingSystem"], json!("Linux"));
        assert_eq!(update["duration"], json!("PT2H"));
        assert_eq!(
            update["linux"],
            json!({"rebootSetting": "IfRequired", "includedPackageClassifications": "Critical,Security"})
        );
        assert!(update.get("windows").is_none());
        assert_eq!(
            update["targets"],
            json!({"azureQueries": [{
                "scope": ["/subscriptions/sub"],
                "tagSettings": {"tags": {"patch": ["weekly"]}, "filterOperator": "Any"},
            }]})
        );

        assert_eq!(
            request.body["properties"]["scheduleInfo"],
            json!({
                "frequency": "Week",
                "interval": 1,
                "startTime": "2026-10-20T02:00:00Z",
                "timeZone": "Etc/UTC",
                "isEnabled": true,
                "advancedSchedule": {"weekDays": ["Tuesday"]},
            })
        );
        assert!(request.body["properties"].get("tasks").is_none());
    }

    #[test]
    fn test_exactly_one_operating_system() {
        let mut attrs = attrs();
        attrs.insert("windows".to_string(), map(vec![]));
        let err = prepare(&attrs).unwrap_err();
        assert!(err.message.contains("Exactly one of linux or windows"));

        attrs.remove("windows");
        attrs.remove("linux");
        assert!(prepare(&attrs).is_err());
    }

    #[test]
    fn test_invalid_duration_is_rejected() {
        let mut attrs = attrs();
        attrs.insert("duration".to_string(), Value::from("2 hours"));
        let err = prepare(&attrs).unwrap_err();
        assert!(err.message.contains("Attribute 'duration'"));
    }

    #[test]
    fn test_schedule_recurrence_rules_apply() {
        let mut attrs = attrs();
        attrs.insert(
            "schedule".to_string(),
            map(vec![
                ("frequency", Value::from("Day")),
                ("advanced_week_days", strings(&["Tuesday"])),
            ]),
        );
        assert!(prepare(&attrs).is_err());
    }

    #[test]
    fn test_prepare_schedule_offsets_and_next_run() {
        let mut attrs = attrs();
        attrs.insert(
            "schedule".to_string(),
            map(vec![
                ("frequency", Value::from("OneTime")),
                ("start_time", Value::from("2026-10-20T11:00:00+09:00")),
                ("start_time_offset_minutes", Value::Int(540)),
                ("next_run", Value::from("2026-10-20T11:00:00+09:00")),
                ("next_run_offset_minutes", Value::Int(540)),
                ("expiry_time_offset_minutes", Value::Int(0)),
            ]),
        );

        let request = prepare(&attrs).unwrap();
        let schedule = &request.body["properties"]["scheduleInfo"];
        assert_eq!(schedule["startTime"], json!("2026-10-20T02:00:00Z"));
        assert_eq!(schedule["startTimeOffsetMinutes"], json!(540));
        assert_eq!(schedule["nextRun"], json!("2026-10-20T02:00:00Z"));
        assert_eq!(schedule["nextRunOffsetMinutes"], json!(540));
        assert_eq!(schedule["expiryTimeOffsetMinutes"], json!(0));
        assert!(schedule.get("interval").is_none());
    }

    #[test]
    fn test_schedule_timestamps_are_read_only() {
        let mut attrs = attrs();
        attrs.insert(
            "schedule".to_string(),
            map(vec![
                ("frequency", Value::from("Week")),
                ("creation_time", Value::from("2026-10-01T00:00:00Z")),
            ]),
        );
        let err = prepare(&attrs).unwrap_err();
        assert!(err.message.contains("creation_time"));
    }

    #[test]
    fn test_tasks() {
        let mut attrs = attrs();
        attrs.insert(
            "pre_task".to_string(),
            map(vec![
                ("source", Value::from("Stop-Services")),
                ("parameters", map(vec![("mode", Value::from("drain"))])),
            ]),
        );
        let request = prepare(&attrs).unwrap();
        assert_eq!(
            request.body["properties"]["tasks"],
            json!({"preTask": {"source": "Stop-Services", "parameters": {"mode": "drain"}}})
        );
    }

    #[test]
    fn test_flatten_matches_configuration() {
        let id = format!("{}/softwareUpdateConfigurations/patch-tuesday", ACCOUNT);
        let body = json!({
            "properties": {
                "updateConfiguration": {
                    "operatingSystem": "Linux",
                    "linux": {
                        "rebootSetting": "IfRequired",
                        "includedPackageClassifications": "Critical, Security",
                    },
                    "duration": "PT2H",
                    "targets": {
                        "azureQueries": [{
                            "scope": ["/subscriptions/sub"],
                            "tagSettings": {"tags": {"patch": ["weekly"]}, "filterOperator": "Any"},
                        }],
                        "nonAzureQueries": [],
                    },
                },
                "scheduleInfo": {
                    "frequency": "Week",
                    "interval": 1,
                    "startTime": "2026-10-20T02:00:00+00:00",
                    "expiryTime": "9999-12-31T23:59:00+00:00",
                    "timeZone": "Etc/UTC",
                    "isEnabled": true,
                    "startTimeOffsetMinutes": 0.0,
                    "expiryTimeOffsetMinutes": 0.0,
                    "nextRun": "2026-10-20T02:00:00+00:00",
                    "nextRunOffsetMinutes": 0.0,
                    "creationTime": "2026-10-16T08:12:40.123+00:00",
                    "lastModifiedTime": "2026-10-16T08:12:41.456+00:00",
                },
                "provisioningState": "Succeeded",
            }
        });

        let current = SoftwareUpdateConfigurationType.flatten(&id, &body);
        assert_eq!(current.get("operating_system"), Some(&Value::from("Linux")));
        assert!(!current.contains_key("error_message"));
        let Some(Value::Map(schedule)) = current.get("schedule") else {
            panic!("schedule block missing: {:?}", current);
        };
        assert_eq!(schedule.get("next_run"), Some(&Value::from("2026-10-20T02:00:00Z")));
        assert_eq!(schedule.get("next_run_offset_minutes"), Some(&Value::Int(0)));
        assert_eq!(schedule.get("start_time_offset_minutes"), Some(&Value::Int(0)));
        assert_eq!(
            schedule.get("creation_time"),
            Some(&Value::from("2026-10-16T08:12:40Z"))
        );
        assert_eq!(
            schedule.get("last_modified_time"),
            Some(&Value::from("2026-10-16T08:12:41Z"))
        );

        let schema = SoftwareUpdateConfigurationType.schema();
        let changed = find_changed_attributes(&attrs(), &current, &schema);
        assert!(changed.is_empty(), "unexpected changes: {:?}", changed);

        // configured next run and offsets compare against the read-back values
        let mut configured = attrs();
        configured.insert(
            "schedule".to_string(),
            map(vec![
                ("frequency", Value::from("Week")),
                ("start_time", Value::from("2026-10-20T02:00:00Z")),
                ("start_time_offset_minutes", Value::Int(0)),
                ("next_run", Value::from("2026-10-20T02:00:00Z")),
                ("next_run_offset_minutes", Value::Int(0)),
                ("advanced_week_days", strings(&["Tuesday"])),
            ]),
        );
        let changed = find_changed_attributes(&configured, &current, &schema);
        assert!(changed.is_empty(), "unexpected changes: {:?}", changed);
    }

    #[test]
    fn test_flatten_error() {
        let id = format!("{}/softwareUpdateConfigurations/patch-tuesday", ACCOUNT);
        let body = json!({"properties": {
            "provisioningState": "Failed",
            "error": {"code": "InvalidTarget", "message": "scope not found"},
        }});
        let attrs = SoftwareUpdateConfigurationType.flatten(&id, &body);
        assert_eq!(attrs.get("error_code"), Some(&Value::from("InvalidTarget")));
        assert_eq!(attrs.get("error_message"), Some(&Value::from("scope not found")));
    }
}
