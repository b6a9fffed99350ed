//! automation_runbook
//!
//! Inline `content` is not part of the runbook body: it is uploaded as the
//! draft after the PUT and then published.

use std::collections::HashMap;

use automation_core::provider::{ProviderError, ProviderResult, ResourceType};
use automation_core::resource::{Attributes, Value};
use automation_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use serde::Deserialize;
use serde_json::json;

use super::{ArmRequest, AutomationResource, FollowUp, account_scoped, decode, scoped_id};
use crate::config::ProviderConfig;
use crate::types::{description_attribute, location_attribute, tags_attribute};
use crate::utils::{
    expand_tags, flatten_tags, json_path, prune_nulls, set_account_scope, set_from,
};

pub const RUNBOOK_TYPES: &[&str] = &[
    "Graph",
    "GraphPowerShell",
    "GraphPowerShellWorkflow",
    "PowerShell",
    "PowerShell72",
    "PowerShellWorkflow",
    "Python2",
    "Python3",
    "Script",
];

pub struct RunbookType;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Runbook {
    name: String,
    resource_group_name: String,
    automation_account_name: String,
    location: String,
    runbook_type: String,
    log_progress: bool,
    log_verbose: bool,
    description: Option<String>,
    content: Option<String>,
    publish_content_link: Option<ContentLink>,
    log_activity_trace_level: Option<i64>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContentLink {
    uri: String,
    version: Option<String>,
}

impl ResourceType for RunbookType {
    fn name(&self) -> &'static str {
        "automation_runbook"
    }

    fn schema(&self) -> ResourceSchema {
        account_scoped(ResourceSchema::new(self.name()))
            .with_description("Runbook in an Automation account")
            .attribute(location_attribute())
            .attribute(
                AttributeSchema::new("runbook_type", AttributeType::enumeration(RUNBOOK_TYPES))
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("log_progress", AttributeType::Bool).required())
            .attribute(AttributeSchema::new("log_verbose", AttributeType::Bool).required())
            .attribute(description_attribute())
            .attribute(
                AttributeSchema::new("content", AttributeType::String)
                    .write_only()
                    .with_description("Script body, uploaded as draft and published"),
            )
            .attribute(AttributeSchema::new(
                "publish_content_link",
                AttributeType::Struct {
                    name: "PublishContentLink".to_string(),
                    fields: vec![
                        AttributeSchema::new("uri", AttributeType::String).required(),
                        AttributeSchema::new("version", AttributeType::String),
                    ],
                },
            ))
            .attribute(
                AttributeSchema::new("log_activity_trace_level", AttributeType::Int)
                    .with_description("0 disables activity tracing"),
            )
            .attribute(tags_attribute())
    }
}

impl AutomationResource for RunbookType {
    fn prepare(
        &self,
        attributes: &Attributes,
        config: &ProviderConfig,
    ) -> ProviderResult<ArmRequest> {
        let runbook: Runbook = decode(&self.schema(), attributes)?;

        if runbook.content.is_none() && runbook.publish_content_link.is_none() {
            return Err(ProviderError::new(
                "One of content or publish_content_link must be set",
            ));
        }
        if let Some(level) = runbook.log_activity_trace_level
            && level < 0
        {
            return Err(ProviderError::new(format!(
                "log_activity_trace_level must not be negative, got {}",
                level
            )));
        }

        let id = scoped_id(
            config,
            &runbook.resource_group_name,
            &runbook.automation_account_name,
            "runbooks",
            &runbook.name,
        );

        let publish_content_link = runbook.publish_content_link.map(|link| {
            json!({
                "uri": link.uri,
                "version": link.version,
            })
        });
        // An uploaded draft replaces the published content link
        let draft = runbook.content.as_ref().map(|_| json!({}));

        let body = prune_nulls(json!({
            "location": runbook.location,
            "properties": {
                "runbookType": runbook.runbook_type,
                "logProgress": runbook.log_progress,
                "logVerbose": runbook.log_verbose,
                "description": runbook.description,
                "logActivityTrace": runbook.log_activity_trace_level,
                "publishContentLink": publish_content_link,
                "draft": draft,
            },
            "tags": expand_tags(&runbook.tags),
        }));

        let mut request = ArmRequest::new(id.clone(), body);
        if let Some(content) = runbook.content {
            request = request
                .with_follow_up(FollowUp::PutContent {
                    path: format!("{}/draft/content", id),
                    content,
                })
                .with_follow_up(FollowUp::Post {
                    path: format!("{}/publish", id),
                });
        }
        Ok(request)
    }

    fn flatten(&self, id: &str, body: &serde_json::Value) -> Attributes {
        let mut attributes = HashMap::new();
        set_account_scope(&mut attributes, id);
        set_from(&mut attributes, "location", body, "location");
        set_from(&mut attributes, "runbook_type", body, "properties.runbookType");
        set_from(&mut attributes, "log_progress", body, "properties.logProgress");
        set_from(&mut attributes, "log_verbose", body, "properties.logVerbose");
        set_from(&mut attributes, "description", body, "properties.description");
        set_from(
            &mut attributes,
            "log_activity_trace_level",
            body,
            "properties.logActivityTrace",
        );

        if let Some(uri) = json_path(body, "properties.publishContentLink.uri").and_then(|v| v.as_str())
        {
            let mut link = HashMap::new();
            link.insert("uri".to_string(), Value::from(uri));
            if let Some(version) =
                json_path(body, "properties.publishContentLink.version").and_then(|v| v.as_str())
            {
                link.insert("version".to_string(), Value::from(version));
            }
            attributes.insert("publish_content_link".to_string(), Value::Map(link));
        }

        flatten_tags(&mut attributes, body);
        attributes
    }
}
