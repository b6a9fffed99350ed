//! Helpers for ARM resource IDs and JSON response bodies

use std::collections::HashMap;

use automation_core::resource::{Attributes, Value};
use serde_json::json;

/// ARM ID of an Automation account
pub fn account_id(subscription_id: &str, resource_group: &str, account: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Automation/automationAccounts/{}",
        subscription_id, resource_group, account
    )
}

/// ARM ID of a child resource of an Automation account
pub fn child_id(parent_id: &str, collection: &str, name: &str) -> String {
    format!("{}/{}/{}", parent_id.trim_end_matches('/'), collection, name)
}

/// Value following `key` in an ARM ID (keys compare case-insensitively)
///
/// `id_segment("/subscriptions/s/resourceGroups/rg/...", "resourceGroups")` is `Some("rg")`.
pub fn id_segment<'a>(id: &'a str, key: &str) -> Option<&'a str> {
    let mut parts = id.split('/').filter(|p| !p.is_empty());
    while let Some(part) = parts.next() {
        if part.eq_ignore_ascii_case(key) {
            return parts.next();
        }
    }
    None
}

/// Parent Automation account ID of a child resource ID
pub fn parent_account_id(id: &str) -> Option<String> {
    let idx = id
        .to_ascii_lowercase()
        .find("/automationaccounts/")?;
    let rest = &id[idx + "/automationAccounts/".len()..];
    let name_len = rest.find('/').unwrap_or(rest.len());
    Some(id[..idx + "/automationAccounts/".len() + name_len].to_string())
}

/// Walk a dotted path (`properties.sku.name`) through a JSON body
pub fn json_path<'a>(body: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.')
        .try_fold(body, |current, key| current.get(key))
        .filter(|v| !v.is_null())
}

/// Copy `path` from the body into `attributes[name]` when present
pub fn set_from(
    attributes: &mut Attributes,
    name: &str,
    body: &serde_json::Value,
    path: &str,
) {
    if let Some(value) = json_path(body, path).and_then(Value::from_json) {
        attributes.insert(name.to_string(), value);
    }
}

/// Read the common `name`, `resource_group_name` and `automation_account_name`
/// attributes back from an account child ID
pub fn set_account_scope(attributes: &mut Attributes, id: &str) {
    if let Some(rg) = id_segment(id, "resourceGroups") {
        attributes.insert("resource_group_name".to_string(), Value::from(rg));
    }
    if let Some(account) = id_segment(id, "automationAccounts") {
        attributes.insert("automation_account_name".to_string(), Value::from(account));
    }
    if let Some(name) = id.rsplit('/').find(|p| !p.is_empty()) {
        attributes.insert("name".to_string(), Value::from(name));
    }
}

/// Tags as sent to ARM
pub fn expand_tags(tags: &HashMap<String, String>) -> serde_json::Value {
    json!(tags)
}

/// Tags read back from ARM; absent or empty tags are left out
pub fn flatten_tags(attributes: &mut Attributes, body: &serde_json::Value) {
    if let Some(tags) = body.get("tags").and_then(|t| t.as_object()) {
        let tags: HashMap<String, Value> = tags
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), Value::from(s))))
            .collect();
        if !tags.is_empty() {
            attributes.insert("tags".to_string(), Value::Map(tags));
        }
    }
}

/// Remove `null` members recursively so optional fields are omitted from requests
pub fn prune_nulls(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, prune_nulls(v)))
                .collect(),
        ),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(prune_nulls).collect())
        }
        other => other,
    }
}
