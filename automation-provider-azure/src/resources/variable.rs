//! automation_variable_{string,int,bool,datetime}
//!
//! The API stores every variable value as a JSON literal inside a string:
//! `"\"text\""`, `"42"`, `"true"`, or `"\"\\/Date(1700000000000)\\/\""` for
//! timestamps (milliseconds since the epoch). Encrypted values are never
//! returned.

use std::collections::HashMap;

use automation_core::provider::{ProviderError, ProviderResult, ResourceType};
use automation_core::resource::{Attributes, Value};
use automation_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::{ArmRequest, AutomationResource, account_scoped, decode, scoped_id};
use crate::config::ProviderConfig;
use crate::types::{description_attribute, utc_millis, utc_timestamp};
use crate::utils::{json_path, prune_nulls, set_account_scope, set_from};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    String,
    Int,
    Bool,
    Datetime,
}

impl VariableKind {
    fn value_type(self) -> AttributeType {
        match self {
            VariableKind::String => AttributeType::String,
            VariableKind::Int => AttributeType::Int,
            VariableKind::Bool => AttributeType::Bool,
            VariableKind::Datetime => utc_timestamp(),
        }
    }

    /// Encode a configured value as the API's JSON literal
    fn encode(self, value: &serde_json::Value) -> Option<String> {
        match self {
            VariableKind::String => value.as_str().map(|s| json!(s).to_string()),
            VariableKind::Int => value.as_i64().map(|i| i.to_string()),
            VariableKind::Bool => value.as_bool().map(|b| b.to_string()),
            VariableKind::Datetime => {
                let timestamp = DateTime::parse_from_rfc3339(value.as_str()?).ok()?;
                Some(format!(r#""\/Date({})\/""#, timestamp.timestamp_millis()))
            }
        }
    }

    /// Decode the API's JSON literal back into an attribute value
    fn decode(self, raw: &str) -> Option<Value> {
        match self {
            VariableKind::String => serde_json::from_str::<String>(raw).ok().map(Value::String),
            VariableKind::Int => raw.trim().parse::<i64>().ok().map(Value::Int),
            VariableKind::Bool => raw.trim().parse::<bool>().ok().map(Value::Bool),
            VariableKind::Datetime => {
                let text = serde_json::from_str::<String>(raw).ok()?;
                let inner = text.strip_prefix("/Date(")?.strip_suffix(")/")?;
                // Offsets such as "+0000" may follow the milliseconds
                let digits_end = inner
                    .char_indices()
                    .skip(1)
                    .find(|(_, c)| !c.is_ascii_digit())
                    .map_or(inner.len(), |(i, _)| i);
                let millis = inner[..digits_end].parse::<i64>().ok()?;
                let timestamp = DateTime::<Utc>::from_timestamp_millis(millis)?;
                utc_millis(timestamp.into()).map(Value::String)
            }
        }
    }
}

pub struct VariableType {
    kind: VariableKind,
}

impl VariableType {
    pub const STRING: VariableType = VariableType {
        kind: VariableKind::String,
    };
    pub const INT: VariableType = VariableType {
        kind: VariableKind::Int,
    };
    pub const BOOL: VariableType = VariableType {
        kind: VariableKind::Bool,
    };
    pub const DATETIME: VariableType = VariableType {
        kind: VariableKind::Datetime,
    };

    pub fn kind(&self) -> VariableKind {
        self.kind
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Variable {
    name: String,
    resource_group_name: String,
    automation_account_name: String,
    value: Option<serde_json::Value>,
    encrypted: bool,
    description: Option<String>,
}

impl ResourceType for VariableType {
    fn name(&self) -> &'static str {
        match self.kind {
            VariableKind::String => "automation_variable_string",
            VariableKind::Int => "automation_variable_int",
            VariableKind::Bool => "automation_variable_bool",
            VariableKind::Datetime => "automation_variable_datetime",
        }
    }

    fn schema(&self) -> ResourceSchema {
        account_scoped(ResourceSchema::new(self.name()))
            .with_description("Variable asset of an Automation account")
            .attribute(
                AttributeSchema::new("value", self.kind.value_type())
                    .write_only()
                    .with_description("Not returned by the API when encrypted"),
            )
            .attribute(
                AttributeSchema::new("encrypted", AttributeType::Bool)
                    .with_default(false)
                    .force_new(),
            )
            .attribute(description_attribute())
    }
}

impl AutomationResource for VariableType {
    fn prepare(
        &self,
        attributes: &Attributes,
        config: &ProviderConfig,
    ) -> ProviderResult<ArmRequest> {
        let variable: Variable = decode(&self.schema(), attributes)?;

        let value = match &variable.value {
            Some(v) => Some(self.kind.encode(v).ok_or_else(|| {
                ProviderError::new(format!("Cannot encode {} as {:?} variable value", v, self.kind))
            })?),
            None => None,
        };

        let body = prune_nulls(json!({
            "name": variable.name,
            "properties": {
                "value": value,
                "isEncrypted": variable.encrypted,
                "description": variable.description,
            }
        }));

        Ok(ArmRequest::new(
            scoped_id(
                config,
                &variable.resource_group_name,
                &variable.automation_account_name,
                "variables",
                &variable.name,
            ),
            body,
        ))
    }

    fn flatten(&self, id: &str, body: &serde_json::Value) -> Attributes {
        let mut attributes = HashMap::new();
        set_account_scope(&mut attributes, id);
        set_from(&mut attributes, "description", body, "properties.description");

        let encrypted = json_path(body, "properties.isEncrypted")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        attributes.insert("encrypted".to_string(), Value::Bool(encrypted));

        if !encrypted
            && let Some(value) = json_path(body, "properties.value")
                .and_then(|v| v.as_str())
                .and_then(|raw| self.kind.decode(raw))
        {
            attributes.insert("value".to_string(), value);
        }
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automation_core::differ::find_changed_attributes;

    fn attrs(value: Value) -> Attributes {
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::from("var1"));
        attrs.insert("resource_group_name".to_string(), Value::from("rg-ops"));
        attrs.insert("automation_account_name".to_string(), Value::from("acct1"));
        attrs.insert("value".to_string(), value);
        attrs
    }

    fn encoded(kind: &VariableType, value: Value) -> serde_json::Value {
        let request = kind
            .prepare(&attrs(value), &ProviderConfig::new("sub"))
            .unwrap();
        request.body["properties"]["value"].clone()
    }

    #[test]
    fn test_values_are_encoded_as_json_literals() {
        assert_eq!(
            encoded(&VariableType::STRING, Value::from("hello")),
            json!("\"hello\"")
        );
        assert_eq!(encoded(&VariableType::INT, Value::Int(42)), json!("42"));
        assert_eq!(encoded(&VariableType::BOOL, Value::Bool(true)), json!("true"));
        assert_eq!(
            encoded(&VariableType::DATETIME, Value::from("2023-11-14T22:13:20Z")),
            json!(r#""\/Date(1700000000000)\/""#)
        );
    }

    #[test]
    fn test_prepare_body() {
        let request = VariableType::INT
            .prepare(&attrs(Value::Int(7)), &ProviderConfig::new("sub"))
            .unwrap();
        assert!(request.id.ends_with("/automationAccounts/acct1/variables/var1"));
        assert_eq!(
            request.body,
            json!({"name": "var1", "properties": {"value": "7", "isEncrypted": false}})
        );
    }

    #[test]
    fn test_value_type_is_checked_per_kind() {
        let err = VariableType::INT
            .prepare(&attrs(Value::from("seven")), &ProviderConfig::new("sub"))
            .unwrap_err();
        assert!(err.message.contains("Attribute 'value'"));

        let err = VariableType::DATETIME
            .prepare(&attrs(Value::from("yesterday")), &ProviderConfig::new("sub"))
            .unwrap_err();
        assert!(err.message.contains("RFC 3339"));
    }

    #[test]
    fn test_datetime_value_reads_back_unchanged() {
        let schema = VariableType::DATETIME.schema();
        let id = "/subscriptions/sub/resourceGroups/rg-ops/providers/Microsoft.Automation/automationAccounts/acct1/variables/var1";

        let err = VariableType::DATETIME
            .prepare(
                &attrs(Value::from("2026-10-20T11:00:00+09:00")),
                &ProviderConfig::new("sub"),
            )
            .unwrap_err();
        assert!(err.message.contains("2026-10-20T02:00:00Z"), "{}", err.message);

        for value in ["2026-10-20T02:00:00Z", "2026-10-20T02:00:00.250Z"] {
            let desired = attrs(Value::from(value));
            let request = VariableType::DATETIME
                .prepare(&desired, &ProviderConfig::new("sub"))
                .unwrap();
            let current = VariableType::DATETIME.flatten(id, &request.body);

            assert_eq!(current.get("value"), Some(&Value::from(value)));
            assert!(find_changed_attributes(&desired, &current, &schema).is_empty());
        }
    }

    #[test]
    fn test_decode() {
        assert_eq!(
            VariableKind::String.decode("\"hello\""),
            Some(Value::from("hello"))
        );
        assert_eq!(VariableKind::Int.decode("42"), Some(Value::Int(42)));
        assert_eq!(VariableKind::Bool.decode("false"), Some(Value::Bool(false)));
        assert_eq!(
            VariableKind::Datetime.decode(r#""\/Date(1700000000000)\/""#),
            Some(Value::from("2023-11-14T22:13:20Z"))
        );
        assert_eq!(
            VariableKind::Datetime.decode(r#""\/Date(1700000000000+0000)\/""#),
            Some(Value::from("2023-11-14T22:13:20Z"))
        );
        assert_eq!(VariableKind::Int.decode("\"x\""), None);
    }

    #[test]
    fn test_flatten_skips_encrypted_value() {
        let id = "/subscriptions/sub/resourceGroups/rg-ops/providers/Microsoft.Automation/automationAccounts/acct1/variables/var1";

        let attrs = VariableType::STRING.flatten(
            id,
            &json!({"properties": {"value": "\"hello\"", "isEncrypted": false}}),
        );
        assert_eq!(attrs.get("value"), Some(&Value::from("hello")));
        assert_eq!(attrs.get("encrypted"), Some(&Value::Bool(false)));

        let attrs = VariableType::STRING.flatten(id, &json!({"properties": {"isEncrypted": true}}));
        assert!(!attrs.contains_key("value"));
        assert_eq!(attrs.get("encrypted"), Some(&Value::Bool(true)));
    }
}
