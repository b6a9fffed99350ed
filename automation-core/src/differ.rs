//! Differ - Compare desired state with current state
//!
//! Compares the desired attributes of a resource with the state read back from
//! the management API and decides whether it must be created, updated in
//! place, replaced, or left alone.

use crate::resource::{Attributes, Resource, ResourceId, State, Value};
use crate::schema::{AttributeType, ResourceSchema};

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences that can be applied in place
    Update {
        id: ResourceId,
        changed_attributes: Vec<String>,
    },
    /// Resource exists but a force-new attribute changed
    Replace {
        id: ResourceId,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State, schema: &ResourceSchema) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes, schema);

    if changed.is_empty() {
        return Diff::NoChange(desired.id.clone());
    }

    let forced = forces_replacement(&changed, schema);
    if forced.is_empty() {
        Diff::Update {
            id: desired.id.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Replace {
            id: desired.id.clone(),
            changed_attributes: forced,
        }
    }
}

/// Find changed attributes between desired and current state
///
/// Schema defaults are applied to the desired attributes first. Write-only
/// attributes are only compared when the current state carries them, since
/// the API never returns their value. Nested blocks only compare the fields
/// the desired side sets.
pub fn find_changed_attributes(
    desired: &Attributes,
    current: &Attributes,
    schema: &ResourceSchema,
) -> Vec<String> {
    let desired = schema.with_defaults(desired);
    let mut changed = Vec::new();

    for (key, desired_value) in &desired {
        // Skip internal attributes (starting with _)
        if key.starts_with('_') {
            continue;
        }

        let attr = schema.get(key);
        match current.get(key) {
            Some(current_value)
                if values_match(attr.map(|a| &a.attr_type), desired_value, current_value) => {}
            None if attr.is_some_and(|a| a.write_only) => {}
            _ => changed.push(key.clone()),
        }
    }

    changed.sort();
    changed
}

fn values_match(attr_type: Option<&AttributeType>, desired: &Value, current: &Value) -> bool {
    match (attr_type, desired, current) {
        (Some(AttributeType::Struct { fields, .. }), Value::Map(d), Value::Map(c)) => {
            d.iter().all(|(key, dv)| {
                let field = fields.iter().find(|f| &f.name == key);
                match c.get(key) {
                    Some(cv) => values_match(field.map(|f| &f.attr_type), dv, cv),
                    None => field.is_some_and(|f| f.write_only),
                }
            })
        }
        (Some(AttributeType::List(inner)), Value::List(d), Value::List(c))
            if matches!(**inner, AttributeType::Struct { .. }) =>
        {
            d.len() == c.len()
                && d.iter()
                    .zip(c)
                    .all(|(dv, cv)| values_match(Some(inner.as_ref()), dv, cv))
        }
        _ => desired == current,
    }
}

/// The subset of changed attributes that cannot be updated in place
pub fn forces_replacement(changed: &[String], schema: &ResourceSchema) -> Vec<String> {
    changed
        .iter()
        .filter(|name| schema.get(name).is_some_and(|a| a.force_new))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeSchema;
    use std::collections::HashMap;

    fn schema() -> ResourceSchema {
        ResourceSchema::new("automation_credential")
            .attribute(AttributeSchema::new("name", AttributeType::String).force_new())
            .attribute(AttributeSchema::new("username", AttributeType::String))
            .attribute(AttributeSchema::new("password", AttributeType::String).write_only())
    }

    #[test]
    fn diff_create_when_not_exists() {
        let desired = Resource::new("automation_credential", "test");
        let current = State::not_found(ResourceId::new("automation_credential", "test"));

        let result = diff(&desired, &current, &schema());
        assert!(matches!(result, Diff::Create(_)));
    }

    #[test]
    fn diff_no_change_when_same() {
        let desired =
            Resource::new("automation_credential", "test").with_attribute("username", "admin");

        let mut attrs = HashMap::new();
        attrs.insert("username".to_string(), Value::String("admin".to_string()));
        let current = State::existing(ResourceId::new("automation_credential", "test"), attrs);

        let result = diff(&desired, &current, &schema());
        assert!(matches!(result, Diff::NoChange(_)));
    }

    #[test]
    fn diff_update_when_different() {
        let desired =
            Resource::new("automation_credential", "test").with_attribute("username", "root");

        let mut attrs = HashMap::new();
        attrs.insert("username".to_string(), Value::String("admin".to_string()));
        let current = State::existing(ResourceId::new("automation_credential", "test"), attrs);

        match diff(&desired, &current, &schema()) {
            Diff::Update {
                changed_attributes, ..
            } => {
                assert_eq!(changed_attributes, vec!["username".to_string()]);
            }
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn diff_replace_when_force_new_changes() {
        let desired = Resource::new("automation_credential", "test")
            .with_attribute("name", "cred-b")
            .with_attribute("username", "root");

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("cred-a".to_string()));
        attrs.insert("username".to_string(), Value::String("admin".to_string()));
        let current = State::existing(ResourceId::new("automation_credential", "test"), attrs);

        match diff(&desired, &current, &schema()) {
            Diff::Replace {
                changed_attributes, ..
            } => {
                assert_eq!(changed_attributes, vec!["name".to_string()]);
            }
            other => panic!("Expected Replace, got {:?}", other),
        }
    }

    #[test]
    fn write_only_absent_from_current_is_not_a_change() {
        let desired = Resource::new("automation_credential", "test")
            .with_attribute("username", "admin")
            .with_attribute("password", "hunter2");

        let mut attrs = HashMap::new();
        attrs.insert("username".to_string(), Value::String("admin".to_string()));
        let current = State::existing(ResourceId::new("automation_credential", "test"), attrs.clone());
        assert!(matches!(
            diff(&desired, &current, &schema()),
            Diff::NoChange(_)
        ));

        attrs.insert("password".to_string(), Value::String("old".to_string()));
        let current = State::existing(ResourceId::new("automation_credential", "test"), attrs);
        assert!(matches!(
            diff(&desired, &current, &schema()),
            Diff::Update { .. }
        ));
    }

    fn schedule_schema() -> ResourceSchema {
        ResourceSchema::new("automation_software_update_configuration")
            .attribute(
                AttributeSchema::new("duration", AttributeType::String).with_default("PT2H"),
            )
            .attribute(AttributeSchema::new(
                "schedule",
                AttributeType::Struct {
                    name: "Schedule".to_string(),
                    fields: vec![
                        AttributeSchema::new("frequency", AttributeType::String).required(),
                        AttributeSchema::new("time_zone", AttributeType::String)
                            .with_default("Etc/UTC"),
                    ],
                },
            ))
            .attribute(AttributeSchema::new("tags", AttributeType::string_map()))
    }

    fn map(entries: &[(&str, &str)]) -> Value {
        Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), Value::from(*v)))
                .collect(),
        )
    }

    #[test]
    fn defaults_and_nested_blocks_compare_set_fields() {
        let mut desired = HashMap::new();
        desired.insert("schedule".to_string(), map(&[("frequency", "Day")]));

        let mut current = HashMap::new();
        current.insert("duration".to_string(), Value::from("PT2H"));
        current.insert(
            "schedule".to_string(),
            map(&[
                ("frequency", "Day"),
                ("time_zone", "Etc/UTC"),
                ("next_run", "2026-10-17T06:00:00Z"),
            ]),
        );
        assert!(find_changed_attributes(&desired, &current, &schedule_schema()).is_empty());

        current.insert("duration".to_string(), Value::from("PT4H"));
        assert_eq!(
            find_changed_attributes(&desired, &current, &schedule_schema()),
            vec!["duration".to_string()]
        );
    }

    #[test]
    fn plain_maps_compare_exactly() {
        let mut desired = HashMap::new();
        desired.insert("tags".to_string(), map(&[("env", "prod")]));
        desired.insert("duration".to_string(), Value::from("PT2H"));

        let mut current = HashMap::new();
        current.insert("duration".to_string(), Value::from("PT2H"));
        current.insert("tags".to_string(), map(&[("env", "prod"), ("owner", "ops")]));

        assert_eq!(
            find_changed_attributes(&desired, &current, &schedule_schema()),
            vec!["tags".to_string()]
        );
    }
}
