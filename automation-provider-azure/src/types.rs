//! Azure-specific attribute types and common attributes

use automation_core::resource::Value;
use automation_core::schema::{AttributeSchema, AttributeType};

/// Days of the week as spelled by the Automation API
pub const WEEK_DAYS: &[&str] = &[
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// RFC 3339 timestamp (e.g., "2026-10-17T06:00:00Z")
pub fn rfc3339_timestamp() -> AttributeType {
    AttributeType::Custom {
        name: "Rfc3339Timestamp".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
                .map(|_| ())
                .map_err(|e| format!("'{}' is not an RFC 3339 timestamp: {}", s, e)),
            _ => Err("Expected string".to_string()),
        },
    }
}

/// UTC rendering of a timestamp at millisecond precision, the form the API
/// reports datetime variables in
pub fn utc_millis(timestamp: chrono::DateTime<chrono::FixedOffset>) -> Option<String> {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(timestamp.timestamp_millis())
        .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true))
}

/// RFC 3339 timestamp in UTC with at most millisecond precision
/// (e.g., "2026-10-17T06:00:00Z")
///
/// Values are read back in this form, so any other offset would show up as
/// a change on every read.
pub fn utc_timestamp() -> AttributeType {
    AttributeType::Custom {
        name: "UtcTimestamp".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) => {
                let parsed = chrono::DateTime::parse_from_rfc3339(s)
                    .map_err(|e| format!("'{}' is not an RFC 3339 timestamp: {}", s, e))?;
                match utc_millis(parsed) {
                    Some(utc) if utc == *s => Ok(()),
                    Some(utc) => Err(format!(
                        "Timestamp '{}' must be given in UTC (e.g., '{}')",
                        s, utc
                    )),
                    None => Err(format!("Timestamp '{}' is out of range", s)),
                }
            }
            _ => Err("Expected string".to_string()),
        },
    }
}

/// Day of the month: 1 to 31, or -1 for the last day
pub fn month_day() -> AttributeType {
    AttributeType::Custom {
        name: "MonthDay".to_string(),
        base: Box::new(AttributeType::Int),
        validate: |value| match value {
            Value::Int(n) if *n == -1 || (1..=31).contains(n) => Ok(()),
            Value::Int(n) => Err(format!("Month day {} must be between 1 and 31, or -1", n)),
            _ => Err("Expected integer".to_string()),
        },
    }
}

/// Occurrence of a weekday within a month: 1 to 5, or -1 for the last one
pub fn week_occurrence() -> AttributeType {
    AttributeType::Custom {
        name: "WeekOccurrence".to_string(),
        base: Box::new(AttributeType::Int),
        validate: |value| match value {
            Value::Int(n) if *n == -1 || (1..=5).contains(n) => Ok(()),
            Value::Int(n) => Err(format!("Occurrence {} must be between 1 and 5, or -1", n)),
            _ => Err("Expected integer".to_string()),
        },
    }
}

/// ISO 8601 time-of-day duration (e.g., "PT2H", "PT1H30M")
pub fn iso8601_duration() -> AttributeType {
    AttributeType::Custom {
        name: "Iso8601Duration".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) => validate_duration(s),
            _ => Err("Expected string".to_string()),
        },
    }
}

fn validate_duration(s: &str) -> Result<(), String> {
    let Some(rest) = s.strip_prefix("PT") else {
        return Err(format!("Duration '{}' must start with PT", s));
    };
    if rest.is_empty() {
        return Err(format!("Duration '{}' has no components", s));
    }

    let mut digits = 0;
    for c in rest.chars() {
        match c {
            '0'..='9' => digits += 1,
            'H' | 'M' | 'S' if digits > 0 => digits = 0,
            _ => return Err(format!("Invalid duration '{}'", s)),
        }
    }
    if digits > 0 {
        return Err(format!("Duration '{}' is missing a unit", s));
    }
    Ok(())
}

/// Azure region in its normalized form (e.g., "westeurope")
///
/// The API always reports the normalized form, so display names such as
/// "West Europe" would show up as a change on every read.
pub fn azure_location() -> AttributeType {
    AttributeType::Custom {
        name: "AzureLocation".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s)
                if !s.is_empty()
                    && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) =>
            {
                Ok(())
            }
            Value::String(s) => Err(format!(
                "Location '{}' must be normalized (e.g., '{}')",
                s,
                s.to_lowercase().replace(' ', "")
            )),
            _ => Err("Expected string".to_string()),
        },
    }
}

/// String map whose keys must be lowercase
pub fn lowercase_keys_map() -> AttributeType {
    AttributeType::Custom {
        name: "LowercaseKeyMap".to_string(),
        base: Box::new(AttributeType::string_map()),
        validate: |value| match value {
            Value::Map(map) => match map.keys().find(|k| k.to_lowercase() != **k) {
                Some(key) => Err(format!("Parameter name '{}' must be lowercase", key)),
                None => Ok(()),
            },
            _ => Err("Expected map".to_string()),
        },
    }
}

// =============================================================================
// Common Attributes
// =============================================================================

pub fn name_attribute() -> AttributeSchema {
    AttributeSchema::new("name", automation_core::schema::types::non_empty_string())
        .required()
        .force_new()
}

pub fn resource_group_attribute() -> AttributeSchema {
    AttributeSchema::new("resource_group_name", AttributeType::String)
        .required()
        .force_new()
}

pub fn account_name_attribute() -> AttributeSchema {
    AttributeSchema::new("automation_account_name", AttributeType::String)
        .required()
        .force_new()
        .with_description("Name of the Automation account the resource belongs to")
}

pub fn account_id_attribute() -> AttributeSchema {
    AttributeSchema::new("automation_account_id", AttributeType::String)
        .required()
        .force_new()
        .with_description("ARM ID of the Automation account the resource belongs to")
}

pub fn location_attribute() -> AttributeSchema {
    AttributeSchema::new("location", azure_location())
        .required()
        .force_new()
}

pub fn description_attribute() -> AttributeSchema {
    AttributeSchema::new("description", AttributeType::String)
}

pub fn tags_attribute() -> AttributeSchema {
    AttributeSchema::new("tags", AttributeType::string_map())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_rfc3339_timestamp() {
        let t = rfc3339_timestamp();
        assert!(t.validate(&Value::from("2026-10-17T06:00:00Z")).is_ok());
        assert!(t.validate(&Value::from("2026-10-17T06:00:00+09:00")).is_ok());
        assert!(t.validate(&Value::from("2026-10-17 06:00")).is_err());
        assert!(t.validate(&Value::Int(0)).is_err());
    }

    #[test]
    fn test_utc_timestamp() {
        let t = utc_timestamp();
        assert!(t.validate(&Value::from("2026-10-20T02:00:00Z")).is_ok());
        assert!(t.validate(&Value::from("2026-10-20T02:00:00.250Z")).is_ok());
        assert!(t.validate(&Value::from("yesterday")).is_err());

        let err = t
            .validate(&Value::from("2026-10-20T11:00:00+09:00"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("2026-10-20T02:00:00Z"), "{}", err);
        // precision beyond milliseconds is not kept by the API
        assert!(t.validate(&Value::from("2026-10-20T02:00:00.123456Z")).is_err());
        assert!(t.validate(&Value::from("2026-10-20T02:00:00+00:00")).is_err());
    }

    #[test]
    fn test_month_day() {
        let t = month_day();
        assert!(t.validate(&Value::Int(1)).is_ok());
        assert!(t.validate(&Value::Int(31)).is_ok());
        assert!(t.validate(&Value::Int(-1)).is_ok());
        assert!(t.validate(&Value::Int(0)).is_err());
        assert!(t.validate(&Value::Int(32)).is_err());
    }

    #[test]
    fn test_week_occurrence() {
        let t = week_occurrence();
        assert!(t.validate(&Value::Int(5)).is_ok());
        assert!(t.validate(&Value::Int(-1)).is_ok());
        assert!(t.validate(&Value::Int(0)).is_err());
        assert!(t.validate(&Value::Int(6)).is_err());
    }

    #[test]
    fn test_iso8601_duration() {
        assert!(validate_duration("PT2H").is_ok());
        assert!(validate_duration("PT1H30M").is_ok());
        assert!(validate_duration("PT45S").is_ok());
        assert!(validate_duration("2H").is_err());
        assert!(validate_duration("PT").is_err());
        assert!(validate_duration("PT2").is_err());
        assert!(validate_duration("PTH").is_err());
    }

    #[test]
    fn test_azure_location() {
        let t = azure_location();
        assert!(t.validate(&Value::from("westeurope")).is_ok());
        assert!(t.validate(&Value::from("eastus2")).is_ok());
        let err = t.validate(&Value::from("West Europe")).unwrap_err();
        assert!(err.to_string().contains("'westeurope'"));
    }

    #[test]
    fn test_lowercase_keys_map() {
        let t = lowercase_keys_map();
        let mut map = HashMap::new();
        map.insert("vmname".to_string(), Value::from("web-1"));
        assert!(t.validate(&Value::Map(map.clone())).is_ok());

        map.insert("ResourceGroup".to_string(), Value::from("rg"));
        assert!(t.validate(&Value::Map(map)).is_err());
    }
}
