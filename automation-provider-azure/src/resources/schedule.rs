//! automation_schedule
//!
//! Recurrence rules shared with the schedule block of software update
//! configurations live here as well.

use std::collections::HashMap;

use automation_core::provider::{ProviderError, ProviderResult, ResourceType};
use automation_core::resource::{Attributes, Value};
use automation_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;

use super::{ArmRequest, AutomationResource, account_scoped, decode, scoped_id};
use crate::config::ProviderConfig;
use crate::types::{WEEK_DAYS, description_attribute, month_day, rfc3339_timestamp, week_occurrence};
use crate::utils::{json_path, prune_nulls, set_account_scope, set_from};

pub const FREQUENCIES: &[&str] = &["OneTime", "Day", "Hour", "Week", "Month"];

pub const DEFAULT_TIMEZONE: &str = "Etc/UTC";

/// Lead time for a schedule created without `start_time`
const DEFAULT_START_DELAY_MINUTES: i64 = 7;

pub struct ScheduleType;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Schedule {
    name: String,
    resource_group_name: String,
    automation_account_name: String,
    frequency: String,
    interval: Option<i64>,
    start_time: Option<String>,
    expiry_time: Option<String>,
    timezone: String,
    description: Option<String>,
    #[serde(default)]
    week_days: Vec<String>,
    #[serde(default)]
    month_days: Vec<i64>,
    #[serde(default)]
    monthly_occurrence: Vec<MonthlyOccurrence>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct MonthlyOccurrence {
    day: String,
    occurrence: i64,
}

/// Recurrence of a schedule, validated against its frequency
#[derive(Debug)]
pub(super) struct Recurrence<'a> {
    pub frequency: &'a str,
    pub interval: Option<i64>,
    pub week_days: &'a [String],
    pub month_days: &'a [i64],
    pub monthly_occurrence: &'a [MonthlyOccurrence],
}

impl Recurrence<'_> {
    /// Check the combination of settings; returns the interval to send
    pub fn validate(&self) -> ProviderResult<Option<i64>> {
        let interval = match (self.frequency, self.interval) {
            ("OneTime", Some(_)) => {
                return Err(ProviderError::new(
                    "interval cannot be set when frequency is OneTime",
                ));
            }
            ("OneTime", None) => None,
            (_, interval) => Some(interval.unwrap_or(1)),
        };

        if !self.week_days.is_empty() && self.frequency != "Week" {
            return Err(ProviderError::new(
                "week_days can only be set when frequency is Week",
            ));
        }
        if (!self.month_days.is_empty() || !self.monthly_occurrence.is_empty())
            && self.frequency != "Month"
        {
            return Err(ProviderError::new(
                "month_days and monthly_occurrence can only be set when frequency is Month",
            ));
        }
        if !self.month_days.is_empty() && !self.monthly_occurrence.is_empty() {
            return Err(ProviderError::new(
                "month_days and monthly_occurrence cannot be set together",
            ));
        }

        Ok(interval)
    }

    /// `advancedSchedule` body, if any advanced setting is present
    pub fn advanced_schedule(&self) -> Option<serde_json::Value> {
        if self.week_days.is_empty()
            && self.month_days.is_empty()
            && self.monthly_occurrence.is_empty()
        {
            return None;
        }

        let non_empty = |v: serde_json::Value| {
            if v.as_array().is_some_and(|a| a.is_empty()) {
                serde_json::Value::Null
            } else {
                v
            }
        };
        let occurrences: Vec<serde_json::Value> = self
            .monthly_occurrence
            .iter()
            .map(|o| json!({"day": o.day, "occurrence": o.occurrence}))
            .collect();

        Some(prune_nulls(json!({
            "weekDays": non_empty(json!(self.week_days)),
            "monthDays": non_empty(json!(self.month_days)),
            "monthlyOccurrences": non_empty(json!(occurrences)),
        })))
    }
}

/// Attribute type of one `monthly_occurrence` entry
pub(super) fn monthly_occurrence_type() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::Struct {
        name: "MonthlyOccurrence".to_string(),
        fields: vec![
            AttributeSchema::new("day", AttributeType::enumeration(WEEK_DAYS)).required(),
            AttributeSchema::new("occurrence", week_occurrence()).required(),
        ],
    }))
}

/// Read `weekDays`, `monthDays` and `monthlyOccurrences` of an advanced schedule
pub(super) fn flatten_advanced_schedule(
    attributes: &mut Attributes,
    advanced: Option<&serde_json::Value>,
    names: [&str; 3],
) {
    let Some(advanced) = advanced else {
        return;
    };
    let [week_days, month_days, monthly_occurrence] = names;

    for (name, key) in [(week_days, "weekDays"), (month_days, "monthDays")] {
        if let Some(Value::List(items)) = advanced.get(key).and_then(Value::from_json)
            && !items.is_empty()
        {
            attributes.insert(name.to_string(), Value::List(items));
        }
    }

    if let Some(occurrences) = advanced.get("monthlyOccurrences").and_then(|v| v.as_array()) {
        let items: Vec<Value> = occurrences
            .iter()
            .filter_map(|o| {
                let day = o.get("day")?.as_str()?;
                let occurrence = o.get("occurrence")?.as_i64()?;
                let mut item = HashMap::new();
                item.insert("day".to_string(), Value::from(day));
                item.insert("occurrence".to_string(), Value::Int(occurrence));
                Some(Value::Map(item))
            })
            .collect();
        if !items.is_empty() {
            attributes.insert(monthly_occurrence.to_string(), Value::List(items));
        }
    }
}

/// Timestamp in UTC with second precision; unparsable input is kept as is
pub(super) fn normalize_timestamp(timestamp: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map(|t| {
            t.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        })
        .unwrap_or_else(|_| timestamp.to_string())
}

fn default_start_time() -> String {
    (Utc::now() + chrono::Duration::minutes(DEFAULT_START_DELAY_MINUTES))
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl ResourceType for ScheduleType {
    fn name(&self) -> &'static str {
        "automation_schedule"
    }

    fn schema(&self) -> ResourceSchema {
        account_scoped(ResourceSchema::new(self.name()))
            .with_description("Schedule that runbooks can be linked to")
            .attribute(
                AttributeSchema::new("frequency", AttributeType::enumeration(FREQUENCIES))
                    .required(),
            )
            .attribute(
                AttributeSchema::new("interval", types::positive_int())
                    .with_description("Defaults to 1 unless frequency is OneTime"),
            )
            .attribute(
                AttributeSchema::new("start_time", rfc3339_timestamp())
                    .with_description("Defaults to seven minutes after creation"),
            )
            .attribute(AttributeSchema::new("expiry_time", rfc3339_timestamp()))
            .attribute(
                AttributeSchema::new("timezone", AttributeType::String)
                    .with_default(DEFAULT_TIMEZONE),
            )
            .attribute(description_attribute())
            .attribute(AttributeSchema::new(
                "week_days",
                AttributeType::List(Box::new(AttributeType::enumeration(WEEK_DAYS))),
            ))
            .attribute(AttributeSchema::new(
                "month_days",
                AttributeType::List(Box::new(month_day())),
            ))
            .attribute(AttributeSchema::new(
                "monthly_occurrence",
                monthly_occurrence_type(),
            ))
    }
}

impl AutomationResource for ScheduleType {
    fn prepare(
        &self,
        attributes: &Attributes,
        config: &ProviderConfig,
    ) -> ProviderResult<ArmRequest> {
        let schedule: Schedule = decode(&self.schema(), attributes)?;

        let recurrence = Recurrence {
            frequency: &schedule.frequency,
            interval: schedule.interval,
            week_days: &schedule.week_days,
            month_days: &schedule.month_days,
            monthly_occurrence: &schedule.monthly_occurrence,
        };
        let interval = recurrence.validate()?;

        let start_time = match &schedule.start_time {
            Some(t) => normalize_timestamp(t),
            None => default_start_time(),
        };

        let body = prune_nulls(json!({
            "properties": {
                "description": schedule.description,
                "frequency": schedule.frequency,
                "interval": interval,
                "startTime": start_time,
                "expiryTime": schedule.expiry_time.as_deref().map(normalize_timestamp),
                "timeZone": schedule.timezone,
                "advancedSchedule": recurrence.advanced_schedule(),
            }
        }));

        Ok(ArmRequest::new(
            scoped_id(
                config,
                &schedule.resource_group_name,
                &schedule.automation_account_name,
                "schedules",
                &schedule.name,
            ),
            body,
        ))
    }

    fn carry_over(&self, desired: &Attributes, prior: &Attributes) -> Attributes {
        let mut desired = desired.clone();
        if !desired.contains_key("start_time")
            && let Some(start_time) = prior.get("start_time")
        {
            desired.insert("start_time".to_string(), start_time.clone());
        }
        desired
    }

    fn flatten(&self, id: &str, body: &serde_json::Value) -> Attributes {
        let mut attributes = HashMap::new();
        set_account_scope(&mut attributes, id);
        set_from(&mut attributes, "frequency", body, "properties.frequency");
        set_from(&mut attributes, "timezone", body, "properties.timeZone");
        set_from(&mut attributes, "description", body, "properties.description");

        let one_time = json_path(body, "properties.frequency").and_then(|v| v.as_str())
            == Some("OneTime");
        if !one_time {
            set_from(&mut attributes, "interval", body, "properties.interval");
        }

        for (name, path) in [
            ("start_time", "properties.startTime"),
            ("expiry_time", "properties.expiryTime"),
        ] {
            if let Some(t) = json_path(body, path).and_then(|v| v.as_str()) {
                attributes.insert(name.to_string(), Value::String(normalize_timestamp(t)));
            }
        }

        flatten_advanced_schedule(
            &mut attributes,
            json_path(body, "properties.advancedSchedule"),
            ["week_days", "month_days", "monthly_occurrence"],
        );
        attributes
    }
}
