//! Provider configuration
//!
//! Decoded from the provider block through the same schema/decode step used
//! for resources, so typos and mistyped values fail up front.

use std::time::Duration;

use automation_core::poller::DEFAULT_POLL_INTERVAL;
use automation_core::provider::{ProviderError, ProviderResult};
use automation_core::resource::{Attributes, Value};
use automation_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use serde::Deserialize;

/// Environment variable consulted when `subscription_id` is not configured
pub const SUBSCRIPTION_ID_ENV: &str = "ARM_SUBSCRIPTION_ID";

/// Per-operation time limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(30 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(30 * 60),
            delete: Duration::from_secs(30 * 60),
        }
    }
}

/// Context shared by every operation of the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub subscription_id: String,
    /// Minimum time between two provisioning-state checks
    pub poll_interval: Duration,
    pub timeouts: Timeouts,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    subscription_id: Option<String>,
    poll_interval_seconds: u64,
    timeouts: Option<RawTimeouts>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTimeouts {
    create_minutes: u64,
    read_minutes: u64,
    update_minutes: u64,
    delete_minutes: u64,
}

fn from_minutes(name: &str, minutes: u64) -> ProviderResult<Duration> {
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| ProviderError::new(format!("timeouts.{} of {} is too large", name, minutes)))
}

impl ProviderConfig {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Schema of the provider block
    pub fn schema() -> ResourceSchema {
        let defaults = Timeouts::default();
        let minutes = |d: Duration| Value::Int((d.as_secs() / 60) as i64);

        ResourceSchema::new("azure_automation")
            .with_description("Azure Automation provider settings")
            .attribute(
                AttributeSchema::new("subscription_id", types::non_empty_string())
                    .with_description("Subscription that owns the Automation accounts"),
            )
            .attribute(
                AttributeSchema::new("poll_interval_seconds", types::positive_int())
                    .with_default(DEFAULT_POLL_INTERVAL.as_secs() as i64)
                    .with_description("Minimum time between provisioning-state checks"),
            )
            .attribute(AttributeSchema::new(
                "timeouts",
                AttributeType::Struct {
                    name: "Timeouts".to_string(),
                    fields: vec![
                        AttributeSchema::new("create_minutes", types::positive_int())
                            .with_default(minutes(defaults.create)),
                        AttributeSchema::new("read_minutes", types::positive_int())
                            .with_default(minutes(defaults.read)),
                        AttributeSchema::new("update_minutes", types::positive_int())
                            .with_default(minutes(defaults.update)),
                        AttributeSchema::new("delete_minutes", types::positive_int())
                            .with_default(minutes(defaults.delete)),
                    ],
                },
            ))
    }

    /// Build the configuration from provider block attributes
    ///
    /// `subscription_id` falls back to the `ARM_SUBSCRIPTION_ID` environment variable.
    pub fn from_attributes(attributes: &Attributes) -> ProviderResult<Self> {
        Self::from_attributes_with_env(attributes, std::env::var(SUBSCRIPTION_ID_ENV).ok())
    }

    fn from_attributes_with_env(
        attributes: &Attributes,
        env_subscription: Option<String>,
    ) -> ProviderResult<Self> {
        let raw: RawConfig = Self::schema().decode(attributes).map_err(|e| {
            ProviderError::new(format!("Invalid provider configuration: {}", e)).with_cause(e)
        })?;

        let subscription_id = raw
            .subscription_id
            .or(env_subscription.filter(|s| !s.trim().is_empty()))
            .ok_or_else(|| {
                ProviderError::new(format!(
                    "subscription_id must be configured or provided via {}",
                    SUBSCRIPTION_ID_ENV
                ))
            })?;

        let timeouts = match raw.timeouts {
            Some(t) => Timeouts {
                create: from_minutes("create_minutes", t.create_minutes)?,
                read: from_minutes("read_minutes", t.read_minutes)?,
                update: from_minutes("update_minutes", t.update_minutes)?,
                delete: from_minutes("delete_minutes", t.delete_minutes)?,
            },
            None => Timeouts::default(),
        };

        Ok(Self {
            subscription_id,
            poll_interval: Duration::from_secs(raw.poll_interval_seconds),
            timeouts,
        })
    }
}
