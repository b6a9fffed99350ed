//! Poller - Wait for a resource to reach its target provisioning state
//!
//! Some resources keep provisioning after the mutating call that created or
//! updated them has returned (module imports, software update
//! configurations). A [`ProvisioningPoll`] is created right after that call
//! and repeatedly asks a [`StatusSource`] for the resource's provisioning
//! state until one of these holds:
//!
//! - the state equals the target → success
//! - the status carries an error message → [`PollError::Failed`]
//! - the status source itself fails → [`PollError::Fetch`], without retrying
//! - the deadline passes while still pending → [`PollError::TimedOut`]
//!
//! Empty or unrecognized states are treated as the pending state
//! [`UNKNOWN_STATE`]; the management API may briefly return nothing right
//! after a write.
//!
//! The deadline is checked once per observation. Sleeps are capped at the
//! time remaining, so the last observation is made at the deadline.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::time::Instant;

/// Pending substate used for empty or unrecognized provisioning states
pub const UNKNOWN_STATE: &str = "Unknown";

/// Default minimum time between two status fetches
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// One observation of a resource's provisioning status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningStatus {
    /// Provisioning state as reported by the API (may be empty)
    pub state: String,
    /// Server-side provisioning error attached to the resource
    pub error_message: Option<String>,
}

impl ProvisioningStatus {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            error_message: None,
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// Where the poller stands after an observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// Not done yet; carries the observed (or "Unknown") substate
    Pending(String),
    Succeeded,
    Failed(String),
    TimedOut { last_state: String },
}

impl PollState {
    /// No transition leaves a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Pending(_))
    }
}

/// Fetches the current provisioning status of one resource
#[async_trait]
pub trait StatusSource: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn fetch(&self) -> Result<ProvisioningStatus, Self::Error>;
}

/// Terminal failures of a poll
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The status source failed; passed through unchanged
    #[error(transparent)]
    Fetch(Box<dyn std::error::Error + Send + Sync>),

    /// The API reported a provisioning failure for the resource
    #[error("provisioning {resource} failed: {message}")]
    Failed { resource: String, message: String },

    /// The deadline passed while the resource was still pending
    #[error(
        "timed out waiting for {resource} to reach provisioning state {target:?} (last state: {last_state:?})"
    )]
    TimedOut {
        resource: String,
        target: String,
        last_state: String,
    },
}

/// A single-use wait for a resource to reach its target provisioning state
#[derive(Debug, Clone)]
pub struct ProvisioningPoll {
    resource: String,
    target: String,
    pending: HashSet<String>,
    interval: Duration,
    deadline: Instant,
}

impl ProvisioningPoll {
    /// Wait for `resource` (used in error messages) to reach `target` before `deadline`
    pub fn new(resource: impl Into<String>, target: impl Into<String>, deadline: Instant) -> Self {
        Self {
            resource: resource.into(),
            target: target.into(),
            pending: HashSet::new(),
            interval: DEFAULT_POLL_INTERVAL,
            deadline,
        }
    }

    /// States that are expected while provisioning is in progress
    pub fn with_pending<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.extend(states.into_iter().map(Into::into));
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Classify one observation made at `now`
    pub fn step(&self, status: &ProvisioningStatus, now: Instant) -> PollState {
        if let Some(message) = status.error_message.as_deref()
            && !message.is_empty()
        {
            return PollState::Failed(message.to_string());
        }

        if status.state == self.target {
            return PollState::Succeeded;
        }

        let substate = if self.pending.contains(&status.state) {
            status.state.clone()
        } else {
            if !status.state.is_empty() {
                warn!(
                    "{}: unrecognized provisioning state {:?}, treating as {}",
                    self.resource, status.state, UNKNOWN_STATE
                );
            }
            UNKNOWN_STATE.to_string()
        };

        if now >= self.deadline {
            PollState::TimedOut {
                last_state: substate,
            }
        } else {
            PollState::Pending(substate)
        }
    }

    /// Poll `source` until a terminal state is reached
    pub async fn wait<S>(&self, source: &S) -> Result<(), PollError>
    where
        S: StatusSource + ?Sized,
    {
        let mut state = PollState::Pending(UNKNOWN_STATE.to_string());
        let mut fetches = 0usize;
        while !state.is_terminal() {
            let status = source
                .fetch()
                .await
                .map_err(|e| PollError::Fetch(Box::new(e)))?;
            fetches += 1;

            let now = Instant::now();
            state = self.step(&status, now);
            if let PollState::Pending(substate) = &state {
                let delay = self.interval.min(self.deadline.saturating_duration_since(now));
                debug!(
                    "{}: provisioning state {}, checking again in {:?}",
                    self.resource, substate, delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        match state {
            PollState::Succeeded => {
                debug!(
                    "{}: reached {} after {} status checks",
                    self.resource, self.target, fetches
                );
                Ok(())
            }
            PollState::Failed(message) => Err(PollError::Failed {
                resource: self.resource.clone(),
                message,
            }),
            PollState::TimedOut { last_state } | PollState::Pending(last_state) => {
                Err(PollError::TimedOut {
                    resource: self.resource.clone(),
                    target: self.target.clone(),
                    last_state,
                })
            }
        }
    }
}
