//! Trip wires for the deliberately failing operators.

use load_common::{LoadError, Result};
use serde::Serialize;
use std::time::Instant;

/// When a crashing operator gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BreakPolicy {
    /// Fail once more than this many events were seen by one task.
    AfterEvents(u64),
    /// Fail once this many milliseconds elapsed since the task started.
    AfterMillis(u64),
}

impl BreakPolicy {
    /// A positive time threshold takes precedence over the event threshold.
    pub fn from_thresholds(after_events: i32, after_millis: i32) -> Self {
        if after_millis > 0 {
            BreakPolicy::AfterMillis(after_millis as u64)
        } else {
            BreakPolicy::AfterEvents(after_events.max(0) as u64)
        }
    }
}

/// Per-task event counter bound to a [`BreakPolicy`].
#[derive(Debug)]
pub struct Breaker {
    policy: BreakPolicy,
    events: u64,
    started: Instant,
}

impl Breaker {
    pub fn new(policy: BreakPolicy) -> Self {
        Self {
            policy,
            events: 0,
            started: Instant::now(),
        }
    }

    pub fn events(&self) -> u64 {
        self.events
    }

    /// Count one event, failing with `message` once the threshold is crossed.
    pub fn record(&mut self, message: &str) -> Result<()> {
        self.events += 1;
        self.check(message)
    }

    /// Overwrite the count (aggregators track their own per-group count).
    pub fn record_count(&mut self, events: u64, message: &str) -> Result<()> {
        self.events = events;
        self.check(message)
    }

    fn check(&self, message: &str) -> Result<()> {
        let tripped = match self.policy {
            BreakPolicy::AfterEvents(limit) => self.events > limit,
            BreakPolicy::AfterMillis(limit) => self.started.elapsed().as_millis() as u64 > limit,
        };

        if tripped {
            Err(LoadError::breaking_error(format!(
                "{message} after {} events",
                self.events
            )))
        } else {
            Ok(())
        }
    }
}
