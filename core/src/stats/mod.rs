//! Run statistics: a cascade → flow → step → node hierarchy.

pub mod printer;

pub use printer::StatsPrinter;

use load_common::current_timestamp_millis;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Level of a stats record in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatsKind {
    Cascade,
    Flow,
    Step,
    Node,
}

impl fmt::Display for StatsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatsKind::Cascade => "Cascade",
            StatsKind::Flow => "Flow",
            StatsKind::Step => "Step",
            StatsKind::Node => "Node",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Pending,
    Running,
    Successful,
    Failed,
    Skipped,
}

impl Status {
    pub fn is_finished(&self) -> bool {
        matches!(self, Status::Successful | Status::Failed | Status::Skipped)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Pending => "PENDING",
            Status::Running => "RUNNING",
            Status::Successful => "SUCCESSFUL",
            Status::Failed => "FAILED",
            Status::Skipped => "SKIPPED",
        };
        f.write_str(name)
    }
}

/// Counters collected while a unit of work runs. Durations are milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Counter {
    ProcessDuration,
    ReadDuration,
    WriteDuration,
    TuplesRead,
    TuplesWritten,
}

/// Timing, status and counters of one unit of work and its children.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    kind: StatsKind,
    id: String,
    name: String,
    status: Status,
    start_millis: u64,
    finish_millis: u64,
    counters: BTreeMap<Counter, u64>,
    children: Vec<Stats>,
}

impl Stats {
    pub fn new<S: Into<String>>(kind: StatsKind, name: S) -> Self {
        Self {
            kind,
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            status: Status::Pending,
            start_millis: 0,
            finish_millis: 0,
            counters: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> StatsKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn start_millis(&self) -> u64 {
        self.start_millis
    }

    pub fn finish_millis(&self) -> u64 {
        self.finish_millis
    }

    /// Milliseconds between start and finish, 0 if either is unknown.
    pub fn duration_millis(&self) -> u64 {
        if self.start_millis == 0 || self.finish_millis == 0 {
            return 0;
        }
        self.finish_millis.saturating_sub(self.start_millis)
    }

    pub fn counter(&self, counter: Counter) -> u64 {
        self.counters.get(&counter).copied().unwrap_or(0)
    }

    pub fn add_counter(&mut self, counter: Counter, amount: u64) {
        *self.counters.entry(counter).or_insert(0) += amount;
    }

    pub fn children(&self) -> &[Stats] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Stats] {
        &mut self.children
    }

    pub fn push_child(&mut self, child: Stats) {
        self.children.push(child);
    }

    pub fn mark_started(&mut self) {
        self.mark_started_at(current_timestamp_millis());
    }

    pub fn mark_started_at(&mut self, millis: u64) {
        self.status = Status::Running;
        self.start_millis = millis;
    }

    pub fn mark_finished(&mut self, status: Status) {
        self.mark_finished_at(status, current_timestamp_millis());
    }

    pub fn mark_finished_at(&mut self, status: Status, millis: u64) {
        if self.start_millis == 0 {
            self.start_millis = millis;
        }
        self.status = status;
        self.finish_millis = millis;
    }

    /// Mark without timing, for work that never started.
    pub fn mark_skipped(&mut self) {
        self.status = Status::Skipped;
        for child in &mut self.children {
            child.mark_skipped();
        }
    }

    /// Replace this record's counters with the sum of its children's.
    pub fn roll_up(&mut self) {
        if self.children.is_empty() {
            return;
        }
        let mut counters = BTreeMap::new();
        for child in &mut self.children {
            child.roll_up();
            for (counter, value) in &child.counters {
                *counters.entry(*counter).or_insert(0) += value;
            }
        }
        self.counters = counters;
    }

    /// Find a descendant (or self) by name.
    pub fn find(&self, name: &str) -> Option<&Stats> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }
}
