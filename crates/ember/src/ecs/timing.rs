//! Per-system tick timing.
//!
//! The scheduler wraps each system's full tick (before, every entity, after)
//! in a [`Stopwatch`] and records the result here, together with the system's
//! diagnostic `log` object. Only the most recent value is kept; averaging is
//! left to whoever reads it (see [`diag::Logger`](crate::diag::Logger)).
//!
//! The record lives on the [`World`](super::world::World) so systems that run
//! later in the same tick can read it.

use std::time::{Duration, Instant};

use serde::Serialize;

/// Timing and diagnostics of one system's most recent completed tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemTiming {
    pub name: String,
    /// Wall-clock duration of the last completed tick, in milliseconds.
    pub time_ms: f64,
    /// The system's own summary of its internal counters, if it provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<serde_json::Value>,
}

/// Last-value timing record for every registered system, in registration order.
#[derive(Debug, Default)]
pub struct Timings {
    entries: Vec<SystemTiming>,
}

impl Timings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timing of the system at registration index `index`.
    pub fn get(&self, index: usize) -> Option<&SystemTiming> {
        self.entries.get(index)
    }

    /// First system registered under `name`.
    pub fn by_name(&self, name: &str) -> Option<&SystemTiming> {
        self.entries.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SystemTiming> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every system's last tick, in milliseconds.
    pub fn total_ms(&self) -> f64 {
        self.entries.iter().map(|t| t.time_ms).sum()
    }

    /// Make sure slot `index` exists and carries `name`. Leaves any recorded
    /// time in place.
    pub(crate) fn register(&mut self, index: usize, name: &str) {
        if self.entries.len() <= index {
            self.entries.resize_with(index + 1, SystemTiming::default);
        }
        self.entries[index].name = name.to_string();
    }

    pub(crate) fn record(
        &mut self,
        index: usize,
        name: &str,
        elapsed: Duration,
        log: Option<serde_json::Value>,
    ) {
        self.register(index, name);
        let entry = &mut self.entries[index];
        entry.time_ms = elapsed.as_secs_f64() * 1000.0;
        entry.log = log;
    }
}

/// Wall-clock measurement around a system's tick.
pub(crate) struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
