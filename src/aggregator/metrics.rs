//! Summary statistics over error events.
//!
//! Escaped errors reached a request boundary and were seen by a caller.
//! These are the primary targets for triage.

use super::dedup::ErrorEvent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts over a list of error events
///
/// **Public** - returned from summarize_events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSummary {
    /// Distinct error events
    pub total: usize,

    /// Caught before any server span
    pub handled: usize,

    /// Reached a server span
    pub escaped: usize,

    /// Built-in exceptions raised by the runtime
    pub unexpected: usize,

    /// Events per exception type
    pub by_type: BTreeMap<String, usize>,
}

/// Calculate summary statistics
///
/// **Public** - provides summary statistics
///
/// # Arguments
/// * `events` - Deduplicated error events
pub fn summarize_events(events: &[ErrorEvent]) -> ErrorSummary {
    let mut summary = ErrorSummary {
        total: events.len(),
        ..Default::default()
    };

    for event in events {
        if event.handled {
            summary.handled += 1;
        } else {
            summary.escaped += 1;
        }
        if event.is_unexpected() {
            summary.unexpected += 1;
        }
        *summary
            .by_type
            .entry(event.exception_type.clone())
            .or_insert(0) += 1;
    }

    summary
}

impl ErrorSummary {
    /// Percentage of events that escaped
    pub fn escape_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.escaped as f64 / self.total as f64) * 100.0
    }

    /// Most frequent exception type, ties broken by name
    pub fn top_type(&self) -> Option<(&str, usize)> {
        self.by_type
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(name, count)| (name.as_str(), *count))
    }

    /// Get human-readable summary
    ///
    /// **Public** - for logging and debugging
    pub fn summary(&self) -> String {
        format!(
            "Total: {} | Handled: {} | Escaped: {} ({:.1}%) | Unexpected: {}",
            self.total,
            self.handled,
            self.escaped,
            self.escape_rate(),
            self.unexpected
        )
    }
}
