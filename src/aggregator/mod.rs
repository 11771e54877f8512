//! Aggregation of parsed exceptions into error events and metrics.
//!
//! This module transforms parsed tracebacks into:
//! - Deduplicated error events per root span tree
//! - Handled/escaped classification
//! - Summary statistics

pub mod batch;
pub mod dedup;
pub mod metrics;

// Re-export main types and functions
pub use batch::{parse_event, process_batch, BatchOptions};
pub use dedup::{containment_length, deduplicate, ErrorEvent, ParsedException};
pub use metrics::{summarize_events, ErrorSummary};
