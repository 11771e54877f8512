//! Span batches and the span forest.
//!
//! This module handles:
//! - The batch input schema (spans, exception events, side channel)
//! - Linking spans into parent-rooted trees

pub mod forest;
pub mod schema;

// Re-export main types
pub use forest::{SpanForest, SpanNode};
pub use schema::{ExceptionEvent, SpanBatch, SpanKind, SpanRef};
