//! Span batch input schema.
//!
//! A batch is the unit of work: every span in it, with the exceptions
//! recorded on each, plus an optional side-channel map shared by all events.

use crate::frame_info::FrameInfoMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a span in its trace
///
/// Accepts lowercase names and the `SPAN_KIND_*` spellings used by
/// OpenTelemetry exporters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    /// Request boundary; an exception reaching it escaped to the caller
    #[serde(alias = "SPAN_KIND_SERVER", alias = "SERVER")]
    Server,

    #[serde(alias = "SPAN_KIND_INTERNAL", alias = "INTERNAL")]
    Internal,

    #[serde(alias = "SPAN_KIND_CLIENT", alias = "CLIENT")]
    Client,

    #[serde(alias = "SPAN_KIND_PRODUCER", alias = "PRODUCER")]
    Producer,

    #[serde(alias = "SPAN_KIND_CONSUMER", alias = "CONSUMER")]
    Consumer,

    #[default]
    #[serde(other)]
    Unspecified,
}

impl SpanKind {
    pub fn is_server(self) -> bool {
        self == SpanKind::Server
    }
}

/// An exception recorded on a span
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionEvent {
    /// Traceback text as printed, possibly with recursion elided
    pub stacktrace: String,

    /// Untruncated traceback text, parsed in preference when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_stacktrace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub exception_type: String,

    #[serde(default)]
    pub exception_message: String,

    /// Side-channel map serialized as a JSON string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locals: Option<String>,
}

impl ExceptionEvent {
    pub fn new(stacktrace: impl Into<String>) -> Self {
        Self {
            stacktrace: stacktrace.into(),
            ..Default::default()
        }
    }

    /// Text the parser should read
    pub fn parse_source(&self) -> &str {
        match self.full_stacktrace.as_deref() {
            Some(full) if !full.trim().is_empty() => full,
            _ => &self.stacktrace,
        }
    }
}

/// A span as delivered in a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanRef {
    pub span_id: String,

    /// Absent for roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub kind: SpanKind,

    #[serde(default)]
    pub events: Vec<ExceptionEvent>,
}

impl SpanRef {
    pub fn new(span_id: impl Into<String>, parent_span_id: Option<&str>, kind: SpanKind) -> Self {
        Self {
            span_id: span_id.into(),
            parent_span_id: parent_span_id.map(str::to_string),
            kind,
            ..Default::default()
        }
    }

    /// Attach an exception event (builder style)
    pub fn with_event(mut self, event: ExceptionEvent) -> Self {
        self.events.push(event);
        self
    }
}

/// A batch of spans to analyze together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanBatch {
    pub spans: Vec<SpanRef>,

    /// Side channel shared by every event of the batch
    #[serde(default, skip_serializing_if = "FrameInfoMap::is_empty")]
    pub frame_info: FrameInfoMap,
}
