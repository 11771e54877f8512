//! Deduplicate exceptions across a span forest.
//!
//! An exception that propagates out of nested spans is recorded once per
//! span it crosses, each time with a traceback that ends at the same raise
//! site. Within one root tree these sightings collapse into a single
//! [`ErrorEvent`]; the spans that saw it are remembered as stamps on the
//! frames they share.

use crate::parser::{ExceptionChain, FrameStack};
use crate::spans::SpanForest;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One exception recorded on a span, after parsing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedException {
    /// Traceback text as recorded
    pub stacktrace: String,

    pub timestamp: Option<DateTime<Utc>>,

    pub chain: ExceptionChain,
}

/// A logically distinct error within one root tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// `<ExceptionType> from <function>`
    pub name: String,

    pub exception_type: String,

    pub exception_message: String,

    /// Traceback text of the first sighting
    pub exception_stack: String,

    /// Causes first, this error's own stack last
    pub stacks: Vec<FrameStack>,

    /// Caught before reaching any request boundary
    pub handled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Span where the error was first accepted
    pub first_span_id: String,
}

impl ErrorEvent {
    /// This error's own stack
    pub fn own_stack(&self) -> Option<&FrameStack> {
        self.stacks.last()
    }

    pub fn is_unexpected(&self) -> bool {
        self.own_stack().is_some_and(|stack| stack.unexpected)
    }

    /// Every span id stamped on any frame, first sighting first
    pub fn span_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for id in self
            .stacks
            .iter()
            .flat_map(|stack| &stack.frames)
            .flat_map(|frame| &frame.span_ids)
        {
            if !ids.contains(&id.as_str()) {
                ids.push(id);
            }
        }
        ids
    }
}

/// Number of equal frames at the innermost end of two stacks
///
/// Frames are compared pairwise from the failure point outward and counting
/// stops at the first pair that differs.
pub fn containment_length(existing: &FrameStack, candidate: &FrameStack) -> usize {
    existing
        .frames
        .iter()
        .rev()
        .zip(candidate.frames.iter().rev())
        .take_while(|(a, b)| a.same_site(b))
        .count()
}

/// Collapse repeated sightings into error events
///
/// **Public** - main entry point for deduplication
///
/// # Arguments
/// * `forest` - Span trees of the batch
/// * `exceptions_by_span` - Parsed exceptions keyed by span id
///
/// # Returns
/// Error events grouped by root tree in root order; within a tree, in the
/// order they were first seen during a pre-order walk
pub fn deduplicate(
    forest: &SpanForest,
    exceptions_by_span: &HashMap<String, Vec<ParsedException>>,
) -> Vec<ErrorEvent> {
    let mut events = Vec::new();

    for &root in forest.roots() {
        let mut accepted: Vec<ErrorEvent> = Vec::new();

        for node in forest.preorder(root) {
            let span_id = node.span.span_id.as_str();
            let Some(exceptions) = exceptions_by_span.get(span_id) else {
                continue;
            };

            for exception in exceptions {
                for (link, candidate) in exception.chain.iter().enumerate() {
                    if candidate.frames.is_empty() {
                        continue;
                    }
                    if !absorb(&mut accepted, candidate, span_id) {
                        accepted.push(new_event(exception, link, span_id));
                    }
                }
            }
        }

        for event in &mut accepted {
            let escaped = event.span_ids().into_iter().any(|id| {
                forest
                    .get(id)
                    .is_some_and(|node| node.span.kind.is_server())
            });
            event.handled = !escaped;
        }

        debug!(
            "Root {}: {} distinct errors",
            forest
                .node(root)
                .map(|n| n.span.span_id.as_str())
                .unwrap_or_default(),
            accepted.len()
        );
        events.extend(accepted);
    }

    events
}

/// Stamp `span_id` onto the first accepted stack containing `candidate`
fn absorb(accepted: &mut [ErrorEvent], candidate: &FrameStack, span_id: &str) -> bool {
    for event in accepted.iter_mut() {
        for stack in event.stacks.iter_mut() {
            let matched = containment_length(stack, candidate);
            if matched != candidate.frames.len() {
                continue;
            }
            let start = stack.frames.len() - matched;
            for frame in &mut stack.frames[start..] {
                frame.stamp(span_id);
            }
            return true;
        }
    }
    false
}

fn new_event(exception: &ParsedException, link: usize, span_id: &str) -> ErrorEvent {
    let mut stacks: Vec<FrameStack> = exception.chain[..=link].to_vec();
    for frame in stacks.iter_mut().flat_map(|stack| stack.frames.iter_mut()) {
        frame.stamp(span_id);
    }

    let own = &exception.chain[link];
    let function = own
        .innermost()
        .map(|frame| frame.function.as_str())
        .unwrap_or_default();

    ErrorEvent {
        name: format!("{} from {}", own.exception_type, function),
        exception_type: own.exception_type.clone(),
        exception_message: own.exception_message.clone(),
        exception_stack: exception.stacktrace.clone(),
        stacks,
        handled: true,
        timestamp: exception.timestamp,
        first_span_id: span_id.to_string(),
    }
}
