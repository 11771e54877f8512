//! Batch pipeline: parse, link, deduplicate.

use super::dedup::{deduplicate, ErrorEvent, ParsedException};
use crate::frame_info::FrameInfoMap;
use crate::parser::{parse_exception_chain, ParseOptions};
use crate::spans::{ExceptionEvent, SpanBatch, SpanForest};
use crate::utils::config::DEFAULT_MAX_FOREST_DEPTH;
use crate::utils::error::ForestError;
use log::{debug, info, warn};
use std::collections::HashMap;

/// Everything a batch run needs besides the batch itself
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub parse: ParseOptions,
    pub max_forest_depth: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            parse: ParseOptions::default(),
            max_forest_depth: DEFAULT_MAX_FOREST_DEPTH,
        }
    }
}

/// Turn a span batch into deduplicated error events
///
/// **Public** - main entry point for batch processing
///
/// # Errors
/// * `ForestError` - The span linkage is structurally broken; nothing is returned
pub fn process_batch(batch: SpanBatch, options: &BatchOptions) -> Result<Vec<ErrorEvent>, ForestError> {
    let span_count = batch.spans.len();
    let shared = batch.frame_info;

    let forest = SpanForest::build(batch.spans, options.max_forest_depth)?;

    let mut exceptions_by_span: HashMap<String, Vec<ParsedException>> = HashMap::new();
    for node in forest.nodes() {
        if node.span.events.is_empty() {
            continue;
        }
        let parsed = node
            .span
            .events
            .iter()
            .map(|event| parse_event(event, &node.span.span_id, &shared, &options.parse))
            .collect();
        exceptions_by_span.insert(node.span.span_id.clone(), parsed);
    }

    debug!(
        "Parsed exceptions on {} of {} spans",
        exceptions_by_span.len(),
        span_count
    );

    let events = deduplicate(&forest, &exceptions_by_span);

    info!("Batch of {} spans produced {} error events", span_count, events.len());

    Ok(events)
}

/// Parse one recorded exception with its own side channel layered over the shared one
pub fn parse_event(
    event: &ExceptionEvent,
    span_id: &str,
    shared: &FrameInfoMap,
    options: &ParseOptions,
) -> ParsedException {
    let frame_info = match event.locals.as_deref() {
        Some(json) => match FrameInfoMap::from_json(json) {
            Ok(own) => shared.merged_with(&own),
            Err(e) => {
                warn!("Ignoring side channel of an exception on span {}: {}", span_id, e);
                shared.clone()
            }
        },
        None => shared.clone(),
    };

    let chain = parse_exception_chain(event.parse_source(), span_id, &frame_info, options);
    if chain.is_empty() {
        debug!("No traceback blocks found in an exception on span {}", span_id);
    }

    ParsedException {
        stacktrace: event.stacktrace.clone(),
        timestamp: event.timestamp,
        chain,
    }
}
