use exception_flow::aggregator::{
    containment_length, deduplicate, process_batch, summarize_events, BatchOptions,
    ParsedException,
};
use exception_flow::frame_info::FrameInfoMap;
use exception_flow::parser::{parse_exception_chain, ParseOptions};
use exception_flow::spans::{ExceptionEvent, SpanBatch, SpanForest, SpanKind, SpanRef};
use exception_flow::utils::ForestError;
use pretty_assertions::assert_eq;
use std::collections::HashMap;

/// Traceback as recorded by the outer span: includes the request handler frame
const OUTER: &str = "\
Traceback (most recent call last):
  File \"/app/views.py\", line 14, in index
    return load_profile(user_id)
  File \"/app/profiles.py\", line 31, in load_profile
    return PROFILES[user_id]
KeyError: 42
";

/// Same exception as recorded by the inner span around `load_profile`
const INNER: &str = "\
Traceback (most recent call last):
  File \"/app/profiles.py\", line 31, in load_profile
    return PROFILES[user_id]
KeyError: 42
";

const OTHER: &str = "\
Traceback (most recent call last):
  File \"/app/audit.py\", line 7, in record
    raise AuditError(\"disk full\")
AuditError: disk full
";

fn parsed(text: &str, span_id: &str) -> ParsedException {
    ParsedException {
        stacktrace: text.to_string(),
        timestamp: None,
        chain: parse_exception_chain(text, span_id, &FrameInfoMap::new(), &ParseOptions::default()),
    }
}

fn span(id: &str, parent: Option<&str>, kind: SpanKind) -> SpanRef {
    SpanRef::new(id, parent, kind)
}

#[test]
fn test_containment_length() {
    let outer = parsed(OUTER, "a").chain.remove(0);
    let inner = parsed(INNER, "b").chain.remove(0);
    assert_eq!(containment_length(&outer, &inner), 1);
    assert_eq!(containment_length(&inner, &outer), 1);
}

#[test]
fn test_root_and_child_collapse() {
    let forest = SpanForest::build(
        vec![
            span("root", None, SpanKind::Internal),
            span("child", Some("root"), SpanKind::Internal),
        ],
        16,
    )
    .unwrap();

    let mut by_span = HashMap::new();
    by_span.insert("root".to_string(), vec![parsed(OUTER, "root")]);
    by_span.insert("child".to_string(), vec![parsed(INNER, "child")]);

    let events = deduplicate(&forest, &by_span);

    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.name, "KeyError from load_profile");
    assert_eq!(event.first_span_id, "root");
    assert_eq!(event.span_ids(), vec!["root", "child"]);
    assert!(event.handled);

    // only the shared frame carries the child's stamp
    let frames = &event.stacks[0].frames;
    assert_eq!(frames[0].span_ids, vec!["root"]);
    assert_eq!(frames[1].span_ids, vec!["root", "child"]);
}

#[test]
fn test_identical_stacks_collapse() {
    let forest = SpanForest::build(
        vec![
            span("root", None, SpanKind::Internal),
            span("child", Some("root"), SpanKind::Internal),
        ],
        16,
    )
    .unwrap();

    let mut by_span = HashMap::new();
    by_span.insert("root".to_string(), vec![parsed(OUTER, "root")]);
    by_span.insert("child".to_string(), vec![parsed(OUTER, "child")]);

    let events = deduplicate(&forest, &by_span);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].span_ids(), vec!["root", "child"]);
}

#[test]
fn test_server_span_means_escaped() {
    let forest = SpanForest::build(
        vec![
            span("request", None, SpanKind::Server),
            span("work", Some("request"), SpanKind::Internal),
            span("audit", Some("request"), SpanKind::Internal),
        ],
        16,
    )
    .unwrap();

    let mut by_span = HashMap::new();
    by_span.insert("request".to_string(), vec![parsed(OUTER, "request")]);
    by_span.insert("work".to_string(), vec![parsed(INNER, "work")]);
    by_span.insert("audit".to_string(), vec![parsed(OTHER, "audit")]);

    let events = deduplicate(&forest, &by_span);

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].exception_type, "KeyError");
    assert!(!events[0].handled);
    assert_eq!(events[1].exception_type, "AuditError");
    assert!(events[1].handled);
}

#[test]
fn test_roots_deduplicate_independently() {
    let forest = SpanForest::build(
        vec![
            span("r1", None, SpanKind::Internal),
            span("r2", None, SpanKind::Internal),
        ],
        16,
    )
    .unwrap();

    let mut by_span = HashMap::new();
    by_span.insert("r1".to_string(), vec![parsed(INNER, "r1")]);
    by_span.insert("r2".to_string(), vec![parsed(INNER, "r2")]);

    let events = deduplicate(&forest, &by_span);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].first_span_id, "r1");
    assert_eq!(events[1].first_span_id, "r2");
}

#[test]
fn test_chain_links_are_separate_events() {
    let chained = "\
Traceback (most recent call last):
  File \"/app/profiles.py\", line 31, in load_profile
    return PROFILES[user_id]
KeyError: 42

The above exception was the direct cause of the following exception:

Traceback (most recent call last):
  File \"/app/views.py\", line 16, in index
    raise NotFound(user_id) from exc
NotFound: 42
";
    let forest = SpanForest::build(vec![span("s", None, SpanKind::Server)], 16).unwrap();
    let mut by_span = HashMap::new();
    by_span.insert("s".to_string(), vec![parsed(chained, "s")]);

    let events = deduplicate(&forest, &by_span);

    let names: Vec<&str> = events.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["KeyError from load_profile", "NotFound from index"]);
    assert_eq!(events[0].stacks.len(), 1);
    assert_eq!(events[1].stacks.len(), 2);
    assert!(events[0].is_unexpected());
    assert!(!events[1].is_unexpected());
}

#[test]
fn test_process_batch_from_json() {
    let batch_json = serde_json::json!({
        "spans": [
            {
                "span_id": "req",
                "name": "GET /profile",
                "kind": "SPAN_KIND_SERVER",
                "events": [{ "stacktrace": OUTER, "timestamp": "2024-05-01T10:00:00Z" }]
            },
            {
                "span_id": "load",
                "parent_span_id": "req",
                "kind": "internal",
                "events": [{
                    "stacktrace": INNER,
                    "locals": "{\"/app/profiles.py/load_profile:31\": {\"class\": \"\", \"locals\": {\"user_id\": {\"type\": \"int\", \"is_none\": false, \"length\": 0, \"value\": \"42\"}}}}"
                }]
            }
        ]
    });
    let batch: SpanBatch = serde_json::from_value(batch_json).unwrap();

    let events = process_batch(batch, &BatchOptions::default()).unwrap();

    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert!(!event.handled);
    assert!(event.timestamp.is_some());
    assert_eq!(event.exception_stack, OUTER);

    let summary = summarize_events(&events);
    assert_eq!(summary.escaped, 1);
    assert_eq!(summary.unexpected, 1);
}

#[test]
fn test_process_batch_rejects_cycles() {
    let batch = SpanBatch {
        spans: vec![
            span("a", Some("b"), SpanKind::Internal)
                .with_event(ExceptionEvent::new(INNER)),
            span("b", Some("a"), SpanKind::Internal),
        ],
        frame_info: FrameInfoMap::new(),
    };

    let err = process_batch(batch, &BatchOptions::default()).unwrap_err();
    assert!(matches!(err, ForestError::CyclicLinkage { .. }));
}

#[test]
fn test_process_batch_depth_limit() {
    let spans = (0..10)
        .map(|i| {
            let parent = (i > 0).then(|| format!("s{}", i - 1));
            span(&format!("s{}", i), parent.as_deref(), SpanKind::Internal)
        })
        .collect();
    let batch = SpanBatch {
        spans,
        frame_info: FrameInfoMap::new(),
    };
    let options = BatchOptions {
        max_forest_depth: 5,
        ..Default::default()
    };

    let err = process_batch(batch, &options).unwrap_err();
    assert!(matches!(err, ForestError::DepthExceeded { max_depth: 5, .. }));
}
