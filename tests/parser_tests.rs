use exception_flow::frame_info::{FrameInfo, FrameInfoMap, LocalStats};
use exception_flow::parser::{parse_exception_chain, ParseOptions};
use exception_flow::paths::{NormalizerEnv, PathNormalizer};
use pretty_assertions::assert_eq;

const DIVISION: &str = "\
Traceback (most recent call last):
  File \"/app/service.py\", line 10, in handle
    result = compute(x)
  File \"/app/worker.py\", line 5, in compute
    return 1/x
ZeroDivisionError: division by zero
";

const CHAINED: &str = "\
Traceback (most recent call last):
  File \"/app/store.py\", line 21, in fetch
    return self.rows[key]
KeyError: 'sku-1'

During handling of the above exception, another exception occurred:

Traceback (most recent call last):
  File \"/app/store.py\", line 23, in fetch
    raise LookupFailed(key) from None
LookupFailed: sku-1

The above exception was the direct cause of the following exception:

Traceback (most recent call last):
  File \"/app/api.py\", line 8, in get_item
    item = store.fetch(sku)
  File \"/app/store.py\", line 25, in fetch
    raise ValueError(\"unknown item\")
ValueError: unknown item
";

const RECURSION: &str = "\
Traceback (most recent call last):
  File \"/app/tree.py\", line 30, in main
    walk(root)
  File \"/app/tree.py\", line 12, in walk
    return walk(node.child)
  [Previous line repeated 996 more times]
  File \"/app/tree.py\", line 11, in walk
    if node.depth > limit:
RecursionError: maximum recursion depth exceeded in comparison
";

fn parse(text: &str) -> exception_flow::parser::ExceptionChain {
    parse_exception_chain(text, "span-1", &FrameInfoMap::new(), &ParseOptions::default())
}

#[test]
fn test_division_example() {
    let chain = parse(DIVISION);

    assert_eq!(chain.len(), 1);
    let stack = &chain[0];
    assert_eq!(stack.exception_type, "ZeroDivisionError");
    assert_eq!(stack.exception_message, "division by zero");
    assert!(stack.unexpected);

    let sites: Vec<(&str, u32)> = stack
        .frames
        .iter()
        .map(|f| (f.function.as_str(), f.line_number))
        .collect();
    assert_eq!(sites, vec![("handle", 10), ("compute", 5)]);
    assert_eq!(
        stack.frames[0].executed_code.as_deref(),
        Some("result = compute(x)")
    );
    assert!(stack.frames[0].parameters.is_empty());
    assert_eq!(stack.frames[1].executed_code.as_deref(), Some("return 1/x"));
    assert!(stack.frames.iter().all(|f| f.span_ids == vec!["span-1"]));
}

#[test]
fn test_frame_count_matches_headers() {
    let chain = parse(DIVISION);
    let headers = DIVISION.matches("  File \"").count();
    assert_eq!(chain[0].frames.len(), headers);
}

#[test]
fn test_chained_blocks_cause_first() {
    let chain = parse(CHAINED);

    let types: Vec<&str> = chain.iter().map(|s| s.exception_type.as_str()).collect();
    assert_eq!(types, vec!["KeyError", "LookupFailed", "ValueError"]);
    assert_eq!(chain[2].frames.len(), 2);
    assert_eq!(
        chain[2].frames[0].executed_code.as_deref(),
        Some("item = store.fetch(sku)")
    );
    assert!(chain[2].frames[0].parameters.is_empty());

    // runtime lookup failure vs explicit raises
    assert!(chain[0].unexpected);
    assert!(!chain[1].unexpected);
    assert!(!chain[2].unexpected);
}

#[test]
fn test_repeat_marker() {
    let chain = parse(RECURSION);

    assert_eq!(chain.len(), 1);
    let frames = &chain[0].frames;
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].repeat, 0);
    assert_eq!(frames[1].repeat, 996);
    assert_eq!(frames[2].repeat, 0);
    assert_eq!(frames[2].line_number, 11);
}

#[test]
fn test_parsing_is_idempotent() {
    assert_eq!(parse(CHAINED), parse(CHAINED));
}

#[test]
fn test_captured_locals() {
    let text = "\
Traceback (most recent call last):
  File \"/app/billing.py\", line 40, in charge
    return total / count
    self = <Invoice>
    total = 120
    count = 0
    _ = None
ZeroDivisionError: division by zero
";
    let chain = parse(text);
    let params = &chain[0].frames[0].parameters;

    assert_eq!(params.len(), 2);
    assert_eq!(params["total"], "120");
    assert_eq!(params["count"], "0");
}

#[test]
fn test_assignment_source_line_then_locals() {
    let text = "\
Traceback (most recent call last):
  File \"/app/cart.py\", line 18, in line_total
    total = price * qty
    price = None
    qty = 2
TypeError: unsupported operand type(s) for *: 'NoneType' and 'int'
";
    let chain = parse(text);
    let frame = &chain[0].frames[0];

    assert_eq!(frame.executed_code.as_deref(), Some("total = price * qty"));
    assert_eq!(frame.parameters.len(), 2);
    assert_eq!(frame.parameters["price"], "None");
    assert_eq!(frame.parameters["qty"], "2");
    assert!(!frame.parameters.contains_key("total"));
    assert_eq!(
        chain[0].exception_message,
        "unsupported operand type(s) for *: 'NoneType' and 'int'"
    );
}

#[test]
fn test_side_channel_attached() {
    let mut info = FrameInfoMap::new();
    info.insert(
        "/app/worker.py/compute:5".to_string(),
        FrameInfo {
            class_name: "Worker".to_string(),
            locals: vec![LocalStats {
                name: "x".to_string(),
                type_name: "int".to_string(),
                is_none: false,
                length: 0,
                value: "0".to_string(),
            }],
        },
    );

    let chain = parse_exception_chain(DIVISION, "s", &info, &ParseOptions::default());
    let frames = &chain[0].frames;

    assert_eq!(frames[0].class_name, "");
    assert!(frames[0].parameter_stats.is_empty());
    assert_eq!(frames[1].class_name, "Worker");
    assert_eq!(frames[1].parameter_stats[0].value, "0");
}

#[test]
fn test_side_channel_keyed_by_raw_path() {
    let options = ParseOptions {
        normalizer: PathNormalizer::new(NormalizerEnv {
            library_roots: vec!["/app".to_string()],
            ..Default::default()
        }),
        ..Default::default()
    };
    let mut info = FrameInfoMap::new();
    info.insert(
        "/app/worker.py/compute:5".to_string(),
        FrameInfo {
            class_name: "Worker".to_string(),
            locals: Vec::new(),
        },
    );

    let chain = parse_exception_chain(DIVISION, "s", &info, &options);
    let frame = &chain[0].frames[1];

    assert_eq!(frame.module_path, "worker.py");
    assert_eq!(frame.class_name, "Worker");
}

#[test]
fn test_ignored_frames_dropped() {
    let text = "\
Traceback (most recent call last):
  File \"/app/service.py\", line 10, in handle
    with tracer.start_as_current_span(\"work\"):
  File \"/venv/site-packages/opentelemetry/trace/__init__.py\", line 587, in use_span
    yield span
  File \"/app/worker.py\", line 5, in compute
    return 1/x
ZeroDivisionError: division by zero
";
    let options = ParseOptions {
        normalizer: PathNormalizer::new(NormalizerEnv {
            library_roots: vec!["/venv/site-packages".to_string()],
            ..Default::default()
        }),
        ..Default::default()
    };

    let chain = parse_exception_chain(text, "s", &FrameInfoMap::new(), &options);
    let functions: Vec<&str> = chain[0].frames.iter().map(|f| f.function.as_str()).collect();
    assert_eq!(functions, vec!["handle", "compute"]);
}

#[test]
fn test_truncated_text_yields_fewer_stacks() {
    let truncated = "\
Traceback (most recent call last):
  File \"/app/a.py\", line 1, in main
    run()
KeyError: 'a'
Traceback (most recent call last):
  File \"/app/b.py\", line 2, in run
";
    let chain = parse(truncated);
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].exception_type, "KeyError");
}

#[test]
fn test_garbage_is_skipped() {
    assert!(parse("").is_empty());
    assert!(parse("not a traceback\n  at all\n").is_empty());
}

#[test]
fn test_caret_lines_skipped() {
    let text = "\
Traceback (most recent call last):
  File \"/app/worker.py\", line 5, in compute
    return 1/x
           ~^~
ZeroDivisionError: division by zero
";
    let chain = parse(text);
    assert_eq!(chain[0].frames.len(), 1);
    assert_eq!(chain[0].frames[0].executed_code.as_deref(), Some("return 1/x"));
}
