//! Raise-time collection of per-frame local statistics.
//!
//! Textual tracebacks elide recursive frames and render locals as truncated
//! reprs. The instrumentation hook that records an exception sees the live
//! frames instead, and summarizes every local once per frame identity.
//! That summary travels next to the traceback text as the side channel.

use super::schema::{frame_key, FrameInfo, FrameInfoMap, LocalStats};
use crate::utils::config::RECEIVER_LOCAL;

/// A live local value as seen by the instrumentation hook
#[derive(Debug, Clone, PartialEq)]
pub enum LocalValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<LocalValue>),
    /// Enumeration member, rendered as `Type.MEMBER`
    Enum { type_name: String, member: String },
    /// Any other object, known only by its type
    Object { type_name: String },
}

impl LocalValue {
    pub fn type_name(&self) -> &str {
        match self {
            LocalValue::None => "NoneType",
            LocalValue::Bool(_) => "bool",
            LocalValue::Int(_) => "int",
            LocalValue::Float(_) => "float",
            LocalValue::Str(_) => "str",
            LocalValue::List(_) => "list",
            LocalValue::Enum { type_name, .. } | LocalValue::Object { type_name } => type_name,
        }
    }

    /// Summarize the value: length for sized values, rendering for scalars
    pub fn stats(&self, name: &str) -> LocalStats {
        let (length, value) = match self {
            LocalValue::Str(s) => (s.chars().count() as u64, String::new()),
            LocalValue::List(items) => (items.len() as u64, String::new()),
            LocalValue::Bool(b) => (0, if *b { "True" } else { "False" }.to_string()),
            LocalValue::Int(i) => (0, i.to_string()),
            LocalValue::Float(f) => (0, f.to_string()),
            LocalValue::Enum { type_name, member } => (0, format!("{}.{}", type_name, member)),
            LocalValue::None | LocalValue::Object { .. } => (0, String::new()),
        };

        LocalStats {
            name: name.to_string(),
            type_name: self.type_name().to_string(),
            is_none: matches!(self, LocalValue::None),
            length,
            value,
        }
    }
}

/// One frame of a raised exception's traceback, with its locals
#[derive(Debug, Clone, PartialEq)]
pub struct LiveFrame {
    pub filename: String,
    pub function: String,
    pub line: u32,
    pub locals: Vec<(String, LocalValue)>,
}

/// A raised exception with its chaining links
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RaisedException {
    pub type_name: String,

    /// Frames from the outermost handler down to the raise site
    pub frames: Vec<LiveFrame>,

    /// Explicit cause (`raise ... from ...`)
    pub cause: Option<Box<RaisedException>>,

    /// Implicit context (raised while handling another exception)
    pub context: Option<Box<RaisedException>>,

    /// Context is hidden from the printed traceback
    pub suppress_context: bool,
}

impl RaisedException {
    /// The exception that precedes this one in the printed chain
    pub fn predecessor(&self) -> Option<&RaisedException> {
        if let Some(cause) = &self.cause {
            return Some(cause);
        }
        if self.suppress_context {
            return None;
        }
        self.context.as_deref()
    }
}

/// Produces the side-channel map for a raised exception.
///
/// Implemented by the instrumentation hook; closures work too.
pub trait FrameInfoSource {
    fn frame_info(&self, exception: &RaisedException) -> FrameInfoMap;
}

impl<F> FrameInfoSource for F
where
    F: Fn(&RaisedException) -> FrameInfoMap,
{
    fn frame_info(&self, exception: &RaisedException) -> FrameInfoMap {
        self(exception)
    }
}

/// Default source: summarizes every local of every frame in the chain
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalsCollector;

impl FrameInfoSource for LocalsCollector {
    fn frame_info(&self, exception: &RaisedException) -> FrameInfoMap {
        let mut map = FrameInfoMap::new();

        // Earliest cause first, matching the printed chain order
        let mut chain = vec![exception];
        let mut current = exception;
        while let Some(previous) = current.predecessor() {
            chain.push(previous);
            current = previous;
        }

        for raised in chain.into_iter().rev() {
            for frame in &raised.frames {
                if frame.locals.is_empty() {
                    continue;
                }
                map.insert(
                    frame_key(&frame.filename, &frame.function, frame.line),
                    summarize_frame(frame),
                );
            }
        }

        map
    }
}

fn summarize_frame(frame: &LiveFrame) -> FrameInfo {
    let mut info = FrameInfo::default();
    for (name, value) in &frame.locals {
        if name == RECEIVER_LOCAL {
            info.class_name = value.type_name().to_string();
        } else {
            info.locals.push(value.stats(name));
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(function: &str, line: u32, locals: Vec<(&str, LocalValue)>) -> LiveFrame {
        LiveFrame {
            filename: "/app/billing.py".to_string(),
            function: function.to_string(),
            line,
            locals: locals
                .into_iter()
                .map(|(n, v)| (n.to_string(), v))
                .collect(),
        }
    }

    #[test]
    fn test_local_stats() {
        let s = LocalValue::Str("abc".to_string()).stats("name");
        assert_eq!((s.type_name.as_str(), s.length, s.value.as_str()), ("str", 3, ""));

        let i = LocalValue::Int(42).stats("count");
        assert_eq!((i.length, i.value.as_str()), (0, "42"));

        let b = LocalValue::Bool(false).stats("flag");
        assert_eq!(b.value, "False");

        let e = LocalValue::Enum {
            type_name: "Status".to_string(),
            member: "FAILED".to_string(),
        }
        .stats("status");
        assert_eq!(e.value, "Status.FAILED");

        let n = LocalValue::None.stats("user");
        assert!(n.is_none);
        assert_eq!(n.type_name, "NoneType");
    }

    #[test]
    fn test_receiver_becomes_class_name() {
        let raised = RaisedException {
            type_name: "ValueError".to_string(),
            frames: vec![frame(
                "charge",
                40,
                vec![
                    (
                        "self",
                        LocalValue::Object {
                            type_name: "Invoice".to_string(),
                        },
                    ),
                    ("amount", LocalValue::Float(12.5)),
                ],
            )],
            ..Default::default()
        };

        let map = LocalsCollector.frame_info(&raised);
        let info = map.lookup("/app/billing.py", "charge", 40).unwrap();
        assert_eq!(info.class_name, "Invoice");
        assert_eq!(info.locals.len(), 1);
        assert_eq!(info.locals[0].name, "amount");
    }

    #[test]
    fn test_frames_without_locals_are_skipped() {
        let raised = RaisedException {
            frames: vec![frame("main", 1, vec![])],
            ..Default::default()
        };
        assert!(LocalsCollector.frame_info(&raised).is_empty());
    }

    #[test]
    fn test_cause_frames_included_and_suppressed_context_skipped() {
        let cause = RaisedException {
            frames: vec![frame("load", 5, vec![("key", LocalValue::Str("k".into()))])],
            ..Default::default()
        };
        let hidden = RaisedException {
            frames: vec![frame("hidden", 9, vec![("x", LocalValue::Int(1))])],
            ..Default::default()
        };

        let with_cause = RaisedException {
            frames: vec![frame("handle", 20, vec![("n", LocalValue::Int(2))])],
            cause: Some(Box::new(cause)),
            ..Default::default()
        };
        let map = LocalsCollector.frame_info(&with_cause);
        assert!(map.get("/app/billing.py/load:5").is_some());
        assert!(map.get("/app/billing.py/handle:20").is_some());

        let suppressed = RaisedException {
            frames: vec![frame("handle", 20, vec![("n", LocalValue::Int(2))])],
            context: Some(Box::new(hidden)),
            suppress_context: true,
            ..Default::default()
        };
        let map = LocalsCollector.frame_info(&suppressed);
        assert!(map.get("/app/billing.py/hidden:9").is_none());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_closure_source() {
        let source = |_: &RaisedException| FrameInfoMap::new();
        assert!(source.frame_info(&RaisedException::default()).is_empty());
    }
}
