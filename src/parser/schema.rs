//! Frame stack data model.
//!
//! These are the structures the parser produces and the error events carry
//! into the report.

use crate::frame_info::LocalStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One call site in a traceback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Normalized source path
    pub module_path: String,

    pub line_number: u32,

    /// Function or method name
    pub function: String,

    /// Source text of the executed line, absent for generated code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_code: Option<String>,

    /// Additional consecutive occurrences elided by the interpreter
    #[serde(default)]
    pub repeat: u32,

    /// Captured locals as rendered in the traceback
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,

    /// Enclosing class, empty when unknown
    #[serde(default)]
    pub class_name: String,

    /// Side-channel statistics, empty without a side-channel match
    #[serde(default)]
    pub parameter_stats: Vec<LocalStats>,

    /// Spans this frame was observed in, first sighting first
    #[serde(default)]
    pub span_ids: Vec<String>,
}

impl StackFrame {
    pub fn new(module_path: impl Into<String>, line_number: u32, function: impl Into<String>) -> Self {
        Self {
            module_path: module_path.into(),
            line_number,
            function: function.into(),
            executed_code: None,
            repeat: 0,
            parameters: BTreeMap::new(),
            class_name: String::new(),
            parameter_stats: Vec::new(),
            span_ids: Vec::new(),
        }
    }

    /// Same call site with the same captured state
    ///
    /// Compares path, executed line, line number and parameters. Repeat
    /// counts, side-channel data and stamps do not take part.
    pub fn same_site(&self, other: &StackFrame) -> bool {
        self.module_path == other.module_path
            && self.executed_code == other.executed_code
            && self.line_number == other.line_number
            && self.parameters == other.parameters
    }

    /// Record that this frame was observed in `span_id`
    pub fn stamp(&mut self, span_id: &str) {
        if span_id.is_empty() || self.span_ids.iter().any(|id| id == span_id) {
            return;
        }
        self.span_ids.push(span_id.to_string());
    }
}

/// All frames of one raised exception, outermost call first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameStack {
    pub frames: Vec<StackFrame>,

    pub exception_type: String,

    pub exception_message: String,

    /// Built-in exception raised by the runtime rather than by a `raise`
    pub unexpected: bool,
}

impl FrameStack {
    /// The failure point
    pub fn innermost(&self) -> Option<&StackFrame> {
        self.frames.last()
    }
}

/// Chained exceptions, earliest cause first
pub type ExceptionChain = Vec<FrameStack>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_site_ignores_stamps_and_stats() {
        let mut a = StackFrame::new("app/x.py", 3, "f");
        let mut b = a.clone();
        a.stamp("s1");
        b.repeat = 4;
        b.class_name = "Worker".to_string();
        assert!(a.same_site(&b));

        b.parameters.insert("n".to_string(), "0".to_string());
        assert!(!a.same_site(&b));
    }

    #[test]
    fn test_stamp_is_duplicate_free() {
        let mut frame = StackFrame::new("app/x.py", 3, "f");
        frame.stamp("s1");
        frame.stamp("s2");
        frame.stamp("s1");
        frame.stamp("");
        assert_eq!(frame.span_ids, vec!["s1", "s2"]);
    }
}
