//! Traceback text parser.
//!
//! Scans the printed form of a (possibly chained) exception line by line and
//! rebuilds one [`FrameStack`] per `Traceback (most recent call last):` block:
//!
//! ```text
//! Traceback (most recent call last):
//!   File "<path>", line <N>, in <function>
//!     <source line>
//!     <name> = <value>
//!   [Previous line repeated <K> more times]
//! <ExceptionType>: <message>
//! ```
//!
//! Parsing is best effort. Lines that fit no expected shape are skipped and
//! an unterminated block is dropped; nothing here returns an error.

use super::schema::{ExceptionChain, FrameStack, StackFrame};
use crate::frame_info::FrameInfoMap;
use crate::paths::PathNormalizer;
use crate::utils::config::{
    is_builtin_exception, DEFAULT_IGNORED_PATH_PREFIXES, EXCLUDED_PARAMETERS, RERAISE_KEYWORD,
    TRACEBACK_HEADER,
};
use log::{debug, trace, warn};
use regex::Regex;
use std::sync::LazyLock;

/// Inputs the parser needs besides the text itself
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub normalizer: PathNormalizer,

    /// Frames whose normalized path starts with one of these are dropped
    pub ignored_path_prefixes: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            normalizer: PathNormalizer::default(),
            ignored_path_prefixes: DEFAULT_IGNORED_PATH_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl ParseOptions {
    fn is_ignored(&self, normalized_path: &str) -> bool {
        self.ignored_path_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && normalized_path.starts_with(prefix.as_str()))
    }
}

/// Compiled line shapes.
struct LinePatterns {
    /// `  File "<path>", line <N>, in <function>`
    frame_header: Regex,
    /// `    <identifier> = <value>`
    assignment: Regex,
    /// `    <anything>`
    indented: Regex,
    /// `  [Previous line repeated <K> more time(s)]`
    repeat: Regex,
    /// `raise` as a whole word
    reraise: Regex,
}

fn build_patterns() -> Option<LinePatterns> {
    Some(LinePatterns {
        frame_header: Regex::new(r#"^\s\sFile "(.+)", line ([0-9]+), in (.+)$"#).ok()?,
        assignment: Regex::new(r"^\s{4}([A-Za-z_][A-Za-z0-9_]*) = (.*)$").ok()?,
        indented: Regex::new(r"^\s{4}(.+)$").ok()?,
        repeat: Regex::new(r"^\s\s\[Previous line repeated ([0-9]+) more times?\]$").ok()?,
        reraise: Regex::new(&format!(r"\b{}\b", RERAISE_KEYWORD)).ok()?,
    })
}

static PATTERNS: LazyLock<Option<LinePatterns>> = LazyLock::new(build_patterns);

/// What a single line looks like
#[derive(Debug, PartialEq, Eq)]
enum LineShape<'a> {
    ChainStart,
    FrameHeader {
        path: &'a str,
        line: u32,
        function: &'a str,
    },
    Assignment {
        name: &'a str,
        value: &'a str,
    },
    SourceText(&'a str),
    Repeat(u32),
    /// Flush-left text: the exception line of a block, or chain glue
    Unindented(&'a str),
    /// Indented text fitting no frame shape
    Unknown,
}

fn classify<'a>(patterns: &LinePatterns, line: &'a str) -> LineShape<'a> {
    if line == TRACEBACK_HEADER {
        return LineShape::ChainStart;
    }

    if let Some(caps) = patterns.frame_header.captures(line) {
        let (Some(path), Some(number), Some(function)) = (caps.get(1), caps.get(2), caps.get(3))
        else {
            return LineShape::Unknown;
        };
        return match number.as_str().parse::<u32>() {
            Ok(n) if n > 0 => LineShape::FrameHeader {
                path: path.as_str().trim(),
                line: n,
                function: function.as_str().trim(),
            },
            _ => LineShape::Unknown,
        };
    }

    if let Some(caps) = patterns.repeat.captures(line) {
        return caps
            .get(1)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .map_or(LineShape::Unknown, LineShape::Repeat);
    }

    if let Some(caps) = patterns.assignment.captures(line) {
        if let (Some(name), Some(value)) = (caps.get(1), caps.get(2)) {
            return LineShape::Assignment {
                name: name.as_str(),
                value: value.as_str().trim(),
            };
        }
    }

    if let Some(caps) = patterns.indented.captures(line) {
        if let Some(text) = caps.get(1) {
            return LineShape::SourceText(text.as_str().trim());
        }
    }

    if line.starts_with(char::is_whitespace) {
        LineShape::Unknown
    } else {
        LineShape::Unindented(line)
    }
}

/// Scan states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Outside any block, waiting for `Traceback (most recent call last):`
    SeekingChainStart,
    /// Block opened, no frame header seen yet
    ReadingFrameHeader,
    /// Inside a frame; the source line is still possible when `source_open`
    ReadingFrameBody { source_open: bool },
    /// Frame closed by a repeat marker; another header or the exception line follows
    ExpectingTerminalLine,
}

/// Parse an exception's traceback text into its frame stacks
///
/// **Public** - main entry point for parsing
///
/// # Arguments
/// * `text` - Traceback text as printed by the interpreter
/// * `origin_span_id` - Span the exception was recorded on; stamped on every frame
/// * `frame_info` - Side-channel statistics keyed by frame identity
/// * `options` - Path normalization and ignored prefixes
///
/// # Returns
/// One frame stack per traceback block, earliest cause first. Empty when the
/// text holds no complete block.
pub fn parse_exception_chain(
    text: &str,
    origin_span_id: &str,
    frame_info: &FrameInfoMap,
    options: &ParseOptions,
) -> ExceptionChain {
    let Some(patterns) = PATTERNS.as_ref() else {
        warn!("Traceback line patterns failed to compile, skipping parse");
        return Vec::new();
    };

    let mut scanner = Scanner {
        options,
        frame_info,
        origin_span_id,
        state: ScanState::SeekingChainStart,
        frames: Vec::new(),
        pending: None,
        stacks: Vec::new(),
    };

    let mut previous: Option<&str> = None;
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            previous = Some(line);
            continue;
        }
        scanner.feed(index, classify(patterns, line), previous, patterns);
        previous = Some(line);
    }

    if scanner.state != ScanState::SeekingChainStart {
        debug!("Traceback text ended inside an unterminated block, dropping it");
    }

    debug!("Parsed {} frame stacks", scanner.stacks.len());
    scanner.stacks
}

struct Scanner<'a> {
    options: &'a ParseOptions,
    frame_info: &'a FrameInfoMap,
    origin_span_id: &'a str,
    state: ScanState,
    /// Frames kept so far in the current block
    frames: Vec<StackFrame>,
    /// Frame being read, with its raw path; kept or dropped when it closes
    pending: Option<(String, StackFrame)>,
    stacks: Vec<FrameStack>,
}

impl Scanner<'_> {
    fn feed(
        &mut self,
        index: usize,
        shape: LineShape<'_>,
        previous: Option<&str>,
        patterns: &LinePatterns,
    ) {
        match (self.state, shape) {
            (_, LineShape::ChainStart) => {
                if self.state != ScanState::SeekingChainStart {
                    debug!("Line {}: new traceback before exception line, restarting block", index + 1);
                }
                self.start_block();
            }

            (ScanState::SeekingChainStart, _) => {}

            (_, LineShape::FrameHeader { path, line, function }) => {
                self.close_frame();
                self.open_frame(path, line, function);
                self.state = ScanState::ReadingFrameBody { source_open: true };
            }

            (ScanState::ReadingFrameBody { source_open }, LineShape::SourceText(text)) => {
                if source_open {
                    if let Some((_, frame)) = self.pending.as_mut() {
                        frame.executed_code = Some(text.to_string());
                    }
                } else {
                    trace!("Line {}: unexpected indented text, skipped", index + 1);
                }
                self.state = ScanState::ReadingFrameBody { source_open: false };
            }

            // The line right after a header is source text, whatever its shape
            (
                ScanState::ReadingFrameBody { source_open: true },
                LineShape::Assignment { name, value },
            ) => {
                if let Some((_, frame)) = self.pending.as_mut() {
                    frame.executed_code = Some(format!("{} = {}", name, value));
                }
                self.state = ScanState::ReadingFrameBody { source_open: false };
            }

            (ScanState::ReadingFrameBody { .. }, LineShape::Assignment { name, value }) => {
                if let Some((_, frame)) = self.pending.as_mut() {
                    if !EXCLUDED_PARAMETERS.contains(&name) {
                        frame.parameters.insert(name.to_string(), value.to_string());
                    }
                }
                self.state = ScanState::ReadingFrameBody { source_open: false };
            }

            (ScanState::ReadingFrameBody { .. }, LineShape::Repeat(count)) => {
                if let Some((_, frame)) = self.pending.as_mut() {
                    frame.repeat = count;
                }
                self.state = ScanState::ExpectingTerminalLine;
            }

            (
                ScanState::ReadingFrameBody { .. } | ScanState::ExpectingTerminalLine,
                LineShape::Unindented(line),
            ) => {
                let raised_explicitly = previous.is_some_and(|p| patterns.reraise.is_match(p));
                self.finish_block(line, raised_explicitly);
            }

            (_, _) => {
                trace!("Line {}: no expected shape in state {:?}, skipped", index + 1, self.state);
            }
        }
    }

    fn start_block(&mut self) {
        self.frames.clear();
        self.pending = None;
        self.state = ScanState::ReadingFrameHeader;
    }

    fn open_frame(&mut self, raw_path: &str, line: u32, function: &str) {
        let normalized = self.options.normalizer.normalize(raw_path);
        let mut frame = StackFrame::new(normalized, line, function);
        frame.stamp(self.origin_span_id);
        self.pending = Some((raw_path.to_string(), frame));
    }

    /// Keep or drop the frame being read
    fn close_frame(&mut self) {
        let Some((raw_path, mut frame)) = self.pending.take() else {
            return;
        };

        if self.options.is_ignored(&frame.module_path) {
            trace!("Dropping ignored frame {}", frame.module_path);
            return;
        }

        if let Some(info) = self
            .frame_info
            .lookup(&raw_path, &frame.function, frame.line_number)
        {
            frame.class_name = info.class_name.clone();
            frame.parameter_stats = info.locals.clone();
        }

        self.frames.push(frame);
    }

    /// Close the block with its `<ExceptionType>: <message>` line
    fn finish_block(&mut self, line: &str, raised_explicitly: bool) {
        self.close_frame();
        self.state = ScanState::SeekingChainStart;

        if self.frames.is_empty() {
            debug!("Every frame of a traceback block was ignored, dropping it");
            return;
        }

        let (exception_type, exception_message) = match line.split_once(':') {
            Some((kind, message)) => (kind.trim(), message.trim()),
            None => (line.trim(), ""),
        };

        self.stacks.push(FrameStack {
            frames: std::mem::take(&mut self.frames),
            exception_type: exception_type.to_string(),
            exception_message: exception_message.to_string(),
            unexpected: is_builtin_exception(exception_type) && !raised_explicitly,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> &'static LinePatterns {
        PATTERNS.as_ref().unwrap()
    }

    #[test]
    fn test_classify_lines() {
        let p = patterns();
        assert_eq!(classify(p, TRACEBACK_HEADER), LineShape::ChainStart);
        assert_eq!(
            classify(p, r#"  File "/app/a.py", line 7, in run"#),
            LineShape::FrameHeader {
                path: "/app/a.py",
                line: 7,
                function: "run"
            }
        );
        assert_eq!(
            classify(p, "    count = 3"),
            LineShape::Assignment {
                name: "count",
                value: "3"
            }
        );
        assert_eq!(
            classify(p, "    return self.total / count"),
            LineShape::SourceText("return self.total / count")
        );
        assert_eq!(
            classify(p, "  [Previous line repeated 996 more times]"),
            LineShape::Repeat(996)
        );
        assert_eq!(
            classify(p, "  [Previous line repeated 1 more time]"),
            LineShape::Repeat(1)
        );
        assert_eq!(
            classify(p, "KeyError: 'sku'"),
            LineShape::Unindented("KeyError: 'sku'")
        );
        assert_eq!(classify(p, "  something odd"), LineShape::Unknown);
    }

    #[test]
    fn test_line_zero_is_not_a_header() {
        assert_eq!(
            classify(patterns(), r#"  File "/app/a.py", line 0, in run"#),
            LineShape::Unknown
        );
    }

    #[test]
    fn test_attribute_assignment_is_source_text() {
        assert_eq!(
            classify(patterns(), "    self.total = 0"),
            LineShape::SourceText("self.total = 0")
        );
    }

    #[test]
    fn test_terminal_line_without_colon() {
        let text = "Traceback (most recent call last):\n  File \"/app/a.py\", line 2, in main\n    loop()\nKeyboardInterrupt\n";
        let chain = parse_exception_chain(text, "", &FrameInfoMap::new(), &ParseOptions::default());
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].exception_type, "KeyboardInterrupt");
        assert_eq!(chain[0].exception_message, "");
    }

    #[test]
    fn test_message_keeps_later_colons() {
        let text = "Traceback (most recent call last):\n  File \"/app/a.py\", line 2, in main\n    connect()\nConnectionError: host: db:5432 refused\n";
        let chain = parse_exception_chain(text, "", &FrameInfoMap::new(), &ParseOptions::default());
        assert_eq!(chain[0].exception_message, "host: db:5432 refused");
    }
}
