//! Configuration and constants for the library and CLI.

/// Current output schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Language reported in the error report header
pub const PROGRAMMING_LANGUAGE: &str = "python";

/// Upper bound on parent/child chain length before a batch is rejected
pub const DEFAULT_MAX_FOREST_DEPTH: usize = 512;

// Traceback line grammar
pub const TRACEBACK_HEADER: &str = "Traceback (most recent call last):";
pub const RERAISE_KEYWORD: &str = "raise";

/// Local names that never become frame parameters (receiver/placeholder bindings)
pub const EXCLUDED_PARAMETERS: &[&str] = &["self", "_"];

/// Local name whose value identifies the enclosing class in the side channel
pub const RECEIVER_LOCAL: &str = "self";

// Frames recorded by the tracing library itself while recording the exception.
// These are instrumentation artifacts, not user code.
pub const DEFAULT_IGNORED_PATH_PREFIXES: &[&str] = &[
    "opentelemetry/trace/__init__.py",
    "opentelemetry/sdk/trace/__init__.py",
];

/// Runtime-level exception types; raising one of these without an explicit
/// `raise` marks the stack as unexpected.
pub const BUILT_IN_EXCEPTIONS: &[&str] = &[
    "SystemExit",
    "KeyboardInterrupt",
    "GeneratorExit",
    "StopIteration",
    "StopAsyncIteration",
    "ArithmeticError",
    "FloatingPointError",
    "OverflowError",
    "ZeroDivisionError",
    "AssertionError",
    "AttributeError",
    "BufferError",
    "EOFError",
    "ImportError",
    "ModuleNotFoundError",
    "LookupError",
    "IndexError",
    "KeyError",
    "MemoryError",
    "NameError",
    "UnboundLocalError",
    "BlockingIOError",
    "ChildProcessError",
    "ConnectionResetError",
    "FileExistsError",
    "FileNotFoundError",
    "InterruptedError",
    "IsADirectoryError",
    "NotADirectoryError",
    "PermissionError",
    "ProcessLookupError",
    "ReferenceError",
    "RuntimeError",
    "NotImplementedError",
    "RecursionError",
    "SyntaxError",
    "IndentationError",
    "TabError",
    "SystemError",
    "TypeError",
    "ValueError",
    "UnicodeError",
    "UnicodeDecodeError",
    "UnicodeEncodeError",
    "UnicodeTranslateError",
];

/// Check whether an exception type name is a runtime built-in
pub fn is_builtin_exception(exception_type: &str) -> bool {
    BUILT_IN_EXCEPTIONS.contains(&exception_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_builtin_exception() {
        assert!(is_builtin_exception("ZeroDivisionError"));
        assert!(is_builtin_exception("KeyError"));
        assert!(!is_builtin_exception("EnvironmentError"));
        assert!(!is_builtin_exception("myapp.errors.PaymentDeclined"));
    }
}
