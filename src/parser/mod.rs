//! Traceback parsing and schema definitions.
//!
//! This module handles:
//! - Splitting a chained traceback into one block per exception
//! - Extracting frames, source lines and captured locals
//! - Attaching side-channel statistics to kept frames
//! - Defining the frame stack schema

pub mod schema;
pub mod traceback;

// Re-export main types
pub use schema::{ExceptionChain, FrameStack, StackFrame};
pub use traceback::{parse_exception_chain, ParseOptions};
