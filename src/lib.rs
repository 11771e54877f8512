//! Exception Flow
//!
//! Structured, deduplicated error events from the textual exception
//! tracebacks recorded on distributed-trace spans.
//!
//! This crate provides the core implementation for the
//! `exception-flow` CLI tool.
//!
//! ## Pipeline
//!
//! 1. [`parser`] turns traceback text into frame stacks, one per chained exception
//! 2. [`spans`] links the spans of a batch into parent-rooted trees
//! 3. [`aggregator`] collapses repeated sightings into error events and
//!    classifies each as handled or escaped
//!
//! ```ignore
//! use exception_flow::aggregator::{process_batch, BatchOptions};
//!
//! let events = process_batch(batch, &BatchOptions::default())?;
//! ```

pub mod aggregator;
pub mod commands;
pub mod frame_info;
pub mod output;
pub mod parser;
pub mod paths;
pub mod spans;
pub mod utils;
