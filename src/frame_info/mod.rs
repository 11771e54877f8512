//! Frame-info side channel.
//!
//! This module handles:
//! - The frame-identity-keyed statistics map consumed by the parser
//! - Decoding the map from the JSON string recorded with an exception
//! - Building the map from a live raised exception

pub mod collector;
pub mod schema;

// Re-export main types
pub use collector::{FrameInfoSource, LiveFrame, LocalValue, LocalsCollector, RaisedException};
pub use schema::{frame_key, FrameInfo, FrameInfoMap, LocalStats};
