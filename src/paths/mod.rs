//! Source path normalization.
//!
//! Frame paths are machine-specific (virtualenv locations, checkout
//! directories). This module maps them onto stable identifiers.

pub mod normalizer;

pub use normalizer::{NormalizerEnv, PathNormalizer, Resolution};
