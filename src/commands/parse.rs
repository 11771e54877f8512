//! Parse command implementation.
//!
//! Parses a single traceback file and prints the frame stacks as JSON.
//! Useful for checking how a traceback will be read before it ships.

use super::models::ParseArgs;
use crate::frame_info::FrameInfoMap;
use crate::parser::{parse_exception_chain, ExceptionChain, ParseOptions};
use crate::paths::PathNormalizer;
use anyhow::{Context, Result};
use log::info;
use std::fs;

/// Execute the parse command
pub fn execute_parse(args: &ParseArgs) -> Result<ExceptionChain> {
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read traceback file {}", args.input.display()))?;

    let frame_info = match &args.frame_info {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read side-channel file {}", path.display()))?;
            FrameInfoMap::from_json(&json).context("Invalid side-channel JSON")?
        }
        None => FrameInfoMap::new(),
    };

    let options = ParseOptions {
        normalizer: PathNormalizer::new(args.settings.normalizer_env()),
        ignored_path_prefixes: args.settings.ignored_path_prefixes.clone(),
    };

    let chain = parse_exception_chain(&text, &args.span_id, &frame_info, &options);
    info!(
        "Parsed {} frame stacks ({} frames)",
        chain.len(),
        chain.iter().map(|s| s.frames.len()).sum::<usize>()
    );

    Ok(chain)
}
