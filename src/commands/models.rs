use crate::utils::Settings;
use std::path::PathBuf;

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// Span batch JSON file
    pub input: PathBuf,

    /// Output path for the JSON report
    pub output_json: PathBuf,

    /// Path environment, ignore list and report header values
    pub settings: Settings,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_json: PathBuf::from("errors.json"),
            settings: Settings::default(),
            print_summary: false,
        }
    }
}

/// Arguments for the parse command
#[derive(Debug, Clone, Default)]
pub struct ParseArgs {
    /// File holding traceback text
    pub input: PathBuf,

    /// Side-channel JSON file (optional)
    pub frame_info: Option<PathBuf>,

    /// Span id stamped on the parsed frames
    pub span_id: String,

    pub settings: Settings,
}
