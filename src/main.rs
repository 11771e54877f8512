//! Exception Flow CLI
//!
//! Turns the exception tracebacks recorded on trace spans into
//! deduplicated, classified error reports.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use exception_flow::commands::{
    display_schema, display_version, execute_analyze, execute_parse, validate_args,
    validate_report_file, AnalyzeArgs, ParseArgs,
};
use exception_flow::utils::{load_settings, Settings};

/// Exception Flow - error events from span tracebacks
#[derive(Parser, Debug)]
#[command(name = "exception-flow")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Path environment flags shared by analyze and parse
#[derive(Args, Debug)]
struct PathArgs {
    /// Settings TOML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root directory of the traced project
    #[arg(long, env = "PROJECT_ROOT")]
    project_root: Option<String>,

    /// Installed-package root (repeatable)
    #[arg(long = "library-root")]
    library_roots: Vec<String>,

    /// Working directory of the traced process
    #[arg(long)]
    working_directory: Option<PathBuf>,
}

impl PathArgs {
    /// Settings file first, flags on top
    fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => load_settings(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => Settings::default(),
        };

        if let Some(root) = &self.project_root {
            settings.project_root = Some(root.clone());
        }
        if !self.library_roots.is_empty() {
            settings.library_roots = self.library_roots.clone();
        }
        if let Some(dir) = &self.working_directory {
            settings.working_directory = Some(dir.clone());
        }

        Ok(settings)
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a span batch and write an error report
    Analyze {
        /// Span batch JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the JSON report
        #[arg(short, long, default_value = "errors.json")]
        output: PathBuf,

        #[command(flatten)]
        paths: PathArgs,

        /// Deployment environment recorded in the report
        #[arg(long, env = "ENVIRONMENT")]
        environment: Option<String>,

        /// Commit identifier recorded in the report
        #[arg(long, env = "GIT_COMMIT_ID")]
        commit_id: Option<String>,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Parse one traceback file and print its frame stacks
    Parse {
        /// File holding traceback text
        #[arg(short, long)]
        input: PathBuf,

        /// Side-channel JSON file
        #[arg(long)]
        frame_info: Option<PathBuf>,

        /// Span id stamped on the parsed frames
        #[arg(long, default_value = "")]
        span_id: String,

        #[command(flatten)]
        paths: PathArgs,
    },

    /// Validate a report JSON file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Analyze {
            input,
            output,
            paths,
            environment,
            commit_id,
            summary,
        } => {
            let mut settings = paths.settings()?;
            if environment.is_some() {
                settings.environment = environment;
            }
            if commit_id.is_some() {
                settings.commit_id = commit_id;
            }

            let args = AnalyzeArgs {
                input,
                output_json: output,
                settings,
                print_summary: summary,
            };

            // Validate args first
            validate_args(&args)?;

            execute_analyze(args)?;
        }

        Commands::Parse {
            input,
            frame_info,
            span_id,
            paths,
        } => {
            let args = ParseArgs {
                input,
                frame_info,
                span_id,
                settings: paths.settings()?,
            };

            let chain = execute_parse(&args)?;
            println!("{}", serde_json::to_string_pretty(&chain)?);
        }

        Commands::Validate { file } => {
            validate_report_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
