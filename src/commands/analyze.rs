//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Reads a span batch
//! 2. Parses every recorded exception
//! 3. Links spans into a forest and deduplicates errors
//! 4. Writes the JSON report

use super::models::AnalyzeArgs;
use crate::aggregator::{process_batch, ErrorEvent};
use crate::output::{write_report, ErrorReport};
use crate::spans::SpanBatch;
use anyhow::{Context, Result};
use colored::*;
use log::{debug, info};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Batch file cannot be read or decoded
/// * Span linkage is structurally invalid (no report is written)
/// * Report cannot be written
pub fn execute_analyze(args: AnalyzeArgs) -> Result<ErrorReport> {
    let start_time = Instant::now();

    info!("Analyzing span batch: {}", args.input.display());

    info!("Step 1/3: Reading span batch...");
    let batch = read_batch(&args.input)
        .with_context(|| format!("Failed to read span batch {}", args.input.display()))?;

    debug!(
        "Batch: {} spans, {} shared side-channel entries",
        batch.spans.len(),
        batch.frame_info.len()
    );

    info!("Step 2/3: Parsing and deduplicating exceptions...");
    let options = args.settings.batch_options();
    let events = process_batch(batch, &options).context("Span batch is structurally invalid")?;

    info!("Step 3/3: Writing report...");
    let report = ErrorReport::new(
        events,
        args.settings.environment.clone(),
        args.settings.commit_id.clone(),
    );
    info!("Errors: {}", report.summary.summary());

    write_report(&report, &args.output_json).context("Failed to write report JSON")?;

    info!("✓ Report written to: {}", args.output_json.display());

    if args.print_summary {
        println!("{}", render_summary(&report));
    }

    let elapsed = start_time.elapsed();
    info!("Analysis completed in {:.2}s", elapsed.as_secs_f64());

    Ok(report)
}

/// Read a span batch from a JSON file
pub fn read_batch(path: &Path) -> Result<SpanBatch> {
    let file = File::open(path).context("Cannot open batch file")?;
    let batch = serde_json::from_reader(BufReader::new(file)).context("Invalid batch JSON")?;
    Ok(batch)
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    if args.input.as_os_str().is_empty() {
        anyhow::bail!("Input batch file cannot be empty");
    }

    if !args.input.is_file() {
        anyhow::bail!("Input batch file not found: {}", args.input.display());
    }

    if args.output_json.is_dir() {
        anyhow::bail!(
            "Output path is a directory: {}",
            args.output_json.display()
        );
    }

    args.settings.validate()?;

    Ok(())
}

/// Render the terminal summary of a report
pub fn render_summary(report: &ErrorReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", "=".repeat(80)));
    out.push_str(&"ERROR SUMMARY".bold().to_string());
    out.push_str(&format!("\n{}\n", "=".repeat(80)));
    out.push_str(&format!("Distinct errors: {}\n", report.summary.total));
    out.push_str(&format!(
        "Handled:         {}\n",
        report.summary.handled.to_string().green()
    ));
    out.push_str(&format!(
        "Escaped:         {}\n",
        report.summary.escaped.to_string().red()
    ));
    out.push_str(&format!(
        "Unexpected:      {}\n",
        report.summary.unexpected.to_string().yellow()
    ));

    if !report.events.is_empty() {
        out.push('\n');
        for event in &report.events {
            out.push_str(&format!("  {}\n", render_event_line(event)));
        }
    }

    out.push_str(&"=".repeat(80));
    out
}

fn render_event_line(event: &ErrorEvent) -> String {
    let status = if event.handled {
        "handled".green()
    } else {
        "escaped".red().bold()
    };
    let spans = event.span_ids().len();
    format!(
        "[{}] {}: {} ({} span{})",
        status,
        event.name,
        event.exception_message,
        spans,
        if spans == 1 { "" } else { "s" }
    )
}
