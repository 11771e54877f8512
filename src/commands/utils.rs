use crate::output::read_report;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Validate a report JSON file
pub fn validate_report_file(file_path: PathBuf) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(&file_path).context("Not a valid error report")?;

    if report.summary.total != report.events.len() {
        anyhow::bail!(
            "Summary total {} does not match {} events",
            report.summary.total,
            report.events.len()
        );
    }

    println!("✓ Valid error report JSON");
    println!("  Version: {}", report.version);
    println!("  Generated: {}", report.generated_at);
    println!("  Events: {}", report.events.len());
    println!("  Handled: {}", report.summary.handled);
    println!("  Escaped: {}", report.summary.escaped);

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("Exception Flow Report Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string              - Schema version (e.g., '1.0.0')");
        println!("  generated_at: string         - ISO 8601 timestamp");
        println!("  environment: string?         - Deployment environment");
        println!("  commit_id: string?           - Source revision");
        println!("  programming_language: string - Always 'python'");
        println!("  summary: object              - Event counts");
        println!("    total, handled, escaped, unexpected: number");
        println!("    by_type: object            - Events per exception type");
        println!("  events: array                - Deduplicated error events");
        println!("    name: string               - '<Type> from <function>'");
        println!("    exception_type: string");
        println!("    exception_message: string");
        println!("    exception_stack: string    - Traceback text of the first sighting");
        println!("    stacks: array              - Causes first, own stack last");
        println!("      frames: array            - Outermost call first");
        println!("      unexpected: bool         - Built-in exception not raised explicitly");
        println!("    handled: bool              - Never reached a server span");
        println!("    first_span_id: string");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("Exception Flow v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Structured, deduplicated error events from span tracebacks.");
}
