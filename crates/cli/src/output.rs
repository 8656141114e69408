//! Output formatting for CLI

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use quotecheck_harness::RunReport;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// Plain text format
    Plain,
}

/// Print the run report to stdout.
pub fn print_report(report: &RunReport, format: OutputFormat) {
    match format {
        OutputFormat::Table => print_table(report),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
        }
        OutputFormat::Plain => print_plain(report),
    }
}

fn print_table(report: &RunReport) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Step", "At (ms)"]);

    for step in &report.steps {
        table.add_row(vec![
            step.step.to_string(),
            step.label.clone(),
            step.ms.to_string(),
        ]);
    }
    if let Some(failed) = &report.failed {
        table.add_row(vec![
            failed
                .step
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
            format!("FAILED {}", failed.label.as_deref().unwrap_or("startup")),
            "-".to_string(),
        ]);
    }

    println!("{table}");
    print_summary(report);
}

fn print_plain(report: &RunReport) {
    for step in &report.steps {
        println!("{:>3}  {:<55} {:>7} ms", step.step, step.label, step.ms);
    }
    if let Some(failed) = &report.failed {
        println!(
            "  ✗  {}: {}",
            failed.label.as_deref().unwrap_or("startup"),
            failed.error
        );
    }
    print_summary(report);
}

fn print_summary(report: &RunReport) {
    if report.ok {
        if let Some(capture) = &report.capture {
            println!(
                "✓ verified in {} ms - review {} ({}x{}, sha256 {})",
                report.duration_ms,
                capture.path.display(),
                capture.width,
                capture.height,
                &capture.sha256[..12]
            );
            if capture.uniform {
                println!("  note: the screenshot is a single flat color");
            }
        }
    } else if let Some(failed) = &report.failed {
        println!("✗ failed after {} ms: {}", report.duration_ms, failed.error);
    }
}
