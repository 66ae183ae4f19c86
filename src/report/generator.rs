//! Markdown and JSON report generation.
//!
//! This module renders a finished analysis session: its metadata, the
//! steps that were executed with their results, the plan in effect at the
//! end, and the final recommendations.

use crate::models::{numbered, PastStep, ReportMetadata, SessionReport};
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &SessionReport) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Codebase Analysis Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_steps_section(&report.past_steps));
    output.push_str(&generate_plan_section(&report.final_plan));
    output.push_str(&generate_recommendations_section(&report.response));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Query:** {}\n", metadata.objective));
    section.push_str(&format!("- **Workspace:** `{}`\n", metadata.workspace));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model_used));
    section.push_str(&format!(
        "- **Steps Executed:** {}\n",
        metadata.steps_executed
    ));
    section.push_str(&format!("- **Transitions:** {}\n", metadata.transitions));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &SessionReport) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Executed Steps](#executed-steps)\n");
    if !report.final_plan.is_empty() {
        toc.push_str("- [Final Plan](#final-plan)\n");
    }
    toc.push_str("- [Recommendations](#recommendations)\n");
    toc.push('\n');

    toc
}

/// Generate the executed steps section, in execution order.
fn generate_steps_section(steps: &[PastStep]) -> String {
    let mut section = String::new();

    section.push_str("## Executed Steps\n\n");

    if steps.is_empty() {
        section.push_str("No steps were executed.\n\n");
        return section;
    }

    for (i, past) in steps.iter().enumerate() {
        section.push_str(&format!("### {}. {}\n\n", i + 1, past.step));
        section.push_str(past.result.trim());
        section.push_str("\n\n");
    }

    section
}

/// Generate the final plan section.
fn generate_plan_section(plan: &[String]) -> String {
    if plan.is_empty() {
        return String::new();
    }

    format!("## Final Plan\n\n{}\n\n", numbered(plan))
}

/// Generate the recommendations section from the final response.
fn generate_recommendations_section(response: &str) -> String {
    let mut section = String::new();

    section.push_str("## Recommendations\n\n");
    if response.trim().is_empty() {
        section.push_str("*No final response was produced.*\n\n");
    } else {
        section.push_str(response.trim());
        section.push_str("\n\n");
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    format!(
        "---\n\n*Report generated by cursor-extend v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Generate a JSON report.
pub fn generate_json_report(report: &SessionReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write `content` to `path`.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
