//! Markdown rendering of the autofill report.
//!
//! The report is an audit trail of what the sample told us about each column.
//! It is written next to the mapping files and never read back.

use super::mapping::MappingRecord;
use super::reconcile::ColumnHint;
use std::collections::HashSet;

/// Render the two-column (column, inferred hint) report for a kind.
pub fn render_autofill_report(kind: &str, hints: &[ColumnHint], required: &[MappingRecord]) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Autofill Report: {kind}\n\n"));
    md.push_str(&format!(
        "> **Generated:** {}  \n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    md.push_str(&format!("> **Sample Columns:** {}  \n\n", hints.len()));

    md.push_str("| Column | Inferred Format |\n");
    md.push_str("|--------|-----------------|\n");
    for hint in hints {
        md.push_str(&format!(
            "| `{}` | {} |\n",
            hint.original_name, hint.format_hint
        ));
    }
    md.push('\n');

    let sampled: HashSet<&str> = hints.iter().map(|h| h.original_name.as_str()).collect();
    let declared: HashSet<&str> = required.iter().map(|r| r.original_name.as_str()).collect();

    let sample_only: Vec<&str> = hints
        .iter()
        .map(|h| h.original_name.as_str())
        .filter(|name| !declared.contains(name))
        .collect();

    let unsampled: Vec<&str> = required
        .iter()
        .map(|r| r.original_name.as_str())
        .filter(|name| !sampled.contains(name))
        .collect();

    if !sample_only.is_empty() {
        md.push_str("## Not in Required Mapping\n\n");
        for name in &sample_only {
            md.push_str(&format!("- `{name}`\n"));
        }
        md.push('\n');
    }

    if !unsampled.is_empty() {
        md.push_str("## Absent from Sample\n\n");
        md.push_str("*No format could be inferred for these columns.*\n\n");
        for name in &unsampled {
            md.push_str(&format!("- `{name}`\n"));
        }
        md.push('\n');
    }

    md
}
