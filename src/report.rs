//! Rendering of audit results for the command line.
use crate::audit::{AuditReport, InspectedPart, ThemeInspection};
use crate::error::Result;
use std::fmt::Write;

/// Output format of [`render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

pub fn render(report: &AuditReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(render_text(report)),
        ReportFormat::Json => render_json(report),
    }
}

/// One block per part, then a summary line.
///
/// ```text
/// == /_rels/.rels
/// [OK] no problems found
///
/// 1 part(s) checked: 0 error(s), 0 warning(s)
/// ```
pub fn render_text(report: &AuditReport) -> String {
    let mut out = String::new();
    for part in &report.parts {
        let _ = writeln!(out, "== {}", part.subject);
        for diagnostic in &part.diagnostics {
            let _ = writeln!(out, "{}", diagnostic);
        }
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "{} part(s) checked: {} error(s), {} warning(s)",
        report.parts.len(),
        report.error_count(),
        report.warning_count()
    );
    out
}

pub fn render_json(report: &AuditReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn render_inspection(inspection: &ThemeInspection) -> String {
    let mut out = String::new();
    for theme in &inspection.themes {
        write_inspected(&mut out, "theme", theme);
    }
    match &inspection.variant_manager {
        Some(manager) => write_inspected(&mut out, "variant manager", manager),
        None => out.push_str("== no variant manager found\n"),
    }
    out
}

fn write_inspected(out: &mut String, label: &str, part: &InspectedPart) {
    let _ = writeln!(out, "== {}: {}", label, part.path.display());
    if let Some(failure) = &part.failure {
        let _ = writeln!(out, "{}", failure);
    } else if part.fragments.is_empty() {
        out.push_str("(no extLst)\n");
    }
    for fragment in &part.fragments {
        let _ = writeln!(out, "{}", fragment);
    }
    out.push('\n');
}
