//! Text rendering of check reports.
use crate::check::files::FileRecord;
use crate::check::roles::RoleFile;
use crate::check::{BackendReport, CheckSummary, Findings, FrontendReport, ScriptsReport};
use std::io::{self, Write};

/// Write a `modcheck` summary for humans.
pub fn write_summary(
    out: &mut impl Write,
    module_name: &str,
    summary: &CheckSummary,
) -> io::Result<()> {
    writeln!(out, "module: {module_name}")?;
    if let Some(backend) = summary.backend.as_ref() {
        render_backend(out, backend)?;
    }
    if let Some(frontend) = summary.frontend.as_ref() {
        render_frontend(out, frontend)?;
    }
    if let Some(scripts) = summary.scripts.as_ref() {
        render_scripts(out, scripts)?;
    }
    let status = if summary.has_errors() { "failed" } else { "ok" };
    writeln!(out, "result: {status}")
}

fn render_backend(out: &mut impl Write, report: &BackendReport) -> io::Result<()> {
    writeln!(out, "backend:")?;
    let metadata = &report.metadata;
    writeln!(out, "  label: {}", metadata.label.as_deref().unwrap_or("-"))?;
    if let Some(version) = metadata.version.as_deref() {
        writeln!(out, "  version: {version}")?;
    }
    if let Some(category) = metadata.category.as_deref() {
        writeln!(out, "  category: {category}")?;
    }
    if let Some(module) = report.files.module.as_ref() {
        writeln!(out, "  main: {}", module.path)?;
    }
    render_roles(out, "events", &report.files.events)?;
    render_roles(out, "drivers", &report.files.drivers)?;
    render_roles(out, "formatters", &report.files.formatters)?;
    render_files(out, "libs", &report.files.libs)?;
    render_findings(out, &report.findings)
}

fn render_frontend(out: &mut impl Write, report: &FrontendReport) -> io::Result<()> {
    writeln!(out, "frontend:")?;
    if !report.files.is_empty() {
        writeln!(out, "  files:")?;
        for file in &report.files {
            let usage = file.usage.map(|usage| usage.as_str()).unwrap_or("-");
            writeln!(out, "    - {} [{usage}]", file.path)?;
        }
    }
    render_findings(out, &report.findings)
}

fn render_scripts(out: &mut impl Write, report: &ScriptsReport) -> io::Result<()> {
    writeln!(out, "scripts:")?;
    render_files(out, "files", &report.files)?;
    render_findings(out, &report.findings)
}

fn render_roles(out: &mut impl Write, label: &str, files: &[RoleFile]) -> io::Result<()> {
    if files.is_empty() {
        return Ok(());
    }
    writeln!(out, "  {label}:")?;
    for role in files {
        writeln!(out, "    - {} ({})", role.file.path, role.classname)?;
    }
    Ok(())
}

fn render_files(out: &mut impl Write, label: &str, files: &[FileRecord]) -> io::Result<()> {
    if files.is_empty() {
        return Ok(());
    }
    writeln!(out, "  {label}:")?;
    for file in files {
        writeln!(out, "    - {}", file.path)?;
    }
    Ok(())
}

fn render_findings(out: &mut impl Write, findings: &Findings) -> io::Result<()> {
    for error in &findings.errors {
        writeln!(out, "  error: {error}")?;
    }
    for warning in &findings.warnings {
        writeln!(out, "  warning: {warning}")?;
    }
    Ok(())
}
