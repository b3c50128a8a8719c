use std::collections::BTreeMap;
use std::fmt::Write;

use crate::models::{AuditIssue, IssueKind, ScanResult, Severity};

/// Render a Markdown report.
pub fn render(result: &ScanResult) -> String {
    let mut out = String::new();

    out.push_str("# License Audit Report\n\n");
    let _ = writeln!(
        out,
        "**Generated:** {}  ",
        result.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "**Scan Path:** {}\n", result.scan_path);

    out.push_str("## Summary\n\n");
    let _ = writeln!(
        out,
        "- **Total Dependencies:** {}",
        result.summary.total_dependencies
    );
    let _ = writeln!(out, "- **Issues Found:** {}\n", result.issues.len());

    breakdown_table(
        &mut out,
        "License Distribution",
        "License",
        &result.summary.license_breakdown,
    );
    breakdown_table(
        &mut out,
        "Package Types",
        "Package Type",
        &result.summary.package_breakdown,
    );

    if !result.issues.is_empty() {
        out.push_str("## Issues\n\n");
        for (severity, heading) in [
            (Severity::Error, "🚨 Errors"),
            (Severity::Warning, "⚠️ Warnings"),
            (Severity::Info, "ℹ️ Info"),
        ] {
            let issues: Vec<&AuditIssue> = result
                .issues
                .iter()
                .filter(|i| i.severity == severity)
                .collect();
            if !issues.is_empty() {
                let _ = writeln!(out, "### {}\n", heading);
                for issue in issues {
                    write_issue(&mut out, issue);
                }
            }
        }
    }

    out.push_str("## Dependencies\n\n");
    out.push_str("| Name | Version | License | Type | File Path |\n");
    out.push_str("|------|---------|---------|------|-----------|\n");
    for dep in &result.dependencies {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} |",
            escape(&dep.name),
            escape(&dep.version),
            escape(&dep.license_type),
            dep.package_type,
            escape(&dep.file_path)
        );
    }

    out
}

fn breakdown_table(out: &mut String, title: &str, column: &str, counts: &BTreeMap<String, usize>) {
    if counts.is_empty() {
        return;
    }
    let _ = writeln!(out, "### {}\n", title);
    let _ = writeln!(out, "| {} | Count |", column);
    out.push_str("|---|---|\n");
    for (key, count) in counts {
        let _ = writeln!(out, "| {} | {} |", escape(key), count);
    }
    out.push('\n');
}

fn write_issue(out: &mut String, issue: &AuditIssue) {
    let dep = &issue.dependency;
    let _ = writeln!(out, "#### {}\n", dep.name);
    let _ = writeln!(out, "- **Type:** {}", kind_title(issue.kind));
    let _ = writeln!(out, "- **Message:** {}", issue.message);
    let _ = writeln!(
        out,
        "- **Package:** {}@{} ({})",
        dep.name, dep.version, dep.package_type
    );
    let _ = writeln!(out, "- **File:** {}", dep.file_path);
    if let Some(suggestion) = &issue.suggestion {
        let _ = writeln!(out, "- **Suggestion:** {}", suggestion);
    }
    if let Some(repository) = &dep.repository {
        let _ = writeln!(out, "- **Repository:** {}", repository);
    }
    if let Some(homepage) = &dep.homepage {
        let _ = writeln!(out, "- **Homepage:** {}", homepage);
    }
    out.push('\n');
}

fn kind_title(kind: IssueKind) -> &'static str {
    match kind {
        IssueKind::DangerousLicense => "Dangerous License",
        IssueKind::UnclearLicense => "Unclear License",
        IssueKind::TaintedLicense => "Tainted License",
        IssueKind::MissingLicense => "Missing License",
    }
}

fn escape(cell: &str) -> String {
    cell.replace('|', "\\|")
}
