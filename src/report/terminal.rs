use std::collections::BTreeMap;

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::models::{AuditIssue, Dependency, ScanResult, Severity};

/// Render a colored terminal report to stdout.
pub fn render(result: &ScanResult, verbose: bool, quiet: bool) {
    let total = result.summary.total_dependencies;
    let error_count = count_severity(&result.issues, Severity::Error);
    let warn_count = count_severity(&result.issues, Severity::Warning);

    if quiet {
        println!(
            "Total: {}  Issues: {}  Errors: {}  Warnings: {}",
            total,
            result.issues.len(),
            error_count.to_string().red(),
            warn_count.to_string().yellow(),
        );
        return;
    }

    println!(
        "\n {} v{}",
        "license-audit".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(" Scanning: {}\n", result.scan_path);

    // Summary box
    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(" │  {:<48} │", format!("Total dependencies : {}", total));
    println!(
        " │  {:<48} │",
        format!("Licenses           : {}", top_entries(&result.summary.license_breakdown))
    );
    println!(
        " │  {:<48} │",
        format!("Ecosystems         : {}", top_entries(&result.summary.package_breakdown))
    );
    println!(
        " │  {:<48} │",
        format!("{}  Errors          : {:>4}", "✗".red(), error_count)
    );
    println!(
        " │  {:<48} │",
        format!("{}  Warnings        : {:>4}", "⚠".yellow(), warn_count)
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    if error_count > 0 {
        println!(" {} Dependencies requiring attention:\n", "[ERROR]".red().bold());
        render_issue_table(&result.issues, Severity::Error);
        println!();
    }

    if warn_count > 0 {
        println!(" {} Dependencies with warnings:\n", "[WARN]".yellow().bold());
        render_issue_table(&result.issues, Severity::Warning);
        println!();
    }

    if verbose && !result.dependencies.is_empty() {
        println!(" {} All dependencies:\n", "[DEPS]".green().bold());
        render_dependency_table(&result.dependencies);
        println!();
    }
}

fn count_severity(issues: &[AuditIssue], severity: Severity) -> usize {
    issues.iter().filter(|i| i.severity == severity).count()
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold))
        .collect()
}

fn render_issue_table(issues: &[AuditIssue], severity: Severity) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["Name", "Version", "Ecosystem", "License", "Issue", "Message"]));

    let color = match severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Info => Color::Cyan,
    };

    for issue in issues.iter().filter(|i| i.severity == severity) {
        let dep = &issue.dependency;
        table.add_row(vec![
            Cell::new(&dep.name),
            Cell::new(&dep.version),
            Cell::new(dep.package_type.to_string()),
            Cell::new(&dep.license_type),
            Cell::new(issue.kind.to_string())
                .fg(color)
                .set_alignment(CellAlignment::Center),
            Cell::new(&issue.message),
        ]);
    }

    println!("{}", table);
}

fn render_dependency_table(deps: &[Dependency]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["Name", "Version", "Ecosystem", "License", "File"]));

    for dep in deps {
        let license = if dep.has_unknown_license() {
            Cell::new(&dep.license_type).fg(Color::DarkGrey)
        } else {
            Cell::new(&dep.license_type)
        };
        table.add_row(vec![
            Cell::new(&dep.name),
            Cell::new(&dep.version),
            Cell::new(dep.package_type.to_string()),
            license,
            Cell::new(&dep.file_path),
        ]);
    }

    println!("{}", table);
}

/// The three largest buckets, e.g. `[MIT (12), Apache-2.0 (4), ISC (1)]`.
fn top_entries(counts: &BTreeMap<String, usize>) -> String {
    let mut pairs: Vec<(&String, &usize)> = counts.iter().collect();
    // Stable sort keeps name order among equal counts.
    pairs.sort_by(|a, b| b.1.cmp(a.1));

    let summary: Vec<String> = pairs
        .iter()
        .take(3)
        .map(|(key, count)| format!("{} ({})", key, count))
        .collect();

    if summary.is_empty() {
        String::new()
    } else {
        format!("[{}]", summary.join(", "))
    }
}
