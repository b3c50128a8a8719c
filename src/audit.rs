//! Rule-based license classification.
//!
//! Every dependency is checked against four independent rules, in a fixed
//! order: dangerous, unclear, tainted, missing. A dependency can trigger any
//! number of them.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::license::catalog;
use crate::models::{AuditIssue, Dependency, IssueKind, Severity, UNKNOWN};

pub struct Auditor {
    dangerous: Vec<String>,
    unclear: Vec<String>,
}

impl Auditor {
    pub fn new(config: &Config) -> Self {
        Auditor {
            dangerous: upper_all(&config.dangerous_licenses),
            unclear: upper_all(&config.unclear_licenses),
        }
    }

    /// Classify `deps`, returning issues in dependency order.
    pub fn audit(&self, deps: &[Dependency]) -> Vec<AuditIssue> {
        let mut issues = Vec::new();

        for dep in deps {
            if self.is_dangerous(&dep.license_type) {
                let id = dep.license_type.as_str();
                issues.push(issue(
                    dep,
                    Severity::Error,
                    IssueKind::DangerousLicense,
                    catalog::lookup(catalog::DANGEROUS_MESSAGES, id)
                        .unwrap_or(catalog::DANGEROUS_FALLBACK_MESSAGE),
                    catalog::lookup(catalog::DANGEROUS_SUGGESTIONS, id)
                        .unwrap_or(catalog::DANGEROUS_FALLBACK_SUGGESTION),
                ));
            }

            if self.is_unclear(&dep.license_type) {
                issues.push(issue(
                    dep,
                    Severity::Warning,
                    IssueKind::UnclearLicense,
                    catalog::lookup(catalog::UNCLEAR_MESSAGES, &dep.license_type)
                        .unwrap_or(catalog::UNCLEAR_FALLBACK_MESSAGE),
                    catalog::UNCLEAR_SUGGESTION,
                ));
            }

            if is_tainted(dep) {
                issues.push(issue(
                    dep,
                    Severity::Warning,
                    IssueKind::TaintedLicense,
                    catalog::TAINTED_MESSAGE,
                    catalog::TAINTED_SUGGESTION,
                ));
            }

            if is_missing(dep) {
                issues.push(issue(
                    dep,
                    Severity::Warning,
                    IssueKind::MissingLicense,
                    catalog::MISSING_MESSAGE,
                    catalog::MISSING_SUGGESTION,
                ));
            }
        }

        issues
    }

    /// Empty and `UNKNOWN` licenses are never dangerous, whatever the list says.
    fn is_dangerous(&self, license: &str) -> bool {
        let license = license.trim();
        if license.is_empty() || license.eq_ignore_ascii_case(UNKNOWN) {
            return false;
        }
        let upper = license.to_uppercase();
        self.dangerous.iter().any(|d| *d == upper)
    }

    fn is_unclear(&self, license: &str) -> bool {
        let upper = license.trim().to_uppercase();
        self.unclear.iter().any(|u| *u == upper)
    }
}

fn upper_all(list: &[String]) -> Vec<String> {
    list.iter().map(|s| s.trim().to_uppercase()).collect()
}

fn issue(
    dep: &Dependency,
    severity: Severity,
    kind: IssueKind,
    message: &str,
    suggestion: &str,
) -> AuditIssue {
    AuditIssue {
        severity,
        kind,
        message: message.to_string(),
        dependency: dep.clone(),
        suggestion: Some(suggestion.to_string()),
    }
}

/// Heuristics over the license text: dual or custom licensing, or GPL code
/// that also mentions commercial terms.
fn is_tainted(dep: &Dependency) -> bool {
    let text = dep.license_text.as_deref().unwrap_or("").to_lowercase();
    let license = dep.license_type.to_lowercase();

    if text.contains("dual license")
        || text.contains("multiple license")
        || (license.contains("gpl") && text.contains("commercial"))
    {
        return true;
    }

    ["modified", "custom", "proprietary"]
        .iter()
        .any(|word| text.contains(word))
}

fn is_missing(dep: &Dependency) -> bool {
    dep.license_type == UNKNOWN
        && dep
            .license_text
            .as_deref()
            .map_or(true, |t| t.trim().is_empty())
}

/// Count issues under three keys each: `severity_kind`, severity and kind.
pub fn issue_breakdown(issues: &[AuditIssue]) -> BTreeMap<String, usize> {
    let mut breakdown = BTreeMap::new();

    for issue in issues {
        for key in [
            format!("{}_{}", issue.severity, issue.kind),
            issue.severity.to_string(),
            issue.kind.to_string(),
        ] {
            *breakdown.entry(key).or_insert(0) += 1;
        }
    }

    breakdown
}
