use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel for version or license data that could not be determined.
pub const UNKNOWN: &str = "UNKNOWN";

/// One declared or locked package reference found in a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,
    pub license_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_url: Option<String>,
    pub package_type: Ecosystem,
    pub file_path: String,
}

impl Dependency {
    /// Build a dependency with an unresolved license.
    ///
    /// The name is trimmed and a blank version collapses to [`UNKNOWN`].
    pub fn new(name: &str, version: &str, package_type: Ecosystem) -> Self {
        Dependency {
            name: name.trim().to_string(),
            version: or_unknown(version),
            license_type: UNKNOWN.to_string(),
            license_text: None,
            repository: None,
            homepage: None,
            license_url: None,
            package_type,
            file_path: String::new(),
        }
    }

    pub fn with_license(mut self, license: &str) -> Self {
        self.set_license(license);
        self
    }

    pub fn with_license_text(mut self, text: Option<String>) -> Self {
        self.license_text = text.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_file_path(mut self, path: &str) -> Self {
        self.file_path = path.to_string();
        self
    }

    /// Overwrite the license type; blank input is stored as [`UNKNOWN`].
    pub fn set_license(&mut self, license: &str) {
        self.license_type = or_unknown(license);
    }

    pub fn has_unknown_license(&self) -> bool {
        self.license_type == UNKNOWN
    }
}

fn or_unknown(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Package ecosystem a dependency was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ecosystem {
    Npm,
    Go,
    DockerImage,
    Apt,
    Yum,
    Apk,
    Python,
    Ruby,
    Maven,
}

impl Ecosystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
            Ecosystem::Go => "go",
            Ecosystem::DockerImage => "docker-image",
            Ecosystem::Apt => "apt",
            Ecosystem::Yum => "yum",
            Ecosystem::Apk => "apk",
            Ecosystem::Python => "python",
            Ecosystem::Ruby => "ruby",
            Ecosystem::Maven => "maven",
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    DangerousLicense,
    UnclearLicense,
    TaintedLicense,
    MissingLicense,
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueKind::DangerousLicense => write!(f, "dangerous_license"),
            IssueKind::UnclearLicense => write!(f, "unclear_license"),
            IssueKind::TaintedLicense => write!(f, "tainted_license"),
            IssueKind::MissingLicense => write!(f, "missing_license"),
        }
    }
}

/// A classification finding. Owns a copy of the dependency it refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditIssue {
    pub severity: Severity,
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub message: String,
    pub dependency: Dependency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_dependencies: usize,
    pub license_breakdown: BTreeMap<String, usize>,
    pub package_breakdown: BTreeMap<String, usize>,
    pub issue_breakdown: BTreeMap<String, usize>,
}

/// Complete output of one run, handed to the report renderers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub timestamp: DateTime<Utc>,
    pub scan_path: String,
    pub dependencies: Vec<Dependency>,
    pub issues: Vec<AuditIssue>,
    pub summary: Summary,
}
