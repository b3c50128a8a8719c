use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use super::{file_name, read_manifest};
use crate::license::detect::{read_first_of, NODE_LICENSE_FILES};
use crate::models::{Dependency, Ecosystem, UNKNOWN};

/// Analyzer for npm projects: `package.json` and `package-lock.json`.
///
/// Declared dependencies pick up license data from an installed copy under
/// the sibling `node_modules/` when one exists.
pub struct NodeAnalyzer;

impl NodeAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for NodeAnalyzer {
    fn name(&self) -> &'static str {
        "nodejs"
    }

    fn detect(&self, path: &Path) -> bool {
        matches!(file_name(path), "package.json" | "package-lock.json")
    }

    fn scan(&self, path: &Path) -> Result<Vec<Dependency>> {
        match file_name(path) {
            "package.json" => parse_package_json(path),
            "package-lock.json" => parse_package_lock_json(path),
            other => bail!("unsupported Node.js file: {}", other),
        }
    }
}

/// Metadata read from an installed `node_modules/<name>/package.json`.
#[derive(Debug)]
struct InstalledPackage {
    license: String,
    license_url: Option<String>,
    license_text: Option<String>,
    repository: Option<String>,
    homepage: Option<String>,
}

impl InstalledPackage {
    fn apply(self, mut dep: Dependency) -> Dependency {
        dep.set_license(&self.license);
        dep.license_text = self.license_text.filter(|t| !t.trim().is_empty());
        dep.license_url = self.license_url;
        dep.repository = self.repository;
        dep.homepage = self.homepage;
        dep
    }
}

/// Parse `package.json`: the union of `dependencies` and `devDependencies`.
fn parse_package_json(path: &Path) -> Result<Vec<Dependency>> {
    let content = read_manifest(path)?;
    let json: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let node_modules = path.parent().unwrap_or(Path::new(".")).join("node_modules");
    let mut deps = Vec::new();

    for section in &["dependencies", "devDependencies"] {
        if let Some(pkgs) = json.get(section).and_then(|v| v.as_object()) {
            for (name, version_range) in pkgs {
                if name.trim().is_empty() {
                    continue;
                }
                let version = version_range.as_str().unwrap_or("");
                let dep = Dependency::new(name, version, Ecosystem::Npm)
                    .with_file_path(&path.display().to_string());
                let dep = match read_installed_package(&node_modules.join(name)) {
                    Some(installed) => installed.apply(dep),
                    None => dep,
                };
                deps.push(dep);
            }
        }
    }

    Ok(deps)
}

/// Parse `package-lock.json`.
///
/// Lockfile v2/v3 carry a `packages` map keyed by install path; v1 only has
/// the nested `dependencies` map with no license data.
fn parse_package_lock_json(path: &Path) -> Result<Vec<Dependency>> {
    let content = read_manifest(path)?;
    let json: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let project_root = path.parent().unwrap_or(Path::new("."));
    let file_path = path.display().to_string();

    let mut deps = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut push = |dep: Dependency| {
        if !dep.name.is_empty() && seen.insert((dep.name.clone(), dep.version.clone())) {
            deps.push(dep);
        }
    };

    let packages = json
        .get("packages")
        .and_then(|v| v.as_object())
        .filter(|p| !p.is_empty());

    if let Some(packages) = packages {
        for (pkg_path, info) in packages {
            // Skip the root entry (empty string key)
            if pkg_path.is_empty() {
                continue;
            }

            let Some(name) = lock_entry_name(pkg_path, info) else {
                continue;
            };
            let version = info.get("version").and_then(|v| v.as_str()).unwrap_or("");
            let dep = Dependency::new(&name, version, Ecosystem::Npm)
                .with_license(&parse_license(info.get("license")))
                .with_file_path(&file_path);

            // Fall back to the installed copy when the lock entry has no license.
            let dep = if dep.has_unknown_license() {
                match read_installed_package(&project_root.join(pkg_path)) {
                    Some(installed) => installed.apply(dep),
                    None => dep,
                }
            } else {
                dep
            };

            push(dep);
        }
    } else if let Some(legacy) = json.get("dependencies").and_then(|v| v.as_object()) {
        for (name, entry) in legacy {
            let version = entry.get("version").and_then(|v| v.as_str()).unwrap_or("");
            push(Dependency::new(name, version, Ecosystem::Npm).with_file_path(&file_path));
        }
    }

    Ok(deps)
}

/// Package name for a `packages` entry: the explicit `name`, else the path
/// after the last `node_modules/` ("node_modules/@scope/foo" → "@scope/foo").
fn lock_entry_name(pkg_path: &str, info: &Value) -> Option<String> {
    if let Some(name) = info.get("name").and_then(|v| v.as_str()) {
        if !name.trim().is_empty() {
            return Some(name.trim().to_string());
        }
    }

    let (_, tail) = pkg_path.rsplit_once("node_modules/")?;
    let tail = tail.trim_end_matches('/');
    (!tail.is_empty()).then(|| tail.to_string())
}

/// Resolve an npm `license` field.
///
/// A string is used as-is, an object contributes its `type`, and an array
/// contributes the `type` of its first element. Anything else is unknown.
pub fn parse_license(value: Option<&Value>) -> String {
    let resolved = match value {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Object(obj)) => obj.get("type").and_then(|t| t.as_str()),
        Some(Value::Array(items)) => items
            .first()
            .and_then(|first| first.get("type"))
            .and_then(|t| t.as_str()),
        _ => None,
    };

    match resolved.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

fn license_url(json: &Value) -> Option<String> {
    let from = |v: &Value| v.get("url").and_then(|u| u.as_str()).map(str::to_string);
    match json.get("license") {
        Some(obj @ Value::Object(_)) => from(obj),
        _ => json
            .get("licenses")
            .and_then(|l| l.as_array())
            .and_then(|items| items.first())
            .and_then(from),
    }
}

fn repository_url(json: &Value) -> Option<String> {
    let url = match json.get("repository")? {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("url").and_then(|u| u.as_str()).map(str::to_string),
        _ => None,
    };
    url.filter(|s| !s.trim().is_empty())
}

/// Read license metadata from an installed package directory. Never fails;
/// a missing or unparsable `package.json` simply yields `None`.
fn read_installed_package(pkg_dir: &Path) -> Option<InstalledPackage> {
    let content = std::fs::read_to_string(pkg_dir.join("package.json")).ok()?;
    let json: Value = serde_json::from_str(&content).ok()?;

    let mut license = parse_license(json.get("license"));
    if license == UNKNOWN {
        // Pre-SPDX packages list licenses as an array of objects.
        license = parse_license(json.get("licenses"));
    }

    let license_text = if license != UNKNOWN {
        read_first_of(pkg_dir, NODE_LICENSE_FILES)
    } else {
        None
    };

    Some(InstalledPackage {
        license,
        license_url: license_url(&json),
        license_text,
        repository: repository_url(&json),
        homepage: json
            .get("homepage")
            .and_then(|h| h.as_str())
            .map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use serde_json::json;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_parse_package_json() {
        let json = r#"{
  "name": "my-app",
  "dependencies": {
    "express": "^4.18.2",
    "lodash": "^4.17.21"
  },
  "devDependencies": {
    "jest": "^29.0.0"
  }
}"#;
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{}", json).unwrap();
        let deps = parse_package_json(f.path()).unwrap();
        assert_eq!(deps.len(), 3);
        assert!(deps.iter().all(|d| d.package_type == Ecosystem::Npm));
        assert!(deps.iter().all(|d| d.license_type == UNKNOWN));
        let express = deps.iter().find(|d| d.name == "express").unwrap();
        assert_eq!(express.version, "^4.18.2");
    }

    #[test]
    fn test_package_json_reads_installed_license() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("package.json"),
            r#"{"dependencies": {"left-pad": "1.3.0", "ghost": "1.0.0"}}"#,
        )
        .unwrap();
        let installed = tmp.path().join("node_modules").join("left-pad");
        std::fs::create_dir_all(&installed).unwrap();
        std::fs::write(
            installed.join("package.json"),
            r#"{"license": {"type": "WTFPL", "url": "http://www.wtfpl.net"},
                "repository": {"type": "git", "url": "git+https://github.com/left-pad/left-pad.git"},
                "homepage": "https://github.com/left-pad/left-pad"}"#,
        )
        .unwrap();
        std::fs::write(installed.join("LICENSE"), "DO WHAT THE F*CK YOU WANT").unwrap();

        let deps = NodeAnalyzer::new()
            .scan(&tmp.path().join("package.json"))
            .unwrap();
        let left_pad = deps.iter().find(|d| d.name == "left-pad").unwrap();
        assert_eq!(left_pad.license_type, "WTFPL");
        assert_eq!(left_pad.license_url.as_deref(), Some("http://www.wtfpl.net"));
        assert_eq!(
            left_pad.repository.as_deref(),
            Some("git+https://github.com/left-pad/left-pad.git")
        );
        assert!(left_pad.license_text.as_deref().unwrap().contains("WANT"));

        let ghost = deps.iter().find(|d| d.name == "ghost").unwrap();
        assert_eq!(ghost.license_type, UNKNOWN);
        assert_eq!(ghost.license_text, None);
    }

    #[test]
    fn test_parse_package_lock_json() {
        let json = r#"{
  "name": "my-app",
  "lockfileVersion": 3,
  "packages": {
    "": { "name": "my-app", "version": "1.0.0" },
    "node_modules/express": {
      "version": "4.18.2",
      "license": "MIT"
    },
    "node_modules/lodash": {
      "version": "4.17.21"
    },
    "node_modules/@babel/core": {
      "version": "7.22.0",
      "license": { "type": "MIT" }
    },
    "node_modules/express/node_modules/debug": {
      "version": "2.6.9",
      "license": "MIT"
    }
  }
}"#;
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{}", json).unwrap();
        let deps = parse_package_lock_json(f.path()).unwrap();
        let names: Vec<_> = deps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["@babel/core", "express", "debug", "lodash"]);
        assert_eq!(deps.len(), 4);
        let lodash = deps.iter().find(|d| d.name == "lodash").unwrap();
        assert_eq!(lodash.version, "4.17.21");
        assert_eq!(lodash.license_type, UNKNOWN);
        let express = deps.iter().find(|d| d.name == "express").unwrap();
        assert_eq!(express.license_type, "MIT");
        assert!(deps.iter().any(|d| d.name == "debug" && d.version == "2.6.9"));
        assert!(deps.iter().any(|d| d.name == "@babel/core" && d.license_type == "MIT"));
    }

    #[test]
    fn test_package_lock_dedups_name_and_version() {
        let json = r#"{
  "packages": {
    "node_modules/ms": { "version": "2.1.3" },
    "node_modules/a/node_modules/ms": { "version": "2.1.3" },
    "node_modules/b/node_modules/ms": { "version": "2.0.0" },
    "packages/local-workspace": { "version": "0.0.1" }
  }
}"#;
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{}", json).unwrap();
        let deps = parse_package_lock_json(f.path()).unwrap();
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().all(|d| d.name == "ms"));
    }

    #[test]
    fn test_legacy_lockfile_uses_dependencies_map() {
        let json = r#"{
  "lockfileVersion": 1,
  "dependencies": {
    "chalk": { "version": "2.4.2" },
    "ansi-styles": { "version": "3.2.1" }
  }
}"#;
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{}", json).unwrap();
        let deps = parse_package_lock_json(f.path()).unwrap();
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().all(|d| d.license_type == UNKNOWN));
        assert!(deps.iter().any(|d| d.name == "chalk" && d.version == "2.4.2"));
    }

    #[test]
    fn test_parse_license_shapes() {
        assert_eq!(parse_license(Some(&json!("MIT"))), "MIT");
        assert_eq!(parse_license(Some(&json!({"type": "ISC"}))), "ISC");
        assert_eq!(
            parse_license(Some(&json!([{"type": "BSD-3-Clause"}, {"type": "MIT"}]))),
            "BSD-3-Clause"
        );
        assert_eq!(parse_license(Some(&json!(""))), UNKNOWN);
        assert_eq!(parse_license(Some(&json!(42))), UNKNOWN);
        assert_eq!(parse_license(Some(&json!([]))), UNKNOWN);
        assert_eq!(parse_license(None), UNKNOWN);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{{ not json").unwrap();
        assert!(parse_package_json(f.path()).is_err());
    }
}
