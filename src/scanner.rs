//! Scan orchestration: walk each root, dispatch manifests to analyzers, then
//! apply license overrides and tally the summary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::analyzer::{self, Analyzer};
use crate::config::Config;
use crate::ignore::IgnoreMatcher;
use crate::models::{Dependency, ScanResult, Summary, UNKNOWN};

pub struct Scanner {
    scan_paths: Vec<PathBuf>,
    ignore_file: PathBuf,
    overrides: BTreeMap<String, String>,
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl Scanner {
    pub fn new(config: &Config) -> Self {
        Self::with_analyzers(config, analyzer::registered(&config.scanners))
    }

    /// Build a scanner with an explicit analyzer list instead of the
    /// `[scanners]` flags.
    pub fn with_analyzers(config: &Config, analyzers: Vec<Box<dyn Analyzer>>) -> Self {
        Scanner {
            scan_paths: config.scan_paths.clone(),
            ignore_file: config.ignore_file.clone(),
            overrides: config.license_overrides.clone(),
            analyzers,
        }
    }

    /// Walk every configured root and collect dependencies.
    ///
    /// Issues are left empty; the auditor fills them in.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut dependencies = Vec::new();
        let mut scan_path = String::new();

        for root in &self.scan_paths {
            scan_path = root.display().to_string();
            let found = self
                .scan_root(root)
                .with_context(|| format!("error scanning path {}", root.display()))?;
            info!("{}: {} dependencies", root.display(), found.len());
            dependencies.extend(found);
        }

        self.apply_overrides(&mut dependencies);
        let summary = summarize(&dependencies);

        Ok(ScanResult {
            timestamp: Utc::now(),
            scan_path,
            dependencies,
            issues: Vec::new(),
            summary,
        })
    }

    fn scan_root(&self, root: &Path) -> Result<Vec<Dependency>> {
        if !root.exists() {
            bail!("path does not exist");
        }

        let matcher = self.ignore_matcher(root);
        let mut deps = Vec::new();
        let mut failures = 0usize;

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                // The root itself is never subject to ignore rules.
                if entry.depth() == 0 {
                    return true;
                }
                let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
                let rel_dir = rel.parent().map(|p| p.to_string_lossy()).unwrap_or_default();
                let name = entry.file_name().to_string_lossy();
                !matcher.should_ignore(&rel_dir, &name, entry.file_type().is_dir())
            });

        for entry in walker {
            // Only the root itself being unreadable is fatal.
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() > 0 => {
                    failures += 1;
                    warn!("skipping unreadable entry: {}", e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            for analyzer in &self.analyzers {
                if !analyzer.detect(path) {
                    continue;
                }
                debug!("{} analyzing {}", analyzer.name(), path.display());

                match analyzer.scan(path) {
                    Ok(found) => {
                        let file_path = path.display().to_string();
                        deps.extend(found.into_iter().map(|d| d.with_file_path(&file_path)));
                    }
                    Err(e) => {
                        failures += 1;
                        warn!("{} scanner failed for {}: {:#}", analyzer.name(), path.display(), e);
                    }
                }
            }
        }

        if failures > 0 {
            warn!("{}: {} entries could not be read or parsed", root.display(), failures);
        }

        Ok(deps)
    }

    /// Resolve the ignore file against `root` first, then the working directory.
    fn ignore_matcher(&self, root: &Path) -> IgnoreMatcher {
        let candidate = if self.ignore_file.is_relative() && root.join(&self.ignore_file).exists() {
            root.join(&self.ignore_file)
        } else {
            self.ignore_file.clone()
        };

        IgnoreMatcher::load(&candidate).unwrap_or_else(|e| {
            warn!("failed to load ignore file: {:#}", e);
            IgnoreMatcher::default()
        })
    }

    /// Force the configured license onto every dependency with a matching name.
    pub fn apply_overrides(&self, deps: &mut [Dependency]) {
        apply_license_overrides(&self.overrides, deps);
    }
}

pub fn apply_license_overrides(overrides: &BTreeMap<String, String>, deps: &mut [Dependency]) {
    if overrides.is_empty() {
        return;
    }
    for dep in deps.iter_mut() {
        if let Some(license) = overrides.get(&dep.name) {
            dep.set_license(license);
        }
    }
}

/// Totals and histograms by license and ecosystem. The issue breakdown is
/// left empty.
pub fn summarize(deps: &[Dependency]) -> Summary {
    let mut summary = Summary {
        total_dependencies: deps.len(),
        ..Summary::default()
    };

    for dep in deps {
        let license = if dep.license_type.trim().is_empty() {
            UNKNOWN
        } else {
            dep.license_type.as_str()
        };
        *summary.license_breakdown.entry(license.to_string()).or_insert(0) += 1;
        *summary
            .package_breakdown
            .entry(dep.package_type.as_str().to_string())
            .or_insert(0) += 1;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::go::GoAnalyzer;
    use crate::analyzer::node::NodeAnalyzer;
    use crate::analyzer::python::PythonAnalyzer;
    use crate::analyzer::ruby::RubyAnalyzer;
    use crate::models::Ecosystem;
    use std::fs;
    use tempfile::TempDir;

    fn config_for(root: &Path) -> Config {
        Config {
            scan_paths: vec![root.to_path_buf()],
            ignore_file: root.join(".licignore"),
            ..Config::default()
        }
    }

    fn offline_analyzers() -> Vec<Box<dyn Analyzer>> {
        vec![
            Box::new(NodeAnalyzer::new()),
            Box::new(GoAnalyzer::offline()),
            Box::new(PythonAnalyzer::new()),
            Box::new(RubyAnalyzer::new()),
        ]
    }

    fn project() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(
            root.join("package.json"),
            r#"{"dependencies": {"express": "^4.18.2"}}"#,
        )
        .unwrap();
        fs::create_dir_all(root.join("api")).unwrap();
        fs::write(root.join("api/requirements.txt"), "requests==2.31.0\nflask\n").unwrap();
        fs::create_dir_all(root.join("node_modules/express")).unwrap();
        fs::write(
            root.join("node_modules/express/package.json"),
            r#"{"name": "express", "license": "MIT", "dependencies": {"debug": "2.6.9"}}"#,
        )
        .unwrap();
        fs::write(root.join("go.mod"), "module x\n\nrequire github.com/pkg/errors v0.9.1\n").unwrap();
        tmp
    }

    #[test]
    fn test_scan_collects_across_ecosystems() {
        let tmp = project();
        fs::write(tmp.path().join(".licignore"), "node_modules/\n").unwrap();

        let cfg = config_for(tmp.path());
        let result = Scanner::with_analyzers(&cfg, offline_analyzers()).scan().unwrap();

        let names: Vec<_> = result.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["requests", "flask", "github.com/pkg/errors", "express"]);

        let express = &result.dependencies[3];
        assert_eq!(express.license_type, "MIT");
        assert_eq!(
            express.file_path,
            tmp.path().join("package.json").display().to_string()
        );

        assert_eq!(result.scan_path, tmp.path().display().to_string());
        assert_eq!(result.summary.total_dependencies, 4);
        assert_eq!(result.summary.package_breakdown["python"], 2);
        assert_eq!(result.summary.license_breakdown[UNKNOWN], 3);
        assert!(result.issues.is_empty());
        assert!(result.summary.issue_breakdown.is_empty());
    }

    #[test]
    fn test_ignored_directory_is_pruned() {
        let tmp = project();
        let cfg = config_for(tmp.path());

        // Without an ignore file the installed package's manifest is scanned too.
        let result = Scanner::with_analyzers(&cfg, offline_analyzers()).scan().unwrap();
        assert!(result.dependencies.iter().any(|d| d.name == "debug"));

        fs::write(tmp.path().join(".licignore"), "node_modules/\napi/\n").unwrap();
        let result = Scanner::with_analyzers(&cfg, offline_analyzers()).scan().unwrap();
        let names: Vec<_> = result.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["github.com/pkg/errors", "express"]);
    }

    #[test]
    fn test_negated_file_pattern() {
        let tmp = project();
        fs::write(
            tmp.path().join(".licignore"),
            "node_modules/\n*.txt\n!requirements.txt\n",
        )
        .unwrap();

        let cfg = config_for(tmp.path());
        let result = Scanner::with_analyzers(&cfg, offline_analyzers()).scan().unwrap();
        assert!(result.dependencies.iter().any(|d| d.name == "requests"));
    }

    #[test]
    fn test_parse_failure_does_not_abort() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("package.json"), "{ not json").unwrap();
        fs::write(tmp.path().join("Gemfile"), "gem 'rails', '7.1.0'\n").unwrap();

        let cfg = config_for(tmp.path());
        let result = Scanner::with_analyzers(&cfg, offline_analyzers()).scan().unwrap();
        assert_eq!(result.dependencies.len(), 1);
        assert_eq!(result.dependencies[0].package_type, Ecosystem::Ruby);
    }

    #[test]
    fn test_relative_ignore_file_resolves_against_root() {
        let tmp = project();
        fs::write(tmp.path().join("custom.ignore"), "node_modules/\napi/\n").unwrap();

        let cfg = Config {
            ignore_file: PathBuf::from("custom.ignore"),
            ..config_for(tmp.path())
        };
        let result = Scanner::with_analyzers(&cfg, offline_analyzers()).scan().unwrap();
        let names: Vec<_> = result.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["github.com/pkg/errors", "express"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = project();
        fs::write(tmp.path().join(".licignore"), "node_modules/\n").unwrap();
        let locked = tmp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not stop a privileged user.
        let readable = fs::read_dir(&locked).is_ok();
        let result = Scanner::with_analyzers(&config_for(tmp.path()), offline_analyzers()).scan();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }

        let result = result.unwrap();
        assert_eq!(result.summary.total_dependencies, 4);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let cfg = config_for(&tmp.path().join("nonexistent"));
        let err = Scanner::with_analyzers(&cfg, offline_analyzers())
            .scan()
            .unwrap_err();
        assert!(format!("{:#}", err).contains("nonexistent"));
    }

    #[test]
    fn test_license_overrides_apply_by_name() {
        let tmp = project();
        fs::write(tmp.path().join(".licignore"), "node_modules/\n").unwrap();

        let mut cfg = config_for(tmp.path());
        cfg.license_overrides.insert("flask".into(), "BSD-3-Clause".into());
        cfg.license_overrides.insert("express".into(), "Apache-2.0".into());
        cfg.license_overrides.insert("not-present".into(), "MIT".into());

        let result = Scanner::with_analyzers(&cfg, offline_analyzers()).scan().unwrap();
        let license = |name: &str| {
            result
                .dependencies
                .iter()
                .find(|d| d.name == name)
                .map(|d| d.license_type.clone())
                .unwrap()
        };
        assert_eq!(license("flask"), "BSD-3-Clause");
        assert_eq!(license("express"), "Apache-2.0");
        assert_eq!(license("requests"), UNKNOWN);
        assert_eq!(result.summary.license_breakdown["BSD-3-Clause"], 1);
    }

    #[test]
    fn test_scan_is_repeatable() {
        let tmp = project();
        let cfg = config_for(tmp.path());
        let scanner = Scanner::with_analyzers(&cfg, offline_analyzers());

        let first = scanner.scan().unwrap();
        let second = scanner.scan().unwrap();
        assert_eq!(first.dependencies, second.dependencies);
        assert_eq!(first.summary.license_breakdown, second.summary.license_breakdown);
    }

    #[test]
    fn test_summarize_treats_blank_license_as_unknown() {
        let mut blank = Dependency::new("a", "1", Ecosystem::Npm);
        blank.license_type = String::new();
        let deps = vec![
            blank,
            Dependency::new("b", "1", Ecosystem::Npm).with_license("MIT"),
            Dependency::new("c", "1", Ecosystem::Apt),
        ];

        let summary = summarize(&deps);
        assert_eq!(summary.total_dependencies, 3);
        assert_eq!(summary.license_breakdown[UNKNOWN], 2);
        assert_eq!(summary.license_breakdown["MIT"], 1);
        assert_eq!(summary.package_breakdown["npm"], 2);
        assert_eq!(summary.package_breakdown["apt"], 1);
    }
}
