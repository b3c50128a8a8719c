use std::path::Path;

use anyhow::{bail, Result};
use regex::Regex;

use super::{file_name, read_manifest};
use crate::models::{Dependency, Ecosystem};

/// Analyzer for Bundler projects: `Gemfile`, `Gemfile.lock` and `*.gemspec`.
pub struct RubyAnalyzer;

impl RubyAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for RubyAnalyzer {
    fn name(&self) -> &'static str {
        "ruby"
    }

    fn detect(&self, path: &Path) -> bool {
        let name = file_name(path);
        name == "Gemfile" || name == "Gemfile.lock" || name.ends_with(".gemspec")
    }

    fn scan(&self, path: &Path) -> Result<Vec<Dependency>> {
        let deps = match file_name(path) {
            "Gemfile" => parse_gemfile(&read_manifest(path)?)?,
            "Gemfile.lock" => parse_gemfile_lock(&read_manifest(path)?),
            name if name.ends_with(".gemspec") => Vec::new(),
            other => bail!("unsupported Ruby file: {}", other),
        };

        let file_path = path.display().to_string();
        Ok(deps
            .into_iter()
            .map(|d| d.with_file_path(&file_path))
            .collect())
    }
}

/// `gem 'name'` or `gem 'name', 'version'` declarations.
pub fn parse_gemfile(content: &str) -> Result<Vec<Dependency>> {
    let re = Regex::new(r#"^\s*gem\s+['"]([^'"]+)['"](?:\s*,\s*['"]([^'"]+)['"])?"#)?;

    let deps = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| re.captures(line))
        .map(|caps| {
            let version = caps.get(2).map_or("", |m| m.as_str());
            Dependency::new(&caps[1], version, Ecosystem::Ruby)
        })
        .collect();

    Ok(deps)
}

/// Top-level entries of every `specs:` section in `Gemfile.lock`.
///
/// Entries sit one level (two spaces) below `specs:`; deeper lines are the
/// entries' own requirements. A line at column zero ends the section.
pub fn parse_gemfile_lock(content: &str) -> Vec<Dependency> {
    let mut deps = Vec::new();
    let mut entry_indent: Option<usize> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let indent = line.len() - line.trim_start().len();

        if trimmed == "specs:" {
            entry_indent = Some(indent + 2);
            continue;
        }

        let Some(expected) = entry_indent else {
            continue;
        };

        if indent == 0 {
            entry_indent = None;
            continue;
        }

        if indent == expected {
            if let Some(dep) = parse_spec_line(trimmed) {
                deps.push(dep);
            }
        }
    }

    deps
}

/// `name (version)` with an optional platform suffix inside the parens.
fn parse_spec_line(line: &str) -> Option<Dependency> {
    let mut parts = line.split_whitespace();
    let name = parts.next()?;
    let version = parts.next()?.trim_start_matches('(').trim_end_matches(')');
    let version = version.split('-').next().unwrap_or(version);

    Some(Dependency::new(name, version, Ecosystem::Ruby))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::models::UNKNOWN;
    use tempfile::TempDir;

    const GEMFILE_LOCK: &str = "\
GIT
  remote: https://github.com/rails/rails.git
  specs:
    rails (7.1.0)
      actionpack (= 7.1.0)

GEM
  remote: https://rubygems.org/
  specs:
    nokogiri (1.15.4-x86_64-linux)
      racc (~> 1.4)
    rack (3.0.8)
    racc (1.7.1)

PLATFORMS
  x86_64-linux

DEPENDENCIES
  rails!
  rack
";

    #[test]
    fn test_parse_gemfile() {
        let content = r#"
source 'https://rubygems.org'

# web
gem 'rails', '~> 7.1'
gem "pg"
  gem 'puma', '>= 5.0', require: false
gemspec
"#;
        let deps = parse_gemfile(content).unwrap();
        let found: Vec<_> = deps
            .iter()
            .map(|d| (d.name.as_str(), d.version.as_str()))
            .collect();
        assert_eq!(
            found,
            [("rails", "~> 7.1"), ("pg", UNKNOWN), ("puma", ">= 5.0")]
        );
    }

    #[test]
    fn test_parse_gemfile_lock_reads_direct_entries() {
        let deps = parse_gemfile_lock(GEMFILE_LOCK);
        let found: Vec<_> = deps
            .iter()
            .map(|d| (d.name.as_str(), d.version.as_str()))
            .collect();
        assert_eq!(
            found,
            [
                ("rails", "7.1.0"),
                ("nokogiri", "1.15.4"),
                ("rack", "3.0.8"),
                ("racc", "1.7.1"),
            ]
        );
        assert!(deps.iter().all(|d| d.package_type == Ecosystem::Ruby));
    }

    #[test]
    fn test_sections_after_specs_are_not_entries() {
        let deps = parse_gemfile_lock(GEMFILE_LOCK);
        assert!(!deps.iter().any(|d| d.name == "x86_64-linux" || d.name == "rails!"));
    }

    #[test]
    fn test_gemspec_is_stubbed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mylib.gemspec");
        std::fs::write(&path, "spec.add_dependency 'rack'\n").unwrap();

        let analyzer = RubyAnalyzer::new();
        assert!(analyzer.detect(&path));
        assert!(analyzer.scan(&path).unwrap().is_empty());
    }
}
