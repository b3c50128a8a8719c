use std::path::Path;

use anyhow::{bail, Result};

use super::{file_name, read_manifest};
use crate::models::{Dependency, Ecosystem};

/// Version operators recognised in `requirements.txt`. Two-character operators
/// come first so that `>=` wins over `>` at the same position.
const OPERATORS: &[&str] = &["==", ">=", "<=", "~=", ">", "<"];

/// Analyzer for Python projects.
///
/// Only `requirements.txt` is parsed. `setup.py`, `pyproject.toml` and
/// `Pipfile` are recognised so they show up in debug output, but yield nothing.
pub struct PythonAnalyzer;

impl PythonAnalyzer {
    /// Create a new `PythonAnalyzer`.
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for PythonAnalyzer {
    fn name(&self) -> &'static str {
        "python"
    }

    fn detect(&self, path: &Path) -> bool {
        matches!(
            file_name(path),
            "requirements.txt" | "setup.py" | "pyproject.toml" | "Pipfile"
        )
    }

    fn scan(&self, path: &Path) -> Result<Vec<Dependency>> {
        match file_name(path) {
            "requirements.txt" => {
                let content = read_manifest(path)?;
                let file_path = path.display().to_string();
                Ok(parse_requirements_txt(&content)
                    .into_iter()
                    .map(|d| d.with_file_path(&file_path))
                    .collect())
            }
            "setup.py" | "pyproject.toml" | "Pipfile" => Ok(Vec::new()),
            other => bail!("unsupported Python file: {}", other),
        }
    }
}

/// Parse `requirements.txt`, one requirement per line. Option lines such as
/// `-r` and `-e` are skipped.
pub fn parse_requirements_txt(content: &str) -> Vec<Dependency> {
    content.lines().filter_map(parse_requirement).collect()
}

fn parse_requirement(line: &str) -> Option<Dependency> {
    let line = strip_comment(line).trim();
    if line.is_empty() || line.starts_with('-') {
        return None;
    }

    // Environment markers: `numpy==1.24 ; python_version >= "3.8"`
    let line = line.split(';').next().unwrap_or(line).trim();

    let (name, version) = split_operator(line).unwrap_or((line, ""));

    let name = name.trim().trim_matches(|c| c == '"' || c == '\'');
    if name.is_empty() {
        return None;
    }

    Some(Dependency::new(name, version.trim(), Ecosystem::Python))
}

/// Cut a `#` comment that starts the line or follows whitespace. A `#` inside
/// a token, as in a URL fragment, is kept.
fn strip_comment(line: &str) -> &str {
    let mut prev_is_space = true;
    for (i, c) in line.char_indices() {
        if c == '#' && prev_is_space {
            return &line[..i];
        }
        prev_is_space = c.is_whitespace();
    }
    line
}

/// Split at the earliest operator in the line.
fn split_operator(line: &str) -> Option<(&str, &str)> {
    OPERATORS
        .iter()
        .enumerate()
        .filter_map(|(rank, op)| line.find(op).map(|pos| (pos, rank, op.len())))
        .min()
        .map(|(pos, _, len)| (&line[..pos], &line[pos + len..]))
}
