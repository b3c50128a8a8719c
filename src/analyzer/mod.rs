//! Ecosystem-specific manifest parsers.
//!
//! Each [`Analyzer`] recognises its files by name alone ([`Analyzer::detect`])
//! and turns one file into normalized [`Dependency`] records
//! ([`Analyzer::scan`]). Malformed lines or entries are skipped; only an
//! unreadable or structurally broken file is an error.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::ScannersConfig;
use crate::models::Dependency;

pub mod docker;
pub mod go;
pub mod java;
pub mod node;
pub mod python;
pub mod ruby;

pub trait Analyzer {
    /// Stable tag used in log output.
    fn name(&self) -> &'static str;

    /// Whether `path` looks like a file this analyzer understands. No I/O.
    fn detect(&self, path: &Path) -> bool;

    /// Parse the file at `path`.
    fn scan(&self, path: &Path) -> Result<Vec<Dependency>>;
}

/// Analyzers enabled by `scanners`, in a fixed order.
pub fn registered(scanners: &ScannersConfig) -> Vec<Box<dyn Analyzer>> {
    let mut analyzers: Vec<Box<dyn Analyzer>> = Vec::new();

    if scanners.nodejs {
        analyzers.push(Box::new(node::NodeAnalyzer::new()));
    }
    if scanners.go {
        analyzers.push(Box::new(go::GoAnalyzer::new()));
    }
    if scanners.docker {
        analyzers.push(Box::new(docker::DockerAnalyzer::new()));
    }
    if scanners.python {
        analyzers.push(Box::new(python::PythonAnalyzer::new()));
    }
    if scanners.ruby {
        analyzers.push(Box::new(ruby::RubyAnalyzer::new()));
    }
    if scanners.java {
        analyzers.push(Box::new(java::JavaAnalyzer::new()));
    }

    analyzers
}

/// Final path component as UTF-8, or `""`.
pub(crate) fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

pub(crate) fn read_manifest(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
