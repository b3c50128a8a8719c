//! Report renderers for scan results.
//!
//! - [`json`]: the full [`ScanResult`](crate::models::ScanResult), pretty-printed.
//! - [`markdown`]: summary tables, issues grouped by severity, dependency table.
//! - [`terminal`]: colored, tabular output with summary box; respects `--verbose` / `--quiet`.

pub mod json;
pub mod markdown;
pub mod terminal;

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

/// Write a rendered report to `target`, or to stdout when it is `-`.
pub fn write_output(content: &str, target: &Path) -> Result<()> {
    if target.as_os_str() == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(content.as_bytes())?;
        if !content.ends_with('\n') {
            stdout.write_all(b"\n")?;
        }
        return Ok(());
    }

    std::fs::write(target, content)
        .with_context(|| format!("failed to write report to {}", target.display()))
}
