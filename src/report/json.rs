use anyhow::{Context, Result};

use crate::models::ScanResult;

pub fn render(result: &ScanResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize scan result")
}
