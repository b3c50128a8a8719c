use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::ignore::DEFAULT_IGNORE_FILE;

/// File name looked up in the home directory and the working directory.
pub const CONFIG_FILE_NAME: &str = ".license-audit.toml";

/// Root configuration structure, deserialized from `.license-audit.toml`.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories to walk. The last one processed is reported as the scan path.
    pub scan_paths: Vec<PathBuf>,
    pub output_format: OutputFormat,
    /// Report destination; `-` means stdout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    pub ignore_file: PathBuf,
    /// Licenses reported as errors, compared case-insensitively.
    pub dangerous_licenses: Vec<String>,
    /// Licenses reported as unclear, compared case-insensitively.
    pub unclear_licenses: Vec<String>,
    pub enable_audit: bool,
    /// Forced license per dependency name, applied after scanning.
    pub license_overrides: BTreeMap<String, String>,
    pub scanners: ScannersConfig,
}

/// Per-ecosystem enable flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannersConfig {
    pub nodejs: bool,
    pub go: bool,
    pub docker: bool,
    pub python: bool,
    pub ruby: bool,
    pub java: bool,
}

impl Default for ScannersConfig {
    fn default() -> Self {
        ScannersConfig {
            nodejs: true,
            go: true,
            docker: true,
            python: true,
            ruby: true,
            java: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Markdown,
    Terminal,
}

impl OutputFormat {
    /// Report file written when no output file is configured. Terminal output
    /// always goes to stdout.
    pub fn default_output_file(&self) -> Option<&'static str> {
        match self {
            OutputFormat::Json => Some("license-report.json"),
            OutputFormat::Markdown => Some("license-report.md"),
            OutputFormat::Terminal => None,
        }
    }
}

impl Default for Config {
    /// Built-in defaults used beneath every config file.
    ///
    /// Strong and weak copyleft licenses are dangerous; missing or
    /// non-open-source markers are unclear.
    fn default() -> Self {
        let dangerous = [
            "GPL-2.0", "GPL-3.0", "AGPL-3.0", "LGPL-2.1", "LGPL-3.0", "CDDL-1.0", "CDDL-1.1",
            "CPL-1.0", "EPL-1.0", "EPL-2.0", "OSL-3.0", "QPL-1.0",
        ];
        let unclear = ["UNKNOWN", "UNLICENSED", "PROPRIETARY", "COMMERCIAL", ""];

        Config {
            scan_paths: vec![PathBuf::from(".")],
            output_format: OutputFormat::Json,
            output_file: None,
            ignore_file: PathBuf::from(DEFAULT_IGNORE_FILE),
            dangerous_licenses: dangerous.iter().map(|s| s.to_string()).collect(),
            unclear_licenses: unclear.iter().map(|s| s.to_string()).collect(),
            enable_audit: true,
            license_overrides: BTreeMap::new(),
            scanners: ScannersConfig::default(),
        }
    }
}

impl Config {
    /// Normalize and check the final configuration, after CLI overrides.
    ///
    /// An empty path list means the working directory. Every scan path must
    /// exist.
    pub fn validate(&mut self) -> Result<()> {
        if self.scan_paths.is_empty() {
            self.scan_paths.push(PathBuf::from("."));
        }

        for path in &self.scan_paths {
            if !path.exists() {
                bail!("scan path does not exist: {}", path.display());
            }
        }

        Ok(())
    }
}

/// Load the configuration, layering in order:
///
/// 1. Built-in [`Config::default`]
/// 2. `~/.license-audit.toml`
/// 3. `./.license-audit.toml`
/// 4. `explicit`, the path passed via `--config`, which must exist
///
/// Later layers only override the keys they set.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let mut layers = Vec::new();

    if let Some(home) = dirs::home_dir() {
        let global = home.join(CONFIG_FILE_NAME);
        if global.is_file() {
            layers.push(global);
        }
    }

    let project = PathBuf::from(CONFIG_FILE_NAME);
    if project.is_file() {
        layers.push(project);
    }

    if let Some(path) = explicit {
        layers.push(path.to_path_buf());
    }

    load_layers(&layers)
}

/// Merge the given TOML files over the defaults, in order.
pub fn load_layers(paths: &[PathBuf]) -> Result<Config> {
    let mut merged = toml::Table::new();

    for path in paths {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let layer: toml::Table = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        merge_tables(&mut merged, layer);
    }

    toml::Value::Table(merged)
        .try_into()
        .context("invalid configuration")
}

/// Deep-merge `overlay` into `base`; nested tables merge key by key, any other
/// value replaces what was there.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) if matches!(base.get(&key), Some(toml::Value::Table(_))) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                }
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}

/// Write the built-in defaults to `path` as a starting point for editing.
pub fn write_default(path: &Path) -> Result<()> {
    let body = toml::to_string_pretty(&Config::default())
        .context("failed to serialize default configuration")?;
    let content = format!("# license-audit configuration\n\n{body}");
    std::fs::write(path, content)
        .with_context(|| format!("failed to write config file {}", path.display()))
}
