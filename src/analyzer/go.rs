use std::collections::HashSet;
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use super::{file_name, read_manifest};
use crate::license::detect::read_license_from_dir;
use crate::models::{Dependency, Ecosystem};

/// Analyzer for Go modules: `go.mod` and `go.sum`.
///
/// For `go.mod` the module graph is first requested from the `go` tool, which
/// also reports where each module lives on disk. The tool is optional: when
/// it is missing or fails, `go.mod` is parsed as text and licenses are looked
/// up under `vendor/`.
pub struct GoAnalyzer {
    use_go_tool: bool,
}

impl GoAnalyzer {
    pub fn new() -> Self {
        Self { use_go_tool: true }
    }

    /// An analyzer that never invokes the `go` tool.
    pub fn offline() -> Self {
        Self { use_go_tool: false }
    }
}

impl super::Analyzer for GoAnalyzer {
    fn name(&self) -> &'static str {
        "golang"
    }

    fn detect(&self, path: &Path) -> bool {
        matches!(file_name(path), "go.mod" | "go.sum")
    }

    fn scan(&self, path: &Path) -> Result<Vec<Dependency>> {
        let module_dir = path.parent().unwrap_or(Path::new("."));
        match file_name(path) {
            "go.mod" => {
                if self.use_go_tool {
                    match list_modules(module_dir) {
                        Ok(deps) => return Ok(stamp(deps, path)),
                        Err(e) => debug!("go list unavailable for {}: {:#}", path.display(), e),
                    }
                }
                let content = read_manifest(path)?;
                Ok(stamp(parse_go_mod(&content, module_dir), path))
            }
            "go.sum" => {
                let content = read_manifest(path)?;
                Ok(stamp(parse_go_sum(&content, module_dir), path))
            }
            other => bail!("unsupported Go file: {}", other),
        }
    }
}

fn stamp(deps: Vec<Dependency>, path: &Path) -> Vec<Dependency> {
    let file_path = path.display().to_string();
    deps.into_iter()
        .map(|d| d.with_file_path(&file_path))
        .collect()
}

/// One object of the `go list -m -json` stream.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GoListModule {
    path: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    main: bool,
    #[serde(default)]
    dir: Option<String>,
}

/// Ask the `go` tool for the resolved module graph. Runs once, offline, with
/// no retry; any failure is returned so the caller can fall back.
fn list_modules(module_dir: &Path) -> Result<Vec<Dependency>> {
    let output = Command::new("go")
        .args(["list", "-m", "-json", "all"])
        .current_dir(module_dir)
        .env("GOPROXY", "off")
        .env("GOFLAGS", "-mod=readonly")
        .env("GOTOOLCHAIN", "local")
        .output()
        .context("failed to run `go list`")?;

    if !output.status.success() {
        bail!(
            "`go list` exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let modules = serde_json::Deserializer::from_slice(&output.stdout)
        .into_iter::<GoListModule>()
        .collect::<Result<Vec<_>, _>>()
        .context("failed to decode `go list` output")?;

    let deps = modules
        .into_iter()
        .filter(|m| !m.main && !m.path.is_empty())
        .map(|m| {
            let dep = Dependency::new(&m.path, m.version.as_deref().unwrap_or(""), Ecosystem::Go);
            match m.dir.as_deref().and_then(|dir| read_license_from_dir(Path::new(dir))) {
                Some((text, license)) => dep.with_license(license).with_license_text(Some(text)),
                None => dep,
            }
        })
        .collect();

    Ok(deps)
}

/// Parse `go.mod` requirements from single-line and block `require` forms.
pub fn parse_go_mod(content: &str, module_dir: &Path) -> Vec<Dependency> {
    let mut deps = Vec::new();
    let mut in_require_block = false;

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        if line.starts_with("require (") || line == "require(" {
            in_require_block = true;
            continue;
        }

        if in_require_block && line == ")" {
            in_require_block = false;
            continue;
        }

        if line.starts_with("require ") || in_require_block {
            if let Some((name, version)) = parse_require_line(line) {
                deps.push(vendored(Dependency::new(name, version, Ecosystem::Go), module_dir));
            }
        }
    }

    deps
}

/// Split one requirement into `(module, version)`, dropping any trailing
/// `// indirect` style comment.
pub fn parse_require_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    let line = line.strip_prefix("require ").unwrap_or(line);
    let line = match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    };

    let mut parts = line.split_whitespace();
    let name = parts.next()?;
    let version = parts.next()?;
    if name == "(" || name == ")" {
        return None;
    }

    Some((name, version))
}

/// Parse `go.sum`, one record per distinct (module, version).
pub fn parse_go_sum(content: &str, module_dir: &Path) -> Vec<Dependency> {
    let mut deps = Vec::new();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(name), Some(version)) = (parts.next(), parts.next()) else {
            continue;
        };

        // `/go.mod` lines only hash the module's go.mod file.
        if version.ends_with("/go.mod") || version.starts_with("h1:") {
            continue;
        }

        if seen.insert((name, version)) {
            deps.push(vendored(Dependency::new(name, version, Ecosystem::Go), module_dir));
        }
    }

    deps
}

/// Attach license data from `vendor/<module>` when the module is vendored.
fn vendored(dep: Dependency, module_dir: &Path) -> Dependency {
    let vendor_dir = module_dir.join("vendor").join(&dep.name);
    if !vendor_dir.is_dir() {
        return dep;
    }
    match read_license_from_dir(&vendor_dir) {
        Some((text, license)) => dep.with_license(license).with_license_text(Some(text)),
        None => {
            debug!("no license file in {}", vendor_dir.display());
            dep
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::models::UNKNOWN;
    use tempfile::TempDir;

    const GO_MOD: &str = r#"module example.com/app

go 1.21

require github.com/stretchr/testify v1.8.4

require (
	github.com/gin-gonic/gin v1.9.1
	github.com/bytedance/sonic v1.9.1 // indirect
)

replace (
	github.com/old/thing => github.com/new/thing v1.0.0
)
"#;

    #[test]
    fn test_detect() {
        let analyzer = GoAnalyzer::offline();
        assert!(analyzer.detect(Path::new("go.mod")));
        assert!(analyzer.detect(Path::new("go.sum")));
        assert!(analyzer.detect(Path::new("vendor/go.mod")));
        assert!(!analyzer.detect(Path::new("package.json")));
        assert!(!analyzer.detect(Path::new("")));
    }

    #[test]
    fn test_parse_require_line() {
        assert_eq!(
            parse_require_line("github.com/gin-gonic/gin v1.9.1"),
            Some(("github.com/gin-gonic/gin", "v1.9.1"))
        );
        assert_eq!(
            parse_require_line("require github.com/stretchr/testify v1.8.4"),
            Some(("github.com/stretchr/testify", "v1.8.4"))
        );
        assert_eq!(
            parse_require_line("github.com/bytedance/sonic v1.9.1 // indirect"),
            Some(("github.com/bytedance/sonic", "v1.9.1"))
        );
        assert_eq!(parse_require_line("github.com/x/y v1.0.0//indirect").unwrap().1, "v1.0.0");
        assert_eq!(parse_require_line(""), None);
        assert_eq!(parse_require_line("("), None);
        assert_eq!(parse_require_line(")"), None);
    }

    #[test]
    fn test_scan_go_mod_without_tool() {
        let tmp = TempDir::new().unwrap();
        let go_mod = tmp.path().join("go.mod");
        std::fs::write(&go_mod, GO_MOD).unwrap();

        let deps = GoAnalyzer::offline().scan(&go_mod).unwrap();
        let names: Vec<_> = deps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "github.com/stretchr/testify",
                "github.com/gin-gonic/gin",
                "github.com/bytedance/sonic"
            ]
        );

        let sonic = &deps[2];
        assert_eq!(sonic.version, "v1.9.1");
        for dep in &deps {
            assert_eq!(dep.package_type, Ecosystem::Go);
            assert_eq!(dep.license_type, UNKNOWN);
            assert_eq!(dep.file_path, go_mod.display().to_string());
        }
    }

    #[test]
    fn test_vendored_module_license() {
        let tmp = TempDir::new().unwrap();
        let vendor = tmp.path().join("vendor/github.com/gin-gonic/gin");
        std::fs::create_dir_all(&vendor).unwrap();
        std::fs::write(vendor.join("LICENSE"), "The MIT License (MIT)").unwrap();

        let deps = parse_go_mod(GO_MOD, tmp.path());
        let gin = deps.iter().find(|d| d.name == "github.com/gin-gonic/gin").unwrap();
        assert_eq!(gin.license_type, "MIT");
        assert!(gin.license_text.is_some());
    }

    #[test]
    fn test_parse_go_sum_dedups() {
        let content = "\
github.com/gin-gonic/gin v1.9.1 h1:4idEAncQnU5cB7BeOkPtxjfCSye0AAm1R0RVIqJ+Jmg=
github.com/gin-gonic/gin v1.9.1/go.mod h1:hPrL7YrpYKXt5YId3A/Tnip5kqbEAP+KLuI3SUcPTeU=
github.com/gin-gonic/gin v1.9.1 h1:duplicate=
golang.org/x/net v0.10.0 h1:X2//UzNDwYmtCLn7To6G58Wr6f5ahEAQgKNzv9Y951M=

malformed-line
";
        let deps = parse_go_sum(content, Path::new("/nonexistent"));
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "github.com/gin-gonic/gin");
        assert_eq!(deps[0].version, "v1.9.1");
        assert_eq!(deps[1].name, "golang.org/x/net");
    }
}
