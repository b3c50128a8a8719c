use std::path::Path;

use anyhow::{bail, Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

use super::{file_name, read_manifest};
use crate::models::{Dependency, Ecosystem};

/// Analyzer for Maven and Gradle builds.
///
/// `pom.xml` is read with quick-xml; only `project/dependencies/dependency`
/// is considered, so `dependencyManagement` and plugin dependencies are left
/// out. Gradle build scripts are recognised but yield nothing.
pub struct JavaAnalyzer;

impl JavaAnalyzer {
    /// Create a new `JavaAnalyzer`.
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for JavaAnalyzer {
    fn name(&self) -> &'static str {
        "java"
    }

    fn detect(&self, path: &Path) -> bool {
        matches!(file_name(path), "pom.xml" | "build.gradle" | "build.gradle.kts")
    }

    fn scan(&self, path: &Path) -> Result<Vec<Dependency>> {
        match file_name(path) {
            "pom.xml" => {
                let content = read_manifest(path)?;
                let deps = parse_pom_xml(&content)
                    .with_context(|| format!("failed to parse {}", path.display()))?;
                let file_path = path.display().to_string();
                Ok(deps
                    .into_iter()
                    .map(|d| d.with_file_path(&file_path))
                    .collect())
            }
            "build.gradle" | "build.gradle.kts" => Ok(Vec::new()),
            other => bail!("unsupported Java file: {}", other),
        }
    }
}

const DEPENDENCY_PATH: [&str; 3] = ["project", "dependencies", "dependency"];

/// Parse `pom.xml` using the quick-xml event API.
pub fn parse_pom_xml(content: &str) -> Result<Vec<Dependency>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut deps = Vec::new();
    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();

    let mut group_id = String::new();
    let mut artifact_id = String::new();
    let mut version = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let name = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                stack.push(name);
                if stack == DEPENDENCY_PATH {
                    group_id.clear();
                    artifact_id.clear();
                    version.clear();
                }
            }
            Event::End(_) => {
                if stack == DEPENDENCY_PATH && !(group_id.is_empty() && artifact_id.is_empty()) {
                    let name = format!("{}:{}", group_id, artifact_id);
                    deps.push(Dependency::new(&name, &version, Ecosystem::Maven));
                }
                stack.pop();
            }
            Event::Text(ref e) => {
                // Text directly under project/dependencies/dependency/<field>
                if stack.len() == DEPENDENCY_PATH.len() + 1 && stack[..3] == DEPENDENCY_PATH {
                    let text = e.unescape()?;
                    match stack[3].as_str() {
                        "groupId" => group_id = text.trim().to_string(),
                        "artifactId" => artifact_id = text.trim().to_string(),
                        "version" => version = text.trim().to_string(),
                        _ => {}
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        bail!("unexpected end of document inside <{}>", stack.join("/"));
    }

    Ok(deps)
}
