use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use regex::Regex;

use super::{file_name, read_manifest};
use crate::models::{Dependency, Ecosystem};

/// Analyzer for Dockerfiles.
///
/// `FROM` lines become `docker-image` dependencies; package-manager installs
/// inside `RUN` lines contribute one package name per install command.
pub struct DockerAnalyzer;

impl DockerAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for DockerAnalyzer {
    fn name(&self) -> &'static str {
        "docker"
    }

    fn detect(&self, path: &Path) -> bool {
        let name = file_name(path);
        name == "Dockerfile" || name == "dockerfile" || name.ends_with(".dockerfile")
    }

    fn scan(&self, path: &Path) -> Result<Vec<Dependency>> {
        let content = read_manifest(path)?;
        let file_path = path.display().to_string();
        Ok(parse_dockerfile(&content)?
            .into_iter()
            .map(|d| d.with_file_path(&file_path))
            .collect())
    }
}

/// A package-manager install verb and the flags that consume the next token.
struct Installer {
    verb: Regex,
    ecosystem: Ecosystem,
    value_flags: &'static [&'static str],
}

impl Installer {
    /// First package argument following each occurrence of the verb.
    fn packages<'a>(&'a self, command: &'a str) -> impl Iterator<Item = String> + 'a {
        self.verb
            .find_iter(command)
            .filter_map(move |m| self.first_package(&command[m.end()..]))
    }

    fn first_package(&self, args: &str) -> Option<String> {
        let mut tokens = args.split_whitespace();
        while let Some(token) = tokens.next() {
            if token.starts_with('-') {
                if self.value_flags.iter().any(|flag| *flag == token) {
                    tokens.next();
                }
                continue;
            }
            return clean_package_token(token);
        }
        None
    }
}

/// Install commands and the ecosystem of what they install.
fn installers() -> Result<Vec<Installer>> {
    let table: [(&str, Ecosystem, &'static [&'static str]); 6] = [
        (
            r"\bapt(?:-get)?\s+install\b",
            Ecosystem::Apt,
            &["-t", "--target-release", "-o", "--option", "-c", "--config-file"],
        ),
        (
            r"\b(?:yum|dnf)\s+install\b",
            Ecosystem::Yum,
            &["-c", "--config", "--enablerepo", "--disablerepo", "--releasever", "--installroot"],
        ),
        (
            r"\bapk\s+add\b",
            Ecosystem::Apk,
            &["-X", "--repository", "-p", "--root", "-t", "--virtual"],
        ),
        (
            r"\bnpm\s+(?:install|i)\b",
            Ecosystem::Npm,
            &["--prefix", "--registry", "-w", "--workspace"],
        ),
        (
            r"\bpip3?\s+install\b",
            Ecosystem::Python,
            &[
                "-r", "--requirement", "-c", "--constraint", "-e", "--editable", "-i",
                "--index-url", "--extra-index-url", "-f", "--find-links", "-t", "--target",
                "--prefix", "--trusted-host",
            ],
        ),
        (
            r"\bgem\s+install\b",
            Ecosystem::Ruby,
            &["-v", "--version", "-i", "--install-dir", "-s", "--source", "-n", "--bindir"],
        ),
    ];

    table
        .into_iter()
        .map(|(verb, ecosystem, value_flags)| {
            Ok(Installer {
                verb: Regex::new(&format!("(?i){verb}"))?,
                ecosystem,
                value_flags,
            })
        })
        .collect()
}

pub fn parse_dockerfile(content: &str) -> Result<Vec<Dependency>> {
    let installers = installers()?;
    let mut deps = Vec::new();
    let mut stages: HashSet<String> = HashSet::new();

    for line in logical_lines(content) {
        let line = line.trim();

        // Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (instruction, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        match instruction.to_ascii_uppercase().as_str() {
            "RUN" => deps.extend(parse_run(rest, &installers)),
            "FROM" => {
                if let Some(dep) = parse_from(rest, &mut stages) {
                    deps.push(dep);
                }
            }
            _ => {}
        }
    }

    Ok(deps)
}

/// Join backslash-continued lines so a multi-line `RUN` is seen whole.
fn logical_lines(content: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for raw in content.lines() {
        let trimmed = raw.trim_end();
        // Comment lines inside a continuation are dropped by the builder.
        if !current.is_empty() && trimmed.trim_start().starts_with('#') {
            continue;
        }
        match trimmed.strip_suffix('\\') {
            Some(head) => {
                current.push_str(head);
                current.push(' ');
            }
            None => {
                current.push_str(trimmed);
                lines.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

fn parse_run(command: &str, installers: &[Installer]) -> Vec<Dependency> {
    installers
        .iter()
        .flat_map(|installer| {
            installer
                .packages(command)
                .map(move |name| Dependency::new(&name, "", installer.ecosystem))
        })
        .collect()
}

/// Trim quotes and reject shell syntax that the capture can land on.
fn clean_package_token(token: &str) -> Option<String> {
    let name = token
        .trim()
        .trim_end_matches(';')
        .trim_matches(|c| c == '"' || c == '\'');

    if name.is_empty() || name.contains(char::is_whitespace) || name.starts_with('$') {
        return None;
    }
    if matches!(name, "&&" | "||" | "\\" | "|" | ";" | "&") {
        return None;
    }

    Some(name.to_string())
}

/// `FROM [--platform=…] image[:tag] [AS stage]`. Earlier stage names and
/// `scratch` are not images.
fn parse_from(args: &str, stages: &mut HashSet<String>) -> Option<Dependency> {
    let mut parts = args.split_whitespace().filter(|p| !p.starts_with("--"));
    let image = parts.next()?;

    if let (Some(kw), Some(stage)) = (parts.next(), parts.next()) {
        if kw.eq_ignore_ascii_case("as") {
            stages.insert(stage.to_ascii_lowercase());
        }
    }

    if image.eq_ignore_ascii_case("scratch") || stages.contains(&image.to_ascii_lowercase()) {
        return None;
    }

    let (name, tag) = split_image_ref(image);
    Some(Dependency::new(name, tag, Ecosystem::DockerImage))
}

/// Split `[registry[:port]/]repo[:tag][@digest]` into repository and tag.
/// The digest is dropped; a missing tag means `latest`.
fn split_image_ref(image: &str) -> (&str, &str) {
    let image = image.split_once('@').map_or(image, |(head, _)| head);
    let path_start = image.rfind('/').map_or(0, |i| i + 1);

    match image[path_start..].rfind(':') {
        Some(i) => (&image[..path_start + i], &image[path_start + i + 1..]),
        None => (image, "latest"),
    }
}
