//! `.licignore` handling.
//!
//! Patterns follow ignore-file conventions: `#` starts a comment, a leading `!`
//! re-includes, a trailing `/` restricts the pattern to directories, and a
//! pattern containing `/` is matched against the path relative to the scan
//! root instead of the bare entry name. The last matching pattern decides.

use std::path::Path;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};

/// Default ignore file name looked up when the config does not name one.
pub const DEFAULT_IGNORE_FILE: &str = ".licignore";

/// One parsed line of an ignore file.
#[derive(Debug, Clone)]
pub struct IgnorePattern {
    pub pattern: String,
    pub negate: bool,
    pub dir_only: bool,
    glob: Option<GlobMatcher>,
}

impl IgnorePattern {
    /// Parse a single non-comment line.
    pub fn parse(line: &str) -> Self {
        let mut pattern = line.trim();
        let negate = pattern.starts_with('!');
        if negate {
            pattern = &pattern[1..];
        }
        let dir_only = pattern.ends_with('/');
        if dir_only {
            pattern = pattern.trim_end_matches('/');
        }
        let pattern = pattern.to_string();

        // A leading slash makes this a path pattern, anchored at the scan root.
        let glob_text = pattern.trim_start_matches('/').replace("**", "*");
        let glob = GlobBuilder::new(&glob_text)
            .literal_separator(true)
            .build()
            .ok()
            .map(|g| g.compile_matcher());

        IgnorePattern {
            pattern,
            negate,
            dir_only,
            glob,
        }
    }

    fn is_path_pattern(&self) -> bool {
        self.pattern.contains('/')
    }

    /// Whether this pattern matches, ignoring its negation flag.
    pub fn matches(&self, rel_path: &str, name: &str, is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }

        let target = if self.is_path_pattern() { rel_path } else { name };
        let literal = self.pattern.trim_start_matches('/');

        match &self.glob {
            Some(glob) => glob.is_match(target) || literal == target,
            None => literal == target,
        }
    }
}

/// Evaluate `patterns` in order; the last one that matches wins.
///
/// `rel_dir` is the parent directory relative to the scan root (`""` or `"."`
/// for the root itself) and `name` is the entry's file name.
pub fn evaluate_ignore_rules(
    patterns: &[IgnorePattern],
    rel_dir: &str,
    name: &str,
    is_dir: bool,
) -> bool {
    let rel_path = join_relative(rel_dir, name);
    let mut ignored = false;

    for p in patterns {
        if p.matches(&rel_path, name, is_dir) {
            ignored = !p.negate;
        }
    }

    ignored
}

fn join_relative(rel_dir: &str, name: &str) -> String {
    let dir = rel_dir.replace('\\', "/");
    let dir = dir.trim_start_matches("./").trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Ordered set of ignore patterns loaded from one file.
#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    patterns: Vec<IgnorePattern>,
}

impl IgnoreMatcher {
    /// Load patterns from `path`. A missing file yields a matcher that ignores nothing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ignore file {}", path.display()))?;
        Ok(Self::from_lines(&content))
    }

    pub fn from_lines(content: &str) -> Self {
        let patterns = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(IgnorePattern::parse)
            .collect();
        IgnoreMatcher { patterns }
    }

    pub fn patterns(&self) -> &[IgnorePattern] {
        &self.patterns
    }

    pub fn should_ignore(&self, rel_dir: &str, name: &str, is_dir: bool) -> bool {
        evaluate_ignore_rules(&self.patterns, rel_dir, name, is_dir)
    }
}

/// Patterns written by `license-audit init`.
pub fn default_patterns() -> &'static [&'static str] {
    &[
        "node_modules/",
        ".git/",
        ".svn/",
        ".hg/",
        "vendor/",
        "build/",
        "dist/",
        "target/",
        "bin/",
        "obj/",
        "*.tmp",
        "*.temp",
        ".DS_Store",
        "Thumbs.db",
    ]
}

pub fn write_default_ignore_file(path: &Path) -> Result<()> {
    let mut content = String::from("# Paths excluded from license-audit scans\n");
    for pattern in default_patterns() {
        content.push_str(pattern);
        content.push('\n');
    }
    std::fs::write(path, content)
        .with_context(|| format!("failed to write ignore file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn matcher() -> IgnoreMatcher {
        IgnoreMatcher::from_lines(
            "# Test ignore file\nnode_modules/\n*.tmp\ntest-*\n!test-important\n",
        )
    }

    #[test]
    fn test_should_ignore_basic_patterns() {
        let m = matcher();
        assert!(m.should_ignore(".", "node_modules", true));
        assert!(!m.should_ignore(".", "package.json", false));
        assert!(m.should_ignore(".", "test.tmp", false));
        assert!(m.should_ignore(".", "test-file", false));
        assert!(!m.should_ignore(".", "test-important", false));
        assert!(!m.should_ignore(".", "important-test", false));
    }

    #[test]
    fn test_dir_pattern_requires_directory() {
        let m = matcher();
        assert!(!m.should_ignore(".", "node_modules", false));
        assert!(m.should_ignore("packages/web", "node_modules", true));
    }

    #[test]
    fn test_last_match_wins() {
        let m = IgnoreMatcher::from_lines("*.log\n!keep.log\nkeep.*\n");
        // Re-excluded by the final pattern after the negation.
        assert!(m.should_ignore("", "keep.log", false));
        assert!(m.should_ignore("", "other.log", false));

        let m = IgnoreMatcher::from_lines("keep.*\n*.log\n!keep.log\n");
        assert!(!m.should_ignore("", "keep.log", false));
        assert!(m.should_ignore("", "keep.txt", false));
    }

    #[test]
    fn test_path_pattern_matches_relative_path() {
        let m = IgnoreMatcher::from_lines("docs/*.md\n/fixtures\n");
        assert!(m.should_ignore("docs", "readme.md", false));
        assert!(!m.should_ignore("src/docs", "readme.md", false));
        assert!(!m.should_ignore(".", "readme.md", false));
        assert!(m.should_ignore(".", "fixtures", true));
        assert!(!m.should_ignore("nested", "fixtures", true));
    }

    #[test]
    fn test_star_does_not_cross_separators() {
        let m = IgnoreMatcher::from_lines("a/*\na/**/deep\n");
        assert!(m.should_ignore("a", "b", false));
        assert!(!m.should_ignore("a/b", "c", false));
        assert!(m.should_ignore("a/x", "deep", false));
        assert!(!m.should_ignore("a/x/y", "deep", false));
    }

    #[test]
    fn test_character_class_and_question_mark() {
        let m = IgnoreMatcher::from_lines("file?.txt\n[ab]*.json\n");
        assert!(m.should_ignore("", "file1.txt", false));
        assert!(!m.should_ignore("", "file10.txt", false));
        assert!(m.should_ignore("", "a-lock.json", false));
        assert!(!m.should_ignore("", "c-lock.json", false));
    }

    #[test]
    fn test_missing_file_is_permissive() {
        let tmp = TempDir::new().unwrap();
        let m = IgnoreMatcher::load(&tmp.path().join("nonexistent.ignore")).unwrap();
        assert!(m.patterns().is_empty());
        assert!(!m.should_ignore("./", "any-file", false));
    }

    #[test]
    fn test_default_ignore_file_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_IGNORE_FILE);
        write_default_ignore_file(&path).unwrap();

        let m = IgnoreMatcher::load(&path).unwrap();
        assert_eq!(m.patterns().len(), default_patterns().len());
        assert!(m.should_ignore("", "node_modules", true));
        assert!(m.should_ignore("", ".git", true));
        assert!(m.should_ignore("src", "scratch.tmp", false));
    }
}
