//! Directory scans feeding object lists and unity groups.

use regex::{Regex, RegexBuilder};
use walkdir::WalkDir;

use crate::error::{GraphError, Result};

#[derive(Debug, Clone)]
pub struct DirectoryListNode {
    /// Scan root, cleaned and ending with a separator.
    path: String,
    pub patterns: Vec<String>,
    pub recurse: bool,
    /// Directories (cleaned, trailing separator) whose contents are skipped.
    pub exclude_paths: Vec<String>,
    /// Files skipped when a scanned path ends with one of these.
    pub exclude_files: Vec<String>,
    /// Wildcards matched against the full path.
    pub exclude_patterns: Vec<String>,
    files: Vec<String>,
}

impl DirectoryListNode {
    pub fn new(path: impl Into<String>, patterns: Vec<String>, recurse: bool) -> Self {
        Self {
            path: path.into(),
            patterns,
            recurse,
            exclude_paths: Vec::new(),
            exclude_files: Vec::new(),
            exclude_patterns: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Deterministic name, so identical scans requested by different lists share one node.
    pub fn format_name(&self) -> String {
        let mut name = format!(
            "{}|{}|{}",
            self.path,
            self.patterns.join("<"),
            if self.recurse { "true" } else { "false" }
        );
        name.push('|');
        name.push_str(&self.exclude_paths.join("<"));
        name.push('|');
        name.push_str(&self.exclude_files.join("<"));
        name.push('|');
        name.push_str(&self.exclude_patterns.join("<"));
        name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Files found by the last scan, in scan order.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Replace the snapshot with a listing produced elsewhere.
    pub fn set_files(&mut self, files: Vec<String>) {
        self.files = files;
    }

    /// Walk the root and refresh the snapshot. A missing root yields no files.
    pub fn scan(&mut self) -> Result<usize> {
        let root = std::path::Path::new(&self.path);
        if !root.is_dir() {
            tracing::warn!(path = %self.path, "directory list root does not exist");
            self.files.clear();
            return Ok(0);
        }

        let include = self
            .patterns
            .iter()
            .map(|p| wildcard_regex(p))
            .collect::<Result<Vec<_>>>()?;
        let exclude = self
            .exclude_patterns
            .iter()
            .map(|p| wildcard_regex(p))
            .collect::<Result<Vec<_>>>()?;

        let max_depth = if self.recurse { usize::MAX } else { 1 };
        let mut files = Vec::new();
        for entry in WalkDir::new(root).max_depth(max_depth).sort_by_file_name() {
            let entry = entry.map_err(|e| GraphError::DirectoryScan {
                path: self.path.clone(),
                source: e,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let full = entry.path().to_string_lossy().to_string();
            let file_name = entry.file_name().to_string_lossy();

            if !include.is_empty() && !include.iter().any(|re| re.is_match(&file_name)) {
                continue;
            }
            if self.is_excluded(&full, &exclude) {
                continue;
            }
            files.push(full);
        }

        tracing::debug!(path = %self.path, count = files.len(), "directory scanned");
        self.files = files;
        Ok(self.files.len())
    }

    fn is_excluded(&self, full: &str, exclude_patterns: &[Regex]) -> bool {
        self.exclude_paths.iter().any(|p| path_begins_with(full, p))
            || self.exclude_files.iter().any(|f| path_ends_with(full, f))
            || exclude_patterns.iter().any(|re| re.is_match(full))
    }
}

/// Translate a `*`/`?` wildcard into an anchored regex.
pub fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    re.push('$');
    RegexBuilder::new(&re)
        .case_insensitive(cfg!(windows))
        .build()
        .map_err(|e| GraphError::InvalidPattern {
            pattern: pattern.to_string(),
            source: e,
        })
}

/// Prefix test honouring the platform's path case rules.
pub fn path_begins_with(path: &str, prefix: &str) -> bool {
    if cfg!(windows) {
        path.len() >= prefix.len()
            && path.is_char_boundary(prefix.len())
            && path[..prefix.len()].eq_ignore_ascii_case(prefix)
    } else {
        path.starts_with(prefix)
    }
}

fn path_ends_with(path: &str, suffix: &str) -> bool {
    let suffix = suffix.replace(['/', '\\'], std::path::MAIN_SEPARATOR_STR);
    if cfg!(windows) {
        path.to_lowercase().ends_with(&suffix.to_lowercase())
    } else {
        path.ends_with(&suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn dir_string(path: &std::path::Path) -> String {
        format!("{}{}", path.display(), std::path::MAIN_SEPARATOR)
    }

    #[test]
    fn test_wildcard_regex() {
        let re = wildcard_regex("*.cpp").unwrap();
        assert!(re.is_match("main.cpp"));
        assert!(!re.is_match("main.cpp.bak"));
        assert!(!re.is_match("main.c"));

        let re = wildcard_regex("unit?.c").unwrap();
        assert!(re.is_match("unit1.c"));
        assert!(!re.is_match("unit12.c"));
    }

    #[test]
    fn test_format_name_is_deterministic() {
        let a = DirectoryListNode::new("/src/", vec!["*.cpp".to_string()], true);
        let b = DirectoryListNode::new("/src/", vec!["*.cpp".to_string()], true);
        let c = DirectoryListNode::new("/src/", vec!["*.cpp".to_string()], false);
        assert_eq!(a.format_name(), b.format_name());
        assert_ne!(a.format_name(), c.format_name());
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::create_dir_all(dir.path().join("skip")).unwrap();
        fs::write(dir.path().join("b.cpp"), "").unwrap();
        fs::write(dir.path().join("a.cpp"), "").unwrap();
        fs::write(dir.path().join("a.h"), "").unwrap();
        fs::write(dir.path().join("sub/c.cpp"), "").unwrap();
        fs::write(dir.path().join("sub/gen_c.cpp"), "").unwrap();
        fs::write(dir.path().join("skip/d.cpp"), "").unwrap();

        let root = dir_string(dir.path());
        let mut list = DirectoryListNode::new(root.clone(), vec!["*.cpp".to_string()], true);
        list.exclude_paths.push(format!("{root}skip{}", std::path::MAIN_SEPARATOR));
        list.exclude_patterns.push("*gen_*".to_string());

        assert_eq!(list.scan().unwrap(), 3);
        let names: Vec<String> = list
            .files()
            .iter()
            .map(|f| f.strip_prefix(&root).unwrap().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.cpp", "b.cpp", "sub/c.cpp"]);
    }

    #[test]
    fn test_scan_without_recursion_and_excluded_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.cpp"), "").unwrap();
        fs::write(dir.path().join("b.cpp"), "").unwrap();
        fs::write(dir.path().join("sub/c.cpp"), "").unwrap();

        let mut list = DirectoryListNode::new(dir_string(dir.path()), vec!["*.cpp".to_string()], false);
        list.exclude_files.push("b.cpp".to_string());
        assert_eq!(list.scan().unwrap(), 1);
        assert!(list.files()[0].ends_with("a.cpp"));
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        let mut list = DirectoryListNode::new("/definitely/not/here/", vec!["*.cpp".to_string()], true);
        assert_eq!(list.scan().unwrap(), 0);
    }
}
