//! Unity groups: many sources merged into a few translation units.
//!
//! A unity node owns a snapshot of what it produced last: the merged file
//! names, which scanned file went into which merged file, and the files kept
//! out of merging ("isolated") together with the scan root they came from.

use std::path::MAIN_SEPARATOR;

use super::directory_list::path_begins_with;

/// A file excluded from merging, compiled on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolatedFile {
    pub file: String,
    /// Root of the directory scan that found the file.
    pub dir_list_origin: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct UnityMember {
    file: String,
    base_dir: String,
    unity_index: usize,
}

#[derive(Debug, Clone)]
pub struct UnityNode {
    /// Output folder for merged files (cleaned, trailing separator).
    pub output_path: String,
    /// File name pattern, `*` is replaced by the 1-based merged file index.
    pub output_pattern: String,
    pub num_files: usize,
    /// Sources kept out of merging, matched by path suffix.
    pub isolate: Vec<String>,
    /// Directory lists providing the sources.
    pub inputs: Vec<super::NodeId>,
    unity_files: Vec<String>,
    isolated_files: Vec<IsolatedFile>,
    members: Vec<UnityMember>,
}

impl UnityNode {
    pub fn new(output_path: impl Into<String>, output_pattern: impl Into<String>, num_files: usize) -> Self {
        Self {
            output_path: output_path.into(),
            output_pattern: output_pattern.into(),
            num_files: num_files.max(1),
            isolate: Vec::new(),
            inputs: Vec::new(),
            unity_files: Vec::new(),
            isolated_files: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn unity_file_names(&self) -> &[String] {
        &self.unity_files
    }

    pub fn isolated_files(&self) -> &[IsolatedFile] {
        &self.isolated_files
    }

    /// Replace the snapshot with merged and isolated lists produced elsewhere.
    pub fn set_snapshot(&mut self, unity_files: Vec<String>, isolated_files: Vec<IsolatedFile>) {
        self.unity_files = unity_files;
        self.isolated_files = isolated_files;
        self.members.clear();
    }

    /// Rebuild the snapshot from `(file, scan root)` pairs in scan order.
    ///
    /// Non-isolated files are split into contiguous runs over at most
    /// `num_files` merged files, so membership only moves when files are added
    /// or removed.
    pub fn refresh(&mut self, inputs: Vec<(String, String)>) {
        let (isolated, merged): (Vec<_>, Vec<_>) =
            inputs.into_iter().partition(|(file, _)| self.is_isolated(file));

        self.isolated_files = isolated
            .into_iter()
            .map(|(file, dir_list_origin)| IsolatedFile { file, dir_list_origin })
            .collect();

        let count = self.num_files.min(merged.len());
        self.unity_files = (1..=count)
            .map(|i| format!("{}{}", self.output_path, self.output_pattern.replace('*', &i.to_string())))
            .collect();

        // Runs differ in length by at most one, so no merged file is left empty
        let len = merged.len();
        self.members = merged
            .into_iter()
            .enumerate()
            .map(|(i, (file, base_dir))| UnityMember {
                file,
                base_dir,
                unity_index: i * count / len,
            })
            .collect();
    }

    fn is_isolated(&self, file: &str) -> bool {
        self.isolate.iter().any(|entry| {
            let entry = entry.replace(['/', '\\'], &MAIN_SEPARATOR.to_string());
            file.ends_with(&entry) || path_begins_with(file, &entry)
        })
    }

    /// Source text of merged file `index` (0-based).
    pub fn render(&self, index: usize) -> String {
        let mut out = String::from("// Auto-generated unity file, do not modify\n");
        for member in self.members.iter().filter(|m| m.unity_index == index) {
            out.push_str(&format!("#include \"{}\"\n", member.file));
        }
        out
    }

    /// Visit every logical input: merged members first, then isolated files.
    pub fn enumerate_input_files(&self, callback: &mut dyn FnMut(&str, &str)) {
        for member in &self.members {
            callback(&member.file, &member.base_dir);
        }
        for isolated in &self.isolated_files {
            callback(&isolated.file, &isolated.dir_list_origin);
        }
    }
}
