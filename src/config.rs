use crate::error::Result;
use crate::graph::{
    CompilerNode, DirectoryListNode, KeepPchSource, MsvcPchSource, NodeGraph, NodeId, ObjectListNode,
    ObjectListSpec, UnityNode,
};
use crate::toolchain::CompilerFamily;
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "objlist.toml";

#[derive(Deserialize, Debug, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, rename = "compiler")]
    pub compilers: Vec<CompilerConfig>,
    #[serde(default, rename = "unity")]
    pub unities: Vec<UnityConfig>,
    #[serde(default, rename = "object_list")]
    pub object_lists: Vec<ObjectListSpec>,
    #[serde(default, rename = "archive")]
    pub archives: Vec<ArchiveConfig>,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct Settings {
    /// Relative to the folder holding the config file.
    pub working_dir: Option<String>,
    pub stamp_db: String,
    pub pch_source: PchSourceMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            working_dir: None,
            stamp_db: ".objlist/stamps.json".to_string(),
            pch_source: PchSourceMode::Msvc,
        }
    }
}

/// Which PCH sources a directory scan leaves out.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PchSourceMode {
    /// Skip the source of PCHs built by MSVC-like compilers
    #[default]
    Msvc,
    /// Compile every scanned file
    Keep,
}

#[derive(Deserialize, Debug)]
pub struct CompilerConfig {
    pub name: String,
    pub executable: String,
    /// Guessed from the executable name when absent.
    pub family: Option<CompilerFamily>,
}

#[derive(Deserialize, Debug)]
pub struct UnityConfig {
    pub name: String,
    pub input_path: Vec<String>,
    #[serde(default = "default_patterns")]
    pub input_pattern: Vec<String>,
    #[serde(default = "default_true")]
    pub input_path_recurse: bool,
    pub output_path: String,
    #[serde(default = "default_unity_pattern")]
    pub output_pattern: String,
    #[serde(default = "default_num_files")]
    pub num_files: usize,
    #[serde(default)]
    pub isolate: Vec<String>,
}

#[derive(Deserialize, Debug)]
pub struct ArchiveConfig {
    pub name: String,
    pub inputs: Vec<String>,
}

fn default_patterns() -> Vec<String> {
    vec!["*.cpp".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_unity_pattern() -> String {
    "Unity*.cpp".to_string()
}

fn default_num_files() -> usize {
    1
}

/// A constructed graph plus the handles the driver walks.
pub struct Project {
    pub graph: NodeGraph,
    pub object_lists: Vec<NodeId>,
    pub archives: Vec<NodeId>,
    pub stamp_db: PathBuf,
}

// --- Helper: Load Config ---
pub fn load_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "{} not found.\n\n\
            💡 Tip: pass --config <path> or run from the folder holding {}.",
            path.display(),
            CONFIG_FILE
        ));
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} - check file permissions", path.display()))?;
    parse_config(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn parse_config(content: &str) -> anyhow::Result<ProjectConfig> {
    Ok(toml::from_str(content)?)
}

impl ProjectConfig {
    /// Construct every node, in dependency order: compilers, unity groups,
    /// object lists as declared, then archives.
    pub fn into_project(self, root: &Path) -> Result<Project> {
        let working_dir = match &self.settings.working_dir {
            Some(dir) => root.join(dir),
            None => root.to_path_buf(),
        };
        let mut graph = NodeGraph::new(&working_dir);
        if self.settings.pch_source == PchSourceMode::Keep {
            graph.set_pch_source_policy(Box::new(KeepPchSource));
        } else {
            graph.set_pch_source_policy(Box::new(MsvcPchSource));
        }

        for compiler in &self.compilers {
            let executable = graph.clean_path(&compiler.executable);
            let node = match compiler.family {
                Some(family) => CompilerNode::new(executable, family),
                None => CompilerNode::from_executable(executable),
            };
            graph.create_compiler_node(&compiler.name, node)?;
        }

        for unity in &self.unities {
            let mut node = UnityNode::new(
                graph.clean_dir(&unity.output_path),
                unity.output_pattern.clone(),
                unity.num_files,
            );
            node.isolate = unity.isolate.clone();
            for path in &unity.input_path {
                let dl = DirectoryListNode::new(
                    graph.clean_dir(path),
                    unity.input_pattern.clone(),
                    unity.input_path_recurse,
                );
                node.inputs
                    .push(graph.get_directory_list_node(dl, &unity.name, "input_path")?);
            }
            graph.create_unity_node(&unity.name, node)?;
        }

        let mut object_lists = Vec::with_capacity(self.object_lists.len());
        for spec in self.object_lists {
            object_lists.push(ObjectListNode::initialize(&mut graph, spec)?);
        }

        let mut archives = Vec::with_capacity(self.archives.len());
        for archive in &self.archives {
            archives.push(graph.create_archive_node(&archive.name, &archive.inputs)?);
        }

        tracing::debug!(
            nodes = graph.len(),
            object_lists = object_lists.len(),
            archives = archives.len(),
            "build graph constructed"
        );
        let stamp_db = working_dir.join(&self.settings.stamp_db);
        Ok(Project {
            graph,
            object_lists,
            archives,
            stamp_db,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[settings]
pch_source = "keep"

[[compiler]]
name = "clang"
executable = "/usr/bin/clang++"

[[unity]]
name = "engine-unity"
input_path = ["engine"]
output_path = "build/unity"
num_files = 2
isolate = ["engine/slow.cpp"]

[[object_list]]
name = "engine"
compiler = "clang"
compiler_options = "-c %1 -o %2"
compiler_output_path = "build/obj"
compiler_input_unity = ["engine-unity"]

[[archive]]
name = "build/libengine.a"
inputs = ["engine"]
"#;

    #[test]
    fn test_parse_config() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.settings.pch_source, PchSourceMode::Keep);
        assert_eq!(config.settings.stamp_db, ".objlist/stamps.json");
        assert_eq!(config.compilers.len(), 1);
        assert_eq!(config.compilers[0].family, None);
        assert_eq!(config.unities[0].output_pattern, "Unity*.cpp");
        assert_eq!(config.unities[0].input_pattern, vec!["*.cpp"]);
        assert_eq!(config.object_lists[0].compiler_input_unity, vec!["engine-unity"]);
        assert_eq!(config.archives[0].inputs, vec!["engine"]);
    }

    #[test]
    #[cfg(unix)]
    fn test_into_project_resolves_nodes() {
        let project = parse_config(SAMPLE).unwrap().into_project(Path::new("/work")).unwrap();
        assert_eq!(project.object_lists.len(), 1);
        assert_eq!(project.archives.len(), 1);
        assert!(project.graph.find_node("engine-unity").is_some());
        assert!(project.graph.find_node("/work/build/libengine.a").is_some());
        assert_eq!(project.stamp_db, Path::new("/work/.objlist/stamps.json"));
    }

    #[test]
    fn test_missing_config_has_tip() {
        let err = load_config(Path::new("/definitely/not/here/objlist.toml")).unwrap_err();
        assert!(err.to_string().contains("Tip"));
    }

    #[test]
    fn test_unknown_compiler_family_is_rejected() {
        let err = parse_config(
            r#"
[[compiler]]
name = "x"
executable = "x"
family = "fortran"
"#,
        );
        assert!(err.is_err());
    }
}
