//! The node graph: sole owner of every node, addressed by canonical name.
//!
//! Nodes live in an arena and are referred to by [`NodeId`] handles. Object
//! lists, objects and archives only ever hold handles, never ownership, so a
//! precompiled header can be shared by any number of object lists.
//!
//! Mutation needs `&mut NodeGraph`. A driver that expands object lists from
//! several threads wraps the graph in a `Mutex`; creation is cheap next to
//! compilation, so one lock around find-or-create is enough.

pub mod archive;
pub mod compiler;
pub mod directory_list;
pub mod node;
pub mod object;
pub mod object_list;
pub mod unity;

pub use archive::ArchiveNode;
pub use compiler::CompilerNode;
pub use directory_list::DirectoryListNode;
pub use node::{FileNode, Node, NodeId, NodeKind, NodeType};
pub use object::{Deoptimize, ObjectNode};
pub use object_list::{ObjectListNode, ObjectListSpec};
pub use unity::{IsolatedFile, UnityNode};

use std::collections::HashMap;
use std::path::{MAIN_SEPARATOR, MAIN_SEPARATOR_STR, Path};

use crate::error::{GraphError, Result};

/// Decides whether a directory scan should skip the source a PCH is built from.
///
/// Some vendors build the PCH by compiling a regular translation unit (MSVC's
/// `/Yc` on `pch.cpp`). When that source also sits in a scanned folder it
/// would otherwise be compiled twice.
pub trait PchSourcePolicy: Send + Sync {
    fn compiles_pch_source(&self, pch: &ObjectNode) -> bool;
}

/// Skip the PCH source when the PCH was created by an MSVC-like compiler.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsvcPchSource;

impl PchSourcePolicy for MsvcPchSource {
    fn compiles_pch_source(&self, pch: &ObjectNode) -> bool {
        pch.is_msvc()
    }
}

/// Never skip anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepPchSource;

impl PchSourcePolicy for KeepPchSource {
    fn compiles_pch_source(&self, _pch: &ObjectNode) -> bool {
        false
    }
}

pub struct NodeGraph {
    nodes: Vec<Node>,
    names: HashMap<String, NodeId>,
    working_dir: String,
    pch_source_policy: Box<dyn PchSourcePolicy>,
}

impl NodeGraph {
    /// Create an empty graph resolving relative paths against `working_dir`.
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        let working_dir = working_dir.as_ref();
        let absolute = std::path::absolute(working_dir).unwrap_or_else(|_| working_dir.to_path_buf());
        let mut dir = absolute.to_string_lossy().to_string();
        if !dir.ends_with(['/', '\\']) {
            dir.push(MAIN_SEPARATOR);
        }
        let mut graph = Self {
            nodes: Vec::new(),
            names: HashMap::new(),
            working_dir: String::new(),
            pch_source_policy: Box::new(MsvcPchSource),
        };
        graph.working_dir = graph.clean_path(&dir);
        graph
    }

    pub fn working_dir(&self) -> &str {
        &self.working_dir
    }

    pub fn set_pch_source_policy(&mut self, policy: Box<dyn PchSourcePolicy>) {
        self.pch_source_policy = policy;
    }

    pub fn pch_source_policy(&self) -> &dyn PchSourcePolicy {
        self.pch_source_policy.as_ref()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.nodes[id.index()].name()
    }

    pub fn stamp(&self, id: NodeId) -> u64 {
        self.nodes[id.index()].stamp
    }

    /// Record the result of a node's build step.
    pub fn set_stamp(&mut self, id: NodeId, stamp: u64) {
        self.nodes[id.index()].stamp = stamp;
    }

    /// Look a node up by name, trying the name verbatim and then as a cleaned path.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        if let Some(&id) = self.names.get(name) {
            return Some(id);
        }
        self.names.get(&self.clean_path(name)).copied()
    }

    /// Insert a node under a name that must not exist yet.
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> Result<NodeId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(GraphError::AlreadyDefined { name });
        }
        let id = NodeId(self.nodes.len() as u32);
        self.names.insert(name.clone(), id);
        self.nodes.push(Node::new(name, kind));
        Ok(id)
    }

    pub fn create_file_node(&mut self, name: &str) -> Result<NodeId> {
        let name = self.clean_path(name);
        self.add_node(name, NodeKind::File(FileNode))
    }

    pub fn create_compiler_node(&mut self, name: &str, compiler: CompilerNode) -> Result<NodeId> {
        self.add_node(name, NodeKind::Compiler(compiler))
    }

    pub fn create_unity_node(&mut self, name: &str, unity: UnityNode) -> Result<NodeId> {
        self.add_node(name, NodeKind::Unity(unity))
    }

    /// Create an archive consumer over existing object lists, objects or archives.
    pub fn create_archive_node(&mut self, name: &str, inputs: &[String]) -> Result<NodeId> {
        let mut resolved = Vec::with_capacity(inputs.len());
        for input in inputs {
            let id = self.find_node(input).ok_or_else(|| GraphError::TargetNotDefined {
                node: name.to_string(),
                property: "inputs".to_string(),
                target: input.clone(),
            })?;
            match self.node(id).node_type() {
                NodeType::ObjectList | NodeType::Object | NodeType::Archive => resolved.push(id),
                found => {
                    return Err(GraphError::UnexpectedType {
                        node: name.to_string(),
                        property: "inputs".to_string(),
                        target: input.clone(),
                        found,
                        expected: NodeType::ObjectList,
                    });
                }
            }
        }
        let name = self.clean_path(name);
        self.add_node(name, NodeKind::Archive(ArchiveNode { inputs: resolved }))
    }

    /// Find a file node, creating it when absent.
    ///
    /// Fails when the name is taken by something that is not a file.
    pub fn find_or_create_file_node(&mut self, name: &str, owner: &str, property: &str) -> Result<NodeId> {
        match self.find_node(name) {
            Some(id) if self.node(id).is_a_file() => Ok(id),
            Some(id) => Err(GraphError::NotAFile {
                node: owner.to_string(),
                property: property.to_string(),
                target: self.name(id).to_string(),
                found: self.node(id).node_type(),
            }),
            None => self.create_file_node(name),
        }
    }

    /// Resolve a compiler reference.
    ///
    /// A name that is not defined but looks like an executable path creates an
    /// implicit compiler node, with the family guessed from the file name.
    pub fn get_compiler_node(&mut self, name: &str, owner: &str, property: &str) -> Result<NodeId> {
        if let Some(id) = self.find_node(name) {
            let node = self.node(id);
            if node.as_compiler().is_some() {
                return Ok(id);
            }
            return Err(GraphError::UnexpectedType {
                node: owner.to_string(),
                property: property.to_string(),
                target: name.to_string(),
                found: node.node_type(),
                expected: NodeType::Compiler,
            });
        }

        let looks_like_path = name.contains(['/', '\\']) || name.to_lowercase().ends_with(".exe");
        if !looks_like_path {
            return Err(GraphError::TargetNotDefined {
                node: owner.to_string(),
                property: property.to_string(),
                target: name.to_string(),
            });
        }
        let executable = self.clean_path(name);
        tracing::debug!(compiler = %executable, "creating implicit compiler node");
        self.add_node(
            executable.clone(),
            NodeKind::Compiler(CompilerNode::from_executable(executable)),
        )
    }

    /// Share one directory list node between every requester of an identical scan.
    pub fn get_directory_list_node(&mut self, list: DirectoryListNode, owner: &str, property: &str) -> Result<NodeId> {
        let name = list.format_name();
        match self.names.get(&name) {
            Some(&id) if self.node(id).as_directory_list().is_some() => Ok(id),
            Some(&id) => Err(GraphError::UnexpectedType {
                node: owner.to_string(),
                property: property.to_string(),
                target: name,
                found: self.node(id).node_type(),
                expected: NodeType::DirectoryList,
            }),
            None => self.add_node(name, NodeKind::DirectoryList(list)),
        }
    }

    /// Canonical form of a path: absolute against the working directory,
    /// native separators, `.` and `..` collapsed. A trailing separator is kept.
    pub fn clean_path(&self, path: &str) -> String {
        let unified: String = path
            .chars()
            .map(|c| if c == '/' || c == '\\' { MAIN_SEPARATOR } else { c })
            .collect();
        let full = if Path::new(&unified).is_absolute() || unified.starts_with(MAIN_SEPARATOR) {
            unified
        } else {
            format!("{}{}", self.working_dir, unified)
        };

        let mut parts: Vec<&str> = Vec::new();
        for part in full.split(MAIN_SEPARATOR) {
            match part {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                p => parts.push(p),
            }
        }

        let mut out = String::with_capacity(full.len());
        if full.starts_with(MAIN_SEPARATOR) {
            out.push(MAIN_SEPARATOR);
        }
        out.push_str(&parts.join(MAIN_SEPARATOR_STR));
        if full.ends_with(MAIN_SEPARATOR) && !out.ends_with(MAIN_SEPARATOR) {
            out.push(MAIN_SEPARATOR);
        }
        out
    }

    /// [`clean_path`](Self::clean_path) with a guaranteed trailing separator.
    pub fn clean_dir(&self, path: &str) -> String {
        let mut dir = self.clean_path(path);
        if !dir.ends_with(MAIN_SEPARATOR) {
            dir.push(MAIN_SEPARATOR);
        }
        dir
    }

    /// Refresh the unity node's snapshot from its directory lists.
    pub fn refresh_unity(&mut self, id: NodeId) {
        let Some(unity) = self.node(id).as_unity() else {
            return;
        };
        let mut inputs = Vec::new();
        for &list in &unity.inputs {
            if let Some(dl) = self.node(list).as_directory_list() {
                inputs.extend(dl.files().iter().map(|f| (f.clone(), dl.path().to_string())));
            }
        }
        if let NodeKind::Unity(unity) = &mut self.node_mut(id).kind {
            unity.refresh(inputs);
        }
    }

    /// Replace a directory list's snapshot with files listed elsewhere.
    pub fn set_directory_list_files(&mut self, id: NodeId, files: Vec<String>) {
        if let NodeKind::DirectoryList(dl) = &mut self.node_mut(id).kind {
            dl.set_files(files);
        }
    }

    /// Rescan a directory list node.
    pub fn scan_directory_list(&mut self, id: NodeId) -> Result<usize> {
        match &mut self.node_mut(id).kind {
            NodeKind::DirectoryList(dl) => dl.scan(),
            _ => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::CompilerFamily;

    #[test]
    fn test_clean_path() {
        let graph = NodeGraph::new("/work/project");
        assert_eq!(graph.working_dir(), "/work/project/");
        assert_eq!(graph.clean_path("src/a.cpp"), "/work/project/src/a.cpp");
        assert_eq!(graph.clean_path("./src/../lib/b.cpp"), "/work/project/lib/b.cpp");
        assert_eq!(graph.clean_path("/abs//x/./y/"), "/abs/x/y/");
        assert_eq!(graph.clean_dir("out"), "/work/project/out/");

        let cwd = std::env::current_dir().unwrap();
        let here = NodeGraph::new(".");
        assert_eq!(here.working_dir(), NodeGraph::new(&cwd).working_dir());
        assert_eq!(
            here.clean_path("src/a.cpp"),
            cwd.join("src").join("a.cpp").to_string_lossy()
        );
    }

    #[test]
    fn test_add_node_rejects_duplicates() {
        let mut graph = NodeGraph::new("/work");
        graph.create_file_node("a.cpp").unwrap();
        let err = graph.create_file_node("/work/a.cpp").unwrap_err();
        assert!(matches!(err, GraphError::AlreadyDefined { .. }));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_find_node_cleans_names() {
        let mut graph = NodeGraph::new("/work");
        let id = graph.create_file_node("src/a.cpp").unwrap();
        assert_eq!(graph.find_node("/work/src/a.cpp"), Some(id));
        assert_eq!(graph.find_node("src/./a.cpp"), Some(id));
        assert_eq!(graph.find_node("src/b.cpp"), None);
    }

    #[test]
    fn test_find_or_create_file_node_rejects_non_files() {
        let mut graph = NodeGraph::new("/work");
        graph
            .create_compiler_node("/work/tool", CompilerNode::new("/work/tool", CompilerFamily::Custom))
            .unwrap();
        let err = graph.find_or_create_file_node("tool", "core", "compiler_input_files").unwrap_err();
        assert!(matches!(err, GraphError::NotAFile { found: NodeType::Compiler, .. }));

        let a = graph.find_or_create_file_node("a.cpp", "core", "compiler_input_files").unwrap();
        let b = graph.find_or_create_file_node("/work/a.cpp", "core", "compiler_input_files").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_get_compiler_node_implicit() {
        let mut graph = NodeGraph::new("/work");
        let id = graph.get_compiler_node("/usr/bin/g++", "core", "compiler").unwrap();
        assert_eq!(graph.node(id).as_compiler().unwrap().family, CompilerFamily::Gcc);
        assert_eq!(graph.get_compiler_node("/usr/bin/g++", "core", "compiler").unwrap(), id);

        let err = graph.get_compiler_node("msvc", "core", "compiler").unwrap_err();
        assert!(matches!(err, GraphError::TargetNotDefined { .. }));
    }

    #[test]
    fn test_directory_lists_are_shared() {
        let mut graph = NodeGraph::new("/work");
        let a = DirectoryListNode::new("/work/src/", vec!["*.cpp".to_string()], true);
        let b = a.clone();
        let id_a = graph.get_directory_list_node(a, "one", "compiler_input_path").unwrap();
        let id_b = graph.get_directory_list_node(b, "two", "compiler_input_path").unwrap();
        assert_eq!(id_a, id_b);
    }
}
