use std::fmt;

use super::archive::ArchiveNode;
use super::compiler::CompilerNode;
use super::directory_list::DirectoryListNode;
use super::object::ObjectNode;
use super::object_list::ObjectListNode;
use super::unity::UnityNode;

/// Handle to a node owned by a [`NodeGraph`](super::NodeGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Payload-free tag of a node kind, used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    File,
    Compiler,
    DirectoryList,
    Unity,
    Object,
    ObjectList,
    Archive,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A plain input file. Carries no data beyond its name.
#[derive(Debug, Clone, Default)]
pub struct FileNode;

#[derive(Debug, Clone)]
pub enum NodeKind {
    File(FileNode),
    Compiler(CompilerNode),
    DirectoryList(DirectoryListNode),
    Unity(UnityNode),
    Object(ObjectNode),
    ObjectList(ObjectListNode),
    Archive(ArchiveNode),
}

#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    pub(crate) stamp: u64,
    pub kind: NodeKind,
}

impl Node {
    pub(crate) fn new(name: String, kind: NodeKind) -> Self {
        Self { name, stamp: 0, kind }
    }

    /// Canonical name, unique within the graph.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Freshness marker. Zero means "not built yet".
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::File(_) => NodeType::File,
            NodeKind::Compiler(_) => NodeType::Compiler,
            NodeKind::DirectoryList(_) => NodeType::DirectoryList,
            NodeKind::Unity(_) => NodeType::Unity,
            NodeKind::Object(_) => NodeType::Object,
            NodeKind::ObjectList(_) => NodeType::ObjectList,
            NodeKind::Archive(_) => NodeType::Archive,
        }
    }

    /// Nodes whose name is a path on disk that an object can compile or link.
    pub fn is_a_file(&self) -> bool {
        matches!(self.kind, NodeKind::File(_) | NodeKind::Object(_))
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match &self.kind {
            NodeKind::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_list(&self) -> Option<&ObjectListNode> {
        match &self.kind {
            NodeKind::ObjectList(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_compiler(&self) -> Option<&CompilerNode> {
        match &self.kind {
            NodeKind::Compiler(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_directory_list(&self) -> Option<&DirectoryListNode> {
        match &self.kind {
            NodeKind::DirectoryList(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_unity(&self) -> Option<&UnityNode> {
        match &self.kind {
            NodeKind::Unity(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_archive(&self) -> Option<&ArchiveNode> {
        match &self.kind {
            NodeKind::Archive(a) => Some(a),
            _ => None,
        }
    }
}
