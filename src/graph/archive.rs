use super::object_list::collect_input_args;
use super::{NodeGraph, NodeId};

/// A downstream consumer that links or archives the objects of other nodes.
///
/// Only input enumeration is modelled; producing the archive is left to the
/// tool that consumes the argument list.
#[derive(Debug, Clone, Default)]
pub struct ArchiveNode {
    /// Object lists, objects or other archives, in link order.
    pub inputs: Vec<NodeId>,
}

impl ArchiveNode {
    /// Arguments for the tool producing this archive.
    pub fn input_args(
        &self,
        graph: &NodeGraph,
        pre: &str,
        post: &str,
        objects_instead_of_libs: bool,
        out: &mut Vec<String>,
    ) {
        collect_input_args(graph, &self.inputs, pre, post, objects_instead_of_libs, out);
    }
}
