//! Object lists: compile a declared set of inputs into objects.
//!
//! An object list is resolved once, when the graph is constructed, into a
//! fixed sequence of static dependencies:
//!
//! ```text
//! compiler, [preprocessor], [pch object], directory lists.., unity nodes.., files..
//! ```
//!
//! Everything from the first directory list onwards is the *input range*.
//! Before every build attempt that range is expanded again into a fresh list of
//! object nodes (the dynamic dependencies), and once those objects are built
//! their stamps are folded into the list's own stamp.

mod dynamic;
mod init;
mod output;

pub use dynamic::{do_dynamic_dependencies, gather_dynamic_dependencies};
pub use output::collect_input_args;

use std::ops::Range;
use std::sync::Arc;

use serde::Deserialize;
use xxhash_rust::xxh3::xxh3_64;

use super::{NodeGraph, NodeId, NodeType};
use crate::error::{GraphError, Result};
use crate::toolchain::default_object_extension;

/// Stamp of an object list that legitimately has nothing to build.
pub const EMPTY_STAMP: u64 = 1;

/// Declarative configuration of an object list.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObjectListSpec {
    pub name: String,
    pub compiler: String,
    pub compiler_options: String,
    pub compiler_options_deoptimized: Option<String>,
    pub compiler_output_path: Option<String>,
    pub compiler_output_prefix: String,
    pub compiler_output_extension: Option<String>,
    pub compiler_output_keep_base_extension: bool,
    pub compiler_input_allow_no_files: bool,
    pub compiler_input_path: Vec<String>,
    pub compiler_input_pattern: Vec<String>,
    pub compiler_input_path_recurse: bool,
    pub compiler_input_exclude_path: Vec<String>,
    pub compiler_input_excluded_files: Vec<String>,
    pub compiler_input_exclude_pattern: Vec<String>,
    pub compiler_input_unity: Vec<String>,
    pub compiler_input_files: Vec<String>,
    pub compiler_input_files_root: Option<String>,
    pub compiler_force_using: Vec<String>,
    pub deoptimize_writable_files: bool,
    pub deoptimize_writable_files_with_token: bool,
    pub allow_distribution: bool,
    pub allow_caching: bool,
    pub working_dir: Option<String>,
    pub pch_input_file: Option<String>,
    pub pch_output_file: Option<String>,
    pub pch_options: Option<String>,
    pub preprocessor: Option<String>,
    pub preprocessor_options: String,
    pub pre_build_dependencies: Vec<String>,
    /// File that receives the inputs each object was built from.
    pub dependencies_list_out_file: Option<String>,
    /// Left out of target listings.
    pub hidden: bool,
}

impl Default for ObjectListSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            compiler: String::new(),
            compiler_options: String::new(),
            compiler_options_deoptimized: None,
            compiler_output_path: None,
            compiler_output_prefix: String::new(),
            compiler_output_extension: None,
            compiler_output_keep_base_extension: false,
            compiler_input_allow_no_files: false,
            compiler_input_path: Vec::new(),
            compiler_input_pattern: vec!["*.cpp".to_string()],
            compiler_input_path_recurse: true,
            compiler_input_exclude_path: Vec::new(),
            compiler_input_excluded_files: Vec::new(),
            compiler_input_exclude_pattern: Vec::new(),
            compiler_input_unity: Vec::new(),
            compiler_input_files: Vec::new(),
            compiler_input_files_root: None,
            compiler_force_using: Vec::new(),
            deoptimize_writable_files: false,
            deoptimize_writable_files_with_token: false,
            allow_distribution: true,
            allow_caching: true,
            working_dir: None,
            pch_input_file: None,
            pch_output_file: None,
            pch_options: None,
            preprocessor: None,
            preprocessor_options: String::new(),
            pre_build_dependencies: Vec::new(),
            dependencies_list_out_file: None,
            hidden: false,
        }
    }
}

impl ObjectListSpec {
    pub fn new(name: impl Into<String>, compiler: impl Into<String>, options: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            compiler: compiler.into(),
            compiler_options: options.into(),
            ..Self::default()
        }
    }

    fn has_inputs(&self) -> bool {
        !self.compiler_input_path.is_empty()
            || !self.compiler_input_files.is_empty()
            || !self.compiler_input_unity.is_empty()
    }
}

/// Treat `Some("")` like `None`.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[derive(Debug, Clone)]
pub struct ObjectListNode {
    spec: Arc<ObjectListSpec>,
    static_deps: Vec<NodeId>,
    dynamic_deps: Vec<NodeId>,
    input_start: usize,
    input_end: usize,
    using_pch: bool,
    force_using: Vec<NodeId>,
    pre_build_deps: Vec<NodeId>,
    extra_pdb_path: Option<String>,
    extra_asm_path: Option<String>,
}

impl ObjectListNode {
    pub fn spec(&self) -> &ObjectListSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn static_dependencies(&self) -> &[NodeId] {
        &self.static_deps
    }

    /// Objects found by the last expansion, in build order.
    pub fn dynamic_dependencies(&self) -> &[NodeId] {
        &self.dynamic_deps
    }

    /// Slice of the static dependencies re-walked on every expansion.
    pub fn input_range(&self) -> Range<usize> {
        self.input_start..self.input_end
    }

    pub fn pre_build_dependencies(&self) -> &[NodeId] {
        &self.pre_build_deps
    }

    pub fn compiler(&self) -> NodeId {
        self.static_deps[0]
    }

    pub fn preprocessor(&self) -> Option<NodeId> {
        non_empty(&self.spec.preprocessor).map(|_| self.static_deps[1])
    }

    /// The PCH object, stored just before the input range.
    pub fn precompiled_header(&self) -> Option<NodeId> {
        self.using_pch.then(|| self.static_deps[self.input_start - 1])
    }

    pub fn is_using_pch(&self) -> bool {
        self.using_pch
    }

    pub fn extra_pdb_path(&self) -> Option<&str> {
        self.extra_pdb_path.as_deref()
    }

    pub fn extra_asm_path(&self) -> Option<&str> {
        self.extra_asm_path.as_deref()
    }

    pub fn obj_extension(&self) -> &str {
        non_empty(&self.spec.compiler_output_extension).unwrap_or(default_object_extension())
    }
}

/// Look up an object list by handle, failing on any other node kind.
pub fn object_list(graph: &NodeGraph, id: NodeId) -> Result<&ObjectListNode> {
    let node = graph.node(id);
    node.as_object_list().ok_or_else(|| GraphError::UnexpectedType {
        node: node.name().to_string(),
        property: "object list".to_string(),
        target: node.name().to_string(),
        found: node.node_type(),
        expected: NodeType::ObjectList,
    })
}

/// Fold child stamps, in order, into one stamp.
pub fn fold_stamps(stamps: &[u64]) -> u64 {
    if stamps.is_empty() {
        return EMPTY_STAMP;
    }
    let bytes: Vec<u8> = stamps.iter().flat_map(|s| s.to_le_bytes()).collect();
    xxh3_64(&bytes)
}

/// Build step of an object list: combine the stamps of its objects.
///
/// Every dynamic dependency must have been built already.
pub fn do_build(graph: &mut NodeGraph, id: NodeId) -> Result<u64> {
    let list = object_list(graph, id)?;
    let mut stamps = Vec::with_capacity(list.dynamic_deps.len());
    for &dep in &list.dynamic_deps {
        let stamp = graph.stamp(dep);
        if stamp == 0 {
            return Err(GraphError::IncompleteDependency {
                node: list.name().to_string(),
                dependency: graph.name(dep).to_string(),
            });
        }
        stamps.push(stamp);
    }

    let stamp = fold_stamps(&stamps);
    graph.set_stamp(id, stamp);
    tracing::debug!(node = %graph.name(id), objects = stamps.len(), stamp = %format!("{stamp:016x}"), "object list stamped");
    Ok(stamp)
}
