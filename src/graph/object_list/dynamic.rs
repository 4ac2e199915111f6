use std::fs;
use std::path::PathBuf;

use super::{ObjectListNode, non_empty, object_list};
use crate::error::{GraphError, Result};
use crate::graph::{Deoptimize, NodeGraph, NodeId, NodeKind, NodeType, ObjectNode};
use crate::toolchain::CompilerFamily;
use crate::toolchain::flags::{self, ObjectFlags};

/// Everything that varies between the objects one list creates.
pub(super) struct ObjectRequest<'a> {
    pub name: String,
    pub source: NodeId,
    pub flags: ObjectFlags,
    pub options: &'a str,
    pub options_deoptimized: &'a str,
    pub preprocessor: Option<(NodeId, ObjectFlags)>,
    pub pch_object_name: Option<String>,
}

/// Snapshot of one static input, detached from the graph so it can be mutated.
enum StaticInput {
    Listing { root: String, files: Vec<String> },
    Unity { merged: Vec<String>, isolated: Vec<(String, String)> },
    File,
}

/// How an object relates to unity merging.
#[derive(Clone, Copy, PartialEq, Eq)]
enum UnityRole {
    None,
    Merged,
    Isolated,
}

impl ObjectListNode {
    /// Build, validate and register one object node owned by this list.
    pub(super) fn create_object_node(&self, graph: &mut NodeGraph, req: ObjectRequest<'_>) -> Result<NodeId> {
        let spec = &self.spec;
        let creating_pch = req.flags.contains(ObjectFlags::CREATING_PCH);

        let mut flags = req.flags;
        if !spec.allow_caching {
            flags.remove(ObjectFlags::CAN_BE_CACHED);
        }
        if !spec.allow_distribution {
            flags.remove(ObjectFlags::CAN_BE_DISTRIBUTED);
        }

        let node = ObjectNode {
            compiler: self.compiler(),
            compiler_options: req.options.to_string(),
            compiler_options_deoptimized: req.options_deoptimized.to_string(),
            // Precompiled headers are never de-optimized
            deoptimize: if creating_pch {
                Deoptimize::Never
            } else {
                Deoptimize::from_flags(spec.deoptimize_writable_files, spec.deoptimize_writable_files_with_token)
            },
            source: req.source,
            precompiled_header: self.precompiled_header(),
            pch_object_name: req.pch_object_name,
            preprocessor: req.preprocessor.map(|(id, _)| id),
            preprocessor_options: if req.preprocessor.is_some() {
                spec.preprocessor_options.clone()
            } else {
                String::new()
            },
            preprocessor_flags: req.preprocessor.map(|(_, f)| f).unwrap_or_default(),
            flags,
            owner: spec.name.clone(),
            working_dir: spec.working_dir.clone(),
            force_using: self.force_using.clone(),
            pre_build_dependencies: self.pre_build_deps.clone(),
            dependencies_list_out_file: spec.dependencies_list_out_file.clone(),
        };

        node.validate(graph, &req.name)?;
        tracing::trace!(object = %req.name, source = %graph.name(req.source), "creating object node");
        graph.add_node(req.name, NodeKind::Object(node))
    }

    /// Find the object compiling `input` or create it.
    ///
    /// An existing object is only reused when it compiles the same source for
    /// the same object list; anything else mapping to the same output is a
    /// conflict.
    fn create_dynamic_object_node(
        &self,
        graph: &mut NodeGraph,
        deps: &mut Vec<NodeId>,
        input: NodeId,
        base_dir: &str,
        role: UnityRole,
    ) -> Result<()> {
        let obj_file = self.object_file_name(graph.name(input), base_dir);

        let id = match graph.find_node(&obj_file) {
            None => {
                let family = graph
                    .node(self.compiler())
                    .as_compiler()
                    .map(|c| c.family)
                    .unwrap_or(CompilerFamily::Custom);
                let mut obj_flags =
                    flags::determine_flags(family, &self.spec.compiler_options, false, self.using_pch);
                match role {
                    UnityRole::None => {}
                    UnityRole::Merged => obj_flags |= ObjectFlags::UNITY,
                    UnityRole::Isolated => obj_flags |= ObjectFlags::ISOLATED_FROM_UNITY,
                }

                let preprocessor = self.preprocessor().map(|pp| {
                    let pp_family = graph
                        .node(pp)
                        .as_compiler()
                        .map(|c| c.family)
                        .unwrap_or(CompilerFamily::Custom);
                    let pp_flags =
                        flags::determine_flags(pp_family, &self.spec.preprocessor_options, false, self.using_pch);
                    (pp, pp_flags)
                });

                self.create_object_node(
                    graph,
                    ObjectRequest {
                        name: obj_file,
                        source: input,
                        flags: obj_flags,
                        options: &self.spec.compiler_options,
                        options_deoptimized: non_empty(&self.spec.compiler_options_deoptimized).unwrap_or_default(),
                        preprocessor,
                        pch_object_name: None,
                    },
                )?
            }
            Some(existing) => {
                let node = graph.node(existing);
                let Some(other) = node.as_object() else {
                    return Err(GraphError::UnexpectedType {
                        node: self.name().to_string(),
                        property: "object".to_string(),
                        target: obj_file,
                        found: node.node_type(),
                        expected: NodeType::Object,
                    });
                };
                if other.source != input || other.owner != self.spec.name {
                    return Err(GraphError::ConflictingObjects {
                        object: obj_file,
                        source_a: graph.name(input).to_string(),
                        owner_a: self.spec.name.clone(),
                        source_b: graph.name(other.source).to_string(),
                        owner_b: other.owner.clone(),
                    });
                }
                existing
            }
        };

        deps.push(id);
        Ok(())
    }

    /// Expand the input range into objects, without touching `self`.
    fn expand(&self, graph: &mut NodeGraph) -> Result<Vec<NodeId>> {
        let name = self.name();
        let mut deps = Vec::new();

        // Vendors that build the PCH from a regular source would compile it twice
        // if a directory scan picked that source up as well
        let pch_source = self.precompiled_header().and_then(|pch| {
            let pch = graph.node(pch).as_object()?;
            graph
                .pch_source_policy()
                .compiles_pch_source(pch)
                .then_some(pch.source)
        });

        for &dep in &self.static_deps[self.input_range()] {
            let input = match &graph.node(dep).kind {
                NodeKind::DirectoryList(dl) => StaticInput::Listing {
                    root: dl.path().to_string(),
                    files: dl.files().to_vec(),
                },
                NodeKind::Unity(unity) => StaticInput::Unity {
                    merged: unity.unity_file_names().to_vec(),
                    isolated: unity
                        .isolated_files()
                        .iter()
                        .map(|i| (i.file.clone(), i.dir_list_origin.clone()))
                        .collect(),
                },
                NodeKind::File(_) | NodeKind::Object(_) => StaticInput::File,
                _ => {
                    let node = graph.node(dep);
                    tracing::error!(node = %name, input = %node.name(), "unexpected input node kind");
                    return Err(GraphError::UnexpectedType {
                        node: name.to_string(),
                        property: "inputs".to_string(),
                        target: node.name().to_string(),
                        found: node.node_type(),
                        expected: NodeType::File,
                    });
                }
            };

            match input {
                StaticInput::Listing { root, files } => {
                    deps.reserve(files.len());
                    for file in &files {
                        let n = graph.find_or_create_file_node(file, name, "compiler_input_path")?;
                        if Some(n) == pch_source {
                            tracing::debug!(node = %name, file = %file, "skipping precompiled header source");
                            continue;
                        }
                        self.create_dynamic_object_node(graph, &mut deps, n, &root, UnityRole::None)?;
                    }
                }
                StaticInput::Unity { merged, isolated } => {
                    for file in &merged {
                        let n = graph.find_or_create_file_node(file, name, "compiler_input_unity")?;
                        // Unity outputs are flat
                        self.create_dynamic_object_node(graph, &mut deps, n, "", UnityRole::Merged)?;
                    }
                    for (file, origin) in &isolated {
                        let n = graph.find_or_create_file_node(file, name, "isolated unity file")?;
                        self.create_dynamic_object_node(graph, &mut deps, n, origin, UnityRole::Isolated)?;
                    }
                }
                StaticInput::File => {
                    self.create_dynamic_object_node(graph, &mut deps, dep, "", UnityRole::None)?;
                }
            }
        }

        // Link the PCH object's symbols along with everything else
        if let Some(pch) = self.precompiled_header() {
            deps.push(pch);
        }

        Ok(deps)
    }
}

/// Recompute the object list's dynamic dependencies from scratch.
///
/// The previous list is discarded first; on error the list stays empty and the
/// next attempt starts over.
pub fn gather_dynamic_dependencies(graph: &mut NodeGraph, id: NodeId) -> Result<()> {
    let list = object_list(graph, id)?.clone();
    set_dynamic_dependencies(graph, id, Vec::new());

    let deps = list.expand(graph)?;
    tracing::debug!(node = %list.name(), objects = deps.len(), "dynamic dependencies gathered");
    set_dynamic_dependencies(graph, id, deps);
    Ok(())
}

/// Gather dynamic dependencies and apply the checks that follow expansion:
/// something must be left to build, and side output folders must exist.
pub fn do_dynamic_dependencies(graph: &mut NodeGraph, id: NodeId) -> Result<()> {
    gather_dynamic_dependencies(graph, id)?;

    let list = object_list(graph, id)?;
    if list.dynamic_deps.is_empty() && !list.spec.compiler_input_allow_no_files {
        return Err(GraphError::NoInputFiles {
            node: list.name().to_string(),
        });
    }

    let folders = [(".asm", list.extra_asm_path()), (".pdb", list.extra_pdb_path())];
    for (what, path) in folders {
        if let Some(path) = path {
            fs::create_dir_all(path).map_err(|e| GraphError::CreateOutputDir {
                what,
                path: PathBuf::from(path),
                source: e,
            })?;
        }
    }
    Ok(())
}

fn set_dynamic_dependencies(graph: &mut NodeGraph, id: NodeId, deps: Vec<NodeId>) {
    if let NodeKind::ObjectList(list) = &mut graph.node_mut(id).kind {
        list.dynamic_deps = deps;
    }
}
