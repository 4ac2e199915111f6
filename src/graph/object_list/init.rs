use std::sync::Arc;

use super::dynamic::ObjectRequest;
use super::{ObjectListNode, ObjectListSpec, non_empty};
use crate::error::{GraphError, Result};
use crate::graph::{DirectoryListNode, NodeGraph, NodeId, NodeKind, NodeType};
use crate::toolchain::CompilerFamily;
use crate::toolchain::flags::{self, ObjectFlags};

impl ObjectListNode {
    /// Resolve `spec` against the graph and register the object list.
    ///
    /// All references are resolved here, once: the compiler, an optional
    /// preprocessor, the PCH (created or reused), directory scans, unity
    /// groups and explicit files. Any failure leaves neither the list nor its
    /// precompiled header registered.
    pub fn initialize(graph: &mut NodeGraph, spec: ObjectListSpec) -> Result<NodeId> {
        let spec = clean_spec(graph, spec);
        let name = spec.name.clone();
        if graph.find_node(&name).is_some() {
            return Err(GraphError::AlreadyDefined { name });
        }

        // --- Pre-build dependencies ---
        let mut pre_build_deps = Vec::with_capacity(spec.pre_build_dependencies.len());
        for dep in &spec.pre_build_dependencies {
            let id = graph.find_node(dep).ok_or_else(|| GraphError::TargetNotDefined {
                node: name.clone(),
                property: "pre_build_dependencies".to_string(),
                target: dep.clone(),
            })?;
            pre_build_deps.push(id);
        }

        // --- Compiler ---
        let compiler = graph.get_compiler_node(&spec.compiler, &name, "compiler")?;
        let family = compiler_family(graph, compiler);
        if family.is_managed() {
            return Err(GraphError::IncompatibleCompiler {
                node: name,
                compiler: spec.compiler.clone(),
            });
        }

        // Checked now so errors surface during construction; objects carry them,
        // the list itself does not depend on them.
        let mut force_using = Vec::with_capacity(spec.compiler_force_using.len());
        for file in &spec.compiler_force_using {
            force_using.push(graph.find_or_create_file_node(file, &name, "compiler_force_using")?);
        }

        let wants_deoptimize = spec.deoptimize_writable_files || spec.deoptimize_writable_files_with_token;
        if wants_deoptimize && non_empty(&spec.compiler_options_deoptimized).is_none() {
            return Err(GraphError::MissingProperty {
                node: name,
                property: "compiler_options_deoptimized".to_string(),
            });
        }

        let mut list = ObjectListNode {
            spec: Arc::new(spec),
            static_deps: vec![compiler],
            dynamic_deps: Vec::new(),
            input_start: 0,
            input_end: 0,
            using_pch: false,
            force_using,
            pre_build_deps,
            extra_pdb_path: None,
            extra_asm_path: None,
        };
        let spec = Arc::clone(&list.spec);

        // --- Creating a PCH ---
        // Validated here, registered only once every other reference resolved
        let creating_pch = non_empty(&spec.pch_input_file).is_some();
        let mut using_pch = false;
        let mut precompiled_header = None;
        let mut pending_pch = None;
        if let Some(pch_input) = non_empty(&spec.pch_input_file) {
            let (Some(pch_output), Some(pch_options)) =
                (non_empty(&spec.pch_output_file), non_empty(&spec.pch_options))
            else {
                return Err(GraphError::MissingPchArgs { node: name });
            };

            let pch_flags = flags::determine_flags(family, pch_options, true, false);
            let mut pch_object_name = None;
            if pch_flags.contains(ObjectFlags::MSVC) {
                let companion = flags::check_pch_create(pch_options, pch_output, list.obj_extension())
                    .map_err(|reason| invalid_flags(&name, "pch_options", reason))?;
                pch_object_name = Some(companion);
            }

            // Shared between object lists, but defined exactly once
            if pch_output == name || graph.find_node(pch_output).is_some() {
                return Err(GraphError::PchAlreadyDefined {
                    node: name,
                    pch: pch_output.to_string(),
                });
            }

            let source = graph.find_or_create_file_node(pch_input, &name, "pch_input_file")?;
            pending_pch = Some(ObjectRequest {
                name: pch_output.to_string(),
                source,
                flags: pch_flags,
                options: pch_options,
                options_deoptimized: "",
                preprocessor: None,
                pch_object_name,
            });
            using_pch = true;
        }

        // --- Compiling files ---
        if spec.has_inputs() {
            let reads_pch = non_empty(&spec.pch_output_file).is_some();
            let obj_flags = flags::determine_flags(family, &spec.compiler_options, false, reads_pch);
            if let Some(pch_output) = non_empty(&spec.pch_output_file) {
                if obj_flags.contains(ObjectFlags::MSVC) {
                    flags::check_pch_use(&spec.compiler_options)
                        .map_err(|reason| invalid_flags(&name, "compiler_options", reason))?;
                }

                if !creating_pch {
                    // Reusing a PCH that another object list created
                    let found = graph.find_node(pch_output).filter(|&id| {
                        graph
                            .node(id)
                            .as_object()
                            .is_some_and(|o| o.is_creating_pch())
                    });
                    let Some(found) = found else {
                        return Err(GraphError::TargetNotDefined {
                            node: name,
                            property: "pch_output_file".to_string(),
                            target: pch_output.to_string(),
                        });
                    };
                    precompiled_header = Some(found);
                }
                using_pch = true;
            }

            flags::check_compiler_options(&spec.compiler_options, obj_flags)
                .map_err(|reason| invalid_flags(&name, "compiler_options", reason))?;

            // Not needed when the list only produces a PCH
            if non_empty(&spec.compiler_output_path).is_none() {
                return Err(GraphError::MissingProperty {
                    node: name,
                    property: "compiler_output_path".to_string(),
                });
            }
        }

        // --- Preprocessor ---
        let preprocessor = match non_empty(&spec.preprocessor) {
            Some(pp) => Some(graph.get_compiler_node(pp, &name, "preprocessor")?),
            None => None,
        };

        // --- Unity ---
        let mut unity_deps = Vec::with_capacity(spec.compiler_input_unity.len());
        for unity in &spec.compiler_input_unity {
            let id = graph.find_node(unity).ok_or_else(|| GraphError::TargetNotDefined {
                node: name.clone(),
                property: "compiler_input_unity".to_string(),
                target: unity.clone(),
            })?;
            let found = graph.node(id).node_type();
            if found != NodeType::Unity {
                return Err(GraphError::UnexpectedType {
                    node: name,
                    property: "compiler_input_unity".to_string(),
                    target: unity.clone(),
                    found,
                    expected: NodeType::Unity,
                });
            }
            unity_deps.push(id);
        }

        // --- Directory lists ---
        let mut dir_list_deps = Vec::with_capacity(spec.compiler_input_path.len());
        for path in &spec.compiler_input_path {
            let mut dl = DirectoryListNode::new(
                path.clone(),
                spec.compiler_input_pattern.clone(),
                spec.compiler_input_path_recurse,
            );
            dl.exclude_paths = spec.compiler_input_exclude_path.clone();
            dl.exclude_files = spec.compiler_input_excluded_files.clone();
            dl.exclude_patterns = spec.compiler_input_exclude_pattern.clone();
            dir_list_deps.push(graph.get_directory_list_node(dl, &name, "compiler_input_path")?);
        }

        // --- Explicit files ---
        let mut file_deps = Vec::with_capacity(spec.compiler_input_files.len());
        for file in &spec.compiler_input_files {
            file_deps.push(graph.find_or_create_file_node(file, &name, "compiler_input_files")?);
        }

        let (pdb, asm) = flags::extra_output_paths(&spec.compiler_options);
        list.extra_pdb_path = pdb.map(|p| graph.clean_dir(&p));
        list.extra_asm_path = asm.map(|p| graph.clean_dir(&p));

        if let Some(request) = pending_pch {
            precompiled_header = Some(list.create_object_node(graph, request)?);
        }
        list.using_pch = using_pch;

        // --- Static dependencies ---
        // compiler, [preprocessor], [pch], dir lists.., unity.., files..
        list.static_deps.extend(preprocessor);
        list.static_deps.extend(precompiled_header);
        list.input_start = list.static_deps.len();
        list.static_deps.extend(dir_list_deps);
        list.static_deps.extend(unity_deps);
        list.static_deps.extend(file_deps);
        list.input_end = list.static_deps.len();

        tracing::debug!(
            node = %name,
            inputs = list.input_end - list.input_start,
            using_pch = list.using_pch,
            "object list initialized"
        );
        graph.add_node(name, NodeKind::ObjectList(list))
    }
}

fn compiler_family(graph: &NodeGraph, compiler: NodeId) -> CompilerFamily {
    graph
        .node(compiler)
        .as_compiler()
        .map(|c| c.family)
        .unwrap_or(CompilerFamily::Custom)
}

fn invalid_flags(node: &str, property: &str, reason: String) -> GraphError {
    GraphError::InvalidFlags {
        node: node.to_string(),
        property: property.to_string(),
        reason,
    }
}

/// Canonicalize every path-valued property of the spec.
fn clean_spec(graph: &NodeGraph, mut spec: ObjectListSpec) -> ObjectListSpec {
    let dir = |p: &String| graph.clean_dir(p);
    let file = |p: &String| graph.clean_path(p);

    spec.compiler_output_path = non_empty(&spec.compiler_output_path).map(|p| graph.clean_dir(p));
    spec.compiler_input_files_root = non_empty(&spec.compiler_input_files_root).map(|p| graph.clean_dir(p));
    spec.working_dir = non_empty(&spec.working_dir).map(|p| graph.clean_dir(p));
    spec.pch_input_file = non_empty(&spec.pch_input_file).map(|p| graph.clean_path(p));
    spec.pch_output_file = non_empty(&spec.pch_output_file).map(|p| graph.clean_path(p));
    spec.dependencies_list_out_file = non_empty(&spec.dependencies_list_out_file).map(|p| graph.clean_path(p));
    spec.compiler_input_path = spec.compiler_input_path.iter().map(dir).collect();
    spec.compiler_input_exclude_path = spec.compiler_input_exclude_path.iter().map(dir).collect();
    spec.compiler_input_files = spec.compiler_input_files.iter().map(file).collect();
    spec
}
