use super::utils::{write_dependency_lists, write_unity_files};
use crate::error::{GraphError, Result};
use crate::graph::object_list::{do_build, do_dynamic_dependencies, object_list};
use crate::graph::{NodeGraph, NodeId, NodeKind, NodeType, ObjectNode};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use xxhash_rust::xxh3::Xxh3;

/// The compile step for one object. Whatever it runs, it reports a stamp.
pub trait UnitExecutor: Sync {
    /// Build object `name` and return its stamp, which must not be zero.
    fn build(&self, graph: &NodeGraph, name: &str, unit: &ObjectNode) -> Result<u64>;
}

/// Stamps an object from what would be compiled, without compiling it.
///
/// The stamp covers the source bytes, the expanded command line and, for
/// objects compiled against a PCH, the stamp of the PCH itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentStamper;

impl UnitExecutor for ContentStamper {
    fn build(&self, graph: &NodeGraph, name: &str, unit: &ObjectNode) -> Result<u64> {
        let source = Path::new(graph.name(unit.source));
        let bytes = fs::read(source).map_err(|e| GraphError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;
        let options = unit.effective_options(source)?;

        let mut hasher = Xxh3::new();
        hasher.update(&bytes);
        hasher.update(unit.command_line(graph, name, options).as_bytes());
        if unit.is_using_pch()
            && let Some(pch) = unit.precompiled_header
        {
            hasher.update(&graph.stamp(pch).to_le_bytes());
        }
        Ok(hasher.digest().max(1))
    }
}

/// Rescan the directory lists and unity groups an object list reads from.
///
/// Nothing is written to disk. Returns the unity nodes that were refreshed.
pub fn scan_inputs(graph: &mut NodeGraph, id: NodeId) -> Result<Vec<NodeId>> {
    let list = object_list(graph, id)?;
    let inputs = list.static_dependencies()[list.input_range()].to_vec();

    let mut unities = Vec::new();
    for dep in inputs {
        match graph.node(dep).node_type() {
            NodeType::DirectoryList => {
                graph.scan_directory_list(dep)?;
            }
            NodeType::Unity => {
                let lists = graph
                    .node(dep)
                    .as_unity()
                    .map(|u| u.inputs.clone())
                    .unwrap_or_default();
                for dl in lists {
                    graph.scan_directory_list(dl)?;
                }
                graph.refresh_unity(dep);
                unities.push(dep);
            }
            _ => {}
        }
    }
    Ok(unities)
}

/// [`scan_inputs`], then write the merged unity files the scan produced.
pub fn refresh_inputs(graph: &mut NodeGraph, id: NodeId) -> Result<()> {
    for unity in scan_inputs(graph, id)? {
        write_unity_files(graph, unity)?;
    }
    Ok(())
}

/// One full build attempt of an object list.
///
/// Inputs are rescanned and expanded, every object without a stamp is built
/// (PCH creators first, the rest in parallel), then the object stamps are
/// folded into the list's stamp.
pub fn build_object_list(
    graph: &mut NodeGraph,
    id: NodeId,
    executor: &dyn UnitExecutor,
    pb: &ProgressBar,
) -> Result<u64> {
    check_pre_build_dependencies(graph, id)?;
    refresh_inputs(graph, id)?;
    do_dynamic_dependencies(graph, id)?;

    let pending: Vec<NodeId> = object_list(graph, id)?
        .dynamic_dependencies()
        .iter()
        .copied()
        .filter(|&dep| graph.stamp(dep) == 0)
        .collect();
    let (pch, objects): (Vec<NodeId>, Vec<NodeId>) = pending.into_iter().partition(|&dep| {
        graph
            .node(dep)
            .as_object()
            .is_some_and(|o| o.is_creating_pch())
    });

    pb.inc_length((pch.len() + objects.len()) as u64);
    for batch in [pch, objects] {
        let stamps = build_units(graph, &batch, executor, pb)?;
        // Join point: every unit of the batch has finished
        for (unit, stamp) in stamps {
            graph.set_stamp(unit, stamp);
        }
    }

    write_dependency_lists(graph, id)?;
    do_build(graph, id)
}

fn build_units(
    graph: &NodeGraph,
    units: &[NodeId],
    executor: &dyn UnitExecutor,
    pb: &ProgressBar,
) -> Result<Vec<(NodeId, u64)>> {
    units
        .par_iter()
        .map(|&unit| {
            let node = graph.node(unit);
            let NodeKind::Object(obj) = &node.kind else {
                return Err(GraphError::UnitBuild {
                    unit: node.name().to_string(),
                    reason: format!("not an object node ({})", node.node_type()),
                });
            };

            pb.set_message(format!("Compiling {}", graph.name(obj.source)));
            let stamp = executor.build(graph, node.name(), obj)?;
            if stamp == 0 {
                return Err(GraphError::UnitBuild {
                    unit: node.name().to_string(),
                    reason: "executor returned an empty stamp".to_string(),
                });
            }
            tracing::trace!(object = %node.name(), stamp = %format!("{stamp:016x}"), "object built");
            pb.inc(1);
            Ok((unit, stamp))
        })
        .collect()
}

/// Object lists named as pre-build dependencies must have been built first.
fn check_pre_build_dependencies(graph: &NodeGraph, id: NodeId) -> Result<()> {
    let list = object_list(graph, id)?;
    for &dep in list.pre_build_dependencies() {
        if graph.node(dep).node_type() == NodeType::ObjectList && graph.stamp(dep) == 0 {
            return Err(GraphError::IncompleteDependency {
                node: list.name().to_string(),
                dependency: graph.name(dep).to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::object_list::EMPTY_STAMP;
    use crate::graph::{DirectoryListNode, ObjectListNode, ObjectListSpec, UnityNode};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize);

    impl UnitExecutor for Counting {
        fn build(&self, _graph: &NodeGraph, _name: &str, _unit: &ObjectNode) -> Result<u64> {
            Ok(self.0.fetch_add(1, Ordering::SeqCst) as u64 + 100)
        }
    }

    fn core_list(root: &Path) -> (NodeGraph, NodeId) {
        let mut graph = NodeGraph::new(root);
        let mut spec = ObjectListSpec::new("core", "/usr/bin/clang++", "-c %1 -o %2");
        spec.compiler_input_path = vec!["src".to_string()];
        spec.compiler_output_path = Some("out".to_string());
        let id = ObjectListNode::initialize(&mut graph, spec).unwrap();
        (graph, id)
    }

    fn project() -> (tempfile::TempDir, NodeGraph, NodeId) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.cpp"), "int a;").unwrap();
        fs::write(dir.path().join("src/b.cpp"), "int b;").unwrap();
        let (graph, id) = core_list(dir.path());
        (dir, graph, id)
    }

    #[test]
    fn test_build_object_list_stamps_every_unit() {
        let (_dir, mut graph, id) = project();
        let executor = Counting(AtomicUsize::new(0));
        let stamp = build_object_list(&mut graph, id, &executor, &ProgressBar::hidden()).unwrap();

        assert_ne!(stamp, 0);
        assert_ne!(stamp, EMPTY_STAMP);
        assert_eq!(executor.0.load(Ordering::SeqCst), 2);
        assert_eq!(graph.stamp(id), stamp);

        // Objects keep their stamps, so a second attempt builds nothing new
        let again = build_object_list(&mut graph, id, &executor, &ProgressBar::hidden()).unwrap();
        assert_eq!(again, stamp);
        assert_eq!(executor.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_content_stamper_follows_source() {
        let (dir, mut graph, id) = project();
        let first = build_object_list(&mut graph, id, &ContentStamper, &ProgressBar::hidden()).unwrap();

        fs::write(dir.path().join("src/b.cpp"), "int b = 2;").unwrap();
        let (mut graph2, id2) = core_list(dir.path());
        let second = build_object_list(&mut graph2, id2, &ContentStamper, &ProgressBar::hidden()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_missing_pre_build_list_is_reported() {
        let (_dir, mut graph, core) = project();
        let mut spec = ObjectListSpec::new("app", "/usr/bin/clang++", "-c %1 -o %2");
        spec.compiler_input_allow_no_files = true;
        spec.pre_build_dependencies = vec!["core".to_string()];
        let app = ObjectListNode::initialize(&mut graph, spec).unwrap();

        let err = build_object_list(&mut graph, app, &ContentStamper, &ProgressBar::hidden()).unwrap_err();
        assert!(matches!(err, GraphError::IncompleteDependency { .. }));

        build_object_list(&mut graph, core, &ContentStamper, &ProgressBar::hidden()).unwrap();
        let stamp = build_object_list(&mut graph, app, &ContentStamper, &ProgressBar::hidden()).unwrap();
        assert_eq!(stamp, EMPTY_STAMP);
    }

    #[test]
    fn test_scan_inputs_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("engine")).unwrap();
        fs::write(dir.path().join("engine/a.cpp"), "int a;").unwrap();

        let mut graph = NodeGraph::new(dir.path());
        let mut unity = UnityNode::new(graph.clean_dir("unity"), "Unity*.cpp", 1);
        let dl = DirectoryListNode::new(graph.clean_dir("engine"), vec!["*.cpp".to_string()], true);
        unity
            .inputs
            .push(graph.get_directory_list_node(dl, "unity", "input_path").unwrap());
        graph.create_unity_node("unity", unity).unwrap();

        let mut spec = ObjectListSpec::new("core", "/usr/bin/clang++", "-c %1 -o %2");
        spec.compiler_input_unity = vec!["unity".to_string()];
        spec.compiler_output_path = Some("out".to_string());
        let id = ObjectListNode::initialize(&mut graph, spec).unwrap();

        let unities = scan_inputs(&mut graph, id).unwrap();
        assert_eq!(unities.len(), 1);
        assert_eq!(graph.node(unities[0]).as_unity().unwrap().unity_file_names().len(), 1);
        assert!(!dir.path().join("unity").exists());

        refresh_inputs(&mut graph, id).unwrap();
        assert!(dir.path().join("unity/Unity1.cpp").exists());
    }

    #[test]
    fn test_dependency_list_written_after_build() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.cpp"), "int a;").unwrap();

        let mut graph = NodeGraph::new(dir.path());
        let mut spec = ObjectListSpec::new("core", "/usr/bin/clang++", "-c %1 -o %2");
        spec.compiler_input_path = vec!["src".to_string()];
        spec.compiler_output_path = Some("out".to_string());
        spec.compiler_output_extension = Some(".o".to_string());
        spec.compiler_force_using = vec!["force.h".to_string()];
        spec.dependencies_list_out_file = Some("out/deps.txt".to_string());
        let id = ObjectListNode::initialize(&mut graph, spec).unwrap();
        build_object_list(&mut graph, id, &ContentStamper, &ProgressBar::hidden()).unwrap();

        let object = graph.node(object_list(&graph, id).unwrap().dynamic_dependencies()[0]);
        assert_eq!(
            object.as_object().unwrap().dependencies_list_out_file.as_deref(),
            Some(graph.clean_path("out/deps.txt").as_str())
        );
        let written = fs::read_to_string(dir.path().join("out/deps.txt")).unwrap();
        let expected = format!(
            "{}: {} {}\n",
            graph.clean_path("out/a.o"),
            graph.clean_path("src/a.cpp"),
            graph.clean_path("force.h")
        );
        assert_eq!(written, expected);
    }
}
