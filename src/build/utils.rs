use crate::error::{GraphError, Result};
use crate::graph::object_list::object_list;
use crate::graph::{NodeGraph, NodeId};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> GraphError + '_ {
    move |e| GraphError::Io {
        path: path.to_path_buf(),
        source: e,
    }
}

/// Write the merged files of a unity node, leaving unchanged files untouched.
pub fn write_unity_files(graph: &NodeGraph, id: NodeId) -> Result<usize> {
    let Some(unity) = graph.node(id).as_unity() else {
        return Ok(0);
    };

    let mut written = 0;
    for (index, file) in unity.unity_file_names().iter().enumerate() {
        let path = Path::new(file);
        let contents = unity.render(index);
        if fs::read_to_string(path).is_ok_and(|existing| existing == contents) {
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        fs::write(path, contents).map_err(io_error(path))?;
        written += 1;
    }

    if written > 0 {
        tracing::debug!(unity = %graph.name(id), written, "unity files written");
    }
    Ok(written)
}

/// Write the dependency lists requested by an object list's objects.
///
/// Objects sharing one file each contribute a `object: inputs..` line, in
/// build order. Returns the number of files written.
pub fn write_dependency_lists(graph: &NodeGraph, id: NodeId) -> Result<usize> {
    let list = object_list(graph, id)?;
    let mut files: BTreeMap<&str, String> = BTreeMap::new();
    for &dep in list.dynamic_dependencies() {
        let Some(obj) = graph.node(dep).as_object() else {
            continue;
        };
        let Some(out) = obj.dependencies_list_out_file.as_deref() else {
            continue;
        };
        let mut line = format!("{}: {}", graph.name(dep), graph.name(obj.source));
        for &input in obj.precompiled_header.iter().chain(&obj.force_using) {
            line.push(' ');
            line.push_str(graph.name(input));
        }
        line.push('\n');
        files.entry(out).or_default().push_str(&line);
    }

    let mut written = 0;
    for (file, contents) in files {
        let path = Path::new(file);
        if fs::read_to_string(path).is_ok_and(|existing| existing == contents) {
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        fs::write(path, contents).map_err(io_error(path))?;
        written += 1;
    }
    Ok(written)
}

/// `compile_commands.json` entries for the last expansion of each object list.
pub fn compile_commands(graph: &NodeGraph, lists: &[NodeId]) -> Result<Vec<Value>> {
    let mut entries = Vec::new();
    for &id in lists {
        let list = object_list(graph, id)?;
        for &dep in list.dynamic_dependencies() {
            let Some(obj) = graph.node(dep).as_object() else {
                continue;
            };
            let name = graph.name(dep);
            let directory = obj.working_dir.as_deref().unwrap_or(graph.working_dir());
            entries.push(json!({
                "directory": directory,
                "command": obj.command_line(graph, name, &obj.compiler_options),
                "file": graph.name(obj.source),
                "output": name,
            }));
        }
    }
    Ok(entries)
}

/// Pretty-print `value` to `path`.
pub fn write_json(path: &Path, value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| GraphError::Io {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    fs::write(path, text).map_err(io_error(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeKind, UnityNode};

    #[test]
    fn test_write_unity_files_skips_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = NodeGraph::new(dir.path());
        let out = graph.clean_dir("unity");
        let id = graph
            .create_unity_node("unity", UnityNode::new(out, "Unity*.cpp", 2))
            .unwrap();
        if let NodeKind::Unity(unity) = &mut graph.node_mut(id).kind {
            unity.refresh(vec![
                ("/src/a.cpp".to_string(), "/src/".to_string()),
                ("/src/b.cpp".to_string(), "/src/".to_string()),
            ]);
        }

        assert_eq!(write_unity_files(&graph, id).unwrap(), 2);
        assert_eq!(write_unity_files(&graph, id).unwrap(), 0);

        let first = fs::read_to_string(dir.path().join("unity/Unity1.cpp")).unwrap();
        assert!(first.contains("#include \"/src/a.cpp\""));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&path, &json!([{"file": "a.cpp"}])).unwrap();
        let back: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back[0]["file"], "a.cpp");
    }
}
