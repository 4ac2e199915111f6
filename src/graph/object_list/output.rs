use std::path::MAIN_SEPARATOR;

use super::{ObjectListNode, non_empty};
use crate::graph::directory_list::path_begins_with;
use crate::graph::{NodeGraph, NodeId, NodeKind};

impl ObjectListNode {
    /// Output path of the object compiling `file_name`.
    ///
    /// Sources found under `base_dir` (or under the explicit input files root
    /// when there is no base) keep their sub-folder below the output path.
    pub fn object_file_name(&self, file_name: &str, base_dir: &str) -> String {
        let spec = &self.spec;
        let name_start = file_name.rfind(MAIN_SEPARATOR).map_or(0, |i| i + 1);
        let name_end = if spec.compiler_output_keep_base_extension {
            file_name.len()
        } else {
            match file_name.rfind('.') {
                Some(dot) if dot > name_start => dot,
                _ => file_name.len(),
            }
        };

        let root = if base_dir.is_empty() {
            non_empty(&spec.compiler_input_files_root)
        } else {
            Some(base_dir)
        };
        let sub_path = match root {
            Some(root) if path_begins_with(file_name, root) && root.len() <= name_start => {
                &file_name[root.len()..name_start]
            }
            _ => "",
        };

        let output_path = non_empty(&spec.compiler_output_path).unwrap_or_default();
        let mut obj = String::with_capacity(output_path.len() + file_name.len() + 8);
        obj.push_str(output_path);
        obj.push_str(sub_path);
        obj.push_str(&spec.compiler_output_prefix);
        obj.push_str(&file_name[name_start..name_end]);
        obj.push_str(self.obj_extension());
        obj
    }

    /// Linker/archiver arguments for the last expansion, each wrapped in `pre`/`post`.
    pub fn input_args(
        &self,
        graph: &NodeGraph,
        pre: &str,
        post: &str,
        objects_instead_of_libs: bool,
        out: &mut Vec<String>,
    ) {
        collect_input_args(graph, &self.dynamic_deps, pre, post, objects_instead_of_libs, out);
    }

    /// Output paths of the last expansion, in build order.
    pub fn input_files(&self, graph: &NodeGraph, out: &mut Vec<String>) {
        out.reserve(self.dynamic_deps.len());
        out.extend(self.dynamic_deps.iter().map(|&dep| graph.name(dep).to_string()));
    }

    /// Visit every logical input as `(file, base_dir)` without creating objects.
    pub fn enumerate_input_files(&self, graph: &NodeGraph, callback: &mut dyn FnMut(&str, &str)) {
        for &dep in &self.static_deps[self.input_range()] {
            let node = graph.node(dep);
            match &node.kind {
                NodeKind::DirectoryList(dl) => {
                    for file in dl.files() {
                        callback(file, dl.path());
                    }
                }
                NodeKind::Unity(unity) => unity.enumerate_input_files(callback),
                _ if node.is_a_file() => callback(node.name(), ""),
                _ => tracing::error!(node = %self.name(), input = %node.name(), "unexpected input node kind"),
            }
        }
    }
}

/// Flatten `deps` into consumer arguments.
///
/// PCH creators contribute their companion object when the vendor emits one
/// (MSVC) and nothing otherwise. Nested object lists are always flattened;
/// archives only when `objects_instead_of_libs` is set.
pub fn collect_input_args(
    graph: &NodeGraph,
    deps: &[NodeId],
    pre: &str,
    post: &str,
    objects_instead_of_libs: bool,
    out: &mut Vec<String>,
) {
    for &dep in deps {
        let node = graph.node(dep);
        match &node.kind {
            NodeKind::Object(obj) if obj.is_creating_pch() => {
                if obj.is_msvc()
                    && let Some(companion) = &obj.pch_object_name
                {
                    out.push(format!("{pre}{companion}{post}"));
                }
            }
            NodeKind::ObjectList(list) => {
                list.input_args(graph, pre, post, objects_instead_of_libs, out);
            }
            NodeKind::Archive(archive) if objects_instead_of_libs => {
                collect_input_args(graph, &archive.inputs, pre, post, objects_instead_of_libs, out);
            }
            _ => out.push(format!("{pre}{}{post}", node.name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ObjectListSpec;
    use std::sync::Arc;

    fn list(spec: ObjectListSpec) -> ObjectListNode {
        ObjectListNode {
            spec: Arc::new(spec),
            static_deps: Vec::new(),
            dynamic_deps: Vec::new(),
            input_start: 0,
            input_end: 0,
            using_pch: false,
            force_using: Vec::new(),
            pre_build_deps: Vec::new(),
            extra_pdb_path: None,
            extra_asm_path: None,
        }
    }

    fn spec() -> ObjectListSpec {
        let mut spec = ObjectListSpec::new("core", "clang", "-c %1 -o %2");
        spec.compiler_output_path = Some("/out/".to_string());
        spec.compiler_output_extension = Some(".o".to_string());
        spec
    }

    #[test]
    #[cfg(unix)]
    fn test_object_file_name_keeps_sub_folders() {
        let list = list(spec());
        assert_eq!(list.object_file_name("/root/sub/x.cpp", "/root/"), "/out/sub/x.o");
        assert_eq!(list.object_file_name("/root/x.cpp", "/root/"), "/out/x.o");
        // Not under the base: flattened
        assert_eq!(list.object_file_name("/other/x.cpp", "/root/"), "/out/x.o");
        assert_eq!(list.object_file_name("/root/sub/x.cpp", ""), "/out/x.o");
    }

    #[test]
    #[cfg(unix)]
    fn test_object_file_name_extensions() {
        let list_default = list(spec());
        assert_eq!(list_default.object_file_name("/src/y.tar.gz", ""), "/out/y.tar.o");
        assert_eq!(list_default.object_file_name("/src.d/noext", ""), "/out/noext.o");

        let mut keep = spec();
        keep.compiler_output_keep_base_extension = true;
        keep.compiler_output_prefix = "lib_".to_string();
        let list_keep = list(keep);
        assert_eq!(list_keep.object_file_name("/src/y.tar.gz", ""), "/out/lib_y.tar.gz.o");
    }

    #[test]
    #[cfg(unix)]
    fn test_object_file_name_input_files_root() {
        let mut with_root = spec();
        with_root.compiler_input_files_root = Some("/src/".to_string());
        let list = list(with_root);
        assert_eq!(list.object_file_name("/src/a/b/c.cpp", ""), "/out/a/b/c.o");
        // An explicit base wins over the files root
        assert_eq!(list.object_file_name("/src/a/b/c.cpp", "/src/a/"), "/out/b/c.o");
    }
}
