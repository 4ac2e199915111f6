//! The compilation unit: one source file compiled into one object file.

use std::fs;
use std::path::Path;

use super::{NodeGraph, NodeId, NodeType};
use crate::error::{GraphError, Result};
use crate::toolchain::ObjectFlags;

/// Marker a writable source can contain to opt into the de-optimized options
/// under [`Deoptimize::WritableWithToken`].
pub const DEOPTIMIZE_TOKEN: &str = "DEOPTIMIZE_OBJECT";

/// When an object is compiled with the de-optimized option string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Deoptimize {
    #[default]
    Never,
    /// Any source that is writable (checked out for edit).
    Writable,
    /// Writable sources that also contain [`DEOPTIMIZE_TOKEN`].
    WritableWithToken,
}

impl Deoptimize {
    pub fn from_flags(writable_files: bool, writable_files_with_token: bool) -> Self {
        if writable_files {
            Deoptimize::Writable
        } else if writable_files_with_token {
            Deoptimize::WritableWithToken
        } else {
            Deoptimize::Never
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectNode {
    pub compiler: NodeId,
    pub compiler_options: String,
    pub compiler_options_deoptimized: String,
    pub deoptimize: Deoptimize,
    pub source: NodeId,
    /// PCH this object is compiled against (never set on the PCH itself).
    pub precompiled_header: Option<NodeId>,
    /// Companion object an MSVC PCH creation step emits.
    pub pch_object_name: Option<String>,
    pub preprocessor: Option<NodeId>,
    pub preprocessor_options: String,
    pub preprocessor_flags: ObjectFlags,
    pub flags: ObjectFlags,
    /// Name of the object list that created this node.
    pub owner: String,
    pub working_dir: Option<String>,
    pub force_using: Vec<NodeId>,
    pub pre_build_dependencies: Vec<NodeId>,
    /// Where the build driver records the inputs this object was built from.
    pub dependencies_list_out_file: Option<String>,
}

impl ObjectNode {
    pub fn is_creating_pch(&self) -> bool {
        self.flags.contains(ObjectFlags::CREATING_PCH)
    }

    pub fn is_using_pch(&self) -> bool {
        self.flags.contains(ObjectFlags::USING_PCH)
    }

    pub fn is_msvc(&self) -> bool {
        self.flags.contains(ObjectFlags::MSVC)
    }

    pub fn is_unity(&self) -> bool {
        self.flags.contains(ObjectFlags::UNITY)
    }

    pub fn is_isolated_from_unity(&self) -> bool {
        self.flags.contains(ObjectFlags::ISOLATED_FROM_UNITY)
    }

    /// Check that every handle points at a node of the expected kind.
    pub fn validate(&self, graph: &NodeGraph, name: &str) -> Result<()> {
        let expect = |id: NodeId, property: &str, expected: NodeType| -> Result<()> {
            let node = graph.node(id);
            let ok = match expected {
                NodeType::File => node.is_a_file(),
                other => node.node_type() == other,
            };
            if ok {
                Ok(())
            } else {
                Err(GraphError::UnexpectedType {
                    node: name.to_string(),
                    property: property.to_string(),
                    target: node.name().to_string(),
                    found: node.node_type(),
                    expected,
                })
            }
        };

        expect(self.compiler, "compiler", NodeType::Compiler)?;
        expect(self.source, "source", NodeType::File)?;
        if let Some(pp) = self.preprocessor {
            expect(pp, "preprocessor", NodeType::Compiler)?;
        }
        if let Some(pch) = self.precompiled_header {
            expect(pch, "precompiled_header", NodeType::Object)?;
            let creating = graph.node(pch).as_object().is_some_and(|o| o.is_creating_pch());
            if !creating {
                return Err(GraphError::TargetNotDefined {
                    node: name.to_string(),
                    property: "pch_output_file".to_string(),
                    target: graph.name(pch).to_string(),
                });
            }
        }
        for &id in &self.force_using {
            expect(id, "compiler_force_using", NodeType::File)?;
        }
        if self.is_creating_pch() && self.is_msvc() && self.pch_object_name.is_none() {
            return Err(GraphError::MissingProperty {
                node: name.to_string(),
                property: "pch_object_name".to_string(),
            });
        }
        Ok(())
    }

    /// Pure de-optimization decision for a source with the given state.
    pub fn uses_deoptimized(&self, writable: bool, has_token: bool) -> bool {
        if self.compiler_options_deoptimized.is_empty() {
            return false;
        }
        match self.deoptimize {
            Deoptimize::Never => false,
            Deoptimize::Writable => writable,
            Deoptimize::WritableWithToken => writable && has_token,
        }
    }

    /// Option string to compile `source` with, inspecting the file on disk
    /// only when the policy needs it.
    pub fn effective_options(&self, source: &Path) -> Result<&str> {
        if self.deoptimize == Deoptimize::Never || self.compiler_options_deoptimized.is_empty() {
            return Ok(&self.compiler_options);
        }
        let io_err = |e| GraphError::Io {
            path: source.to_path_buf(),
            source: e,
        };
        let writable = !fs::metadata(source).map_err(io_err)?.permissions().readonly();
        let has_token = writable
            && self.deoptimize == Deoptimize::WritableWithToken
            && fs::read_to_string(source).map_err(io_err)?.contains(DEOPTIMIZE_TOKEN);

        if self.uses_deoptimized(writable, has_token) {
            Ok(&self.compiler_options_deoptimized)
        } else {
            Ok(&self.compiler_options)
        }
    }

    /// Expand the option tokens into a full command line for object `name`.
    ///
    /// `%1` is the source, `%2` the output, `%3` the companion object for PCH
    /// creators or the PCH output for PCH users.
    pub fn command_line(&self, graph: &NodeGraph, name: &str, options: &str) -> String {
        let source = graph.name(self.source);
        let extra = match (&self.pch_object_name, self.precompiled_header) {
            (Some(obj), _) => obj.as_str(),
            (None, Some(pch)) => graph.name(pch),
            (None, None) => "",
        };
        let args = options
            .replace("%1", source)
            .replace("%2", name)
            .replace("%3", extra);

        let executable = graph
            .node(self.compiler)
            .as_compiler()
            .map(|c| c.executable.as_str())
            .unwrap_or_default();
        format!("{executable} {args}")
    }
}
