//! Error types for graph construction and object expansion.
//!
//! Every failure is terminal for the object list that raised it. Nothing in
//! this crate retries; the driver decides whether other lists keep building.

use std::path::PathBuf;

use crate::graph::NodeType;

/// Convenience alias used throughout the graph and build modules.
pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A property required by the current configuration was not supplied.
    #[error("{node}: missing required property '{property}'")]
    MissingProperty { node: String, property: String },

    /// `pch_input_file` was set without `pch_output_file` or `pch_options`.
    #[error("{node}: 'pch_output_file' and 'pch_options' are required when 'pch_input_file' is set")]
    MissingPchArgs { node: String },

    /// A precompiled header output was claimed by a second creator.
    #[error("{node}: precompiled header '{pch}' is already defined")]
    PchAlreadyDefined { node: String, pch: String },

    #[error("{node}: '{property}' refers to '{target}' which is a {found} (expected {expected})")]
    UnexpectedType {
        node: String,
        property: String,
        target: String,
        found: NodeType,
        expected: NodeType,
    },

    #[error("{node}: '{property}' refers to '{target}' which is not defined")]
    TargetNotDefined {
        node: String,
        property: String,
        target: String,
    },

    /// The compiler belongs to a family that needs a different node kind.
    #[error("{node}: compiler '{compiler}' is a C# compiler, use an assembly target instead of an object list")]
    IncompatibleCompiler { node: String, compiler: String },

    /// Vendor flag validation rejected an option string.
    #[error("{node}: invalid {property}: {reason}")]
    InvalidFlags {
        node: String,
        property: String,
        reason: String,
    },

    #[error(
        "conflicting objects found for: {object}\n Source A  : {source_a}\n ObjectList: {owner_a}\nAND\n Source B  : {source_b}\n ObjectList: {owner_b}"
    )]
    ConflictingObjects {
        object: String,
        source_a: String,
        owner_a: String,
        source_b: String,
        owner_b: String,
    },

    /// A name that must resolve to a file resolved to something else.
    #[error("{node}: {property} '{target}' is not a file node (type: {found})")]
    NotAFile {
        node: String,
        property: String,
        target: String,
        found: NodeType,
    },

    #[error("no files found to build '{node}'")]
    NoInputFiles { node: String },

    /// Registry insertion under a name that already exists.
    #[error("node '{name}' is already defined")]
    AlreadyDefined { name: String },

    /// An auxiliary output directory (pdb, asm) could not be created.
    #[error("failed to create folder for {what} file '{path}': {source}")]
    CreateOutputDir {
        what: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to scan directory '{path}': {source}")]
    DirectoryScan {
        path: String,
        source: walkdir::Error,
    },

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Stamp folding saw a dependency that has not finished building.
    #[error("{node}: dependency '{dependency}' has not been built")]
    IncompleteDependency { node: String, dependency: String },

    /// The external unit build step failed.
    #[error("failed to build '{unit}': {reason}")]
    UnitBuild { unit: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_both_sides() {
        let err = GraphError::ConflictingObjects {
            object: "/out/a.o".to_string(),
            source_a: "/src/one/a.cpp".to_string(),
            owner_a: "libA".to_string(),
            source_b: "/src/two/a.cpp".to_string(),
            owner_b: "libB".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/out/a.o"));
        assert!(msg.contains("/src/one/a.cpp"));
        assert!(msg.contains("/src/two/a.cpp"));
        assert!(msg.contains("libA"));
        assert!(msg.contains("libB"));
    }

    #[test]
    fn test_unexpected_type_display() {
        let err = GraphError::UnexpectedType {
            node: "core".to_string(),
            property: "compiler_input_unity".to_string(),
            target: "clang".to_string(),
            found: NodeType::Compiler,
            expected: NodeType::Unity,
        };
        let msg = err.to_string();
        assert!(msg.contains("Compiler"));
        assert!(msg.contains("expected Unity"));
    }

    #[test]
    fn test_create_output_dir_display() {
        let err = GraphError::CreateOutputDir {
            what: ".pdb",
            path: PathBuf::from("/out/pdb"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains(".pdb"));
        assert!(msg.contains("/out/pdb"));
    }
}
