//! # objlist - compilation aggregates for a build graph
//!
//! An *object list* compiles a declared set of inputs (explicit files,
//! directory scans and unity groups) into one object per input, and summarizes
//! the result as a single 64-bit stamp.
//!
//! ## Features
//!
//! - **Two-phase resolution**: references are resolved once into static
//!   dependencies, inputs are re-expanded into objects before every build
//! - **Conflict detection**: one output path, one source, one owner
//! - **Shared precompiled headers**: created by one list, reused by others
//! - **Deterministic stamps**: xxh3 over the ordered object stamps
//!
//! ## Module Organization
//!
//! - [`graph`] - Node registry, node kinds and the object list core
//! - [`toolchain`] - Compiler families and vendor flag checks
//! - [`build`] - Build driver, unit executors and the stamp database
//! - [`config`] - Project description parsing (`objlist.toml`)

/// Build driver with parallel unit builds.
pub mod build;

/// Project description parsing (`objlist.toml`).
pub mod config;

/// Errors raised while constructing or expanding the graph.
pub mod error;

/// Node registry and node kinds.
pub mod graph;

/// Compiler families and flag classification.
pub mod toolchain;

/// Terminal UI utilities (tables, colors).
pub mod ui;

pub use error::{GraphError, Result};
