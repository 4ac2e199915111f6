//! Compiler families and vendor-specific flag handling
//!
//! Object lists never invoke a compiler. They only need to know which command
//! line dialect a compiler speaks, so they can validate PCH switches and decide
//! which side outputs (companion objects, PDB and ASM folders) exist.

pub mod flags;
pub mod types;

pub use flags::ObjectFlags;
pub use types::{CompilerFamily, default_object_extension};
