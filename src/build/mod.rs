mod core;
mod stamps;
mod utils;

pub use core::{ContentStamper, UnitExecutor, build_object_list, refresh_inputs, scan_inputs};
pub use stamps::{StampChange, StampDb};
pub use utils::{compile_commands, write_dependency_lists, write_json, write_unity_files};
