use crate::toolchain::CompilerFamily;

/// A compiler (or preprocessor) executable referenced by object lists.
#[derive(Debug, Clone)]
pub struct CompilerNode {
    pub executable: String,
    pub family: CompilerFamily,
}

impl CompilerNode {
    pub fn new(executable: impl Into<String>, family: CompilerFamily) -> Self {
        Self {
            executable: executable.into(),
            family,
        }
    }

    /// Build a node for an executable, guessing the family from its file name
    pub fn from_executable(executable: impl Into<String>) -> Self {
        let executable = executable.into();
        let family = CompilerFamily::from_executable(&executable);
        Self { executable, family }
    }
}
