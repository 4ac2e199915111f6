use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Compiler families that change how object lists validate flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompilerFamily {
    /// Microsoft Visual C++ (cl.exe)
    Msvc,
    /// Clang with MSVC compatibility (clang-cl.exe)
    ClangCl,
    /// Clang/LLVM (clang++ or clang)
    Clang,
    /// GNU Compiler Collection (g++ or gcc)
    Gcc,
    /// C# compiler (csc.exe), only valid for assembly targets
    #[serde(rename = "csharp")]
    CSharp,
    /// Anything else, treated as a plain command line tool
    Custom,
}

impl CompilerFamily {
    /// Families that follow MSVC command line conventions (`/Yc`, `/Fo`, ...)
    pub fn is_msvc_like(&self) -> bool {
        matches!(self, CompilerFamily::Msvc | CompilerFamily::ClangCl)
    }

    pub fn is_managed(&self) -> bool {
        matches!(self, CompilerFamily::CSharp)
    }

    /// Infer the family from an executable path (`cl.exe`, `clang++`, `g++-13`, ...)
    pub fn from_executable(path: &str) -> Self {
        let file_name = Path::new(path)
            .file_name()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let stem = file_name.strip_suffix(".exe").unwrap_or(&file_name);

        match stem {
            "cl" => CompilerFamily::Msvc,
            "clang-cl" => CompilerFamily::ClangCl,
            "csc" => CompilerFamily::CSharp,
            s if s.starts_with("clang") => CompilerFamily::Clang,
            s if s.starts_with("gcc") || s.starts_with("g++") || s.ends_with("-gcc") || s.ends_with("-g++") => {
                CompilerFamily::Gcc
            }
            _ => CompilerFamily::Custom,
        }
    }
}

impl fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompilerFamily::Msvc => "msvc",
            CompilerFamily::ClangCl => "clang-cl",
            CompilerFamily::Clang => "clang",
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::CSharp => "csharp",
            CompilerFamily::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Platform default object file extension
pub fn default_object_extension() -> &'static str {
    if cfg!(windows) { ".obj" } else { ".o" }
}
