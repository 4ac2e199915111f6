//! Vendor flag classification and validation.
//!
//! Object lists only need a pass/fail answer from these checks plus a few
//! derived values (the MSVC PCH companion object, extra output folders). The
//! rules are deliberately shallow: they look for the tokens a build step will
//! substitute (`%1` input, `%2` output, `%3` PCH object) and for the PCH
//! switches that decide how an object relates to its precompiled header.

use bitflags::bitflags;

use super::types::CompilerFamily;

bitflags! {
    /// Classification bits carried by every object node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ObjectFlags: u32 {
        const MSVC                = 1 << 0;
        const CLANG               = 1 << 1;
        const GCC                 = 1 << 2;
        const CREATING_PCH        = 1 << 3;
        const USING_PCH           = 1 << 4;
        const UNITY               = 1 << 5;
        const ISOLATED_FROM_UNITY = 1 << 6;
        const CAN_BE_CACHED       = 1 << 7;
        const CAN_BE_DISTRIBUTED  = 1 << 8;
    }
}

/// Split an option string into tokens, dropping surrounding quotes.
fn tokens(options: &str) -> impl Iterator<Item = &str> {
    options.split_whitespace().map(|t| t.trim_matches('"'))
}

/// Does `token` spell the MSVC switch `name` (either `/name` or `-name` prefix)?
fn is_msvc_switch(token: &str, name: &str) -> bool {
    token
        .strip_prefix('/')
        .or_else(|| token.strip_prefix('-'))
        .is_some_and(|rest| rest.starts_with(name))
}

fn has_msvc_switch(options: &str, name: &str) -> bool {
    tokens(options).any(|t| is_msvc_switch(t, name))
}

/// Value attached to an MSVC switch, e.g. `out/pdb/` for `/Fdout/pdb/`.
fn msvc_switch_value<'a>(options: &'a str, name: &str) -> Option<&'a str> {
    tokens(options).find_map(|t| {
        let rest = t.strip_prefix('/').or_else(|| t.strip_prefix('-'))?;
        rest.strip_prefix(name).filter(|v| !v.is_empty())
    })
}

/// Classify an option string for a compiler.
///
/// Vendor bits come from the family. Caching is ruled out when MSVC writes
/// debug info into a shared PDB (`/Zi`, `/ZI`), distribution when the object
/// produces a precompiled header.
pub fn determine_flags(
    family: CompilerFamily,
    options: &str,
    creating_pch: bool,
    using_pch: bool,
) -> ObjectFlags {
    let mut flags = ObjectFlags::empty();

    if family.is_msvc_like() {
        flags |= ObjectFlags::MSVC;
    } else if family == CompilerFamily::Clang {
        flags |= ObjectFlags::CLANG;
    } else if family == CompilerFamily::Gcc {
        flags |= ObjectFlags::GCC;
    }

    if creating_pch {
        flags |= ObjectFlags::CREATING_PCH;
    } else if using_pch {
        // MSVC only consumes the PCH when told to; other vendors pick it up implicitly
        if !flags.contains(ObjectFlags::MSVC) || has_msvc_switch(options, "Yu") {
            flags |= ObjectFlags::USING_PCH;
        }
    }

    let shared_pdb = flags.contains(ObjectFlags::MSVC)
        && tokens(options).any(|t| t == "/Zi" || t == "/ZI" || t == "-Zi" || t == "-ZI");
    if !shared_pdb {
        flags |= ObjectFlags::CAN_BE_CACHED;
    }
    if !creating_pch && !matches!(family, CompilerFamily::Custom) {
        flags |= ObjectFlags::CAN_BE_DISTRIBUTED;
    }

    flags
}

/// Validate MSVC PCH creation options and derive the companion object name.
///
/// MSVC emits an object alongside the `.pch` that must be linked; it is named
/// after the PCH output with the object extension.
pub fn check_pch_create(options: &str, pch_output: &str, obj_ext: &str) -> Result<String, String> {
    if !has_msvc_switch(options, "Yc") {
        return Err("PCH options must contain /Yc to create a precompiled header".to_string());
    }
    for token in ["%1", "%2", "%3"] {
        if !options.contains(token) {
            return Err(format!("PCH options must contain '{token}'"));
        }
    }
    Ok(replace_extension(pch_output, obj_ext))
}

/// Validate MSVC options for objects that consume a precompiled header.
pub fn check_pch_use(options: &str) -> Result<(), String> {
    if !has_msvc_switch(options, "Yu") {
        return Err("options must contain /Yu when using a precompiled header".to_string());
    }
    if !has_msvc_switch(options, "Fp") {
        return Err("options must contain /Fp when using a precompiled header".to_string());
    }
    Ok(())
}

/// Validate the main compiler options of an object list.
pub fn check_compiler_options(options: &str, flags: ObjectFlags) -> Result<(), String> {
    if !options.contains("%1") {
        return Err("options must contain '%1' (input file)".to_string());
    }
    if !options.contains("%2") {
        return Err("options must contain '%2' (output file)".to_string());
    }
    if flags.contains(ObjectFlags::MSVC) && has_msvc_switch(options, "Yc") {
        return Err("/Yc is only valid in PCH options".to_string());
    }
    Ok(())
}

/// Folders for MSVC side outputs (`/Fd` program database, `/Fa` assembly listing).
///
/// Returns `(pdb_dir, asm_dir)`; each is the directory part of the switch value,
/// including the trailing separator.
pub fn extra_output_paths(options: &str) -> (Option<String>, Option<String>) {
    let dir_of = |value: &str| -> Option<String> {
        // Anything after a substitution token is per-object, keep only the fixed prefix
        let fixed = value.split('%').next().unwrap_or(value);
        let end = fixed.rfind(['/', '\\'])?;
        Some(fixed[..=end].to_string())
    };
    (
        msvc_switch_value(options, "Fd").and_then(dir_of),
        msvc_switch_value(options, "Fa").and_then(dir_of),
    )
}

/// Replace the extension of the final path segment (or append one if there is none).
pub fn replace_extension(path: &str, ext: &str) -> String {
    let name_start = path.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    match path[name_start..].rfind('.') {
        Some(dot) => format!("{}{}", &path[..name_start + dot], ext),
        None => format!("{path}{ext}"),
    }
}
