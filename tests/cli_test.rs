//! End-to-end tests for the `objlist` binary
//!
//! Each test writes a small project into a temporary folder and runs the
//! built executable against its `objlist.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const PROJECT: &str = r#"
[[compiler]]
name = "clang"
executable = "/usr/bin/clang++"

[[object_list]]
name = "core"
compiler = "clang"
compiler_options = "-c %1 -o %2"
compiler_output_path = "build/obj"
compiler_output_extension = ".o"
compiler_input_path = ["src"]

[[archive]]
name = "build/libcore.a"
inputs = ["core"]
"#;

const HIDDEN_LIST: &str = r#"
[[object_list]]
name = "tools"
compiler = "clang"
compiler_options = "-c %1 -o %2"
compiler_output_path = "build/tools"
compiler_input_files = ["src/main.cpp"]
hidden = true
"#;

fn create_project(config: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::create_dir_all(dir.path().join("src/net")).unwrap();
    fs::write(dir.path().join("src/main.cpp"), "int main() { return 0; }\n").unwrap();
    fs::write(dir.path().join("src/net/socket.cpp"), "int sock;\n").unwrap();
    let config_path = dir.path().join("objlist.toml");
    fs::write(&config_path, config).unwrap();
    (dir, config_path)
}

fn objlist(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_objlist"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run objlist")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_build_writes_stamps_and_compile_commands() {
    let (dir, config) = create_project(PROJECT);

    let output = objlist(&config, &["build", "--compile-commands"]);
    assert!(output.status.success(), "build failed: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("new"));

    let stamps = fs::read_to_string(dir.path().join(".objlist/stamps.json")).unwrap();
    assert!(stamps.contains("\"core\""));

    let commands: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("compile_commands.json")).unwrap()).unwrap();
    let entries = commands.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0]["command"].as_str().unwrap().starts_with("/usr/bin/clang++ -c "));

    let again = objlist(&config, &["build"]);
    assert!(again.status.success());
    assert!(stdout(&again).contains("up to date"));

    fs::write(dir.path().join("src/main.cpp"), "int main() { return 1; }\n").unwrap();
    let changed = objlist(&config, &["build"]);
    assert!(changed.status.success());
    assert!(stdout(&changed).contains("changed"));
}

#[test]
fn test_objects_lists_sub_folders() {
    let (dir, config) = create_project(PROJECT);
    let output = objlist(&config, &["objects", "core"]);
    assert!(output.status.success());

    let text = stdout(&output);
    let expected = dir.path().join("build/obj/net/socket.o");
    assert!(text.contains(&expected.to_string_lossy().to_string()), "{text}");
}

#[test]
fn test_args_for_archive() {
    let (_dir, config) = create_project(PROJECT);
    let output = objlist(&config, &["args", "build/libcore.a", "--pre", "<", "--post", ">"]);
    assert!(output.status.success());

    let lines: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.starts_with('<') && l.ends_with(".o>")));
}

#[test]
fn test_plan_skips_hidden_lists() {
    let config_text = format!("{PROJECT}{HIDDEN_LIST}");
    let (_dir, config) = create_project(&config_text);
    let output = objlist(&config, &["plan"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("core"), "{text}");
    assert!(!text.contains("tools"), "{text}");

    let (_dir, bare) = create_project(&PROJECT[..PROJECT.find("[[object_list]]").unwrap()]);
    let output = objlist(&bare, &["plan"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No object lists defined"));
}

#[test]
fn test_empty_folder_fails_build() {
    let config_text = PROJECT.replace("[\"src\"]", "[\"nothing-here\"]");
    let (_dir, config) = create_project(&config_text);
    let output = objlist(&config, &["build"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no files found"));
}

#[test]
fn test_missing_config() {
    let dir = tempfile::tempdir().unwrap();
    let output = objlist(&dir.path().join("objlist.toml"), &["plan"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}
