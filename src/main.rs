//! # objlist CLI Entry Point
//!
//! Loads `objlist.toml`, constructs the node graph and routes commands:
//! - `plan`: the static dependencies of every object list
//! - `inputs`: logical inputs after a rescan, without creating objects
//! - `objects`: the objects a build attempt would compile
//! - `args`: linker/archiver arguments of an object list or archive
//! - `build`: expand, stamp every object and fold the list stamps

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use objlist::build::{self, ContentStamper, StampChange, StampDb};
use objlist::config::{self, CONFIG_FILE, Project};
use objlist::graph::{NodeGraph, NodeId, NodeKind, object_list};
use objlist::ui;

#[derive(Parser)]
#[command(name = "objlist")]
#[command(about = "Expand and stamp compilation aggregates of a build graph", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the project description
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the static dependencies of every object list
    Plan,
    /// List the logical inputs of object lists after rescanning
    Inputs {
        /// Only this object list
        name: Option<String>,
    },
    /// List the objects a build attempt would compile
    Objects {
        /// Only this object list
        name: Option<String>,
    },
    /// Print the linker/archiver arguments of an object list or archive
    Args {
        name: String,
        /// Text placed before every argument
        #[arg(long, default_value = "")]
        pre: String,
        /// Text placed after every argument
        #[arg(long, default_value = "")]
        post: String,
        /// Flatten nested archives into their objects
        #[arg(long)]
        objects: bool,
    },
    /// Expand and stamp every object list
    Build {
        /// Write compile_commands.json next to the project description
        #[arg(long)]
        compile_commands: bool,
        /// Keep building other object lists after a failure
        #[arg(long)]
        keep_going: bool,
    },
}

fn init_tracing(verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_project(path: &Path) -> Result<Project> {
    let config = config::load_config(path)?;
    let root = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    let root = std::path::absolute(&root).context("Failed to resolve project folder")?;
    config
        .into_project(&root)
        .with_context(|| format!("Failed to construct the build graph from {}", path.display()))
}

/// Object lists selected by an optional name.
fn select(project: &Project, name: Option<&str>) -> Result<Vec<NodeId>> {
    let Some(name) = name else {
        return Ok(project.object_lists.clone());
    };
    let id = project
        .graph
        .find_node(name)
        .filter(|&id| project.graph.node(id).as_object_list().is_some())
        .with_context(|| format!("'{}' is not an object list", name))?;
    Ok(vec![id])
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "x".red(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut project = load_project(&cli.config)?;

    match cli.command {
        Commands::Plan => {
            plan(&project.graph, &project.object_lists);
            Ok(())
        }
        Commands::Inputs { name } => {
            for id in select(&project, name.as_deref())? {
                build::scan_inputs(&mut project.graph, id)?;
                let list = object_list::object_list(&project.graph, id)?;
                println!("{} {}", "▶".green(), list.name().bold());
                list.enumerate_input_files(&project.graph, &mut |file, base| {
                    if base.is_empty() {
                        println!("   {}", file);
                    } else {
                        println!("   {} {}", file, format!("(from {})", base).dimmed());
                    }
                });
            }
            Ok(())
        }
        Commands::Objects { name } => {
            for id in select(&project, name.as_deref())? {
                build::scan_inputs(&mut project.graph, id)?;
                object_list::do_dynamic_dependencies(&mut project.graph, id)?;
                objects(&project.graph, id)?;
            }
            Ok(())
        }
        Commands::Args {
            name,
            pre,
            post,
            objects,
        } => {
            let id = project
                .graph
                .find_node(&name)
                .with_context(|| format!("'{}' is not defined", name))?;
            // Arguments come from the last expansion, so expand everything first
            for &list in &project.object_lists.clone() {
                build::scan_inputs(&mut project.graph, list)?;
                object_list::do_dynamic_dependencies(&mut project.graph, list)?;
            }
            let graph = &project.graph;
            let mut args = Vec::new();
            match &graph.node(id).kind {
                NodeKind::ObjectList(list) => list.input_args(graph, &pre, &post, objects, &mut args),
                NodeKind::Archive(archive) => archive.input_args(graph, &pre, &post, objects, &mut args),
                _ => anyhow::bail!("'{}' is neither an object list nor an archive", name),
            }
            for arg in args {
                println!("{}", arg);
            }
            Ok(())
        }
        Commands::Build {
            compile_commands,
            keep_going,
        } => build_all(&mut project, &cli.config, compile_commands, keep_going),
    }
}

fn plan(graph: &NodeGraph, lists: &[NodeId]) {
    let mut table = ui::Table::new(&["Object list", "Compiler", "PCH", "Inputs", "Output"]);
    for &id in lists {
        let Some(list) = graph.node(id).as_object_list().filter(|l| !l.spec().hidden) else {
            continue;
        };
        let inputs = list.static_dependencies()[list.input_range()]
            .iter()
            .map(|&dep| graph.name(dep))
            .collect::<Vec<_>>()
            .join(", ");
        let pch = list
            .precompiled_header()
            .map(|pch| graph.name(pch).to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            list.name().bold().green().to_string(),
            graph.name(list.compiler()).to_string(),
            pch,
            inputs,
            list.spec().compiler_output_path.clone().unwrap_or_default(),
        ]);
    }
    if table.is_empty() {
        println!("{} No object lists defined", "!".yellow());
        return;
    }
    table.print();
}

fn objects(graph: &NodeGraph, id: NodeId) -> Result<()> {
    let list = object_list::object_list(graph, id)?;
    println!("{} {}", "▶".green(), list.name().bold());
    for &dep in list.dynamic_dependencies() {
        let Some(obj) = graph.node(dep).as_object() else {
            continue;
        };
        let tag = if obj.is_creating_pch() {
            "pch".magenta()
        } else if obj.is_unity() {
            "unity".cyan()
        } else if obj.is_isolated_from_unity() {
            "isolated".yellow()
        } else {
            "".normal()
        };
        println!("   {} <- {} {}", graph.name(dep), graph.name(obj.source), tag);
    }
    Ok(())
}

fn build_all(project: &mut Project, config_path: &Path, compile_commands: bool, keep_going: bool) -> Result<()> {
    let start_time = Instant::now();
    let mut db = StampDb::load(&project.stamp_db)?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut table = ui::Table::new(&["Object list", "Objects", "Stamp", "Status"]);
    let mut failed = 0;
    for &id in &project.object_lists {
        let name = project.graph.name(id).to_string();
        match build::build_object_list(&mut project.graph, id, &ContentStamper, &pb) {
            Ok(stamp) => {
                let status = match db.record(&name, stamp) {
                    StampChange::New => "new".cyan(),
                    StampChange::Changed => "changed".yellow(),
                    StampChange::Unchanged => "up to date".green(),
                };
                let count = project
                    .graph
                    .node(id)
                    .as_object_list()
                    .map_or(0, |l| l.dynamic_dependencies().len());
                table.add_row(vec![name, count.to_string(), format!("{stamp:016x}"), status.to_string()]);
            }
            Err(e) => {
                failed += 1;
                pb.suspend(|| eprintln!("{} {}", "x".red(), e));
                table.add_row(vec![name, "-".to_string(), "-".to_string(), "failed".red().to_string()]);
                if !keep_going {
                    break;
                }
            }
        }
    }
    pb.finish_and_clear();
    table.print();

    db.save(&project.stamp_db)?;

    if compile_commands {
        let entries = build::compile_commands(&project.graph, &project.object_lists)?;
        let path = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .join("compile_commands.json");
        build::write_json(&path, &serde_json::Value::Array(entries))?;
        println!("{} Wrote {}", "✓".green(), path.display());
    }

    if failed > 0 {
        anyhow::bail!("{} object list(s) failed to build", failed);
    }
    println!("{} Build finished in {:.2?}", "✓".green(), start_time.elapsed());
    Ok(())
}
