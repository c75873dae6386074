use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use galgo_export::{build_shared, AssetDependencyCache, CancelToken};
use galgo_graph::Graph;
use galgo_project::{ensure_project_toml, load_project_toml, ExportPaths};

const DEFAULT_PROJECT_NAME: &str = "Galgo Project";

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let Some(command) = args.get(1).map(String::as_str) else {
        print_usage();
        std::process::exit(2);
    };

    let result = match command {
        "new" => new_command(&args, &cwd),
        "build" => build_command(&args, &cwd),
        "clean" => clean_command(&args, &cwd),
        _ => {
            print_usage();
            Err(format!("unknown command `{command}`"))
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  galgo_cli new [--path <parent_dir>] [--name <project_name>]");
    eprintln!("  galgo_cli build [--path <project_dir>] [--dist] [--clean-cache]");
    eprintln!("  galgo_cli clean [--path <project_dir>]            # drop the export cache");
}

fn parse_flag_value(args: &[String], flag: &str) -> Option<String> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1).cloned()
}

fn project_dir_from(args: &[String], cwd: &Path) -> PathBuf {
    parse_flag_value(args, "--path")
        .map(PathBuf::from)
        .unwrap_or_else(|| cwd.to_path_buf())
}

fn new_command(args: &[String], cwd: &Path) -> Result<(), String> {
    let base_dir = project_dir_from(args, cwd);
    let project_name =
        parse_flag_value(args, "--name").unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string());
    let project_dir = base_dir.join(sanitize_project_dir_name(&project_name));

    fs::create_dir_all(project_dir.join("res"))
        .map_err(|err| format!("failed to create {}: {err}", project_dir.display()))?;
    ensure_project_toml(&project_dir, &project_name)
        .map_err(|err| format!("failed to write project.toml: {err}"))?;
    let graph_file = project_dir.join("res").join("main.graph");
    if !graph_file.exists() {
        let empty = serde_json::to_string_pretty(&Graph::new())
            .map_err(|err| format!("failed to encode empty graph: {err}"))?;
        fs::write(&graph_file, empty)
            .map_err(|err| format!("failed to write {}: {err}", graph_file.display()))?;
    }

    println!(
        "created project `{}` at {}",
        project_name,
        project_dir.display()
    );
    Ok(())
}

fn build_command(args: &[String], cwd: &Path) -> Result<(), String> {
    let project_dir = project_dir_from(args, cwd);
    let mut config = load_project_toml(&project_dir)
        .map_err(|err| format!("cannot load project at {}: {err}", project_dir.display()))?;
    if args.iter().any(|a| a == "--dist") {
        config.export.distribution = true;
    }

    let paths = ExportPaths::resolve(&project_dir, &config.export)
        .map_err(|err| format!("cannot resolve export paths: {err}"))?;
    if args.iter().any(|a| a == "--clean-cache") {
        let mut cache = AssetDependencyCache::load(&paths.cache_file);
        cache.clear();
        cache
            .flush()
            .map_err(|err| format!("cannot clear export cache: {err}"))?;
    }
    let graph = load_graph(&paths, &config.main_graph)?;

    let report = build_shared(&graph, &[], &paths, &config.export, &CancelToken::new())
        .map_err(|err| format!("build failed: {err}"))?;

    if report.skipped {
        println!("up to date, nothing exported");
        return Ok(());
    }
    for field in &report.missing_fields {
        log::warn!("unresolved: {field}");
    }
    println!(
        "exported {} node(s), {} asset(s) -> {}",
        report.nodes_exported,
        report.assets_exported,
        report.program_path.display()
    );
    if !report.success {
        return Err(format!(
            "build finished with {} unresolved field(s)",
            report.missing_fields.len()
        ));
    }
    Ok(())
}

fn clean_command(args: &[String], cwd: &Path) -> Result<(), String> {
    let project_dir = project_dir_from(args, cwd);
    let config = load_project_toml(&project_dir)
        .map_err(|err| format!("cannot load project at {}: {err}", project_dir.display()))?;
    let paths = ExportPaths::resolve(&project_dir, &config.export)
        .map_err(|err| format!("cannot resolve export paths: {err}"))?;

    let mut cache = AssetDependencyCache::load(&paths.cache_file);
    cache.clear();
    cache
        .flush()
        .map_err(|err| format!("cannot clear export cache: {err}"))?;
    println!("export cache cleared");
    Ok(())
}

fn load_graph(paths: &ExportPaths, main_graph: &str) -> Result<Graph, String> {
    let graph_path = paths
        .resolve_res_path(main_graph)
        .ok_or_else(|| format!("invalid main_graph path `{main_graph}`"))?;
    let raw = fs::read_to_string(&graph_path)
        .map_err(|err| format!("cannot read {}: {err}", graph_path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|err| format!("cannot parse {}: {err}", graph_path.display()))
}

fn sanitize_project_dir_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return "galgo_project".to_string();
    }

    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        let invalid = matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*');
        if invalid {
            out.push('_');
        } else {
            out.push(c);
        }
    }

    let collapsed = out.trim_matches('.');
    if collapsed.is_empty() {
        "galgo_project".to_string()
    } else {
        collapsed.to_string()
    }
}
