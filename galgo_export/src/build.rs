//! Build orchestration: depth-first traversal of the graph, emitter
//! dispatch, the single resolver pass, and final program assembly. Also owns
//! the incremental-skip decision, the lock marker, and the process-wide
//! single-build-in-flight guard.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use galgo_graph::Graph;
use galgo_ids::{mix64, string_to_u64, NodeId, StableId};
use galgo_project::{ExportConfig, ExportPaths};
use once_cell::sync::Lazy;

use crate::cache::AssetDependencyCache;
use crate::context::{CancelToken, ExportContext};
use crate::emit::{EmitArgs, EmitterDispatch};
use crate::error::ExportError;
use crate::expr::escape_str;
use crate::manifest::ScriptsManifest;
use crate::registry::ReferenceRegistry;
use crate::resolver::{write_node_state, Resolver, ResolverEnv};
use crate::writer::CodeWriter;

/// Outcome of one build. Partial files from a failed build stay on disk for
/// inspection and are fully rewritten by the next successful build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub success: bool,
    pub cancelled: bool,
    /// True when the incremental check proved nothing changed and the whole
    /// pipeline was skipped.
    pub skipped: bool,
    pub program_path: PathBuf,
    pub nodes_exported: usize,
    pub assets_exported: usize,
    /// `owner.field` labels written as missing comments.
    pub missing_fields: Vec<String>,
    pub build_id: u64,
}

/// Filesystem marker telling external watchers a build is in progress.
/// Removed on completion or failure.
struct LockMarker {
    path: PathBuf,
}

impl LockMarker {
    fn acquire(path: &Path, build_id: u64) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, format!("{build_id:016x}\n"))?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for LockMarker {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Run a full export build. The graph is read-only for the duration; node
/// destruction during traversal is unsupported by construction.
pub fn build(
    graph: &Graph,
    roots: &[NodeId],
    paths: &ExportPaths,
    config: &ExportConfig,
    cancel: &CancelToken,
) -> Result<BuildReport, ExportError> {
    let roots = select_roots(graph, roots)?;
    fs::create_dir_all(&paths.output_root)
        .map_err(|err| ExportError::OutputDirUnwritable(paths.output_root.clone(), err))?;
    fs::create_dir_all(&paths.assets_dir)
        .map_err(|err| ExportError::OutputDirUnwritable(paths.assets_dir.clone(), err))?;

    let fingerprint = graph_fingerprint(graph)?;
    let mut cache = AssetDependencyCache::load(&paths.cache_file);

    if config.incremental
        && !config.distribution
        && cache.recorded_fingerprint(&paths.program_file) == Some(fingerprint.as_str())
        && paths.program_file.is_file()
        && paths.scripts_manifest.is_file()
        && cache.build_outputs_present(&paths.program_file)
    {
        log::info!("source graph unchanged since last build, skipping export");
        return Ok(BuildReport {
            success: true,
            cancelled: false,
            skipped: true,
            program_path: paths.program_file.clone(),
            nodes_exported: 0,
            assets_exported: 0,
            missing_fields: Vec::new(),
            build_id: 0,
        });
    }

    let build_id = mix64(string_to_u64(&fingerprint) ^ unix_time());
    let _lock = LockMarker::acquire(&paths.lock_file, build_id)?;
    log::info!("build {build_id:016x}: exporting {} root(s)", roots.len());

    let manifest = ScriptsManifest::scan(&paths.res_dir)?;
    manifest.sync_sources(&paths.res_dir, &paths.scripts_dir)?;
    let mut registry = ReferenceRegistry::new();
    manifest.apply_known_types(&mut registry);

    let dispatch = EmitterDispatch::with_builtins();
    let mut ctx = ExportContext::new(build_id);
    let mut body = CodeWriter::new();
    let mut traversal = Traversal {
        graph,
        dispatch: &dispatch,
        cancel,
        traversed: Vec::new(),
        nodes: 0,
    };

    for (i, root) in roots.iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        if i > 0 {
            ctx.reset_subtree();
            body.blank();
        }
        traversal.walk(*root, None, &mut ctx, &mut registry, &mut body);
    }

    let env = ResolverEnv {
        res_dir: paths.res_dir.clone(),
        assets_dir: paths.assets_dir.clone(),
        min_plausible_asset_bytes: config.min_plausible_asset_bytes,
    };
    let mut resolver = Resolver::new(graph, &env);
    resolver.set_has_boundaries(ctx.inside_subgraph);
    for id in &traversal.traversed {
        resolver.mark_restored(*id);
    }
    let mut link = CodeWriter::new();
    let resolve_report =
        resolver.resolve_all(&mut registry, &mut cache, &mut ctx, &mut link, cancel);

    let cancelled = cancel.is_cancelled();
    let program = assemble_program(&body, &link, build_id, cancelled);
    program.flush_to(&paths.program_file)?;
    fs::write(&paths.scripts_manifest, manifest.render())?;

    let missing_fields = resolve_report.missing;
    let success = !cancelled && (missing_fields.is_empty() || !config.fail_on_missing);
    if success {
        cache.record_output(&paths.program_file, fingerprint);
        cache.record_build_outputs(&paths.program_file);
    } else {
        cache.forget(&paths.program_file);
    }
    cache.flush()?;

    if cancelled {
        log::warn!("build {build_id:016x} cancelled, program marked incomplete");
    } else if !missing_fields.is_empty() {
        log::warn!(
            "build {build_id:016x} finished with {} unresolved field(s)",
            missing_fields.len()
        );
    } else {
        log::info!(
            "build {build_id:016x} finished: {} node(s), {} asset(s) exported",
            traversal.nodes,
            resolve_report.assets_exported
        );
    }

    Ok(BuildReport {
        success,
        cancelled,
        skipped: false,
        program_path: paths.program_file.clone(),
        nodes_exported: traversal.nodes,
        assets_exported: resolve_report.assets_exported,
        missing_fields,
        build_id,
    })
}

#[derive(Default)]
struct GuardState {
    running: bool,
    last: Option<Arc<BuildReport>>,
}

static BUILD_GUARD: Lazy<(Mutex<GuardState>, Condvar)> =
    Lazy::new(|| (Mutex::new(GuardState::default()), Condvar::new()));

/// One build in flight per process. A second request while one runs blocks
/// and attaches to the in-flight build's result instead of starting over.
pub fn build_shared(
    graph: &Graph,
    roots: &[NodeId],
    paths: &ExportPaths,
    config: &ExportConfig,
    cancel: &CancelToken,
) -> Result<Arc<BuildReport>, ExportError> {
    let (lock, cvar) = &*BUILD_GUARD;
    let mut state = lock.lock().unwrap_or_else(|e| e.into_inner());
    if state.running {
        log::info!("build already in flight, attaching to its result");
        while state.running {
            state = cvar.wait(state).unwrap_or_else(|e| e.into_inner());
        }
        return state.last.clone().ok_or(ExportError::ConcurrentBuildFailed);
    }
    state.running = true;
    drop(state);

    let shared = build(graph, roots, paths, config, cancel).map(Arc::new);

    let mut state = lock.lock().unwrap_or_else(|e| e.into_inner());
    state.running = false;
    state.last = shared.as_ref().ok().cloned();
    cvar.notify_all();
    drop(state);
    shared
}

struct Traversal<'a> {
    graph: &'a Graph,
    dispatch: &'a EmitterDispatch,
    cancel: &'a CancelToken,
    traversed: Vec<StableId>,
    nodes: usize,
}

impl Traversal<'_> {
    /// Depth-first walk. Node state is written unconditionally for every
    /// visited node so the program can reconstruct nodes that carry no
    /// exported components. Editor-only subtrees are skipped entirely.
    fn walk(
        &mut self,
        id: NodeId,
        parent_var: Option<&str>,
        ctx: &mut ExportContext,
        registry: &mut ReferenceRegistry,
        writer: &mut CodeWriter,
    ) {
        if self.cancel.is_cancelled() {
            return;
        }
        let graph = self.graph;
        let Some(node) = graph.get(id) else {
            return;
        };
        if node.editor_only {
            log::debug!("skipping editor-only subtree `{}`", node.name);
            return;
        }

        let var = ctx.fresh_var("n", &node.name);
        match parent_var {
            Some(parent) => writer.line(&format!(
                "let {var} = scene.add_node({parent}, \"{}\");",
                escape_str(&node.name)
            )),
            None => writer.line(&format!(
                "let {var} = scene.add_root(\"{}\");",
                escape_str(&node.name)
            )),
        }
        registry.register_instance(&var, node.stable_id, "Node");
        write_node_state(writer, &var, node);
        self.traversed.push(node.stable_id);
        self.nodes += 1;

        ctx.current_node = id;
        ctx.current_var = var.clone();
        for component in &node.components {
            if self.cancel.is_cancelled() {
                return;
            }
            ctx.current_component = Some(component.id());
            let result = self.dispatch.run(
                component,
                &mut EmitArgs {
                    node,
                    ctx: &mut *ctx,
                    registry: &mut *registry,
                    writer: &mut *writer,
                },
            );
            match result {
                Some(res) => {
                    if !res.success {
                        log::warn!(
                            "emitter for `{}` on `{}` failed, component skipped",
                            component.kind().as_str(),
                            node.name
                        );
                    }
                    if res.hierarchy_exported {
                        ctx.inside_subgraph = true;
                    }
                }
                None => log::debug!(
                    "no emitter for `{}` on `{}`, skipping",
                    component.kind().as_str(),
                    node.name
                ),
            }
        }
        ctx.current_component = None;

        for child in node.children.clone() {
            self.walk(child, Some(&var), ctx, registry, writer);
            ctx.current_node = id;
            ctx.current_var = var.clone();
            // Brief pause between sibling subtrees so an embedding UI
            // thread gets a chance to run. Not a parallelism point.
            std::thread::yield_now();
        }
    }
}

fn select_roots(graph: &Graph, roots: &[NodeId]) -> Result<Vec<NodeId>, ExportError> {
    if !roots.is_empty() {
        return Ok(roots.to_vec());
    }
    let detected = graph.roots();
    match detected.len() {
        0 => Err(ExportError::NoExportRoot),
        1 => Ok(detected),
        n => Err(ExportError::AmbiguousRoot(n)),
    }
}

fn graph_fingerprint(graph: &Graph) -> Result<String, ExportError> {
    let bytes =
        serde_json::to_vec(graph).map_err(|err| ExportError::GraphEncode(err.to_string()))?;
    Ok(AssetDependencyCache::fingerprint_bytes(&bytes))
}

fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn assemble_program(
    body: &CodeWriter,
    link: &CodeWriter,
    build_id: u64,
    cancelled: bool,
) -> CodeWriter {
    let mut out = CodeWriter::new();
    out.line("#![allow(unused_imports, unused_variables, dead_code)]");
    out.line("// AUTO-GENERATED by Galgo Export. Do not edit by hand.");
    out.blank();
    out.line("use galgo_runtime::Scene;");
    out.line("use galgo_runtime::prelude::*;");
    out.blank();
    out.line("#[path = \"scripts.gen.rs\"]");
    out.line("mod scripts;");
    out.blank();
    out.begin_block("pub fn load_scene(scene: &mut Scene)");
    out.append(body);
    if !link.is_empty() {
        out.blank();
        out.append(link);
    }
    if cancelled {
        out.blank();
        out.comment("INCOMPLETE: build cancelled before all statements were emitted.");
    }
    out.blank();
    // Trailing build identifier so the consuming runtime can cache-bust.
    out.line(&format!("scene.set_build_id(0x{build_id:016x});"));
    out.end_block();
    out
}
