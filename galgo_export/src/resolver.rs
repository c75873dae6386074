//! Second pass of the pipeline. Drains the reference registry after the
//! traversal finishes and turns every pending field into either a resolved
//! assignment or an explicitly missing one. Field state is Pending until
//! this pass runs and terminal afterwards.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use galgo_graph::{AssetKind, AssetRef, Graph, Node, Value};
use galgo_ids::{string_to_u64, NodeId, StableId};

use crate::cache::{AssetDependencyCache, AssetExporter, CopyExporter};
use crate::context::{CancelToken, ExportContext};
use crate::expr::{escape_str, fmt_f32, literal_expr};
use crate::registry::{ReferenceRegistry, ReferencedField};
use crate::writer::CodeWriter;

/// Filesystem context the resolver needs to export referenced assets.
pub struct ResolverEnv {
    /// Root that `res://` paths are resolved against.
    pub res_dir: PathBuf,
    /// Output directory asset artifacts land in.
    pub assets_dir: PathBuf,
    pub min_plausible_asset_bytes: u64,
}

/// What became of the pending fields.
#[derive(Debug, Default)]
pub struct ResolveReport {
    pub resolved: usize,
    /// `owner.field` labels of fields written as missing comments.
    pub missing: Vec<String>,
    pub assets_exported: usize,
}

enum Resolution {
    Resolved(String),
    Missing(String),
}

pub struct Resolver<'a> {
    graph: &'a Graph,
    env: &'a ResolverEnv,
    /// True when this build exported at least one sub-graph boundary, which
    /// legitimizes deferred runtime lookups for identities absent from the
    /// graph being walked.
    has_boundaries: bool,
    exporter: &'a dyn AssetExporter,
    /// Nodes whose state block already exists in the output. Pre-seeded
    /// with every traversed node so restore blocks only fire for targets
    /// the traversal never visited.
    restored: HashSet<StableId>,
    /// Deferred lookups already emitted, keyed by target identity, so a
    /// fan-in of references shares one lookup variable.
    lookups: HashMap<StableId, String>,
}

impl<'a> Resolver<'a> {
    pub fn new(graph: &'a Graph, env: &'a ResolverEnv) -> Self {
        Self {
            graph,
            env,
            has_boundaries: false,
            exporter: &CopyExporter,
            restored: HashSet::new(),
            lookups: HashMap::new(),
        }
    }

    pub fn with_exporter(mut self, exporter: &'a dyn AssetExporter) -> Self {
        self.exporter = exporter;
        self
    }

    pub fn set_has_boundaries(&mut self, value: bool) {
        self.has_boundaries = value;
    }

    /// Mark a node's state as already written (the traversal writes state
    /// for every node it visits).
    pub fn mark_restored(&mut self, id: StableId) {
        self.restored.insert(id);
    }

    /// Drain the registry and write one assignment (or missing comment) per
    /// pending field, in registration order.
    pub fn resolve_all(
        &mut self,
        registry: &mut ReferenceRegistry,
        cache: &mut AssetDependencyCache,
        ctx: &mut ExportContext,
        writer: &mut CodeWriter,
        cancel: &CancelToken,
    ) -> ResolveReport {
        let mut report = ResolveReport::default();
        for field in registry.take_fields() {
            if cancel.is_cancelled() {
                break;
            }
            match self.resolve_value(&field.value, registry, cache, ctx, writer, &mut report) {
                Resolution::Resolved(expr) => {
                    writer.line(&format!(
                        "scene.set({}, \"{}\", {expr});",
                        field.owner_path, field.field_name
                    ));
                    report.resolved += 1;
                }
                Resolution::Missing(reason) => {
                    self.write_missing(writer, &field, &reason);
                    report
                        .missing
                        .push(format!("{}.{}", field.owner_path, field.field_name));
                }
            }
        }
        report
    }

    fn write_missing(&self, writer: &mut CodeWriter, field: &ReferencedField, reason: &str) {
        let label = field
            .display_name
            .as_deref()
            .unwrap_or_else(|| field.value.type_label());
        log::warn!(
            "unresolved field {}.{} ({label}): {reason}",
            field.owner_path,
            field.field_name
        );
        writer.comment(&format!(
            "scene.set({}, \"{}\", ...); // missing {label}: {reason}",
            field.owner_path, field.field_name
        ));
    }

    /// Resolution priority: literal forms, then containers and callables
    /// element-wise, then asset export through the cache, then graph
    /// references (static path, else deferred lookup), then Missing.
    fn resolve_value(
        &mut self,
        value: &Value,
        registry: &ReferenceRegistry,
        cache: &mut AssetDependencyCache,
        ctx: &mut ExportContext,
        writer: &mut CodeWriter,
        report: &mut ResolveReport,
    ) -> Resolution {
        if let Some(expr) = literal_expr(value) {
            return Resolution::Resolved(expr);
        }
        match value {
            Value::List(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    match self.resolve_value(item, registry, cache, ctx, writer, report) {
                        Resolution::Resolved(expr) => parts.push(expr),
                        Resolution::Missing(reason) => {
                            return Resolution::Missing(format!("list element: {reason}"));
                        }
                    }
                }
                Resolution::Resolved(format!("list([{}])", parts.join(", ")))
            }
            Value::Callable { target, method } => {
                match self.resolve_value(target, registry, cache, ctx, writer, report) {
                    Resolution::Resolved(expr) => Resolution::Resolved(format!(
                        "callable({expr}, \"{}\")",
                        escape_str(method)
                    )),
                    Resolution::Missing(reason) => {
                        Resolution::Missing(format!("callable target: {reason}"))
                    }
                }
            }
            Value::Asset(asset) => self.resolve_asset(asset, cache, report),
            Value::Node(id) | Value::Component(id) => {
                self.resolve_graph_ref(*id, matches!(value, Value::Node(_)), registry, ctx, writer)
            }
            // Literal shapes were handled above; reaching here means a new
            // Value variant without a resolver.
            other => Resolution::Missing(format!("no resolver for {}", other.type_label())),
        }
    }

    fn resolve_asset(
        &mut self,
        asset: &AssetRef,
        cache: &mut AssetDependencyCache,
        report: &mut ResolveReport,
    ) -> Resolution {
        let src = match resolve_res_path(&self.env.res_dir, &asset.path) {
            Some(path) => path,
            None => return Resolution::Missing(format!("bad asset path `{}`", asset.path)),
        };
        if !src.is_file() {
            return Resolution::Missing(format!("source file vanished: `{}`", asset.path));
        }
        let name = output_asset_name(&asset.path);
        let dst = self.env.assets_dir.join(&name);
        match cache.get_or_export(&src, &dst, self.env.min_plausible_asset_bytes, self.exporter) {
            Ok((_, exported)) => {
                if exported {
                    report.assets_exported += 1;
                    log::info!("exported {} -> assets/{name}", asset.path);
                }
                if asset.kind == AssetKind::SubGraph {
                    self.has_boundaries = true;
                }
                Resolution::Resolved(format!("asset(\"assets/{name}\")"))
            }
            Err(err) => Resolution::Missing(format!("export failed for `{}`: {err}", asset.path)),
        }
    }

    fn resolve_graph_ref(
        &mut self,
        id: StableId,
        is_node: bool,
        registry: &ReferenceRegistry,
        ctx: &mut ExportContext,
        writer: &mut CodeWriter,
    ) -> Resolution {
        if let Some(path) = registry.try_get_path(id) {
            let path = path.to_string();
            return Resolution::Resolved(if is_node {
                format!("node_ref({path})")
            } else {
                format!("component_ref({path})")
            });
        }
        if let Some(var) = self.lookups.get(&id) {
            let var = var.clone();
            return Resolution::Resolved(if is_node {
                format!("node_ref({var})")
            } else {
                format!("component_ref({var})")
            });
        }
        // Not emitted this build. A graph-resident target gets a deferred
        // lookup plus a one-time state restore; a target outside the graph
        // is only reachable when a sub-graph boundary was exported.
        let graph = self.graph;
        if let Some((nid, node)) = graph
            .find_by_stable_id(id)
            .and_then(|nid| graph.get(nid).map(|node| (nid, node)))
        {
            if in_editor_only_subtree(graph, nid) {
                return Resolution::Missing("target is inside an editor-only subtree".to_string());
            }
            let var = self.deferred_lookup(id, &node.name, ctx, writer);
            if self.restored.insert(id) {
                write_node_state(writer, &var, node);
            }
            Resolution::Resolved(if is_node {
                format!("node_ref({var})")
            } else {
                format!("component_ref({var})")
            })
        } else if self.has_boundaries {
            let var = self.deferred_lookup(id, "ext", ctx, writer);
            Resolution::Resolved(if is_node {
                format!("node_ref({var})")
            } else {
                format!("component_ref({var})")
            })
        } else {
            Resolution::Missing(format!("unknown identity {id}"))
        }
    }

    fn deferred_lookup(
        &mut self,
        id: StableId,
        hint: &str,
        ctx: &mut ExportContext,
        writer: &mut CodeWriter,
    ) -> String {
        let var = ctx.fresh_var("r", hint);
        writer.line(&format!("let {var} = find_by_id(scene, \"{id}\");"));
        self.lookups.insert(id, var.clone());
        var
    }
}

/// Reconstructs non-component node state. Written once per node during
/// traversal, and by the resolver for referenced nodes the traversal
/// never reached.
pub fn write_node_state(writer: &mut CodeWriter, var: &str, node: &Node) {
    writer.line(&format!("bind_id({var}, \"{}\");", node.stable_id));
    writer.line(&format!("scene.set({var}, \"visible\", lit({}));", node.visible));
    writer.line(&format!("scene.set({var}, \"layer\", lit({}));", node.layer));
    if !node.tag.is_empty() {
        writer.line(&format!(
            "scene.set({var}, \"tag\", lit(\"{}\"));",
            escape_str(&node.tag)
        ));
    }
    if node.static_flag {
        writer.line(&format!("scene.set({var}, \"static\", lit(true));"));
    }
    let t = &node.transform;
    writer.line(&format!(
        "scene.set({var}, \"position\", vec3({}, {}, {}));",
        fmt_f32(t.position.x),
        fmt_f32(t.position.y),
        fmt_f32(t.position.z)
    ));
    writer.line(&format!(
        "scene.set({var}, \"rotation\", quat({}, {}, {}, {}));",
        fmt_f32(t.rotation.x),
        fmt_f32(t.rotation.y),
        fmt_f32(t.rotation.z),
        fmt_f32(t.rotation.w)
    ));
    writer.line(&format!(
        "scene.set({var}, \"scale\", vec3({}, {}, {}));",
        fmt_f32(t.scale.x),
        fmt_f32(t.scale.y),
        fmt_f32(t.scale.z)
    ));
}

/// Editor-only excludes whole subtrees, matching what the traversal skips:
/// a node is out when it or any ancestor carries the flag.
fn in_editor_only_subtree(graph: &Graph, mut id: NodeId) -> bool {
    while let Some(node) = graph.get(id) {
        if node.editor_only {
            return true;
        }
        id = node.parent;
    }
    false
}

fn resolve_res_path(res_dir: &Path, path: &str) -> Option<PathBuf> {
    let rel = path.strip_prefix("res://")?;
    if rel.is_empty() || rel.contains("..") {
        return None;
    }
    Some(res_dir.join(rel))
}

/// Deterministic flat output name: `<stem>_<8 hex of path hash>.<ext>`.
/// Two source files with the same stem in different directories never
/// collide, and re-exports always land on the same name.
pub fn output_asset_name(res_path: &str) -> String {
    let file_name = res_path.rsplit('/').next().unwrap_or(res_path);
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (file_name, None),
    };
    let hash = (string_to_u64(res_path) & 0xFFFF_FFFF) as u32;
    match ext {
        Some(ext) => format!("{stem}_{hash:08x}.{ext}"),
        None => format!("{stem}_{hash:08x}"),
    }
}
