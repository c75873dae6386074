use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use galgo_ids::{NodeId, StableId};

/// Cooperative cancellation flag. Polled at traversal recursion points,
/// before each component dispatch, and before each resolver step. There is
/// no forced interruption: in-progress asset exports run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Mutable traversal state. One instance per build; the per-subtree fields
/// are reset between sibling subtrees, the build identifier is not.
#[derive(Debug)]
pub struct ExportContext {
    pub current_node: NodeId,
    pub current_component: Option<StableId>,
    pub current_var: String,
    /// Set by the orchestrator once the emission stream crosses a nested
    /// sub-graph boundary. Not cleared between subtrees: any boundary in
    /// the build legitimizes deferred runtime lookups during resolution.
    pub inside_subgraph: bool,
    pub build_id: u64,
    next_var: u32,
}

impl ExportContext {
    pub fn new(build_id: u64) -> Self {
        Self {
            current_node: NodeId::nil(),
            current_component: None,
            current_var: String::new(),
            inside_subgraph: false,
            build_id,
            next_var: 0,
        }
    }

    /// Clear per-subtree state before walking the next sibling root. The
    /// variable counter keeps running so names stay unique per build.
    pub fn reset_subtree(&mut self) {
        self.current_node = NodeId::nil();
        self.current_component = None;
        self.current_var.clear();
    }

    /// Unique, readable generated variable name: `<prefix>_<n>_<sanitized>`.
    pub fn fresh_var(&mut self, prefix: &str, hint: &str) -> String {
        let n = self.next_var;
        self.next_var += 1;
        let mut sanitized = String::with_capacity(hint.len());
        for c in hint.chars() {
            if c.is_ascii_alphanumeric() {
                sanitized.push(c.to_ascii_lowercase());
            } else if !sanitized.ends_with('_') {
                sanitized.push('_');
            }
        }
        let sanitized = sanitized.trim_matches('_');
        if sanitized.is_empty() {
            format!("{prefix}_{n}")
        } else {
            format!("{prefix}_{n}_{sanitized}")
        }
    }
}
