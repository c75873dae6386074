pub mod builtin;

use galgo_graph::{Component, ComponentKind, Node, Value};

use crate::context::ExportContext;
use crate::expr::literal_expr;
use crate::registry::ReferenceRegistry;
use crate::writer::CodeWriter;

/// Outcome of running one emitter over one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitResult {
    pub success: bool,
    /// True when the emitter exported a nested hierarchy boundary
    /// (sub-graph instances); such builds resolve unknown node references
    /// to runtime lookups instead of marking them missing.
    pub hierarchy_exported: bool,
}

impl EmitResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            hierarchy_exported: false,
        }
    }

    pub fn hierarchy() -> Self {
        Self {
            success: true,
            hierarchy_exported: true,
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            hierarchy_exported: false,
        }
    }
}

/// Everything an emitter may touch while processing one component.
pub struct EmitArgs<'a> {
    pub node: &'a Node,
    pub ctx: &'a mut ExportContext,
    pub registry: &'a mut ReferenceRegistry,
    pub writer: &'a mut CodeWriter,
}

impl EmitArgs<'_> {
    /// Shared field policy: literals are written directly, anything else is
    /// registered for the resolver pass. Null fields are elided.
    pub fn emit_field(&mut self, owner_var: &str, name: &str, value: &Value) {
        if matches!(value, Value::Null) {
            return;
        }
        if let Some(expr) = literal_expr(value) {
            self.writer
                .line(&format!("scene.set({owner_var}, \"{name}\", {expr});"));
        } else {
            self.registry
                .register_field(owner_var, name, value.clone());
        }
    }
}

/// A handler that turns one component into program statements plus pending
/// reference registrations. Emitters must be idempotent: the registry's
/// identity-keyed instance table is the de-duplication mechanism.
pub trait Emitter {
    fn kind(&self) -> ComponentKind;

    /// Higher priority wins when several emitters claim the same kind.
    fn priority(&self) -> i32 {
        0
    }

    fn emit(&self, component: &Component, args: &mut EmitArgs<'_>) -> EmitResult;
}

/// Priority-ordered collection of per-kind emitters. Selection is by exact
/// component kind; a kind with no emitter is a legitimate no-op, not an
/// error (many source types are editor-only).
pub struct EmitterDispatch {
    emitters: Vec<Box<dyn Emitter>>,
}

impl EmitterDispatch {
    pub fn new() -> Self {
        Self {
            emitters: Vec::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut dispatch = Self::new();
        for emitter in builtin::builtin_emitters() {
            dispatch.register(emitter);
        }
        dispatch
    }

    /// Register an emitter. Ordering is kept priority-descending and stable,
    /// so a later registration at a higher priority shadows a builtin.
    pub fn register(&mut self, emitter: Box<dyn Emitter>) {
        let priority = emitter.priority();
        let at = self
            .emitters
            .iter()
            .position(|e| e.priority() < priority)
            .unwrap_or(self.emitters.len());
        self.emitters.insert(at, emitter);
    }

    /// Run the best-matching emitter. None = no handler for this kind.
    pub fn run(&self, component: &Component, args: &mut EmitArgs<'_>) -> Option<EmitResult> {
        let kind = component.kind();
        let emitter = self.emitters.iter().find(|e| e.kind() == kind)?;
        Some(emitter.emit(component, args))
    }
}

impl Default for EmitterDispatch {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galgo_graph::{EditorHelper, Node, ScriptComponent};
    use galgo_ids::StableId;

    struct NullEmitter {
        kind: ComponentKind,
        priority: i32,
        marker: &'static str,
    }

    impl Emitter for NullEmitter {
        fn kind(&self) -> ComponentKind {
            self.kind
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn emit(&self, _component: &Component, args: &mut EmitArgs<'_>) -> EmitResult {
            args.writer.comment(self.marker);
            EmitResult::ok()
        }
    }

    fn run_dispatch(dispatch: &EmitterDispatch, component: &Component) -> (Option<EmitResult>, String) {
        let node = Node::new("n");
        let mut ctx = ExportContext::new(1);
        let mut registry = ReferenceRegistry::new();
        let mut writer = CodeWriter::new();
        let result = dispatch.run(
            component,
            &mut EmitArgs {
                node: &node,
                ctx: &mut ctx,
                registry: &mut registry,
                writer: &mut writer,
            },
        );
        (result, writer.into_string())
    }

    #[test]
    fn unmatched_kind_is_a_noop() {
        let dispatch = EmitterDispatch::new();
        let component = Component::EditorHelper(EditorHelper {
            id: StableId::random(),
            label: "gizmo".into(),
        });
        let (result, text) = run_dispatch(&dispatch, &component);
        assert!(result.is_none());
        assert!(text.is_empty());
    }

    #[test]
    fn higher_priority_emitter_shadows_lower() {
        let mut dispatch = EmitterDispatch::new();
        dispatch.register(Box::new(NullEmitter {
            kind: ComponentKind::Script,
            priority: 0,
            marker: "generic",
        }));
        dispatch.register(Box::new(NullEmitter {
            kind: ComponentKind::Script,
            priority: 10,
            marker: "specific",
        }));

        let component = Component::Script(ScriptComponent {
            id: StableId::random(),
            type_name: "X".into(),
            fields: Vec::new(),
        });
        let (result, text) = run_dispatch(&dispatch, &component);
        assert_eq!(result, Some(EmitResult::ok()));
        assert!(text.contains("specific"));
        assert!(!text.contains("generic"));
    }
}
