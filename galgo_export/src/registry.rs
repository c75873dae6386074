use std::collections::HashMap;

use galgo_graph::Value;
use galgo_ids::StableId;
use indexmap::IndexMap;

/// One emitted object: generated variable path, source identity, declared
/// type. Created exactly once per identity per build; later registrations
/// for the same identity are no-ops (first wins).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencedInstance {
    pub path: String,
    pub source: StableId,
    pub declared_type: String,
}

/// A field assignment whose value could not be inlined at emit time. Drained
/// exactly once by the resolver, in registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencedField {
    pub owner_path: String,
    pub field_name: String,
    pub value: Value,
    pub display_name: Option<String>,
}

/// Append-only ledger of emitted objects and pending field assignments,
/// plus the known-type table emitters consult before exporting user scripts.
#[derive(Debug, Default)]
pub struct ReferenceRegistry {
    instances: IndexMap<StableId, ReferencedInstance>,
    fields: Vec<ReferencedField>,
    known_types: HashMap<String, bool>,
}

impl ReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fresh instance. Returns false (and changes nothing) when the
    /// identity is already registered — this is the de-duplication mechanism
    /// that keeps emitters idempotent.
    pub fn register_instance(
        &mut self,
        path: impl Into<String>,
        source: StableId,
        declared_type: impl Into<String>,
    ) -> bool {
        if self.instances.contains_key(&source) {
            return false;
        }
        self.instances.insert(
            source,
            ReferencedInstance {
                path: path.into(),
                source,
                declared_type: declared_type.into(),
            },
        );
        true
    }

    /// Append a pending field. Registration order is preserved and replayed
    /// by the resolver (matters for readable output grouping).
    pub fn register_field(
        &mut self,
        owner_path: impl Into<String>,
        field_name: impl Into<String>,
        value: Value,
    ) {
        self.fields.push(ReferencedField {
            owner_path: owner_path.into(),
            field_name: field_name.into(),
            value,
            display_name: None,
        });
    }

    pub fn register_field_named(
        &mut self,
        owner_path: impl Into<String>,
        field_name: impl Into<String>,
        value: Value,
        display_name: impl Into<String>,
    ) {
        self.fields.push(ReferencedField {
            owner_path: owner_path.into(),
            field_name: field_name.into(),
            value,
            display_name: Some(display_name.into()),
        });
    }

    pub fn try_get_path(&self, source: StableId) -> Option<&str> {
        self.instances.get(&source).map(|i| i.path.as_str())
    }

    /// Lookup for reference-shaped values (nodes and components).
    pub fn try_get_value_path(&self, value: &Value) -> Option<&str> {
        match value {
            Value::Node(id) | Value::Component(id) => self.try_get_path(*id),
            _ => None,
        }
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn pending_count(&self) -> usize {
        self.fields.len()
    }

    /// Drain all pending fields in registration order.
    pub fn take_fields(&mut self) -> Vec<ReferencedField> {
        std::mem::take(&mut self.fields)
    }

    // ---- known-type table ----

    pub fn set_known_type(&mut self, type_name: impl Into<String>, available: bool) {
        self.known_types.insert(type_name.into(), available);
    }

    /// None = never heard of the type, Some(available) otherwise.
    pub fn type_availability(&self, type_name: &str) -> Option<bool> {
        self.known_types.get(type_name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_instance_first_wins() {
        let mut registry = ReferenceRegistry::new();
        let id = StableId::from_path("res://a");
        assert!(registry.register_instance("n_0_a", id, "Node"));
        assert!(!registry.register_instance("n_9_other", id, "Node"));
        assert_eq!(registry.try_get_path(id), Some("n_0_a"));
        assert_eq!(registry.instance_count(), 1);
    }

    #[test]
    fn field_order_is_preserved() {
        let mut registry = ReferenceRegistry::new();
        registry.register_field("c_0", "first", Value::Null);
        registry.register_field("c_1", "second", Value::Null);
        registry.register_field("c_0", "third", Value::Null);

        let fields = registry.take_fields();
        let names: Vec<&str> = fields.iter().map(|f| f.field_name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn value_path_lookup_only_matches_references() {
        let mut registry = ReferenceRegistry::new();
        let id = StableId::from_path("res://a");
        registry.register_instance("n_0_a", id, "Node");

        assert_eq!(registry.try_get_value_path(&Value::Node(id)), Some("n_0_a"));
        assert_eq!(registry.try_get_value_path(&Value::Component(id)), Some("n_0_a"));
        assert_eq!(registry.try_get_value_path(&Value::I32(3)), None);
    }

    #[test]
    fn known_type_table() {
        let mut registry = ReferenceRegistry::new();
        registry.set_known_type("PlayerController", true);
        registry.set_known_type("LegacyThing", false);

        assert_eq!(registry.type_availability("PlayerController"), Some(true));
        assert_eq!(registry.type_availability("LegacyThing"), Some(false));
        assert_eq!(registry.type_availability("Unknown"), None);
    }
}
