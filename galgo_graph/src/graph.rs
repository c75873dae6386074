use galgo_ids::{NodeId, StableId};
use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::structs::Transform;

/// A positioned element of the source graph. Nodes own their components and
/// (through the arena) their children; `parent` is a non-owning back link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub stable_id: StableId,
    pub name: String,
    pub transform: Transform,
    pub parent: NodeId,
    pub children: Vec<NodeId>,
    pub components: Vec<Component>,
    pub visible: bool,
    pub layer: i32,
    pub tag: String,
    pub static_flag: bool,
    /// Subtrees flagged editor-only are skipped entirely by the export walk.
    pub editor_only: bool,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            stable_id: StableId::random(),
            name: name.into(),
            transform: Transform::identity(),
            parent: NodeId::nil(),
            children: Vec::new(),
            components: Vec::new(),
            visible: true,
            layer: 0,
            tag: String::new(),
            static_flag: false,
            editor_only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena-based storage for graph nodes. Handles carry index + generation so
/// stale handles from removed nodes never alias a reused slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: u32,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node and wire it under `parent` (or as a root when `None`).
    pub fn add_node(&mut self, node: Node, parent: Option<NodeId>) -> NodeId {
        let id = self.allocate(node);
        if let Some(parent_id) = parent {
            if self.contains(parent_id) {
                if let Some(parent_node) = self.get_mut(parent_id) {
                    parent_node.children.push(id);
                }
                if let Some(child) = self.get_mut(id) {
                    child.parent = parent_id;
                }
            }
        }
        id
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId::from_parts(index + 1, slot.generation);
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId::from_parts(self.slots.len() as u32, 0)
    }

    #[inline]
    fn slot_index(&self, id: NodeId) -> Option<usize> {
        let index = id.index();
        if index == 0 {
            return None;
        }
        let idx = (index as usize) - 1;
        let slot = self.slots.get(idx)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_ref()?;
        Some(idx)
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let idx = self.slot_index(id)?;
        self.slots[idx].node.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let idx = self.slot_index(id)?;
        self.slots[idx].node.as_mut()
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.slot_index(id).is_some()
    }

    /// Remove a node and its entire subtree (nodes own their children).
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let idx = self.slot_index(id)?;
        let node = self.slots[idx].node.take()?;
        self.slots[idx].generation = self.slots[idx].generation.wrapping_add(1);
        self.free.push(idx as u32);
        self.live -= 1;

        for child in &node.children {
            self.remove(*child);
        }
        if let Some(parent) = self.get_mut(node.parent) {
            parent.children.retain(|c| *c != id);
        }
        Some(node)
    }

    pub fn len(&self) -> usize {
        self.live as usize
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// All nodes without a live parent, in slot order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| !self.contains(node.parent))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.node
                .as_ref()
                .map(|node| (NodeId::from_parts(idx as u32 + 1, slot.generation), node))
        })
    }

    pub fn find_by_stable_id(&self, stable_id: StableId) -> Option<NodeId> {
        self.iter()
            .find(|(_, node)| node.stable_id == stable_id)
            .map(|(id, _)| id)
    }
}
