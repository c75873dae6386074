use galgo_ids::StableId;
use serde::{Deserialize, Serialize};

use crate::asset::AssetRef;

/// Field value taxonomy for component data. Primitives and struct shapes can
/// be inlined directly into generated code; node/component/asset references
/// and callables go through the reference registry instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    I32(i32),
    F32(f32),
    F64(f64),
    Str(String),
    Vec2 { x: f32, y: f32 },
    Vec3 { x: f32, y: f32, z: f32 },
    Quat { x: f32, y: f32, z: f32, w: f32 },
    Color { r: f32, g: f32, b: f32, a: f32 },
    Enum { ty: String, variant: String },
    List(Vec<Value>),
    Node(StableId),
    Component(StableId),
    Asset(AssetRef),
    Callable { target: Box<Value>, method: String },
}

impl Value {
    /// True when the value can be written as a literal without going through
    /// the reference registry.
    pub fn is_inline(&self) -> bool {
        match self {
            Self::Null
            | Self::Bool(_)
            | Self::I32(_)
            | Self::F32(_)
            | Self::F64(_)
            | Self::Str(_)
            | Self::Vec2 { .. }
            | Self::Vec3 { .. }
            | Self::Quat { .. }
            | Self::Color { .. }
            | Self::Enum { .. } => true,
            Self::List(items) => items.iter().all(Value::is_inline),
            Self::Node(_) | Self::Component(_) | Self::Asset(_) | Self::Callable { .. } => false,
        }
    }

    /// Human-readable type label used in missing-reference diagnostics.
    pub fn type_label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::I32(_) => "i32",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Str(_) => "string",
            Self::Vec2 { .. } => "vec2",
            Self::Vec3 { .. } => "vec3",
            Self::Quat { .. } => "quat",
            Self::Color { .. } => "color",
            Self::Enum { .. } => "enum",
            Self::List(_) => "list",
            Self::Node(_) => "node",
            Self::Component(_) => "component",
            Self::Asset(_) => "asset",
            Self::Callable { .. } => "callable",
        }
    }

}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}
