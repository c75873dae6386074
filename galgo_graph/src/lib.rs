pub mod asset;
pub mod component;
pub mod graph;
pub mod structs;
pub mod value;

pub use asset::{AssetKind, AssetRef};
pub use component::{
    AudioSource, Camera, Component, ComponentKind, EditorHelper, MeshRenderer, ScriptComponent,
    Sprite, SubGraphInstance,
};
pub use graph::{Graph, Node};
pub use structs::{Quaternion, Transform, Vector3};
pub use value::Value;
