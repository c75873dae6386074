use galgo_ids::StableId;
use serde::{Deserialize, Serialize};

use crate::asset::AssetRef;
use crate::value::Value;

/// Discriminant used by emitter dispatch. Selection is by exact kind; kinds
/// with no registered emitter are silently skipped during a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Sprite,
    MeshRenderer,
    Camera,
    AudioSource,
    SubGraph,
    Script,
    EditorHelper,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sprite => "Sprite",
            Self::MeshRenderer => "MeshRenderer",
            Self::Camera => "Camera",
            Self::AudioSource => "AudioSource",
            Self::SubGraph => "SubGraph",
            Self::Script => "Script",
            Self::EditorHelper => "EditorHelper",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub id: StableId,
    pub texture: Value,
    pub tint: Value,
    pub flip_x: bool,
    pub flip_y: bool,
    pub sorting: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshRenderer {
    pub id: StableId,
    pub mesh: Value,
    pub material: Value,
    pub cast_shadows: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub id: StableId,
    pub active: bool,
    pub fov: f32,
    pub clear_color: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSource {
    pub id: StableId,
    pub clip: Value,
    pub volume: f32,
    pub autoplay: bool,
    pub on_finished: Value,
}

/// Instantiates another graph asset under the owning node. Everything inside
/// the instanced graph is an independently exported boundary; references into
/// it resolve to runtime lookups by stable identity, never static paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubGraphInstance {
    pub id: StableId,
    pub source: AssetRef,
    pub overrides: Vec<(String, Value)>,
}

/// User-authored behavior. `type_name` must match a type discovered by the
/// scripts manifest; fields are exported in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptComponent {
    pub id: StableId,
    pub type_name: String,
    pub fields: Vec<(String, Value)>,
}

/// Editor-session helper (selection outlines, gizmo anchors). Carried in the
/// graph but has no runtime counterpart and no emitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorHelper {
    pub id: StableId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Component {
    Sprite(Sprite),
    MeshRenderer(MeshRenderer),
    Camera(Camera),
    AudioSource(AudioSource),
    SubGraph(SubGraphInstance),
    Script(ScriptComponent),
    EditorHelper(EditorHelper),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Sprite(_) => ComponentKind::Sprite,
            Self::MeshRenderer(_) => ComponentKind::MeshRenderer,
            Self::Camera(_) => ComponentKind::Camera,
            Self::AudioSource(_) => ComponentKind::AudioSource,
            Self::SubGraph(_) => ComponentKind::SubGraph,
            Self::Script(_) => ComponentKind::Script,
            Self::EditorHelper(_) => ComponentKind::EditorHelper,
        }
    }

    pub fn id(&self) -> StableId {
        match self {
            Self::Sprite(c) => c.id,
            Self::MeshRenderer(c) => c.id,
            Self::Camera(c) => c.id,
            Self::AudioSource(c) => c.id,
            Self::SubGraph(c) => c.id,
            Self::Script(c) => c.id,
            Self::EditorHelper(c) => c.id,
        }
    }

    /// Runtime type name, used for diagnostics and the known-type table.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Script(c) => c.type_name.as_str(),
            other => other.kind().as_str(),
        }
    }
}
