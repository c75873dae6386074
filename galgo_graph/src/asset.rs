use galgo_ids::StableId;
use serde::{Deserialize, Serialize};

/// Category of a persistent asset. Drives which asset resolver handles the
/// reference and which exporter produces the output artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Texture,
    Audio,
    Font,
    Clip,
    SubGraph,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Texture => "texture",
            Self::Audio => "audio",
            Self::Font => "font",
            Self::Clip => "clip",
            Self::SubGraph => "subgraph",
        }
    }
}

/// Reference to an external artifact identified independently of the live
/// graph. `path` is project-relative (`res://...`); `id` is derived from the
/// path so the same asset keeps the same identity across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRef {
    pub kind: AssetKind,
    pub path: String,
    pub id: StableId,
}

impl AssetRef {
    pub fn new(kind: AssetKind, path: impl Into<String>) -> Self {
        let path = path.into();
        let id = StableId::from_path(&path);
        Self { kind, path, id }
    }

    /// File name component of the `res://` path, used for deterministic
    /// output naming under the assets directory.
    pub fn file_name(&self) -> &str {
        self.path
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(self.path.as_str())
    }
}
