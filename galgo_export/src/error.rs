use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use galgo_project::ProjectError;

/// Structural build failures. Everything here aborts the whole build; local
/// failures (one field, one asset) are downgraded to Missing diagnostics and
/// never surface as this type.
#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Project(ProjectError),
    AmbiguousRoot(usize),
    NoExportRoot,
    OutputDirUnwritable(PathBuf, std::io::Error),
    CacheStore(String),
    GraphEncode(String),
    ConcurrentBuildFailed,
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Project(err) => write!(f, "{err}"),
            Self::AmbiguousRoot(count) => {
                write!(f, "expected a single export root, found {count}")
            }
            Self::NoExportRoot => write!(f, "graph has no export root"),
            Self::OutputDirUnwritable(path, err) => {
                write!(f, "cannot create output directory {}: {err}", path.display())
            }
            Self::CacheStore(msg) => write!(f, "export cache store: {msg}"),
            Self::GraphEncode(msg) => write!(f, "cannot fingerprint source graph: {msg}"),
            Self::ConcurrentBuildFailed => {
                write!(f, "the in-flight build this request attached to failed")
            }
        }
    }
}

impl std::error::Error for ExportError {}

impl From<std::io::Error> for ExportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ProjectError> for ExportError {
    fn from(value: ProjectError) -> Self {
        Self::Project(value)
    }
}
