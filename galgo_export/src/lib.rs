//! Scene export compiler: walks a source graph once, emits construction
//! statements per component, then runs a single resolver pass that links
//! every deferred reference, exports referenced assets through the
//! fingerprint cache, and assembles the generated program.

pub mod build;
pub mod cache;
pub mod context;
pub mod emit;
pub mod error;
pub mod expr;
pub mod manifest;
pub mod registry;
pub mod resolver;
pub mod writer;

pub use build::{build, build_shared, BuildReport};
pub use cache::{AssetDependencyCache, AssetExporter, CopyExporter};
pub use context::{CancelToken, ExportContext};
pub use emit::{EmitArgs, EmitResult, Emitter, EmitterDispatch};
pub use error::ExportError;
pub use manifest::ScriptsManifest;
pub use registry::{ReferenceRegistry, ReferencedField, ReferencedInstance};
pub use resolver::{Resolver, ResolverEnv};
pub use writer::CodeWriter;
