/// protoc bridge
///
/// Finds .proto sources, stages the protos shipped inside dependency
/// archives, and runs protoc over them with a matching search path.

pub mod cleanup;
pub mod config;
pub mod driver;
pub mod error;
pub mod extract;
pub mod locate;
pub mod paths;
pub mod protoc;

pub use config::{BuildConfig, Scope};
pub use driver::{DependencyResolver, Orchestrator, Outcome, OutputRegistrar, SkipReason, Stage, StaticDependencies};
pub use error::{BuildError, ErrorKind, Result};
pub use extract::ArchiveExtractor;
pub use locate::{SchemaFileLocator, DEFAULT_INCLUDES, PROTO_FILE_SUFFIX};
pub use paths::{truncate_path, PathSanitizer};
pub use protoc::{CompileRequest, CompileResult, ProtocBuilder};
