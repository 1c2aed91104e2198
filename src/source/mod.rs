//! Document source resolution
//!
//! Components:
//! - Parser: JSONL documents and JSON / key-value manifests
//! - Embedded: bundled snapshot compiled into the binary
//! - Filesystem: development corpus on disk
//! - Remote: HTTP server (dev or production)
//! - Resolver: mode-driven tier fallback behind the corpus cache

pub mod embedded;
pub mod filesystem;
pub mod mode;
pub mod parser;
pub mod remote;
pub mod resolver;

pub use filesystem::FilesystemSource;
pub use mode::{DeploymentMode, EnvironmentSignals};
pub use parser::{parse_documents_jsonl, parse_manifest_json, parse_manifest_text, DEFAULT_BATCH_SIZE};
pub use remote::RemoteSource;
pub use resolver::DocumentResolver;
