//! Purpose: Define the stable public Rust API boundary for confium digests.
//! Exports: Context, digest, library, resolver, and error types.
//! Role: Public, additive-only surface; hides the owning handle wrappers.
//! Invariants: Raw ABI types are reachable only through `api::sys`.

mod digest_trait;

pub use crate::core::config::{DEFAULT_PLUGIN, EngineConfig, LIBRARY_PATH_ENV, PLUGIN_PATH_ENV};
pub use crate::core::context::Context;
pub use crate::core::digest::{Digest, digest};
pub use crate::core::error::{Error, ErrorKind, to_exit_code};
pub use crate::core::library::{ENTRY_POINTS, EngineVersion, EntryPoints, NativeLibrary};
pub use crate::core::resolve::{
    LibraryPattern, Platform, SearchConfig, candidate_dirs, find_library, resolve_library_path,
};
pub use crate::core::sys;
pub use digest_trait::IncrementalDigest;
