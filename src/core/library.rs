//! Purpose: Load the confium shared library once and bind its entry-point table.
//! Exports: `NativeLibrary`, `EntryPoints`, `EngineVersion`, `ENTRY_POINTS`.
//! Role: Owns the `libloading::Library` so every bound function pointer stays valid.
//! Invariants: A symbol missing from the library is tolerated at load time and
//! reported as `EntryPointMissing` only when that operation is used.
//! Invariants: The process-wide instance is initialized on first use, never torn down,
//! and read-only afterwards.
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;
use once_cell::sync::OnceCell;

use crate::core::error::{Error, ErrorKind};
use crate::core::resolve::{SearchConfig, resolve_library_path};
use crate::core::sys;

/// Every symbol the binding knows how to use, in table order.
pub const ENTRY_POINTS: &[&str] = &[
    sys::CFM_CREATE,
    sys::CFM_DESTROY,
    sys::CFM_PLUGIN_LOAD,
    sys::CFM_HASH_CREATE,
    sys::CFM_HASH_OUTPUT_SIZE,
    sys::CFM_HASH_BLOCK_SIZE,
    sys::CFM_HASH_UPDATE,
    sys::CFM_HASH_RESET,
    sys::CFM_HASH_CLONE,
    sys::CFM_HASH_FINALIZE,
    sys::CFM_HASH_DESTROY,
    sys::CFM_VERSION_MAJOR,
    sys::CFM_VERSION_MINOR,
    sys::CFM_VERSION_PATCH,
];

// A failed first load is cached too; later calls replay it without searching again.
static GLOBAL: OnceCell<Result<Arc<NativeLibrary>, Error>> = OnceCell::new();

/// Function pointers for each entry point; `None` when the library lacks it.
#[derive(Clone, Copy, Default)]
pub struct EntryPoints {
    pub create: Option<sys::CfmCreateFn>,
    pub destroy: Option<sys::CfmDestroyFn>,
    pub plugin_load: Option<sys::CfmPluginLoadFn>,
    pub hash_create: Option<sys::CfmHashCreateFn>,
    pub hash_output_size: Option<sys::CfmHashOutputSizeFn>,
    pub hash_block_size: Option<sys::CfmHashBlockSizeFn>,
    pub hash_update: Option<sys::CfmHashUpdateFn>,
    pub hash_reset: Option<sys::CfmHashResetFn>,
    pub hash_clone: Option<sys::CfmHashCloneFn>,
    pub hash_finalize: Option<sys::CfmHashFinalizeFn>,
    pub hash_destroy: Option<sys::CfmHashDestroyFn>,
    pub version_major: Option<sys::CfmVersionComponentFn>,
    pub version_minor: Option<sys::CfmVersionComponentFn>,
    pub version_patch: Option<sys::CfmVersionComponentFn>,
}

impl EntryPoints {
    fn bind(library: &Library) -> Self {
        Self {
            create: bind_symbol(library, sys::CFM_CREATE),
            destroy: bind_symbol(library, sys::CFM_DESTROY),
            plugin_load: bind_symbol(library, sys::CFM_PLUGIN_LOAD),
            hash_create: bind_symbol(library, sys::CFM_HASH_CREATE),
            hash_output_size: bind_symbol(library, sys::CFM_HASH_OUTPUT_SIZE),
            hash_block_size: bind_symbol(library, sys::CFM_HASH_BLOCK_SIZE),
            hash_update: bind_symbol(library, sys::CFM_HASH_UPDATE),
            hash_reset: bind_symbol(library, sys::CFM_HASH_RESET),
            hash_clone: bind_symbol(library, sys::CFM_HASH_CLONE),
            hash_finalize: bind_symbol(library, sys::CFM_HASH_FINALIZE),
            hash_destroy: bind_symbol(library, sys::CFM_HASH_DESTROY),
            version_major: bind_symbol(library, sys::CFM_VERSION_MAJOR),
            version_minor: bind_symbol(library, sys::CFM_VERSION_MINOR),
            version_patch: bind_symbol(library, sys::CFM_VERSION_PATCH),
        }
    }

    fn is_bound(&self, name: &str) -> bool {
        match name {
            sys::CFM_CREATE => self.create.is_some(),
            sys::CFM_DESTROY => self.destroy.is_some(),
            sys::CFM_PLUGIN_LOAD => self.plugin_load.is_some(),
            sys::CFM_HASH_CREATE => self.hash_create.is_some(),
            sys::CFM_HASH_OUTPUT_SIZE => self.hash_output_size.is_some(),
            sys::CFM_HASH_BLOCK_SIZE => self.hash_block_size.is_some(),
            sys::CFM_HASH_UPDATE => self.hash_update.is_some(),
            sys::CFM_HASH_RESET => self.hash_reset.is_some(),
            sys::CFM_HASH_CLONE => self.hash_clone.is_some(),
            sys::CFM_HASH_FINALIZE => self.hash_finalize.is_some(),
            sys::CFM_HASH_DESTROY => self.hash_destroy.is_some(),
            sys::CFM_VERSION_MAJOR => self.version_major.is_some(),
            sys::CFM_VERSION_MINOR => self.version_minor.is_some(),
            sys::CFM_VERSION_PATCH => self.version_patch.is_some(),
            _ => false,
        }
    }
}

fn bind_symbol<T: Copy>(library: &Library, name: &'static str) -> Option<T> {
    // SAFETY: `T` is the fn-pointer type declared for `name` in `sys`.
    match unsafe { library.get::<T>(name.as_bytes()) } {
        Ok(symbol) => Some(*symbol),
        Err(err) => {
            tracing::debug!(entry_point = name, error = %err, "entry point not bound");
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

pub struct NativeLibrary {
    entries: EntryPoints,
    path: Option<PathBuf>,
    // Dropped last: the pointers in `entries` point into this mapping.
    _library: Option<Library>,
}

impl NativeLibrary {
    /// Loads the library at `path` and binds whatever entry points it exports.
    pub fn open(path: &Path) -> Result<Self, Error> {
        // SAFETY: loading runs the library's initializers; libconfium has no
        // initialization-order requirements beyond being loaded once.
        let library = unsafe { Library::new(path) }.map_err(|err| {
            Error::new(ErrorKind::LibraryNotFound)
                .with_message("failed to load native library")
                .with_path(path)
                .with_source(err)
        })?;
        let entries = EntryPoints::bind(&library);
        tracing::debug!(
            path = %path.display(),
            bound = ENTRY_POINTS.iter().filter(|name| entries.is_bound(name)).count(),
            "loaded native library"
        );
        Ok(Self {
            entries,
            path: Some(path.to_path_buf()),
            _library: Some(library),
        })
    }

    /// Resolves per `config` and loads the first match.
    pub fn resolve(config: &SearchConfig) -> Result<Self, Error> {
        let path = resolve_library_path(config)?;
        Self::open(&path)
    }

    /// Wraps function pointers linked into this process instead of a loaded file.
    ///
    /// # Safety
    ///
    /// Every bound pointer must implement the confium ABI contract of its `sys`
    /// type: out-pointers written on success, handles accepted until destroyed, and
    /// destroy functions safe to call exactly once per created handle. The pointers
    /// must stay callable for the lifetime of the returned value.
    pub unsafe fn from_entry_points(entries: EntryPoints) -> Self {
        Self {
            entries,
            path: None,
            _library: None,
        }
    }

    /// The process-wide library, resolved from the environment on first call.
    ///
    /// The outcome of that first call is final: after a failure every later call
    /// returns the same error kind, message and path without searching again.
    pub fn global() -> Result<Arc<NativeLibrary>, Error> {
        load_once(&GLOBAL, || Self::resolve(&SearchConfig::from_env()))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn has_entry_point(&self, name: &str) -> bool {
        self.entries.is_bound(name)
    }

    pub fn bound_entry_points(&self) -> Vec<&'static str> {
        ENTRY_POINTS
            .iter()
            .copied()
            .filter(|name| self.entries.is_bound(name))
            .collect()
    }

    pub fn version(&self) -> Result<EngineVersion, Error> {
        let major = require(self.entries.version_major, sys::CFM_VERSION_MAJOR)?;
        let minor = require(self.entries.version_minor, sys::CFM_VERSION_MINOR)?;
        let patch = require(self.entries.version_patch, sys::CFM_VERSION_PATCH)?;
        // SAFETY: the version queries take no arguments and only return integers.
        unsafe {
            Ok(EngineVersion {
                major: major(),
                minor: minor(),
                patch: patch(),
            })
        }
    }

    pub(crate) fn create(&self) -> Result<sys::CfmCreateFn, Error> {
        require(self.entries.create, sys::CFM_CREATE)
    }

    pub(crate) fn destroy(&self) -> Result<sys::CfmDestroyFn, Error> {
        require(self.entries.destroy, sys::CFM_DESTROY)
    }

    pub(crate) fn plugin_load(&self) -> Result<sys::CfmPluginLoadFn, Error> {
        require(self.entries.plugin_load, sys::CFM_PLUGIN_LOAD)
    }

    pub(crate) fn hash_create(&self) -> Result<sys::CfmHashCreateFn, Error> {
        require(self.entries.hash_create, sys::CFM_HASH_CREATE)
    }

    pub(crate) fn hash_output_size(&self) -> Result<sys::CfmHashOutputSizeFn, Error> {
        require(self.entries.hash_output_size, sys::CFM_HASH_OUTPUT_SIZE)
    }

    pub(crate) fn hash_block_size(&self) -> Result<sys::CfmHashBlockSizeFn, Error> {
        require(self.entries.hash_block_size, sys::CFM_HASH_BLOCK_SIZE)
    }

    pub(crate) fn hash_update(&self) -> Result<sys::CfmHashUpdateFn, Error> {
        require(self.entries.hash_update, sys::CFM_HASH_UPDATE)
    }

    pub(crate) fn hash_reset(&self) -> Result<sys::CfmHashResetFn, Error> {
        require(self.entries.hash_reset, sys::CFM_HASH_RESET)
    }

    pub(crate) fn hash_clone(&self) -> Result<sys::CfmHashCloneFn, Error> {
        require(self.entries.hash_clone, sys::CFM_HASH_CLONE)
    }

    pub(crate) fn hash_finalize(&self) -> Result<sys::CfmHashFinalizeFn, Error> {
        require(self.entries.hash_finalize, sys::CFM_HASH_FINALIZE)
    }

    pub(crate) fn hash_destroy(&self) -> Result<sys::CfmHashDestroyFn, Error> {
        require(self.entries.hash_destroy, sys::CFM_HASH_DESTROY)
    }
}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.path)
            .field("bound", &self.bound_entry_points())
            .finish()
    }
}

fn load_once(
    cell: &OnceCell<Result<Arc<NativeLibrary>, Error>>,
    load: impl FnOnce() -> Result<NativeLibrary, Error>,
) -> Result<Arc<NativeLibrary>, Error> {
    match cell.get_or_init(|| load().map(Arc::new)) {
        Ok(library) => Ok(Arc::clone(library)),
        Err(err) => Err(replay(err)),
    }
}

fn replay(err: &Error) -> Error {
    let mut copy = Error::new(err.kind());
    if let Some(message) = err.message() {
        copy = copy.with_message(message);
    }
    if let Some(hint) = err.hint() {
        copy = copy.with_hint(hint);
    }
    if let Some(path) = err.path() {
        copy = copy.with_path(path);
    }
    if let Some(source) = std::error::Error::source(err) {
        copy = copy.with_source(CachedCause(source.to_string()));
    }
    copy
}

#[derive(Debug)]
struct CachedCause(String);

impl fmt::Display for CachedCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CachedCause {}

fn require<T>(slot: Option<T>, name: &'static str) -> Result<T, Error> {
    slot.ok_or_else(|| {
        Error::new(ErrorKind::EntryPointMissing)
            .with_message(format!("native library does not export {name}"))
            .with_entry_point(name)
    })
}
