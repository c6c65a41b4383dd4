//! Purpose: Own one native engine context with its provider plugin loaded.
//! Exports: `Context`.
//! Role: Parent of every `Digest`; the native context outlives all of them.
//! Invariants: A `Context` value exists only after create and plugin load both succeed.
//! Invariants: `cfm_destroy` runs exactly once per created context, on every path.
use std::ffi::{CString, OsStr};
use std::ptr;
use std::rc::Rc;
use std::sync::Arc;

use crate::core::config::EngineConfig;
use crate::core::digest::Digest;
use crate::core::error::{Error, ErrorKind, check_status};
use crate::core::library::NativeLibrary;
use crate::core::sys;

/// Owning wrapper for `cfm_t`; releases it on drop.
pub(crate) struct ContextHandle {
    ptr: *mut sys::cfm_t,
    destroy: sys::CfmDestroyFn,
    library: Arc<NativeLibrary>,
}

impl ContextHandle {
    pub(crate) fn as_ptr(&self) -> *mut sys::cfm_t {
        self.ptr
    }

    pub(crate) fn library(&self) -> &Arc<NativeLibrary> {
        &self.library
    }

    fn release(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        let ptr = std::mem::replace(&mut self.ptr, ptr::null_mut());
        tracing::trace!("destroying native context");
        // SAFETY: `ptr` came from a successful `cfm_create` and is released only here.
        unsafe { (self.destroy)(ptr) };
    }
}

impl Drop for ContextHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// An initialized engine with a provider plugin loaded.
///
/// Cloning shares the same native context. The context is destroyed once the last
/// clone and the last `Digest` created from it are dropped.
///
/// Not `Send`/`Sync`: the engine makes no thread-safety promise for its handles.
#[derive(Clone)]
pub struct Context {
    handle: Rc<ContextHandle>,
}

impl Context {
    /// Uses the process-wide library and environment configuration.
    pub fn new() -> Result<Self, Error> {
        Self::with_config(NativeLibrary::global()?, &EngineConfig::from_env())
    }

    pub fn with_config(library: Arc<NativeLibrary>, config: &EngineConfig) -> Result<Self, Error> {
        // Bound before create so a context is never made that can't be freed.
        let create = library.create()?;
        let destroy = library.destroy()?;
        let plugin_load = library.plugin_load()?;

        let mut raw = ptr::null_mut();
        // SAFETY: `raw` is a valid out-pointer for the duration of the call.
        let status = unsafe { create(&mut raw) };
        check_status(sys::CFM_CREATE, status)?;
        if raw.is_null() {
            return Err(Error::new(ErrorKind::Internal)
                .with_message("cfm_create returned a null context")
                .with_entry_point(sys::CFM_CREATE));
        }
        let handle = ContextHandle {
            ptr: raw,
            destroy,
            library,
        };
        tracing::debug!("created native context");

        let name = c_string(config.plugin_name(), "plugin name")?;
        let path = match config.plugin_path() {
            Some(path) => Some(os_c_string(path)?),
            None => None,
        };
        let path_ptr = path.as_ref().map_or(ptr::null(), |path| path.as_ptr());
        // SAFETY: the context is live; both strings outlive the call; reserved args are null.
        let status = unsafe {
            plugin_load(
                handle.as_ptr(),
                name.as_ptr(),
                path_ptr,
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        // On failure `handle` drops here and the context is destroyed.
        check_status(sys::CFM_PLUGIN_LOAD, status)?;
        tracing::debug!(plugin = config.plugin_name(), "loaded provider plugin");

        Ok(Self {
            handle: Rc::new(handle),
        })
    }

    pub fn library(&self) -> &Arc<NativeLibrary> {
        self.handle.library()
    }

    /// Creates a digest for `algorithm` bound to this context.
    pub fn digest(&self, algorithm: &str) -> Result<Digest, Error> {
        Digest::new(self, algorithm)
    }

    pub(crate) fn handle(&self) -> &Rc<ContextHandle> {
        &self.handle
    }
}

#[cfg(unix)]
fn os_c_string(value: &OsStr) -> Result<CString, Error> {
    use std::os::unix::ffi::OsStrExt;
    CString::new(value.as_bytes()).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("plugin path contains NUL")
            .with_source(err)
    })
}

#[cfg(not(unix))]
fn os_c_string(value: &OsStr) -> Result<CString, Error> {
    c_string(&value.to_string_lossy(), "plugin path")
}

pub(crate) fn c_string(value: &str, what: &str) -> Result<CString, Error> {
    CString::new(value).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("{what} contains NUL"))
            .with_source(err)
    })
}
