//! Purpose: Streaming digest over one native hash object.
//! Exports: `Digest`, `digest`.
//! Role: Implements update/reset/finish/clone and length queries on `cfm_hash_t`.
//! Invariants: The hash object is non-null for the whole life of a `Digest`.
//! Invariants: `cfm_hash_destroy` runs exactly once per hash object, before the
//! owning context reference is released.
//! Invariants: The digest covers every byte passed to `update` since the last
//! create, clone, or reset, in call order.
use std::io::{self, Read, Write};
use std::ptr;
use std::rc::Rc;

use crate::core::context::{Context, ContextHandle, c_string};
use crate::core::error::{Error, ErrorKind, check_status};
use crate::core::sys;

/// Native ABI length parameter is 32-bit; larger inputs are fed in chunks.
const MAX_UPDATE_LEN: usize = u32::MAX as usize;

/// Owning wrapper for `cfm_hash_t`; releases it on drop.
struct HashHandle {
    ptr: *mut sys::cfm_hash_t,
    destroy: sys::CfmHashDestroyFn,
}

impl HashHandle {
    fn from_raw(ptr: *mut sys::cfm_hash_t, destroy: sys::CfmHashDestroyFn) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        Some(Self { ptr, destroy })
    }

    fn release(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        let ptr = std::mem::replace(&mut self.ptr, ptr::null_mut());
        tracing::trace!("destroying native hash object");
        // SAFETY: `ptr` came from a successful create/clone and is released only here.
        unsafe { (self.destroy)(ptr) };
    }
}

impl Drop for HashHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Incremental digest for a named algorithm, backed by the native engine.
///
/// Dropping a `Digest` destroys its native hash object. Not `Send`/`Sync`; concurrent
/// use of one digest from several threads is not supported by the engine.
pub struct Digest {
    algorithm: String,
    // Declared before `context` so the hash object is destroyed first.
    handle: HashHandle,
    context: Rc<ContextHandle>,
}

impl Digest {
    pub fn new(context: &Context, algorithm: &str) -> Result<Self, Error> {
        let owner = context.handle();
        let library = owner.library();
        let create = library.hash_create()?;
        let destroy = library.hash_destroy()?;
        let name = c_string(algorithm, "algorithm name")?;

        let mut raw = ptr::null_mut();
        // SAFETY: the context is live; `name` outlives the call; reserved args are null.
        let status = unsafe {
            create(
                owner.as_ptr(),
                &mut raw,
                name.as_ptr(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        check_status(sys::CFM_HASH_CREATE, status)
            .map_err(|err| err.with_algorithm(algorithm))?;
        let handle = HashHandle::from_raw(raw, destroy).ok_or_else(|| {
            Error::new(ErrorKind::InvalidAlgorithm)
                .with_message("provider reported success but returned no hash object")
                .with_entry_point(sys::CFM_HASH_CREATE)
                .with_algorithm(algorithm)
        })?;
        tracing::trace!(algorithm, "created native hash object");

        Ok(Self {
            algorithm: algorithm.to_string(),
            handle,
            context: Rc::clone(owner),
        })
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Independent copy carrying the same accumulated input.
    pub fn try_clone(&self) -> Result<Self, Error> {
        let library = self.context.library();
        let clone = library.hash_clone()?;
        let destroy = library.hash_destroy()?;

        let mut raw = ptr::null_mut();
        // SAFETY: the source handle is live; `raw` is a valid out-pointer.
        let status = unsafe { clone(self.handle.ptr, &mut raw) };
        check_status(sys::CFM_HASH_CLONE, status)
            .map_err(|err| err.with_algorithm(self.algorithm.as_str()))?;
        let handle = HashHandle::from_raw(raw, destroy).ok_or_else(|| {
            Error::new(ErrorKind::InvalidAlgorithm)
                .with_message("provider reported success but returned no cloned hash object")
                .with_entry_point(sys::CFM_HASH_CLONE)
                .with_algorithm(self.algorithm.as_str())
        })?;

        Ok(Self {
            algorithm: self.algorithm.clone(),
            handle,
            context: Rc::clone(&self.context),
        })
    }

    pub fn block_length(&self) -> Result<u32, Error> {
        let block_size = self.context.library().hash_block_size()?;
        let mut out = 0u32;
        // SAFETY: the handle is live; `out` is a valid out-pointer.
        let status = unsafe { block_size(self.handle.ptr, &mut out) };
        check_status(sys::CFM_HASH_BLOCK_SIZE, status)?;
        Ok(out)
    }

    pub fn digest_length(&self) -> Result<u32, Error> {
        let output_size = self.context.library().hash_output_size()?;
        let mut out = 0u32;
        // SAFETY: the handle is live; `out` is a valid out-pointer.
        let status = unsafe { output_size(self.handle.ptr, &mut out) };
        check_status(sys::CFM_HASH_OUTPUT_SIZE, status)?;
        Ok(out)
    }

    /// Appends `data` to the input. After a failure the native state is
    /// provider-defined; discard the digest.
    pub fn update(&mut self, data: &[u8]) -> Result<(), Error> {
        let update = self.context.library().hash_update()?;
        for chunk in data.chunks(MAX_UPDATE_LEN) {
            // SAFETY: the handle is live; `chunk` is valid for `chunk.len()` bytes,
            // which fits in u32 by construction.
            let status = unsafe { update(self.handle.ptr, chunk.as_ptr(), chunk.len() as u32) };
            check_status(sys::CFM_HASH_UPDATE, status)?;
        }
        Ok(())
    }

    /// Feeds `reader` to exhaustion and returns the number of bytes consumed.
    pub fn update_reader<R: Read>(&mut self, mut reader: R) -> Result<u64, Error> {
        io::copy(&mut reader, self).map_err(from_io_error)
    }

    /// Returns to the empty-input state for the same algorithm.
    pub fn reset(&mut self) -> Result<(), Error> {
        let reset = self.context.library().hash_reset()?;
        // SAFETY: the handle is live.
        let status = unsafe { reset(self.handle.ptr) };
        check_status(sys::CFM_HASH_RESET, status)
    }

    /// Digest of all input since the last create/clone/reset.
    ///
    /// The handle stays usable for length queries afterwards. Calling `finish`
    /// again without a `reset` gives provider-defined results.
    pub fn finish(&mut self) -> Result<Vec<u8>, Error> {
        let len = self.digest_length()?;
        let finalize = self.context.library().hash_finalize()?;
        let mut out = vec![0u8; len as usize];
        // SAFETY: the handle is live; `out` holds exactly `len` writable bytes.
        let status = unsafe { finalize(self.handle.ptr, out.as_mut_ptr(), len) };
        check_status(sys::CFM_HASH_FINALIZE, status)?;
        Ok(out)
    }
}

impl Write for Digest {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Digest")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Unwraps binding errors that crossed an `io::Write` boundary.
fn from_io_error(err: io::Error) -> Error {
    if err.get_ref().is_some_and(|inner| inner.is::<Error>()) {
        if let Some(inner) = err.into_inner() {
            if let Ok(binding) = inner.downcast::<Error>() {
                return *binding;
            }
        }
        return Error::new(ErrorKind::Internal).with_message("lost wrapped binding error");
    }
    Error::new(ErrorKind::Io)
        .with_message("failed to read digest input")
        .with_source(err)
}

/// One-shot digest: create, feed `data`, finish.
pub fn digest(context: &Context, algorithm: &str, data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut hash = Digest::new(context, algorithm)?;
    hash.update(data)?;
    hash.finish()
}
