//! Purpose: Incremental digests backed by the confium native hashing engine.
//! Exports: `api` (context, digest, library resolution, errors), `core` (implementation).
//! Role: Binding layer over a small fixed C ABI reached through a dynamically loaded library.
//! Invariants: Every native context and hash object is released exactly once, on every path.
//! Invariants: A nonzero native status always surfaces as `ErrorKind::NativeCallFailed`
//! with the provider's code.
pub mod api;
pub mod core;
