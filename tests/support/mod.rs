// In-process engine implementing the confium C ABI for integration tests.
// Live handle counts are per thread, so parallel tests don't see each other.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::ffi::CStr;
use std::sync::Arc;

use confium_digest::api::{Context, EngineConfig, EntryPoints, NativeLibrary, sys};
use libc::{c_char, c_void};
use md5::Md5;
use sha2::{Digest as _, Sha256};

pub const STATUS_INSUFFICIENT_BUFFER: u32 = 12;
pub const STATUS_UNKNOWN_PROVIDER: u32 = 13;
pub const STATUS_PLUGIN_INTERNAL_ERROR: u32 = 26;
pub const STATUS_UNSUPPORTED_ALGORITHM: u32 = 50;

/// Accepted by the mock's hash create, which then hands back a null object.
pub const NULL_HANDLE_ALGORITHM: &str = "NULL-HANDLE";

pub const MD5_EMPTY: &str = "d41d8cd98f00b204e9800998ecf8427e";
pub const MD5_TEST: &str = "098f6bcd4621d373cade4e832627b4f6";

/// Provider call that the in-process engine should fail on this thread.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Fault {
    Update,
    Reset,
    Finalize,
    BlockSize,
    OutputSize,
    /// Clone reports `STATUS_PLUGIN_INTERNAL_ERROR`.
    CloneStatus,
    /// Clone reports success but writes no object.
    CloneNull,
}

thread_local! {
    static LIVE_CONTEXTS: Cell<i64> = const { Cell::new(0) };
    static LIVE_HASHES: Cell<i64> = const { Cell::new(0) };
    static FAULT: Cell<Option<Fault>> = const { Cell::new(None) };
    static PLUGIN_PATHS: RefCell<Vec<Option<String>>> = const { RefCell::new(Vec::new()) };
}

pub fn live_contexts() -> i64 {
    LIVE_CONTEXTS.with(Cell::get)
}

pub fn live_hashes() -> i64 {
    LIVE_HASHES.with(Cell::get)
}

pub fn fail_updates(enabled: bool) {
    inject(enabled.then_some(Fault::Update));
}

pub fn inject(fault: Option<Fault>) {
    FAULT.with(|slot| slot.set(fault));
}

fn faulted(fault: Fault) -> bool {
    FAULT.with(Cell::get) == Some(fault)
}

/// Plugin paths seen by plugin load on this thread, in call order.
pub fn plugin_paths() -> Vec<Option<String>> {
    PLUGIN_PATHS.with(|paths| paths.borrow().clone())
}

pub fn entry_points() -> EntryPoints {
    EntryPoints {
        create: Some(mock_create as sys::CfmCreateFn),
        destroy: Some(mock_destroy as sys::CfmDestroyFn),
        plugin_load: Some(mock_plugin_load as sys::CfmPluginLoadFn),
        hash_create: Some(mock_hash_create as sys::CfmHashCreateFn),
        hash_output_size: Some(mock_hash_output_size as sys::CfmHashOutputSizeFn),
        hash_block_size: Some(mock_hash_block_size as sys::CfmHashBlockSizeFn),
        hash_update: Some(mock_hash_update as sys::CfmHashUpdateFn),
        hash_reset: Some(mock_hash_reset as sys::CfmHashResetFn),
        hash_clone: Some(mock_hash_clone as sys::CfmHashCloneFn),
        hash_finalize: Some(mock_hash_finalize as sys::CfmHashFinalizeFn),
        hash_destroy: Some(mock_hash_destroy as sys::CfmHashDestroyFn),
        version_major: Some(mock_version_major as sys::CfmVersionComponentFn),
        version_minor: Some(mock_version_minor as sys::CfmVersionComponentFn),
        version_patch: Some(mock_version_patch as sys::CfmVersionComponentFn),
    }
}

pub fn library() -> Arc<NativeLibrary> {
    library_with(|_| {})
}

/// Callers may only unbind entries; every pointer left in place is a mock below.
pub fn library_with(edit: impl FnOnce(&mut EntryPoints)) -> Arc<NativeLibrary> {
    let mut entries = entry_points();
    edit(&mut entries);
    // SAFETY: the mocks implement the ABI contract and live for the whole process.
    Arc::new(unsafe { NativeLibrary::from_entry_points(entries) })
}

pub fn context() -> Context {
    Context::with_config(library(), &EngineConfig::new()).expect("mock context")
}

#[derive(Default)]
struct MockContext {
    plugins: Vec<String>,
}

#[derive(Clone)]
enum Engine {
    Md5(Md5),
    Sha256(Sha256),
}

impl Engine {
    fn named(name: &str) -> Option<Self> {
        match name {
            "MD5" => Some(Engine::Md5(Md5::new())),
            "SHA-256" => Some(Engine::Sha256(Sha256::new())),
            _ => None,
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Engine::Md5(hash) => hash.update(data),
            Engine::Sha256(hash) => hash.update(data),
        }
    }

    fn reset(&mut self) {
        *self = match self {
            Engine::Md5(_) => Engine::Md5(Md5::new()),
            Engine::Sha256(_) => Engine::Sha256(Sha256::new()),
        };
    }

    fn output(&self) -> Vec<u8> {
        match self {
            Engine::Md5(hash) => hash.clone().finalize().to_vec(),
            Engine::Sha256(hash) => hash.clone().finalize().to_vec(),
        }
    }

    fn block_size(&self) -> u32 {
        64
    }

    fn output_size(&self) -> u32 {
        match self {
            Engine::Md5(_) => 16,
            Engine::Sha256(_) => 32,
        }
    }
}

struct MockHash {
    engine: Engine,
}

fn adjust(counter: &'static std::thread::LocalKey<Cell<i64>>, delta: i64) {
    counter.with(|count| count.set(count.get() + delta));
}

fn box_hash(engine: Engine) -> *mut sys::cfm_hash_t {
    adjust(&LIVE_HASHES, 1);
    Box::into_raw(Box::new(MockHash { engine })).cast()
}

unsafe fn hash_ref<'a>(hash: *mut sys::cfm_hash_t) -> &'a mut MockHash {
    unsafe { &mut *hash.cast::<MockHash>() }
}

unsafe fn string_arg(value: *const c_char) -> Option<String> {
    if value.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned())
}

unsafe extern "C" fn mock_create(out: *mut *mut sys::cfm_t) -> u32 {
    adjust(&LIVE_CONTEXTS, 1);
    unsafe { *out = Box::into_raw(Box::new(MockContext::default())).cast() };
    0
}

unsafe extern "C" fn mock_destroy(cfm: *mut sys::cfm_t) {
    assert!(!cfm.is_null(), "destroy called with null context");
    drop(unsafe { Box::from_raw(cfm.cast::<MockContext>()) });
    adjust(&LIVE_CONTEXTS, -1);
}

unsafe extern "C" fn mock_plugin_load(
    cfm: *mut sys::cfm_t,
    name: *const c_char,
    path: *const c_char,
    _reserved1: *mut c_void,
    _reserved2: *mut c_void,
) -> u32 {
    let path = unsafe { string_arg(path) };
    PLUGIN_PATHS.with(|paths| paths.borrow_mut().push(path));
    let Some(name) = (unsafe { string_arg(name) }) else {
        return STATUS_PLUGIN_INTERNAL_ERROR;
    };
    if name != "botan" {
        return STATUS_UNKNOWN_PROVIDER;
    }
    let context = unsafe { &mut *cfm.cast::<MockContext>() };
    context.plugins.push(name);
    0
}

unsafe extern "C" fn mock_hash_create(
    cfm: *mut sys::cfm_t,
    out: *mut *mut sys::cfm_hash_t,
    name: *const c_char,
    _reserved1: *mut c_void,
    _reserved2: *mut c_void,
    _reserved3: *mut c_void,
) -> u32 {
    let context = unsafe { &*cfm.cast::<MockContext>() };
    if context.plugins.is_empty() {
        return STATUS_UNKNOWN_PROVIDER;
    }
    let name = unsafe { string_arg(name) }.unwrap_or_default();
    if name == NULL_HANDLE_ALGORITHM {
        unsafe { *out = std::ptr::null_mut() };
        return 0;
    }
    let Some(engine) = Engine::named(&name) else {
        return STATUS_UNSUPPORTED_ALGORITHM;
    };
    unsafe { *out = box_hash(engine) };
    0
}

unsafe extern "C" fn mock_hash_output_size(hash: *mut sys::cfm_hash_t, out: *mut u32) -> u32 {
    if faulted(Fault::OutputSize) {
        return STATUS_PLUGIN_INTERNAL_ERROR;
    }
    unsafe { *out = hash_ref(hash).engine.output_size() };
    0
}

unsafe extern "C" fn mock_hash_block_size(hash: *mut sys::cfm_hash_t, out: *mut u32) -> u32 {
    if faulted(Fault::BlockSize) {
        return STATUS_PLUGIN_INTERNAL_ERROR;
    }
    unsafe { *out = hash_ref(hash).engine.block_size() };
    0
}

unsafe extern "C" fn mock_hash_update(hash: *mut sys::cfm_hash_t, data: *const u8, len: u32) -> u32 {
    if faulted(Fault::Update) {
        return STATUS_PLUGIN_INTERNAL_ERROR;
    }
    let bytes = unsafe { std::slice::from_raw_parts(data, len as usize) };
    unsafe { hash_ref(hash) }.engine.update(bytes);
    0
}

unsafe extern "C" fn mock_hash_reset(hash: *mut sys::cfm_hash_t) -> u32 {
    if faulted(Fault::Reset) {
        return STATUS_PLUGIN_INTERNAL_ERROR;
    }
    unsafe { hash_ref(hash) }.engine.reset();
    0
}

unsafe extern "C" fn mock_hash_clone(
    hash: *mut sys::cfm_hash_t,
    out: *mut *mut sys::cfm_hash_t,
) -> u32 {
    if faulted(Fault::CloneStatus) {
        return STATUS_PLUGIN_INTERNAL_ERROR;
    }
    if faulted(Fault::CloneNull) {
        unsafe { *out = std::ptr::null_mut() };
        return 0;
    }
    let engine = unsafe { hash_ref(hash) }.engine.clone();
    unsafe { *out = box_hash(engine) };
    0
}

unsafe extern "C" fn mock_hash_finalize(hash: *mut sys::cfm_hash_t, out: *mut u8, len: u32) -> u32 {
    if faulted(Fault::Finalize) {
        return STATUS_PLUGIN_INTERNAL_ERROR;
    }
    let digest = unsafe { hash_ref(hash) }.engine.output();
    if digest.len() != len as usize {
        return STATUS_INSUFFICIENT_BUFFER;
    }
    unsafe { std::ptr::copy_nonoverlapping(digest.as_ptr(), out, digest.len()) };
    0
}

unsafe extern "C" fn mock_hash_destroy(hash: *mut sys::cfm_hash_t) {
    assert!(!hash.is_null(), "destroy called with null hash");
    drop(unsafe { Box::from_raw(hash.cast::<MockHash>()) });
    adjust(&LIVE_HASHES, -1);
}

unsafe extern "C" fn mock_version_major() -> u32 {
    0
}

unsafe extern "C" fn mock_version_minor() -> u32 {
    1
}

unsafe extern "C" fn mock_version_patch() -> u32 {
    0
}
