// Raw ABI declarations for the confium native library.
#![allow(non_camel_case_types)]

use libc::{c_char, c_void};

#[repr(C)]
pub struct cfm_t {
    _private: [u8; 0],
}

#[repr(C)]
pub struct cfm_hash_t {
    _private: [u8; 0],
}

pub type CfmCreateFn = unsafe extern "C" fn(out_cfm: *mut *mut cfm_t) -> u32;
pub type CfmDestroyFn = unsafe extern "C" fn(cfm: *mut cfm_t);
pub type CfmPluginLoadFn = unsafe extern "C" fn(
    cfm: *mut cfm_t,
    name: *const c_char,
    path: *const c_char,
    reserved1: *mut c_void,
    reserved2: *mut c_void,
) -> u32;

pub type CfmHashCreateFn = unsafe extern "C" fn(
    cfm: *mut cfm_t,
    out_hash: *mut *mut cfm_hash_t,
    name: *const c_char,
    reserved1: *mut c_void,
    reserved2: *mut c_void,
    reserved3: *mut c_void,
) -> u32;
pub type CfmHashOutputSizeFn = unsafe extern "C" fn(hash: *mut cfm_hash_t, out: *mut u32) -> u32;
pub type CfmHashBlockSizeFn = unsafe extern "C" fn(hash: *mut cfm_hash_t, out: *mut u32) -> u32;
pub type CfmHashUpdateFn =
    unsafe extern "C" fn(hash: *mut cfm_hash_t, data: *const u8, len: u32) -> u32;
pub type CfmHashResetFn = unsafe extern "C" fn(hash: *mut cfm_hash_t) -> u32;
pub type CfmHashCloneFn =
    unsafe extern "C" fn(hash: *mut cfm_hash_t, out_hash: *mut *mut cfm_hash_t) -> u32;
pub type CfmHashFinalizeFn =
    unsafe extern "C" fn(hash: *mut cfm_hash_t, out: *mut u8, len: u32) -> u32;
pub type CfmHashDestroyFn = unsafe extern "C" fn(hash: *mut cfm_hash_t);

pub type CfmVersionComponentFn = unsafe extern "C" fn() -> u32;

pub const CFM_CREATE: &str = "cfm_create";
pub const CFM_DESTROY: &str = "cfm_destroy";
pub const CFM_PLUGIN_LOAD: &str = "cfm_plugin_load";
pub const CFM_HASH_CREATE: &str = "cfm_hash_create";
pub const CFM_HASH_OUTPUT_SIZE: &str = "cfm_hash_output_size";
pub const CFM_HASH_BLOCK_SIZE: &str = "cfm_hash_block_size";
pub const CFM_HASH_UPDATE: &str = "cfm_hash_update";
pub const CFM_HASH_RESET: &str = "cfm_hash_reset";
pub const CFM_HASH_CLONE: &str = "cfm_hash_clone";
pub const CFM_HASH_FINALIZE: &str = "cfm_hash_finalize";
pub const CFM_HASH_DESTROY: &str = "cfm_hash_destroy";
pub const CFM_VERSION_MAJOR: &str = "cfm_version_major";
pub const CFM_VERSION_MINOR: &str = "cfm_version_minor";
pub const CFM_VERSION_PATCH: &str = "cfm_version_patch";
