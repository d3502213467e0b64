//! Raw C types used in the signatures of the host callback table.
//!
//! These mirror the declarations a host runtime exposes to its native
//! extension modules. Handles owned by the host are opaque; the few structs a
//! plugin reads or fills in itself are laid out field for field.

#![allow(missing_docs)]

use std::ffi::{c_char, c_int, c_void};
use std::marker::{PhantomData, PhantomPinned};

use cfg_if::cfg_if;

macro_rules! opaque {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[repr(C)]
            pub struct $name {
                _data: [u8; 0],
                _marker: PhantomData<(*mut u8, PhantomPinned)>,
            }
        )*
    };
}

opaque!(
    /// Environment a term lives in.
    ErlNifEnv,
    /// Host mutex handle.
    ErlNifMutex,
    /// Host condition variable handle.
    ErlNifCond,
    /// Host read/write lock handle.
    ErlNifRWLock,
    /// Registered resource type.
    ErlNifResourceType,
    /// Host I/O queue.
    ErlNifIOQueue,
    /// Target of a host thread id.
    ErlDrvTid_,
    /// C stdio stream.
    FILE,
);

/// A term handle. Pointer-sized on every supported target.
pub type ERL_NIF_TERM = usize;
pub type ERL_NIF_UINT = usize;
pub type ErlNifUInt64 = u64;
pub type ErlNifSInt64 = i64;
pub type ErlNifTime = i64;
pub type ErlNifTid = *mut ErlDrvTid_;
pub type ErlNifTSDKey = c_int;

/// A `va_list` as it is passed to a function: a pointer on every supported
/// target.
pub type va_list = *mut c_void;

cfg_if! {
    if #[cfg(windows)] {
        /// Event object handed to `enif_select`.
        pub type ErlNifEvent = *mut c_void;

        /// Scatter/gather element, laid out like `WSABUF`.
        #[repr(C)]
        #[derive(Debug, Clone, Copy)]
        pub struct SysIOVec {
            pub iov_len: std::ffi::c_ulong,
            pub iov_base: *mut c_char,
        }
    } else {
        /// Event object handed to `enif_select`.
        pub type ErlNifEvent = c_int;

        /// Scatter/gather element, laid out like `struct iovec`.
        #[repr(C)]
        #[derive(Debug, Clone, Copy)]
        pub struct SysIOVec {
            pub iov_base: *mut c_char,
            pub iov_len: usize,
        }
    }
}

pub type ErlNifCharEncoding = c_int;
pub const ERL_NIF_LATIN1: ErlNifCharEncoding = 1;
pub const ERL_NIF_UTF8: ErlNifCharEncoding = 2;

pub type ErlNifMapIteratorEntry = c_int;
pub const ERL_NIF_MAP_ITERATOR_FIRST: ErlNifMapIteratorEntry = 1;
pub const ERL_NIF_MAP_ITERATOR_LAST: ErlNifMapIteratorEntry = 2;

pub type ErlNifTimeUnit = c_int;
pub const ERL_NIF_SEC: ErlNifTimeUnit = 0;
pub const ERL_NIF_MSEC: ErlNifTimeUnit = 1;
pub const ERL_NIF_USEC: ErlNifTimeUnit = 2;
pub const ERL_NIF_NSEC: ErlNifTimeUnit = 3;

pub type ErlNifUniqueInteger = c_int;
pub const ERL_NIF_UNIQUE_POSITIVE: ErlNifUniqueInteger = 1 << 0;
pub const ERL_NIF_UNIQUE_MONOTONIC: ErlNifUniqueInteger = 1 << 1;

pub type ErlNifResourceFlags = c_int;
pub const ERL_NIF_RT_CREATE: ErlNifResourceFlags = 1;
pub const ERL_NIF_RT_TAKEOVER: ErlNifResourceFlags = 2;

pub type ErlNifSelectFlags = c_int;
pub const ERL_NIF_SELECT_READ: ErlNifSelectFlags = 1 << 0;
pub const ERL_NIF_SELECT_WRITE: ErlNifSelectFlags = 1 << 1;
pub const ERL_NIF_SELECT_STOP: ErlNifSelectFlags = 1 << 2;
pub const ERL_NIF_SELECT_CANCEL: ErlNifSelectFlags = 1 << 3;
pub const ERL_NIF_SELECT_CUSTOM_MSG: ErlNifSelectFlags = 1 << 4;
pub const ERL_NIF_SELECT_ERROR: ErlNifSelectFlags = 1 << 5;

pub type ErlNifHash = c_int;
pub const ERL_NIF_INTERNAL_HASH: ErlNifHash = 1;
pub const ERL_NIF_PHASH2: ErlNifHash = 2;

pub type ErlNifTermType = c_int;
pub const ERL_NIF_TERM_TYPE_ATOM: ErlNifTermType = 1;
pub const ERL_NIF_TERM_TYPE_BITSTRING: ErlNifTermType = 2;
pub const ERL_NIF_TERM_TYPE_FLOAT: ErlNifTermType = 3;
pub const ERL_NIF_TERM_TYPE_FUN: ErlNifTermType = 4;
pub const ERL_NIF_TERM_TYPE_INTEGER: ErlNifTermType = 5;
pub const ERL_NIF_TERM_TYPE_LIST: ErlNifTermType = 6;
pub const ERL_NIF_TERM_TYPE_MAP: ErlNifTermType = 7;
pub const ERL_NIF_TERM_TYPE_PID: ErlNifTermType = 8;
pub const ERL_NIF_TERM_TYPE_PORT: ErlNifTermType = 9;
pub const ERL_NIF_TERM_TYPE_REFERENCE: ErlNifTermType = 10;
pub const ERL_NIF_TERM_TYPE_TUPLE: ErlNifTermType = 11;

pub type ErlNifOption = c_int;
pub const ERL_NIF_OPT_DELAY_HALT: ErlNifOption = 1;
pub const ERL_NIF_OPT_ON_HALT: ErlNifOption = 2;
pub const ERL_NIF_OPT_ON_UNLOAD_THREAD: ErlNifOption = 3;

pub type ErlNifIOQueueOpts = c_int;
pub const ERL_NIF_IOQ_NORMAL: ErlNifIOQueueOpts = 1;

pub const ERL_NIF_THR_UNDEFINED: c_int = 0;
pub const ERL_NIF_THR_NORMAL_SCHEDULER: c_int = 1;
pub const ERL_NIF_THR_DIRTY_CPU_SCHEDULER: c_int = 2;
pub const ERL_NIF_THR_DIRTY_IO_SCHEDULER: c_int = 3;

pub const ERL_NIF_BIN2TERM_SAFE: std::ffi::c_uint = 0x2000_0000;

pub const ERL_NIF_IOVEC_SIZE: usize = 16;

/// Signature of a native function callable from the host.
pub type ErlNifFunctionPtr =
    unsafe extern "C" fn(env: *mut ErlNifEnv, argc: c_int, argv: *const ERL_NIF_TERM) -> ERL_NIF_TERM;
pub type ErlNifThreadFunc = unsafe extern "C" fn(args: *mut c_void) -> *mut c_void;
pub type ErlNifDlErrorHandler = unsafe extern "C" fn(arg: *mut c_void, message: *const c_char);
pub type ErlNifResourceDtor = unsafe extern "C" fn(env: *mut ErlNifEnv, obj: *mut c_void);
pub type ErlNifResourceStop =
    unsafe extern "C" fn(env: *mut ErlNifEnv, obj: *mut c_void, event: ErlNifEvent, is_direct_call: c_int);
pub type ErlNifResourceDown = unsafe extern "C" fn(
    env: *mut ErlNifEnv,
    obj: *mut c_void,
    pid: *mut ErlNifPid,
    monitor: *mut ErlNifMonitor,
);
pub type ErlNifResourceDynCall =
    unsafe extern "C" fn(env: *mut ErlNifEnv, obj: *mut c_void, call_data: *mut c_void);

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ErlNifBinary {
    pub size: usize,
    pub data: *mut u8,
    pub ref_bin: *mut c_void,
    pub __spare__: [*mut c_void; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErlNifPid {
    pub pid: ERL_NIF_TERM,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErlNifPort {
    pub port_id: ERL_NIF_TERM,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErlNifMonitor {
    pub data: [u8; 4 * std::mem::size_of::<ERL_NIF_TERM>()],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ErlNifThreadOpts {
    pub suggested_stack_size: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ErlNifSysInfo {
    pub driver_major_version: c_int,
    pub driver_minor_version: c_int,
    pub erts_version: *mut c_char,
    pub otp_release: *mut c_char,
    pub thread_support: c_int,
    pub smp_support: c_int,
    pub async_threads: c_int,
    pub scheduler_threads: c_int,
    pub nif_major_version: c_int,
    pub nif_minor_version: c_int,
    pub dirty_scheduler_support: c_int,
}

/// Iterator state over a map term. Only the host reads the private parts.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ErlNifMapIterator {
    pub map: ERL_NIF_TERM,
    pub size: ERL_NIF_UINT,
    pub idx: ERL_NIF_UINT,
    pub u: [*mut c_void; 2],
    pub __spare__: [*mut c_void; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ErlNifIOVec {
    pub iovcnt: c_int,
    pub size: usize,
    pub iov: *mut SysIOVec,
    pub ref_bins: *mut *mut c_void,
    pub flags: c_int,
    pub small_iov: [SysIOVec; ERL_NIF_IOVEC_SIZE],
    pub small_ref_bin: [*mut c_void; ERL_NIF_IOVEC_SIZE],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ErlNifResourceTypeInit {
    pub dtor: Option<ErlNifResourceDtor>,
    pub stop: Option<ErlNifResourceStop>,
    pub down: Option<ErlNifResourceDown>,
    pub members: c_int,
    pub dyncall: Option<ErlNifResourceDynCall>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn test_term_is_pointer_sized() {
        assert_eq!(size_of::<ERL_NIF_TERM>(), size_of::<*const c_void>());
        assert_eq!(size_of::<ErlNifPid>(), size_of::<ERL_NIF_TERM>());
    }

    #[test]
    fn test_binary_layout() {
        assert_eq!(size_of::<ErlNifBinary>(), 5 * size_of::<usize>());
    }

    #[test]
    fn test_opaque_types_are_zero_sized() {
        assert_eq!(size_of::<ErlNifEnv>(), 0);
        assert_eq!(size_of::<ErlNifMutex>(), 0);
    }
}
