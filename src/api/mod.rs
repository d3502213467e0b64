//! The NIF callback catalog.
//!
//! [`NifCallbacks`] is the table a host populates for its native extension
//! modules and [`NifApi`] the handle a module calls it through. The entry
//! list below is the single definition of the catalog: slot indices follow
//! its order, so entries are only ever appended at the bottom. Never reorder
//! or remove an entry, and never change a released signature.

use std::ffi::{c_char, c_double, c_int, c_long, c_uint, c_ulong, c_void};

#[allow(clippy::wildcard_imports)]
use crate::ffi::*;
use crate::{dispatch_table, session::Session};

mod convenience;

dispatch_table! {
    /// The callbacks a host provides to native extension modules.
    #[allow(missing_docs)]
    pub struct NifCallbacks;
    /// Calls into the host through the [`NifCallbacks`] of a session.
    pub struct NifApi;
    prefix = "enif_";

    /// Returns the private data set by the module's load function.
    fn priv_data(env: *mut ErlNifEnv) -> *mut c_void;
    /// Allocates memory from the host allocator.
    fn alloc(size: usize) -> *mut c_void;
    /// Frees memory returned by [`alloc`](Self::alloc).
    fn free(ptr: *mut c_void);
    fn is_atom(env: *mut ErlNifEnv, term: ERL_NIF_TERM) -> c_int;
    fn is_binary(env: *mut ErlNifEnv, term: ERL_NIF_TERM) -> c_int;
    fn is_ref(env: *mut ErlNifEnv, term: ERL_NIF_TERM) -> c_int;
    fn inspect_binary(env: *mut ErlNifEnv, bin_term: ERL_NIF_TERM, bin: *mut ErlNifBinary) -> c_int;
    fn alloc_binary(size: usize, bin: *mut ErlNifBinary) -> c_int;
    fn realloc_binary(bin: *mut ErlNifBinary, size: usize) -> c_int;
    fn release_binary(bin: *mut ErlNifBinary);
    fn get_int(env: *mut ErlNifEnv, term: ERL_NIF_TERM, ip: *mut c_int) -> c_int;
    fn get_ulong(env: *mut ErlNifEnv, term: ERL_NIF_TERM, ip: *mut c_ulong) -> c_int;
    fn get_double(env: *mut ErlNifEnv, term: ERL_NIF_TERM, dp: *mut c_double) -> c_int;
    fn get_list_cell(
        env: *mut ErlNifEnv,
        term: ERL_NIF_TERM,
        head: *mut ERL_NIF_TERM,
        tail: *mut ERL_NIF_TERM,
    ) -> c_int;
    fn get_tuple(
        env: *mut ErlNifEnv,
        tpl: ERL_NIF_TERM,
        arity: *mut c_int,
        array: *mut *const ERL_NIF_TERM,
    ) -> c_int;
    fn is_identical(lhs: ERL_NIF_TERM, rhs: ERL_NIF_TERM) -> c_int;
    /// Compares two terms. Negative, zero or positive like `memcmp`.
    fn compare(lhs: ERL_NIF_TERM, rhs: ERL_NIF_TERM) -> c_int;
    fn make_binary(env: *mut ErlNifEnv, bin: *mut ErlNifBinary) -> ERL_NIF_TERM;
    fn make_badarg(env: *mut ErlNifEnv) -> ERL_NIF_TERM;
    fn make_int(env: *mut ErlNifEnv, i: c_int) -> ERL_NIF_TERM;
    fn make_ulong(env: *mut ErlNifEnv, i: c_ulong) -> ERL_NIF_TERM;
    fn make_double(env: *mut ErlNifEnv, d: c_double) -> ERL_NIF_TERM;
    fn make_atom(env: *mut ErlNifEnv, name: *const c_char) -> ERL_NIF_TERM;
    fn make_existing_atom(
        env: *mut ErlNifEnv,
        name: *const c_char,
        atom: *mut ERL_NIF_TERM,
        encoding: ErlNifCharEncoding,
    ) -> c_int;
    /// Builds a tuple of `cnt` terms passed as variadic arguments.
    @variadic fn make_tuple(env: *mut ErlNifEnv, cnt: c_uint) -> ERL_NIF_TERM;
    /// Builds a list of `cnt` terms passed as variadic arguments.
    @variadic fn make_list(env: *mut ErlNifEnv, cnt: c_uint) -> ERL_NIF_TERM;
    fn make_list_cell(env: *mut ErlNifEnv, car: ERL_NIF_TERM, cdr: ERL_NIF_TERM) -> ERL_NIF_TERM;
    fn make_string(
        env: *mut ErlNifEnv,
        string: *const c_char,
        encoding: ErlNifCharEncoding,
    ) -> ERL_NIF_TERM;
    fn make_ref(env: *mut ErlNifEnv) -> ERL_NIF_TERM;

    fn mutex_create(name: *mut c_char) -> *mut ErlNifMutex;
    fn mutex_destroy(mtx: *mut ErlNifMutex);
    fn mutex_trylock(mtx: *mut ErlNifMutex) -> c_int;
    fn mutex_lock(mtx: *mut ErlNifMutex);
    fn mutex_unlock(mtx: *mut ErlNifMutex);
    fn cond_create(name: *mut c_char) -> *mut ErlNifCond;
    fn cond_destroy(cnd: *mut ErlNifCond);
    fn cond_signal(cnd: *mut ErlNifCond);
    fn cond_broadcast(cnd: *mut ErlNifCond);
    fn cond_wait(cnd: *mut ErlNifCond, mtx: *mut ErlNifMutex);
    fn rwlock_create(name: *mut c_char) -> *mut ErlNifRWLock;
    fn rwlock_destroy(rwlck: *mut ErlNifRWLock);
    fn rwlock_tryrlock(rwlck: *mut ErlNifRWLock) -> c_int;
    fn rwlock_rlock(rwlck: *mut ErlNifRWLock);
    fn rwlock_runlock(rwlck: *mut ErlNifRWLock);
    fn rwlock_tryrwlock(rwlck: *mut ErlNifRWLock) -> c_int;
    fn rwlock_rwlock(rwlck: *mut ErlNifRWLock);
    fn rwlock_rwunlock(rwlck: *mut ErlNifRWLock);
    fn tsd_key_create(name: *mut c_char, key: *mut ErlNifTSDKey) -> c_int;
    fn tsd_key_destroy(key: ErlNifTSDKey);
    fn tsd_set(key: ErlNifTSDKey, data: *mut c_void);
    fn tsd_get(key: ErlNifTSDKey) -> *mut c_void;
    fn thread_opts_create(name: *mut c_char) -> *mut ErlNifThreadOpts;
    fn thread_opts_destroy(opts: *mut ErlNifThreadOpts);
    fn thread_create(
        name: *mut c_char,
        tid: *mut ErlNifTid,
        func: Option<ErlNifThreadFunc>,
        args: *mut c_void,
        opts: *mut ErlNifThreadOpts,
    ) -> c_int;
    fn thread_self() -> ErlNifTid;
    fn equal_tids(tid1: ErlNifTid, tid2: ErlNifTid) -> c_int;
    fn thread_exit(resp: *mut c_void);
    fn thread_join(tid: ErlNifTid, respp: *mut *mut c_void) -> c_int;

    /// Resizes memory returned by [`alloc`](Self::alloc).
    fn realloc(ptr: *mut c_void, size: usize) -> *mut c_void;
    fn system_info(sip: *mut ErlNifSysInfo, si_size: usize);
    @variadic fn fprintf(filep: *mut FILE, format: *const c_char) -> c_int;
    fn inspect_iolist_as_binary(env: *mut ErlNifEnv, term: ERL_NIF_TERM, bin: *mut ErlNifBinary) -> c_int;
    fn make_sub_binary(env: *mut ErlNifEnv, bin_term: ERL_NIF_TERM, pos: usize, size: usize) -> ERL_NIF_TERM;
    fn get_string(
        env: *mut ErlNifEnv,
        list: ERL_NIF_TERM,
        buf: *mut c_char,
        len: c_uint,
        encoding: ErlNifCharEncoding,
    ) -> c_int;
    fn get_atom(
        env: *mut ErlNifEnv,
        atom: ERL_NIF_TERM,
        buf: *mut c_char,
        len: c_uint,
        encoding: ErlNifCharEncoding,
    ) -> c_int;
    fn is_fun(env: *mut ErlNifEnv, term: ERL_NIF_TERM) -> c_int;
    fn is_pid(env: *mut ErlNifEnv, term: ERL_NIF_TERM) -> c_int;
    fn is_port(env: *mut ErlNifEnv, term: ERL_NIF_TERM) -> c_int;
    fn get_uint(env: *mut ErlNifEnv, term: ERL_NIF_TERM, ip: *mut c_uint) -> c_int;
    fn get_long(env: *mut ErlNifEnv, term: ERL_NIF_TERM, ip: *mut c_long) -> c_int;
    fn make_uint(env: *mut ErlNifEnv, i: c_uint) -> ERL_NIF_TERM;
    fn make_long(env: *mut ErlNifEnv, i: c_long) -> ERL_NIF_TERM;
    /// Builds a tuple from `cnt` terms stored at `arr`.
    fn make_tuple_from_array(env: *mut ErlNifEnv, arr: *const ERL_NIF_TERM, cnt: c_uint) -> ERL_NIF_TERM;
    /// Builds a list from `cnt` terms stored at `arr`.
    fn make_list_from_array(env: *mut ErlNifEnv, arr: *const ERL_NIF_TERM, cnt: c_uint) -> ERL_NIF_TERM;
    fn is_empty_list(env: *mut ErlNifEnv, term: ERL_NIF_TERM) -> c_int;
    fn open_resource_type(
        env: *mut ErlNifEnv,
        module_str: *const c_char,
        name_str: *const c_char,
        dtor: Option<ErlNifResourceDtor>,
        flags: ErlNifResourceFlags,
        tried: *mut ErlNifResourceFlags,
    ) -> *mut ErlNifResourceType;
    fn alloc_resource(ty: *mut ErlNifResourceType, size: usize) -> *mut c_void;
    fn release_resource(obj: *mut c_void);
    fn make_resource(env: *mut ErlNifEnv, obj: *mut c_void) -> ERL_NIF_TERM;
    fn get_resource(
        env: *mut ErlNifEnv,
        term: ERL_NIF_TERM,
        ty: *mut ErlNifResourceType,
        objp: *mut *mut c_void,
    ) -> c_int;
    fn sizeof_resource(obj: *mut c_void) -> usize;
    fn make_new_binary(env: *mut ErlNifEnv, size: usize, termp: *mut ERL_NIF_TERM) -> *mut u8;
    fn is_list(env: *mut ErlNifEnv, term: ERL_NIF_TERM) -> c_int;
    fn is_tuple(env: *mut ErlNifEnv, term: ERL_NIF_TERM) -> c_int;
    fn get_atom_length(
        env: *mut ErlNifEnv,
        atom: ERL_NIF_TERM,
        len: *mut c_uint,
        encoding: ErlNifCharEncoding,
    ) -> c_int;
    fn get_list_length(env: *mut ErlNifEnv, term: ERL_NIF_TERM, len: *mut c_uint) -> c_int;
    fn make_atom_len(env: *mut ErlNifEnv, name: *const c_char, len: usize) -> ERL_NIF_TERM;
    fn make_existing_atom_len(
        env: *mut ErlNifEnv,
        name: *const c_char,
        len: usize,
        atom: *mut ERL_NIF_TERM,
        encoding: ErlNifCharEncoding,
    ) -> c_int;
    fn make_string_len(
        env: *mut ErlNifEnv,
        string: *const c_char,
        len: usize,
        encoding: ErlNifCharEncoding,
    ) -> ERL_NIF_TERM;
    fn alloc_env() -> *mut ErlNifEnv;
    fn free_env(env: *mut ErlNifEnv);
    fn clear_env(env: *mut ErlNifEnv);
    /// Sends `msg` from `msg_env` to the process `to_pid`.
    fn send(env: *mut ErlNifEnv, to_pid: *const ErlNifPid, msg_env: *mut ErlNifEnv, msg: ERL_NIF_TERM) -> c_int;
    fn make_copy(dst_env: *mut ErlNifEnv, src_term: ERL_NIF_TERM) -> ERL_NIF_TERM;
    /// Writes the pid of the calling process to `pid`.
    #[link_name = "enif_self"]
    fn self_(caller_env: *mut ErlNifEnv, pid: *mut ErlNifPid) -> *mut ErlNifPid;
    fn get_local_pid(env: *mut ErlNifEnv, term: ERL_NIF_TERM, pid: *mut ErlNifPid) -> c_int;
    fn keep_resource(obj: *mut c_void);
    fn make_resource_binary(
        env: *mut ErlNifEnv,
        obj: *mut c_void,
        data: *const c_void,
        size: usize,
    ) -> ERL_NIF_TERM;
    #[cfg(any(windows, target_pointer_width = "32"))]
    fn get_int64(env: *mut ErlNifEnv, term: ERL_NIF_TERM, ip: *mut ErlNifSInt64) -> c_int;
    #[cfg(any(windows, target_pointer_width = "32"))]
    fn get_uint64(env: *mut ErlNifEnv, term: ERL_NIF_TERM, ip: *mut ErlNifUInt64) -> c_int;
    #[cfg(any(windows, target_pointer_width = "32"))]
    fn make_int64(env: *mut ErlNifEnv, i: ErlNifSInt64) -> ERL_NIF_TERM;
    #[cfg(any(windows, target_pointer_width = "32"))]
    fn make_uint64(env: *mut ErlNifEnv, i: ErlNifUInt64) -> ERL_NIF_TERM;
    fn is_exception(env: *mut ErlNifEnv, term: ERL_NIF_TERM) -> c_int;
    fn make_reverse_list(env: *mut ErlNifEnv, term: ERL_NIF_TERM, list: *mut ERL_NIF_TERM) -> c_int;
    fn is_number(env: *mut ErlNifEnv, term: ERL_NIF_TERM) -> c_int;
    fn dlopen(
        lib: *const c_char,
        err_handler: Option<ErlNifDlErrorHandler>,
        err_arg: *mut c_void,
    ) -> *mut c_void;
    fn dlsym(
        handle: *mut c_void,
        symbol: *const c_char,
        err_handler: Option<ErlNifDlErrorHandler>,
        err_arg: *mut c_void,
    ) -> *mut c_void;
    fn consume_timeslice(env: *mut ErlNifEnv, percent: c_int) -> c_int;
    fn is_map(env: *mut ErlNifEnv, term: ERL_NIF_TERM) -> c_int;
    fn get_map_size(env: *mut ErlNifEnv, term: ERL_NIF_TERM, size: *mut usize) -> c_int;
    fn make_new_map(env: *mut ErlNifEnv) -> ERL_NIF_TERM;
    fn make_map_put(
        env: *mut ErlNifEnv,
        map_in: ERL_NIF_TERM,
        key: ERL_NIF_TERM,
        value: ERL_NIF_TERM,
        map_out: *mut ERL_NIF_TERM,
    ) -> c_int;
    fn get_map_value(
        env: *mut ErlNifEnv,
        map: ERL_NIF_TERM,
        key: ERL_NIF_TERM,
        value: *mut ERL_NIF_TERM,
    ) -> c_int;
    fn make_map_update(
        env: *mut ErlNifEnv,
        map_in: ERL_NIF_TERM,
        key: ERL_NIF_TERM,
        value: ERL_NIF_TERM,
        map_out: *mut ERL_NIF_TERM,
    ) -> c_int;
    fn make_map_remove(
        env: *mut ErlNifEnv,
        map_in: ERL_NIF_TERM,
        key: ERL_NIF_TERM,
        map_out: *mut ERL_NIF_TERM,
    ) -> c_int;
    fn map_iterator_create(
        env: *mut ErlNifEnv,
        map: ERL_NIF_TERM,
        iter: *mut ErlNifMapIterator,
        entry: ErlNifMapIteratorEntry,
    ) -> c_int;
    fn map_iterator_destroy(env: *mut ErlNifEnv, iter: *mut ErlNifMapIterator);
    fn map_iterator_is_head(env: *mut ErlNifEnv, iter: *mut ErlNifMapIterator) -> c_int;
    fn map_iterator_is_tail(env: *mut ErlNifEnv, iter: *mut ErlNifMapIterator) -> c_int;
    fn map_iterator_next(env: *mut ErlNifEnv, iter: *mut ErlNifMapIterator) -> c_int;
    fn map_iterator_prev(env: *mut ErlNifEnv, iter: *mut ErlNifMapIterator) -> c_int;
    fn map_iterator_get_pair(
        env: *mut ErlNifEnv,
        iter: *mut ErlNifMapIterator,
        key: *mut ERL_NIF_TERM,
        value: *mut ERL_NIF_TERM,
    ) -> c_int;
    /// Schedules `fp` to be called with `argv` in place of the running NIF.
    fn schedule_nif(
        env: *mut ErlNifEnv,
        fun_name: *const c_char,
        flags: c_int,
        fp: Option<ErlNifFunctionPtr>,
        argc: c_int,
        argv: *const ERL_NIF_TERM,
    ) -> ERL_NIF_TERM;
    fn has_pending_exception(env: *mut ErlNifEnv, reason: *mut ERL_NIF_TERM) -> c_int;
    fn raise_exception(env: *mut ErlNifEnv, reason: ERL_NIF_TERM) -> ERL_NIF_TERM;
    fn getenv(key: *const c_char, value: *mut c_char, value_size: *mut usize) -> c_int;
    fn monotonic_time(unit: ErlNifTimeUnit) -> ErlNifTime;
    fn time_offset(unit: ErlNifTimeUnit) -> ErlNifTime;
    fn convert_time_unit(val: ErlNifTime, from: ErlNifTimeUnit, to: ErlNifTimeUnit) -> ErlNifTime;
    fn now_time(env: *mut ErlNifEnv) -> ERL_NIF_TERM;
    fn cpu_time(env: *mut ErlNifEnv) -> ERL_NIF_TERM;
    fn make_unique_integer(env: *mut ErlNifEnv, properties: ErlNifUniqueInteger) -> ERL_NIF_TERM;
    fn is_current_process_alive(env: *mut ErlNifEnv) -> c_int;
    fn is_process_alive(env: *mut ErlNifEnv, pid: *mut ErlNifPid) -> c_int;
    fn is_port_alive(env: *mut ErlNifEnv, port_id: *mut ErlNifPort) -> c_int;
    fn get_local_port(env: *mut ErlNifEnv, term: ERL_NIF_TERM, port_id: *mut ErlNifPort) -> c_int;
    fn term_to_binary(env: *mut ErlNifEnv, term: ERL_NIF_TERM, bin: *mut ErlNifBinary) -> c_int;
    fn binary_to_term(
        env: *mut ErlNifEnv,
        data: *const u8,
        sz: usize,
        term: *mut ERL_NIF_TERM,
        opts: c_uint,
    ) -> usize;
    fn port_command(
        env: *mut ErlNifEnv,
        to_port: *const ErlNifPort,
        msg_env: *mut ErlNifEnv,
        msg: ERL_NIF_TERM,
    ) -> c_int;
    fn thread_type() -> c_int;
    @variadic fn snprintf(buffer: *mut c_char, size: usize, format: *const c_char) -> c_int;
    fn select(
        env: *mut ErlNifEnv,
        e: ErlNifEvent,
        flags: ErlNifSelectFlags,
        obj: *mut c_void,
        pid: *const ErlNifPid,
        reference: ERL_NIF_TERM,
    ) -> c_int;
    fn open_resource_type_x(
        env: *mut ErlNifEnv,
        name_str: *const c_char,
        init: *const ErlNifResourceTypeInit,
        flags: ErlNifResourceFlags,
        tried: *mut ErlNifResourceFlags,
    ) -> *mut ErlNifResourceType;
    fn monitor_process(
        env: *mut ErlNifEnv,
        obj: *mut c_void,
        pid: *const ErlNifPid,
        monitor: *mut ErlNifMonitor,
    ) -> c_int;
    fn demonitor_process(env: *mut ErlNifEnv, obj: *mut c_void, monitor: *const ErlNifMonitor) -> c_int;
    fn compare_monitors(a: *const ErlNifMonitor, b: *const ErlNifMonitor) -> c_int;
    fn hash(ty: ErlNifHash, term: ERL_NIF_TERM, salt: ErlNifUInt64) -> ErlNifUInt64;
    fn whereis_pid(env: *mut ErlNifEnv, name: ERL_NIF_TERM, pid: *mut ErlNifPid) -> c_int;
    fn whereis_port(env: *mut ErlNifEnv, name: ERL_NIF_TERM, port: *mut ErlNifPort) -> c_int;

    fn ioq_create(opts: ErlNifIOQueueOpts) -> *mut ErlNifIOQueue;
    fn ioq_destroy(q: *mut ErlNifIOQueue);
    fn ioq_enq_binary(q: *mut ErlNifIOQueue, bin: *mut ErlNifBinary, skip: usize) -> c_int;
    fn ioq_enqv(q: *mut ErlNifIOQueue, iov: *mut ErlNifIOVec, skip: usize) -> c_int;
    fn ioq_size(q: *mut ErlNifIOQueue) -> usize;
    fn ioq_deq(q: *mut ErlNifIOQueue, count: usize, size: *mut usize) -> c_int;
    fn ioq_peek(q: *mut ErlNifIOQueue, iovlen: *mut c_int) -> *mut SysIOVec;
    fn inspect_iovec(
        env: *mut ErlNifEnv,
        max_length: usize,
        iovec_term: ERL_NIF_TERM,
        tail: *mut ERL_NIF_TERM,
        iovec: *mut *mut ErlNifIOVec,
    ) -> c_int;
    fn free_iovec(iov: *mut ErlNifIOVec);
    fn ioq_peek_head(
        env: *mut ErlNifEnv,
        q: *mut ErlNifIOQueue,
        size: *mut usize,
        head: *mut ERL_NIF_TERM,
    ) -> c_int;
    fn mutex_name(mtx: *mut ErlNifMutex) -> *mut c_char;
    fn cond_name(cnd: *mut ErlNifCond) -> *mut c_char;
    fn rwlock_name(rwlck: *mut ErlNifRWLock) -> *mut c_char;
    fn thread_name(tid: ErlNifTid) -> *mut c_char;
    fn vfprintf(filep: *mut FILE, fmt: *const c_char, ap: va_list) -> c_int;
    fn vsnprintf(buffer: *mut c_char, size: usize, fmt: *const c_char, ap: va_list) -> c_int;
    fn make_map_from_arrays(
        env: *mut ErlNifEnv,
        keys: *mut ERL_NIF_TERM,
        values: *mut ERL_NIF_TERM,
        cnt: usize,
        map_out: *mut ERL_NIF_TERM,
    ) -> c_int;
    /// Like [`select`](Self::select), delivering `msg` from `msg_env`
    /// instead of the default notification.
    fn select_x(
        env: *mut ErlNifEnv,
        e: ErlNifEvent,
        flags: ErlNifSelectFlags,
        obj: *mut c_void,
        pid: *const ErlNifPid,
        msg: ERL_NIF_TERM,
        msg_env: *mut ErlNifEnv,
    ) -> c_int;
    fn make_monitor_term(env: *mut ErlNifEnv, monitor: *const ErlNifMonitor) -> ERL_NIF_TERM;
    fn set_pid_undefined(pid: *mut ErlNifPid);
    fn is_pid_undefined(pid: *const ErlNifPid) -> c_int;
    fn term_type(env: *mut ErlNifEnv, term: ERL_NIF_TERM) -> ErlNifTermType;
    fn init_resource_type(
        env: *mut ErlNifEnv,
        name_str: *const c_char,
        init: *const ErlNifResourceTypeInit,
        flags: ErlNifResourceFlags,
        tried: *mut ErlNifResourceFlags,
    ) -> *mut ErlNifResourceType;
    fn dynamic_resource_call(
        env: *mut ErlNifEnv,
        module: ERL_NIF_TERM,
        name: ERL_NIF_TERM,
        rsrc: ERL_NIF_TERM,
        call_data: *mut c_void,
    ) -> c_int;
    fn get_string_length(
        env: *mut ErlNifEnv,
        list: ERL_NIF_TERM,
        len: *mut c_uint,
        encoding: ErlNifCharEncoding,
    ) -> c_int;
    fn make_new_atom(
        env: *mut ErlNifEnv,
        name: *const c_char,
        atom: *mut ERL_NIF_TERM,
        encoding: ErlNifCharEncoding,
    ) -> c_int;
    fn make_new_atom_len(
        env: *mut ErlNifEnv,
        name: *const c_char,
        len: usize,
        atom: *mut ERL_NIF_TERM,
        encoding: ErlNifCharEncoding,
    ) -> c_int;
    /// Sets a module option. Option specific arguments follow `opt`.
    @variadic fn set_option(env: *mut ErlNifEnv, opt: ErlNifOption) -> c_int;
}

impl Session<'_, NifCallbacks> {
    /// Returns the NIF API of the session.
    #[must_use]
    pub fn api(&self) -> NifApi<'_> {
        NifApi::new(self.handle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::FunctionTable;

    #[test]
    fn test_catalog_matches_layout() {
        let catalog = NifCallbacks::catalog();
        assert_eq!(catalog.len(), NifCallbacks::SLOTS);
        for entry in catalog {
            assert!(entry.name().starts_with("enif_"), "{}", entry.name());
        }
    }

    #[test]
    fn test_first_and_last_slots() {
        assert_eq!(NifCallbacks::priv_data.index(), 0);
        assert_eq!(NifCallbacks::alloc.index(), 1);
        assert_eq!(NifCallbacks::free.index(), 2);
        assert_eq!(NifCallbacks::set_option.index(), NifCallbacks::SLOTS - 1);
    }

    #[test]
    fn test_keyword_entry_keeps_host_name() {
        let catalog = NifCallbacks::catalog();
        assert_eq!(catalog.slot_of("enif_self"), Some(NifCallbacks::self_.index()));
        assert_eq!(catalog.slot_of("enif_self_"), None);
    }

    #[test]
    fn test_variadic_entries() {
        let catalog = NifCallbacks::catalog();
        let variadic: Vec<_> = catalog
            .iter()
            .filter(|entry| entry.signature().is_variadic())
            .map(|entry| entry.name())
            .collect();
        assert_eq!(
            variadic,
            vec![
                "enif_make_tuple",
                "enif_make_list",
                "enif_fprintf",
                "enif_snprintf",
                "enif_set_option"
            ]
        );
    }

    #[test]
    fn test_signature_rendering() {
        let entry = NifCallbacks::catalog().entry("enif_alloc").unwrap();
        assert_eq!(entry.signature().to_string(), "fn(usize) -> *mut c_void");
        let entry = NifCallbacks::catalog().entry("enif_free").unwrap();
        assert_eq!(entry.signature().ret(), "()");
    }

    #[cfg(all(not(windows), target_pointer_width = "64"))]
    #[test]
    fn test_int64_slots_absent_with_64_bit_long() {
        assert!(NifCallbacks::catalog().slot_of("enif_get_int64").is_none());
    }
}
