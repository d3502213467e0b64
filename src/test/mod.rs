//! Fake hosts for the unit tests.

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use std::{
    alloc::{Layout, alloc, dealloc, realloc},
    cell::RefCell,
    ffi::{c_int, c_long, c_uint, c_ulong, c_void},
    ptr, slice,
};

use crate::{
    api::NifCallbacks,
    builders::TableBuilder,
    dispatch_table,
    ffi::{ERL_NIF_TERM, ErlNifEnv, ErlNifEvent, ErlNifPid, ErlNifSelectFlags},
    table::{DispatchTable, FunctionTable},
};

dispatch_table! {
    /// Three slot table.
    pub struct SmallTable;
    /// API of [`SmallTable`].
    pub struct SmallApi;
    prefix = "small_";

    fn answer() -> i32;
    fn add(a: i32, b: i32) -> i32;
    fn negate(x: i32) -> i32;
}

pub unsafe extern "C" fn host_answer() -> i32 {
    42
}

pub unsafe extern "C" fn host_add(a: i32, b: i32) -> i32 {
    a.wrapping_add(b)
}

pub unsafe extern "C" fn host_negate(x: i32) -> i32 {
    x.wrapping_neg()
}

/// Fully populated [`SmallTable`] built at `version`.
pub fn small_table(version: usize) -> DispatchTable<SmallTable> {
    TableBuilder::from_functions(SmallTable {
        answer: Some(host_answer),
        add: Some(host_add),
        negate: Some(host_negate),
    })
    .build_with_version(version)
    .expect("version within the layout")
}

/// Byte fresh allocations of the fake host are filled with.
pub const GARBAGE: u8 = 0xAB;
/// Base of the terms returned for tuples, plus the arity.
pub const TUPLE_TAG: ERL_NIF_TERM = 0x1000;
/// Base of the terms returned for lists, plus the length.
pub const LIST_TAG: ERL_NIF_TERM = 0x2000;

const HEADER: usize = 16;

thread_local! {
    static LAST_TERMS: RefCell<Vec<ERL_NIF_TERM>> = const { RefCell::new(Vec::new()) };
}

/// Terms passed to the last tuple or list constructor on this thread.
pub fn last_terms() -> Vec<ERL_NIF_TERM> {
    LAST_TERMS.with(|terms| terms.borrow().clone())
}

fn layout(size: usize) -> Option<Layout> {
    Layout::from_size_align(size.checked_add(HEADER)?, HEADER).ok()
}

unsafe extern "C" fn fake_alloc(size: usize) -> *mut c_void {
    let Some(layout) = layout(size) else {
        return ptr::null_mut();
    };
    unsafe {
        let base = alloc(layout);
        if base.is_null() {
            return ptr::null_mut();
        }
        base.cast::<usize>().write(size);
        let block = base.add(HEADER);
        ptr::write_bytes(block, GARBAGE, size);
        block.cast()
    }
}

unsafe extern "C" fn fake_free(block: *mut c_void) {
    if block.is_null() {
        return;
    }
    unsafe {
        let base = block.cast::<u8>().sub(HEADER);
        let size = base.cast::<usize>().read();
        dealloc(base, layout(size).expect("layout of a live block"));
    }
}

unsafe extern "C" fn fake_realloc(block: *mut c_void, size: usize) -> *mut c_void {
    if block.is_null() {
        return unsafe { fake_alloc(size) };
    }
    let Some(new_size) = size.checked_add(HEADER) else {
        return ptr::null_mut();
    };
    unsafe {
        let base = block.cast::<u8>().sub(HEADER);
        let old = base.cast::<usize>().read();
        let base = realloc(base, layout(old).expect("layout of a live block"), new_size);
        if base.is_null() {
            return ptr::null_mut();
        }
        base.cast::<usize>().write(size);
        base.add(HEADER).cast()
    }
}

fn record(arr: *const ERL_NIF_TERM, cnt: c_uint) {
    let terms = unsafe { slice::from_raw_parts(arr, cnt as usize) };
    LAST_TERMS.with(|last| *last.borrow_mut() = terms.to_vec());
}

unsafe extern "C" fn fake_make_tuple_from_array(
    _env: *mut ErlNifEnv,
    arr: *const ERL_NIF_TERM,
    cnt: c_uint,
) -> ERL_NIF_TERM {
    record(arr, cnt);
    TUPLE_TAG + cnt as usize
}

unsafe extern "C" fn fake_make_list_from_array(
    _env: *mut ErlNifEnv,
    arr: *const ERL_NIF_TERM,
    cnt: c_uint,
) -> ERL_NIF_TERM {
    record(arr, cnt);
    LIST_TAG + cnt as usize
}

unsafe extern "C" fn fake_compare(lhs: ERL_NIF_TERM, rhs: ERL_NIF_TERM) -> c_int {
    match lhs.cmp(&rhs) {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }
}

unsafe extern "C" fn fake_select_x(
    _env: *mut ErlNifEnv,
    _event: ErlNifEvent,
    flags: ErlNifSelectFlags,
    _obj: *mut c_void,
    _pid: *const ErlNifPid,
    _msg: ERL_NIF_TERM,
    _msg_env: *mut ErlNifEnv,
) -> c_int {
    flags
}

unsafe extern "C" fn fake_make_long(_env: *mut ErlNifEnv, i: c_long) -> ERL_NIF_TERM {
    i as ERL_NIF_TERM
}

unsafe extern "C" fn fake_get_long(_env: *mut ErlNifEnv, term: ERL_NIF_TERM, ip: *mut c_long) -> c_int {
    unsafe { ip.write(term as c_long) };
    1
}

unsafe extern "C" fn fake_make_ulong(_env: *mut ErlNifEnv, i: c_ulong) -> ERL_NIF_TERM {
    i as ERL_NIF_TERM
}

unsafe extern "C" fn fake_get_ulong(_env: *mut ErlNifEnv, term: ERL_NIF_TERM, ip: *mut c_ulong) -> c_int {
    unsafe { ip.write(term as c_ulong) };
    1
}

unsafe extern "C" fn unsupported() {
    std::process::abort();
}

/// A [`NifCallbacks`] table with a handful of working operations. Every
/// other slot aborts when called.
pub fn nif_table() -> DispatchTable<NifCallbacks> {
    let mut builder = TableBuilder::<NifCallbacks>::new()
        .populate(NifCallbacks::alloc, fake_alloc)
        .and_then(|b| b.populate(NifCallbacks::realloc, fake_realloc))
        .and_then(|b| b.populate(NifCallbacks::free, fake_free))
        .and_then(|b| b.populate(NifCallbacks::make_tuple_from_array, fake_make_tuple_from_array))
        .and_then(|b| b.populate(NifCallbacks::make_list_from_array, fake_make_list_from_array))
        .and_then(|b| b.populate(NifCallbacks::compare, fake_compare))
        .and_then(|b| b.populate(NifCallbacks::select_x, fake_select_x))
        .and_then(|b| b.populate(NifCallbacks::make_long, fake_make_long))
        .and_then(|b| b.populate(NifCallbacks::get_long, fake_get_long))
        .and_then(|b| b.populate(NifCallbacks::make_ulong, fake_make_ulong))
        .and_then(|b| b.populate(NifCallbacks::get_ulong, fake_get_ulong))
        .expect("distinct slots");

    for index in 0..NifCallbacks::SLOTS {
        if !builder.is_populated(index) {
            builder = unsafe { builder.populate_raw(index, unsupported) }.expect("slot in range");
        }
    }

    builder.build().expect("every slot populated")
}
