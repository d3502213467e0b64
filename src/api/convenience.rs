//! Helpers layered over the raw catalog operations.
//!
//! The variadic term constructors cannot be forwarded from Rust. Tuples and
//! lists are built through the array-taking slots instead, either with a
//! fixed arity up to nine, from a slice, or with the
//! [`make_tuple!`](crate::make_tuple) and [`make_list!`](crate::make_list)
//! macros.

use std::ffi::{c_int, c_uint, c_void};

use cfg_if::cfg_if;

use super::NifApi;
use crate::{
    error::Result,
    ffi::{ERL_NIF_TERM, ErlNifEnv, ErlNifEvent, ErlNifPid},
    flags::SelectFlags,
};

macro_rules! fixed_arity {
    ($($tuple:ident, $list:ident, $n:literal => ($($term:ident),+);)*) => {
        impl NifApi<'_> {
            $(
                #[doc = concat!("Builds a tuple of ", stringify!($n), " terms.")]
                ///
                /// # Errors
                ///
                /// Fails if the session was unbound or the table does not
                /// provide `enif_make_tuple_from_array`.
                ///
                /// # Safety
                ///
                /// `env` must be a valid environment and every term must
                /// belong to it.
                #[allow(clippy::too_many_arguments)]
                pub unsafe fn $tuple(
                    &self,
                    env: *mut ErlNifEnv,
                    $($term: ERL_NIF_TERM),+
                ) -> Result<ERL_NIF_TERM> {
                    let terms = [$($term),+];
                    unsafe { self.make_tuple_from_array(env, terms.as_ptr(), $n) }
                }

                #[doc = concat!("Builds a list of ", stringify!($n), " terms, head first.")]
                ///
                /// # Errors
                ///
                /// Fails if the session was unbound or the table does not
                /// provide `enif_make_list_from_array`.
                ///
                /// # Safety
                ///
                /// `env` must be a valid environment and every term must
                /// belong to it.
                #[allow(clippy::too_many_arguments)]
                pub unsafe fn $list(
                    &self,
                    env: *mut ErlNifEnv,
                    $($term: ERL_NIF_TERM),+
                ) -> Result<ERL_NIF_TERM> {
                    let terms = [$($term),+];
                    unsafe { self.make_list_from_array(env, terms.as_ptr(), $n) }
                }
            )*
        }
    };
}

fixed_arity! {
    make_tuple1, make_list1, 1 => (e1);
    make_tuple2, make_list2, 2 => (e1, e2);
    make_tuple3, make_list3, 3 => (e1, e2, e3);
    make_tuple4, make_list4, 4 => (e1, e2, e3, e4);
    make_tuple5, make_list5, 5 => (e1, e2, e3, e4, e5);
    make_tuple6, make_list6, 6 => (e1, e2, e3, e4, e5, e6);
    make_tuple7, make_list7, 7 => (e1, e2, e3, e4, e5, e6, e7);
    make_tuple8, make_list8, 8 => (e1, e2, e3, e4, e5, e6, e7, e8);
    make_tuple9, make_list9, 9 => (e1, e2, e3, e4, e5, e6, e7, e8, e9);
}

impl NifApi<'_> {
    /// Builds a tuple of any number of terms.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IntegerOverflow`](crate::error::Error::IntegerOverflow)
    /// if there are more terms than the host accepts, otherwise fails like
    /// [`NifApi::make_tuple_from_array`].
    ///
    /// # Safety
    ///
    /// `env` must be a valid environment and every term must belong to it.
    pub unsafe fn make_tuple_from_slice(
        &self,
        env: *mut ErlNifEnv,
        terms: &[ERL_NIF_TERM],
    ) -> Result<ERL_NIF_TERM> {
        let count = c_uint::try_from(terms.len())?;
        unsafe { self.make_tuple_from_array(env, terms.as_ptr(), count) }
    }

    /// Builds a list of any number of terms, head first.
    ///
    /// # Errors
    ///
    /// See [`NifApi::make_tuple_from_slice`].
    ///
    /// # Safety
    ///
    /// `env` must be a valid environment and every term must belong to it.
    pub unsafe fn make_list_from_slice(
        &self,
        env: *mut ErlNifEnv,
        terms: &[ERL_NIF_TERM],
    ) -> Result<ERL_NIF_TERM> {
        let count = c_uint::try_from(terms.len())?;
        unsafe { self.make_list_from_array(env, terms.as_ptr(), count) }
    }

    /// Returns the term of a pid. Does not call into the host.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn make_pid(&self, pid: &ErlNifPid) -> ERL_NIF_TERM {
        pid.pid
    }

    /// Compares two pids the way [`NifApi::compare`] compares terms.
    ///
    /// # Errors
    ///
    /// Fails if the session was unbound or the table does not provide
    /// `enif_compare`.
    ///
    /// # Safety
    ///
    /// Both pids must have been obtained from the host.
    pub unsafe fn compare_pids(&self, a: &ErlNifPid, b: &ErlNifPid) -> Result<c_int> {
        unsafe { self.compare(a.pid, b.pid) }
    }

    /// Selects on `event` becoming readable, delivering `msg` when it does.
    ///
    /// # Errors
    ///
    /// Fails if the session was unbound or the table does not provide
    /// `enif_select_x`.
    ///
    /// # Safety
    ///
    /// Same contract as [`NifApi::select_x`].
    pub unsafe fn select_read(
        &self,
        env: *mut ErlNifEnv,
        event: ErlNifEvent,
        obj: *mut c_void,
        pid: *const ErlNifPid,
        msg: ERL_NIF_TERM,
        msg_env: *mut ErlNifEnv,
    ) -> Result<c_int> {
        let mode = SelectFlags::READ | SelectFlags::CUSTOM_MSG;
        unsafe { self.select_x(env, event, mode.bits(), obj, pid, msg, msg_env) }
    }

    /// Selects on `event` becoming writable, delivering `msg` when it does.
    ///
    /// # Errors
    ///
    /// See [`NifApi::select_read`].
    ///
    /// # Safety
    ///
    /// Same contract as [`NifApi::select_x`].
    pub unsafe fn select_write(
        &self,
        env: *mut ErlNifEnv,
        event: ErlNifEvent,
        obj: *mut c_void,
        pid: *const ErlNifPid,
        msg: ERL_NIF_TERM,
        msg_env: *mut ErlNifEnv,
    ) -> Result<c_int> {
        let mode = SelectFlags::WRITE | SelectFlags::CUSTOM_MSG;
        unsafe { self.select_x(env, event, mode.bits(), obj, pid, msg, msg_env) }
    }

    /// Selects on `event` reporting an error, delivering `msg` when it does.
    ///
    /// # Errors
    ///
    /// See [`NifApi::select_read`].
    ///
    /// # Safety
    ///
    /// Same contract as [`NifApi::select_x`].
    pub unsafe fn select_error(
        &self,
        env: *mut ErlNifEnv,
        event: ErlNifEvent,
        obj: *mut c_void,
        pid: *const ErlNifPid,
        msg: ERL_NIF_TERM,
        msg_env: *mut ErlNifEnv,
    ) -> Result<c_int> {
        let mode = SelectFlags::ERROR | SelectFlags::CUSTOM_MSG;
        unsafe { self.select_x(env, event, mode.bits(), obj, pid, msg, msg_env) }
    }
}

cfg_if! {
    // With a 64-bit `long` the host has no separate 64-bit integer slots.
    if #[cfg(not(any(windows, target_pointer_width = "32")))] {
        use crate::ffi::{ErlNifSInt64, ErlNifUInt64};

        impl NifApi<'_> {
            /// Reads a 64-bit signed integer through `enif_get_long`.
            ///
            /// # Errors
            ///
            /// Fails if the session was unbound or the table does not
            /// provide `enif_get_long`.
            ///
            /// # Safety
            ///
            /// Same contract as [`NifApi::get_long`].
            pub unsafe fn get_int64(
                &self,
                env: *mut ErlNifEnv,
                term: ERL_NIF_TERM,
                ip: *mut ErlNifSInt64,
            ) -> Result<c_int> {
                unsafe { self.get_long(env, term, ip.cast()) }
            }

            /// Reads a 64-bit unsigned integer through `enif_get_ulong`.
            ///
            /// # Errors
            ///
            /// Fails if the session was unbound or the table does not
            /// provide `enif_get_ulong`.
            ///
            /// # Safety
            ///
            /// Same contract as [`NifApi::get_ulong`].
            pub unsafe fn get_uint64(
                &self,
                env: *mut ErlNifEnv,
                term: ERL_NIF_TERM,
                ip: *mut ErlNifUInt64,
            ) -> Result<c_int> {
                unsafe { self.get_ulong(env, term, ip.cast()) }
            }

            /// Makes a 64-bit signed integer through `enif_make_long`.
            ///
            /// # Errors
            ///
            /// Fails if the session was unbound or the table does not
            /// provide `enif_make_long`.
            ///
            /// # Safety
            ///
            /// `env` must be a valid environment.
            pub unsafe fn make_int64(&self, env: *mut ErlNifEnv, i: ErlNifSInt64) -> Result<ERL_NIF_TERM> {
                unsafe { self.make_long(env, i) }
            }

            /// Makes a 64-bit unsigned integer through `enif_make_ulong`.
            ///
            /// # Errors
            ///
            /// Fails if the session was unbound or the table does not
            /// provide `enif_make_ulong`.
            ///
            /// # Safety
            ///
            /// `env` must be a valid environment.
            pub unsafe fn make_uint64(&self, env: *mut ErlNifEnv, i: ErlNifUInt64) -> Result<ERL_NIF_TERM> {
                unsafe { self.make_ulong(env, i) }
            }
        }
    }
}
