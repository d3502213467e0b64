//! Flags and bit-valued options passed to and from the host.

use bitflags::bitflags;

use crate::ffi::{
    ERL_NIF_RT_CREATE, ERL_NIF_RT_TAKEOVER, ERL_NIF_SELECT_CANCEL, ERL_NIF_SELECT_CUSTOM_MSG,
    ERL_NIF_SELECT_ERROR, ERL_NIF_SELECT_READ, ERL_NIF_SELECT_STOP, ERL_NIF_SELECT_WRITE,
    ERL_NIF_UNIQUE_MONOTONIC, ERL_NIF_UNIQUE_POSITIVE,
};

bitflags! {
    /// Modes accepted by `enif_select` and returned in its status.
    ///
    /// ```
    /// use ext_nif_rs::flags::SelectFlags;
    ///
    /// let mode = SelectFlags::READ | SelectFlags::CUSTOM_MSG;
    /// assert!(mode.contains(SelectFlags::READ));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SelectFlags: i32 {
        /// Notify when the event becomes readable.
        const READ       = ERL_NIF_SELECT_READ;
        /// Notify when the event becomes writable.
        const WRITE      = ERL_NIF_SELECT_WRITE;
        /// Stop selecting on the event.
        const STOP       = ERL_NIF_SELECT_STOP;
        /// Cancel a pending selection.
        const CANCEL     = ERL_NIF_SELECT_CANCEL;
        /// Deliver a caller supplied message instead of the default one.
        const CUSTOM_MSG = ERL_NIF_SELECT_CUSTOM_MSG;
        /// Notify when the event reports an error.
        const ERROR      = ERL_NIF_SELECT_ERROR;
    }
}

bitflags! {
    /// How a resource type is opened.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceFlags: i32 {
        /// Create a new resource type.
        const CREATE   = ERL_NIF_RT_CREATE;
        /// Take over an existing resource type on upgrade.
        const TAKEOVER = ERL_NIF_RT_TAKEOVER;
    }
}

bitflags! {
    /// Properties requested from `enif_make_unique_integer`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UniqueInteger: i32 {
        /// Only positive integers.
        const POSITIVE  = ERL_NIF_UNIQUE_POSITIVE;
        /// Strictly increasing in creation order.
        const MONOTONIC = ERL_NIF_UNIQUE_MONOTONIC;
    }
}

bitflags! {
    /// Options the host sets in a [`LoadRecord`](crate::negotiation::LoadRecord).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LoadFlags: u32 {
        /// Turn use-after-unload and version mismatches into panics.
        const ESCALATE = 1 << 0;
    }
}
