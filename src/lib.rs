#![doc = include_str!("../README.md")]
#![deny(clippy::unwrap_used)]
#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![warn(clippy::pedantic)]
#![cfg_attr(docs, feature(doc_cfg))]

pub mod alloc;
pub mod api;
pub mod builders;
pub mod catalog;
pub mod error;
pub mod ffi;
pub mod flags;
pub mod loader;
#[macro_use]
pub mod macros;
pub mod negotiation;
pub mod session;
pub mod table;
#[cfg(test)]
pub mod test;

// Re-export once_cell for use by macros
#[doc(hidden)]
pub use once_cell;

/// A module typically glob-imported containing the typically required macros
/// and imports.
pub mod prelude {
    pub use crate::alloc::HostAllocator;
    pub use crate::api::{NifApi, NifCallbacks};
    pub use crate::builders::TableBuilder;
    pub use crate::error::{Error, Result};
    pub use crate::loader::{Loader, LoaderConfig};
    pub use crate::negotiation::{LoadRecord, PluginInfo};
    pub use crate::session::{Handle, Session, SessionSlot, SessionState};
    pub use crate::table::{DispatchTable, FunctionTable, Slot, TableRef};
    pub use crate::{dispatch_table, make_list, make_tuple, nif_plugin};
}

/// `ext-nif-rs` version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
