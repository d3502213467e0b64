//! Builders for host side structures.

mod table;

pub use table::TableBuilder;
