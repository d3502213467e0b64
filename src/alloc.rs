//! Functions relating to the host allocator.
//!
//! Native libraries bundled into a plugin often take a set of allocation
//! functions. [`HostAllocator`] routes them to the host's allocator through
//! the session's table.

use std::{ffi::c_void, ptr};

use crate::{
    api::NifApi,
    error::{Error, Result},
};

/// Allocation functions backed by `enif_alloc`, `enif_realloc` and
/// `enif_free`.
#[derive(Debug, Clone, Copy)]
pub struct HostAllocator<'s> {
    api: NifApi<'s>,
}

impl<'s> HostAllocator<'s> {
    /// Creates an allocator calling through `api`.
    #[must_use]
    pub fn new(api: NifApi<'s>) -> Self {
        Self { api }
    }

    /// Allocates `size` bytes. The contents are unspecified.
    ///
    /// # Errors
    ///
    /// Fails if the session was unbound or the table does not provide
    /// `enif_alloc`. A host out of memory returns a null pointer instead.
    pub fn alloc(&self, size: usize) -> Result<*mut c_void> {
        unsafe { self.api.alloc(size) }
    }

    /// Allocates `count * size` zeroed bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IntegerOverflow`] if `count * size` does not fit into
    /// a `usize`, otherwise fails like [`HostAllocator::alloc`].
    pub fn calloc(&self, count: usize, size: usize) -> Result<*mut c_void> {
        let total = count.checked_mul(size).ok_or(Error::IntegerOverflow)?;
        let ptr = self.alloc(total)?;
        if !ptr.is_null() {
            unsafe { ptr::write_bytes(ptr.cast::<u8>(), 0, total) };
        }
        Ok(ptr)
    }

    /// Resizes a block, keeping its contents up to the smaller size.
    ///
    /// # Errors
    ///
    /// Fails if the session was unbound or the table does not provide
    /// `enif_realloc`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block from this allocator.
    pub unsafe fn realloc(&self, ptr: *mut c_void, size: usize) -> Result<*mut c_void> {
        unsafe { self.api.realloc(ptr, size) }
    }

    /// Frees a block.
    ///
    /// # Errors
    ///
    /// Fails if the session was unbound or the table does not provide
    /// `enif_free`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block from this allocator.
    pub unsafe fn free(&self, ptr: *mut c_void) -> Result<()> {
        unsafe { self.api.free(ptr) }
    }
}

impl<'s> From<NifApi<'s>> for HostAllocator<'s> {
    fn from(api: NifApi<'s>) -> Self {
        Self::new(api)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        session::{Session, SessionCell},
        test::{GARBAGE, nif_table},
    };

    #[test]
    fn test_calloc_zeroes() {
        let table = nif_table();
        let cell = SessionCell::new();
        let session = Session::bind(table.table_ref(), &cell, 0).unwrap();
        let allocator = HostAllocator::new(session.api());

        let raw = allocator.alloc(16).unwrap();
        let bytes = unsafe { std::slice::from_raw_parts(raw.cast::<u8>(), 16) };
        assert!(bytes.iter().all(|b| *b == GARBAGE));
        unsafe { allocator.free(raw) }.unwrap();

        let zeroed = allocator.calloc(4, 8).unwrap();
        let bytes = unsafe { std::slice::from_raw_parts(zeroed.cast::<u8>(), 32) };
        assert!(bytes.iter().all(|b| *b == 0));

        let grown = unsafe { allocator.realloc(zeroed, 64) }.unwrap();
        let bytes = unsafe { std::slice::from_raw_parts(grown.cast::<u8>(), 32) };
        assert!(bytes.iter().all(|b| *b == 0));
        unsafe { allocator.free(grown) }.unwrap();
    }

    #[test]
    fn test_calloc_overflow() {
        let table = nif_table();
        let cell = SessionCell::new();
        let session = Session::bind(table.table_ref(), &cell, 0).unwrap();
        let allocator = HostAllocator::from(session.api());

        assert_eq!(allocator.calloc(usize::MAX, 2), Err(Error::IntegerOverflow));
        assert!(allocator.calloc(0, 8).is_ok());
    }

    #[test]
    fn test_alloc_after_unbind() {
        let table = nif_table();
        let cell = SessionCell::new();
        let session = Session::bind(table.table_ref(), &cell, 0).unwrap();
        let allocator = HostAllocator::new(session.api());
        session.unbind();

        assert!(matches!(
            allocator.alloc(8),
            Err(Error::UseAfterUnload { .. })
        ));
    }
}
