//! Dispatch tables: host populated structs of function pointers, and the
//! bounds-limited views plugins resolve their calls through.

use std::{fmt::Debug, marker::PhantomData, mem, slice};

use crate::{
    builders::TableBuilder,
    catalog::Catalog,
    error::{Error, Result},
};

/// Type-erased function pointer stored in every slot.
pub type RawFn = unsafe extern "C" fn();

/// A `#[repr(C)]` struct of function pointers laid out in catalog order.
///
/// Implemented by [`dispatch_table!`](crate::dispatch_table).
///
/// # Safety
///
/// The implementor must be `#[repr(C)]` and consist of exactly
/// [`SLOTS`](FunctionTable::SLOTS) fields, each an optional
/// `unsafe extern "C"` function pointer, declared in the order of the
/// entries of [`catalog`](FunctionTable::catalog).
pub unsafe trait FunctionTable: Sized + Send + Sync + 'static {
    /// Number of slots in the table layout.
    const SLOTS: usize;

    /// Returns the catalog describing every slot.
    fn catalog() -> &'static Catalog;

    /// Returns a table with every slot unpopulated.
    fn empty() -> Self;
}

/// A typed descriptor of a single slot of the table `T`, calling through a
/// function pointer of type `F`.
pub struct Slot<T, F> {
    index: usize,
    name: &'static str,
    _marker: PhantomData<(fn() -> T, F)>,
}

impl<T, F> Slot<T, F> {
    /// Creates a slot descriptor.
    ///
    /// # Safety
    ///
    /// `index` must be a slot of `T` whose function pointer has exactly the
    /// type `F`.
    #[must_use]
    pub const unsafe fn new(index: usize, name: &'static str) -> Self {
        Self {
            index,
            name,
            _marker: PhantomData,
        }
    }

    /// Slot index in the catalog.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Stable name of the operation.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T, F> Clone for Slot<T, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, F> Copy for Slot<T, F> {}

impl<T, F> Debug for Slot<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("index", &self.index)
            .field("name", &self.name)
            .finish()
    }
}

/// Converts a typed function pointer into its stored form.
pub(crate) fn erase<F: Copy>(function: F) -> RawFn {
    const { assert!(mem::size_of::<F>() == mem::size_of::<RawFn>()) };
    // SAFETY: `F` is a function pointer type of the same size.
    unsafe { mem::transmute_copy(&function) }
}

/// An immutable, populated dispatch table owned by the host.
///
/// Created through [`TableBuilder`]. Slots `0..version()` are guaranteed to
/// hold valid function pointers, every later slot is empty.
pub struct DispatchTable<T: FunctionTable> {
    functions: Box<T>,
    version: usize,
}

impl<T: FunctionTable> DispatchTable<T> {
    pub(crate) fn from_parts(functions: Box<T>, version: usize) -> Self {
        Self { functions, version }
    }

    /// Creates a new table builder.
    #[must_use]
    pub fn builder() -> TableBuilder<T> {
        TableBuilder::new()
    }

    /// Number of populated slots.
    #[must_use]
    pub fn version(&self) -> usize {
        self.version
    }

    /// Returns true if the slot at `index` may be called.
    #[must_use]
    pub fn is_available(&self, index: usize) -> bool {
        index < self.version
    }

    /// The populated struct, as handed to plugins.
    #[must_use]
    pub fn functions(&self) -> &T {
        &self.functions
    }

    /// Pointer to the populated struct. Valid for as long as the table lives.
    #[must_use]
    pub fn as_ptr(&self) -> *const T {
        &raw const *self.functions
    }

    /// Returns a view over the populated slots.
    #[must_use]
    pub fn table_ref(&self) -> TableRef<'_, T> {
        TableRef::new(&self.functions, self.version)
    }
}

impl<T: FunctionTable> Debug for DispatchTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("version", &self.version)
            .field("slots", &T::SLOTS)
            .finish_non_exhaustive()
    }
}

/// A borrowed view over the usable prefix of a dispatch table.
///
/// A plugin compiled against a catalog of `S` slots sees `min(provided, S)`
/// slots, whatever size the host's table actually has. Slots past the view
/// are never read.
pub struct TableRef<'t, T> {
    slots: &'t [Option<RawFn>],
    provided: usize,
    _table: PhantomData<&'t T>,
}

impl<'t, T: FunctionTable> TableRef<'t, T> {
    /// Creates a view over a table the caller owns.
    ///
    /// # Arguments
    ///
    /// * `table` - The populated table.
    /// * `provided` - The version reported for the table.
    #[must_use]
    pub fn new(table: &'t T, provided: usize) -> Self {
        // SAFETY: `T` is exactly `SLOTS` pointer-sized optional function
        // pointers.
        unsafe { Self::from_parts(&raw const *table, provided) }
    }

    /// Creates a view over a table handed over by the host.
    ///
    /// # Arguments
    ///
    /// * `table` - Pointer to the first slot of the host's table.
    /// * `provided` - The number of slots the host populated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPointer`] if `table` is null.
    ///
    /// # Safety
    ///
    /// `table` must point to at least `min(provided, T::SLOTS)` slots laid
    /// out in the order of `T`'s catalog, each holding null or a function of
    /// that slot's signature, valid and unchanged for `'t`.
    pub unsafe fn from_raw(table: *const T, provided: usize) -> Result<Self> {
        if table.is_null() {
            return Err(Error::InvalidPointer);
        }
        Ok(unsafe { Self::from_parts(table, provided) })
    }

    unsafe fn from_parts(table: *const T, provided: usize) -> Self {
        let len = provided.min(T::SLOTS);
        Self {
            slots: unsafe { slice::from_raw_parts(table.cast::<Option<RawFn>>(), len) },
            provided,
            _table: PhantomData,
        }
    }

    /// Number of slots that may be called.
    #[must_use]
    pub fn version(&self) -> usize {
        self.slots.len()
    }

    /// Version reported by the host, which may exceed the slots known to
    /// this catalog.
    #[must_use]
    pub fn provided_version(&self) -> usize {
        self.provided
    }

    /// Returns true if the slot at `index` holds a callable function.
    #[must_use]
    pub fn supports(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Some(_)))
    }

    /// Resolves a slot to its function pointer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnboundSlot`] if the slot is at or past the version of
    /// the view, or the host left it empty.
    pub fn resolve<F: Copy>(&self, slot: Slot<T, F>) -> Result<F> {
        const { assert!(mem::size_of::<F>() == mem::size_of::<RawFn>()) };

        let raw = self
            .slots
            .get(slot.index())
            .copied()
            .flatten()
            .ok_or(Error::UnboundSlot {
                slot: slot.index(),
                version: self.version(),
            })?;
        // SAFETY: `Slot<T, F>` guarantees `F` is the type of this slot.
        Ok(unsafe { mem::transmute_copy::<RawFn, F>(&raw) })
    }

    /// Resolves a slot and hands the function pointer to `call`.
    ///
    /// # Errors
    ///
    /// See [`TableRef::resolve`].
    pub fn invoke<F: Copy, R>(&self, slot: Slot<T, F>, call: impl FnOnce(F) -> R) -> Result<R> {
        self.resolve(slot).map(call)
    }
}

impl<T> Clone for TableRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TableRef<'_, T> {}

impl<T> Debug for TableRef<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRef")
            .field("version", &self.slots.len())
            .field("provided", &self.provided)
            .finish()
    }
}
