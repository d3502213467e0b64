use std::{fmt::Debug, slice};

use log::{debug, trace, warn};

use crate::{
    error::{Error, Result},
    table::{DispatchTable, FunctionTable, RawFn, Slot, erase},
};

/// Builds a [`DispatchTable`] on the host side. Every slot is populated
/// exactly once before the table is handed to any plugin.
///
/// ```rust
/// use ext_nif_rs::{builders::TableBuilder, dispatch_table};
///
/// dispatch_table! {
///     pub struct Callbacks;
///     pub struct Api;
///     prefix = "demo_";
///
///     fn answer() -> i32;
/// }
///
/// unsafe extern "C" fn answer() -> i32 {
///     42
/// }
///
/// let table = TableBuilder::<Callbacks>::new()
///     .populate(Callbacks::answer, answer)
///     .unwrap()
///     .build()
///     .unwrap();
/// assert_eq!(table.version(), 1);
/// ```
#[must_use]
pub struct TableBuilder<T: FunctionTable> {
    functions: Box<T>,
}

impl<T: FunctionTable> TableBuilder<T> {
    /// Creates a builder with every slot unpopulated.
    pub fn new() -> Self {
        Self {
            functions: Box::new(T::empty()),
        }
    }

    /// Creates a builder from a struct the host filled in directly.
    ///
    /// # Arguments
    ///
    /// * `functions` - The table, populated slots set to `Some`.
    pub fn from_functions(functions: T) -> Self {
        Self {
            functions: Box::new(functions),
        }
    }

    /// Binds a function to a slot.
    ///
    /// # Arguments
    ///
    /// * `slot` - The slot to bind.
    /// * `function` - The host implementation of the operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyPopulated`] if the slot is already bound.
    pub fn populate<F: Copy>(self, slot: Slot<T, F>, function: F) -> Result<Self> {
        self.set(slot.index(), erase(function))
    }

    /// Binds a raw function address to the slot at `index`. Used for host
    /// functions written in other languages and for variadic operations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SlotOutOfRange`] if `index` is not a slot of the table
    /// and [`Error::AlreadyPopulated`] if the slot is already bound.
    ///
    /// # Safety
    ///
    /// `raw` must be a function with the signature of the slot at `index`.
    pub unsafe fn populate_raw(self, index: usize, raw: RawFn) -> Result<Self> {
        self.set(index, raw)
    }

    /// Returns true if the slot at `index` is bound.
    #[must_use]
    pub fn is_populated(&self, index: usize) -> bool {
        matches!(self.slots().get(index), Some(Some(_)))
    }

    /// Builds a table of version `T::SLOTS`.
    ///
    /// # Errors
    ///
    /// See [`TableBuilder::build_with_version`].
    pub fn build(self) -> Result<DispatchTable<T>> {
        self.build_with_version(T::SLOTS)
    }

    /// Builds a table providing the first `version` slots. Slots past the
    /// version are cleared.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SlotOutOfRange`] if `version` is larger than the
    /// table, or [`Error::UnpopulatedSlot`] for the first slot below
    /// `version` that was never bound.
    pub fn build_with_version(mut self, version: usize) -> Result<DispatchTable<T>> {
        if version > T::SLOTS {
            return Err(Error::SlotOutOfRange {
                slot: version,
                slots: T::SLOTS,
            });
        }

        if let Some(slot) = self.slots()[..version].iter().position(Option::is_none) {
            return Err(Error::UnpopulatedSlot {
                slot,
                name: slot_name::<T>(slot).to_string(),
            });
        }

        for entry in &mut self.slots_mut()[version..] {
            *entry = None;
        }

        debug!("Built dispatch table with {version} of {} slots", T::SLOTS);
        Ok(DispatchTable::from_parts(self.functions, version))
    }

    fn set(mut self, index: usize, raw: RawFn) -> Result<Self> {
        let entry = self
            .slots_mut()
            .get_mut(index)
            .ok_or(Error::SlotOutOfRange {
                slot: index,
                slots: T::SLOTS,
            })?;

        if entry.is_some() {
            warn!(
                "Refusing to overwrite slot {index} (`{}`)",
                slot_name::<T>(index)
            );
            return Err(Error::AlreadyPopulated { slot: index });
        }

        *entry = Some(raw);
        trace!("Populated slot {index} (`{}`)", slot_name::<T>(index));
        Ok(self)
    }

    fn slots(&self) -> &[Option<RawFn>] {
        // SAFETY: `T` is exactly `SLOTS` optional function pointers.
        unsafe { slice::from_raw_parts((&raw const *self.functions).cast(), T::SLOTS) }
    }

    fn slots_mut(&mut self) -> &mut [Option<RawFn>] {
        // SAFETY: see `slots`.
        unsafe { slice::from_raw_parts_mut((&raw mut *self.functions).cast(), T::SLOTS) }
    }
}

impl<T: FunctionTable> Default for TableBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FunctionTable> Debug for TableBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let populated = self.slots().iter().filter(|slot| slot.is_some()).count();
        f.debug_struct("TableBuilder")
            .field("populated", &populated)
            .field("slots", &T::SLOTS)
            .finish()
    }
}

fn slot_name<T: FunctionTable>(index: usize) -> &'static str {
    T::catalog().get(index).map_or("<unknown>", |entry| entry.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{SmallTable, host_add, host_answer, host_negate};

    #[test]
    fn test_build_full_table() {
        let table = TableBuilder::<SmallTable>::new()
            .populate(SmallTable::answer, host_answer)
            .unwrap()
            .populate(SmallTable::add, host_add)
            .unwrap()
            .populate(SmallTable::negate, host_negate)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(table.version(), 3);
    }

    #[test]
    fn test_populate_twice() {
        let err = TableBuilder::<SmallTable>::new()
            .populate(SmallTable::add, host_add)
            .unwrap()
            .populate(SmallTable::add, host_add)
            .unwrap_err();
        assert_eq!(err, Error::AlreadyPopulated { slot: 1 });
    }

    #[test]
    fn test_unpopulated_slot_is_reported() {
        let err = TableBuilder::<SmallTable>::new()
            .populate(SmallTable::answer, host_answer)
            .unwrap()
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            Error::UnpopulatedSlot {
                slot: 1,
                name: "small_add".into()
            }
        );
    }

    #[test]
    fn test_build_with_version_clears_tail() {
        let table = TableBuilder::from_functions(SmallTable {
            answer: Some(host_answer),
            add: Some(host_add),
            negate: Some(host_negate),
        })
        .build_with_version(2)
        .unwrap();
        assert_eq!(table.version(), 2);
        assert!(table.functions().negate.is_none());
    }

    #[test]
    fn test_version_out_of_range() {
        let err = TableBuilder::<SmallTable>::new()
            .build_with_version(4)
            .unwrap_err();
        assert_eq!(err, Error::SlotOutOfRange { slot: 4, slots: 3 });
    }

    #[test]
    fn test_populate_raw_out_of_range() {
        unsafe extern "C" fn nothing() {}

        let builder = TableBuilder::<SmallTable>::new();
        let err = unsafe { builder.populate_raw(3, nothing) }.unwrap_err();
        assert_eq!(err, Error::SlotOutOfRange { slot: 3, slots: 3 });
    }

    #[test]
    fn test_is_populated() {
        let builder = TableBuilder::<SmallTable>::new()
            .populate(SmallTable::negate, host_negate)
            .unwrap();
        assert!(builder.is_populated(2));
        assert!(!builder.is_populated(0));
        assert!(!builder.is_populated(7));
    }
}
