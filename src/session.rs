//! Plugin sessions: the binding between a plugin and the table it was handed
//! at load time.
//!
//! There is no process-wide "current table". A plugin receives a [`Session`]
//! in its init function and passes it, or a [`Handle`] borrowed from it, to
//! everything that calls into the host. A plugin calling into the host after
//! init keeps its session in a [`SessionSlot`].

use std::{
    fmt::Debug,
    sync::atomic::{AtomicU8, Ordering},
};

use log::{debug, error};
use parking_lot::RwLock;

use crate::{
    error::{Error, Result},
    flags::LoadFlags,
    negotiation::{LoadRecord, negotiate},
    table::{FunctionTable, Slot, TableRef},
};

/// Lifecycle of a plugin session.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No table has been negotiated yet.
    Unloaded = 0,
    /// Negotiation succeeded, the plugin is initializing.
    Bound = 1,
    /// The plugin initialized successfully.
    Active = 2,
    /// Unload has begun. No further calls are resolved.
    Unbound = 3,
}

impl From<u8> for SessionState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Unloaded,
            1 => Self::Bound,
            2 => Self::Active,
            _ => Self::Unbound,
        }
    }
}

/// Host owned state of a session, shared with the plugin through the
/// [`LoadRecord`].
#[repr(transparent)]
#[derive(Default)]
pub struct SessionCell(AtomicU8);

impl SessionCell {
    /// Creates a cell in the [`SessionState::Unloaded`] state.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU8::new(SessionState::Unloaded as u8))
    }

    /// Returns the current state.
    pub fn load(&self) -> SessionState {
        self.0.load(Ordering::Acquire).into()
    }

    /// Moves from `from` to `to`. Returns false, leaving the cell unchanged,
    /// if the cell was not in `from`.
    pub fn advance(&self, from: SessionState, to: SessionState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Moves to [`SessionState::Unbound`] from any state and returns the
    /// previous one.
    pub fn unbind(&self) -> SessionState {
        self.0
            .swap(SessionState::Unbound as u8, Ordering::AcqRel)
            .into()
    }
}

impl Debug for SessionCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionCell").field(&self.load()).finish()
    }
}

/// A plugin's binding to a dispatch table.
pub struct Session<'t, T: FunctionTable> {
    table: TableRef<'t, T>,
    cell: &'t SessionCell,
    escalate: bool,
}

impl<'t, T: FunctionTable> Session<'t, T> {
    /// Negotiates against the table and binds the session.
    ///
    /// A cell in [`SessionState::Unloaded`] moves to
    /// [`SessionState::Bound`]. A cell the host has already moved further is
    /// left as it is.
    ///
    /// # Arguments
    ///
    /// * `table` - View over the host's table.
    /// * `cell` - The session state shared with the host.
    /// * `required` - Minimum version the plugin needs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VersionMismatch`] if the host provides fewer slots
    /// than `required`. The cell is not touched.
    pub fn bind(table: TableRef<'t, T>, cell: &'t SessionCell, required: u32) -> Result<Self> {
        let provided = u32::try_from(table.provided_version()).unwrap_or(u32::MAX);
        negotiate(required, provided)?;

        if cell.advance(SessionState::Unloaded, SessionState::Bound) {
            debug!("Session bound at version {} (required {required})", table.version());
        }

        Ok(Self {
            table,
            cell,
            escalate: false,
        })
    }

    /// Binds a session from the record the host handed to the plugin.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPointer`] if the record, its table or its state
    /// is null, and [`Error::VersionMismatch`] if negotiation fails.
    ///
    /// # Safety
    ///
    /// `record` must point to a record produced by the host, which stays valid
    /// together with the table and state it points to for `'t`.
    pub unsafe fn from_record(record: *const LoadRecord<T>, required: u32) -> Result<Self> {
        let record = unsafe { record.as_ref() }.ok_or(Error::InvalidPointer)?;
        let cell = unsafe { record.state.as_ref() }.ok_or(Error::InvalidPointer)?;
        let table = unsafe { TableRef::from_raw(record.table, record.provided_version as usize) }?;

        let flags = LoadFlags::from_bits_truncate(record.flags);
        Ok(Self::bind(table, cell, required)?.escalate(flags.contains(LoadFlags::ESCALATE)))
    }

    /// Sets whether use after unload panics instead of returning an error.
    #[must_use]
    pub fn escalate(mut self, escalate: bool) -> Self {
        self.escalate = escalate;
        self
    }

    /// Current state of the session.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.cell.load()
    }

    /// Marks the plugin as initialized. Returns false if the session was not
    /// in [`SessionState::Bound`].
    pub fn activate(&self) -> bool {
        let activated = self.cell.advance(SessionState::Bound, SessionState::Active);
        if activated {
            debug!("Session activated");
        }
        activated
    }

    /// Begins unloading. Every call resolved afterwards fails.
    pub fn unbind(&self) {
        let previous = self.cell.unbind();
        debug!("Session unbound from {previous:?}");
    }

    /// Returns a handle to pass to code calling into the host.
    #[must_use]
    pub fn handle(&self) -> Handle<'_, T> {
        Handle { session: self }
    }

    /// The table view of the session.
    #[must_use]
    pub fn table(&self) -> TableRef<'t, T> {
        self.table
    }

    /// Resolves a slot to its function pointer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UseAfterUnload`] if the session is neither bound nor
    /// active, and [`Error::UnboundSlot`] if the table does not provide the
    /// slot.
    ///
    /// # Panics
    ///
    /// Panics instead of returning [`Error::UseAfterUnload`] if the session
    /// escalates.
    pub fn resolve<F: Copy>(&self, slot: Slot<T, F>) -> Result<F> {
        match self.cell.load() {
            SessionState::Bound | SessionState::Active => self.table.resolve(slot),
            state => {
                error!(
                    "`{}` (slot {}) called while the session is {state:?}",
                    slot.name(),
                    slot.index()
                );
                assert!(
                    !self.escalate,
                    "`{}` called after the session was unbound",
                    slot.name()
                );
                Err(Error::UseAfterUnload { slot: slot.index() })
            }
        }
    }
}

impl<T: FunctionTable> Debug for Session<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("table", &self.table)
            .field("escalate", &self.escalate)
            .finish()
    }
}

/// A cheap, copyable reference to a [`Session`].
pub struct Handle<'s, T: FunctionTable> {
    session: &'s Session<'s, T>,
}

impl<'s, T: FunctionTable> Handle<'s, T> {
    /// Resolves a slot through the session.
    ///
    /// # Errors
    ///
    /// See [`Session::resolve`].
    pub fn resolve<F: Copy>(&self, slot: Slot<T, F>) -> Result<F> {
        self.session.resolve(slot)
    }

    /// Resolves a slot and hands the function pointer to `call`.
    ///
    /// # Errors
    ///
    /// See [`Session::resolve`].
    pub fn invoke<F: Copy, R>(&self, slot: Slot<T, F>, call: impl FnOnce(F) -> R) -> Result<R> {
        self.resolve(slot).map(call)
    }

    /// Number of slots that may be called.
    #[must_use]
    pub fn version(&self) -> usize {
        self.session.table.version()
    }

    /// Returns true if the slot at `index` can be called.
    #[must_use]
    pub fn supports(&self, index: usize) -> bool {
        self.session.table.supports(index)
    }

    /// The session behind the handle.
    #[must_use]
    pub fn session(&self) -> &'s Session<'s, T> {
        self.session
    }
}

impl<T: FunctionTable> Clone for Handle<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: FunctionTable> Copy for Handle<'_, T> {}

impl<T: FunctionTable> Debug for Handle<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Handle").field(self.session).finish()
    }
}

/// Holds the session a plugin keeps between calls into the host.
///
/// Meant to live in a `static` of the plugin: the init function stores the
/// session it was given, later entry points call through it, and the unload
/// function takes it out again.
///
/// ```rust
/// use ext_nif_rs::{
///     dispatch_table,
///     error::{Error, Result},
///     session::{Session, SessionSlot},
/// };
///
/// dispatch_table! {
///     pub struct Callbacks;
///     pub struct Api;
///     prefix = "demo_";
///
///     fn answer() -> i32;
/// }
///
/// static SESSION: SessionSlot<Callbacks> = SessionSlot::new();
///
/// fn init(session: Session<'static, Callbacks>) -> Result<()> {
///     SESSION.store(session);
///     Ok(())
/// }
///
/// fn answer() -> Result<i32> {
///     SESSION.with(|handle| unsafe { Api::from(handle).answer() })
/// }
///
/// fn unload() {
///     drop(SESSION.take());
/// }
///
/// assert_eq!(answer(), Err(Error::NoSession));
/// # let _ = (init, unload);
/// ```
pub struct SessionSlot<T: FunctionTable> {
    session: RwLock<Option<Session<'static, T>>>,
}

impl<T: FunctionTable> SessionSlot<T> {
    /// Creates an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session: RwLock::new(None),
        }
    }

    /// Stores a session, returning the one held before.
    pub fn store(&self, session: Session<'static, T>) -> Option<Session<'static, T>> {
        self.session.write().replace(session)
    }

    /// Removes the session. Waits for calls running through it to finish.
    pub fn take(&self) -> Option<Session<'static, T>> {
        self.session.write().take()
    }

    /// Returns true if a session is stored.
    #[must_use]
    pub fn is_stored(&self) -> bool {
        self.session.read().is_some()
    }

    /// Runs `call` with a handle to the stored session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSession`] if no session is stored, and whatever
    /// `call` returns otherwise.
    pub fn with<R>(&self, call: impl FnOnce(Handle<'_, T>) -> Result<R>) -> Result<R> {
        let session = self.session.read();
        let session = session.as_ref().ok_or(Error::NoSession)?;
        call(session.handle())
    }
}

impl<T: FunctionTable> Default for SessionSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FunctionTable> Debug for SessionSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionSlot").field(&*self.session.read()).finish()
    }
}
