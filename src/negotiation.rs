//! Load-time negotiation between a host and a plugin.
//!
//! The host hands every plugin a [`LoadRecord`] once, synchronously, before
//! the plugin runs any code. A plugin describes itself with a
//! [`PluginInfo`], usually generated by [`nif_plugin!`](crate::nif_plugin)
//! and exported under the symbol `nif_plugin_info`.

use std::ffi::{CStr, c_char, c_int};

use log::{error, warn};

use crate::{
    error::{Error, Result},
    flags::LoadFlags,
    session::{Session, SessionCell},
    table::{DispatchTable, FunctionTable},
};

/// Status returned from a plugin init function on success.
pub const INIT_OK: c_int = 0;
/// Status returned when the plugin refused the table it was given.
pub const INIT_VERSION_MISMATCH: c_int = 1;
/// Status returned when the plugin's own initialization failed.
pub const INIT_FAILED: c_int = 2;

/// Checks that the host provides at least the version a plugin requires.
///
/// # Errors
///
/// Returns [`Error::VersionMismatch`] if `required > provided`.
pub fn negotiate(required: u32, provided: u32) -> Result<()> {
    if required > provided {
        warn!("Refusing plugin requiring version {required}, host provides {provided}");
        return Err(Error::VersionMismatch { required, provided });
    }
    Ok(())
}

/// The record a host hands to a plugin at load.
///
/// The layout does not depend on `T`, so a plugin may read a record offered
/// for a host table of a different catalog version through
/// [`LoadRecord::reinterpret`].
#[repr(C)]
#[derive(Debug)]
pub struct LoadRecord<T> {
    /// Version the plugin declared in its [`PluginInfo`].
    pub required_version: u32,
    /// Number of slots the host populated.
    pub provided_version: u32,
    /// [`LoadFlags`] bits.
    pub flags: u32,
    /// The populated table.
    pub table: *const T,
    /// The session state cell.
    pub state: *const SessionCell,
}

impl<T: FunctionTable> LoadRecord<T> {
    /// Creates a record offering `table`, providing its full version.
    ///
    /// # Arguments
    ///
    /// * `table` - The table to hand over. Must outlive every use of the
    ///   record.
    /// * `state` - The session cell. Must outlive every use of the record.
    #[must_use]
    pub fn offer(table: &DispatchTable<T>, state: &SessionCell) -> Self {
        Self {
            required_version: 0,
            provided_version: u32::try_from(table.version()).unwrap_or(u32::MAX),
            flags: LoadFlags::empty().bits(),
            table: table.as_ptr(),
            state: &raw const *state,
        }
    }

    /// Records the version the plugin declared.
    #[must_use]
    pub fn required(mut self, version: u32) -> Self {
        self.required_version = version;
        self
    }

    /// Caps the version reported to the plugin. The version can only be
    /// lowered.
    #[must_use]
    pub fn advertise(mut self, version: u32) -> Self {
        self.provided_version = self.provided_version.min(version);
        self
    }

    /// Sets the load flags.
    #[must_use]
    pub fn flags(mut self, flags: LoadFlags) -> Self {
        self.flags = flags.bits();
        self
    }
}

impl<T> LoadRecord<T> {
    /// Views the record as offering a table of a different catalog.
    #[must_use]
    pub fn reinterpret<U>(&self) -> &LoadRecord<U> {
        // SAFETY: `LoadRecord` is `repr(C)` and `T` only appears behind a
        // pointer.
        unsafe { &*(&raw const *self).cast::<LoadRecord<U>>() }
    }
}

// SAFETY: the record only points to a `Sync` table and an atomic cell.
unsafe impl<T: Sync> Send for LoadRecord<T> {}
// SAFETY: see above.
unsafe impl<T: Sync> Sync for LoadRecord<T> {}

/// Type of a plugin init function.
pub type PluginInitFn<T> = unsafe extern "C" fn(record: *const LoadRecord<T>) -> c_int;

/// Type of a plugin unload function.
pub type PluginUnloadFn = unsafe extern "C" fn();

/// Type of the exported function returning the plugin descriptor.
pub type PluginInfoFn<T> = unsafe extern "C" fn() -> *const PluginInfo<T>;

/// Describes a plugin to the host.
#[repr(C)]
#[derive(Debug)]
pub struct PluginInfo<T> {
    /// Plugin name (null-terminated).
    pub name: *const c_char,
    /// Minimum table version the plugin needs.
    pub required_version: u32,
    /// Called once after negotiation. Returns [`INIT_OK`] on success.
    pub init: Option<PluginInitFn<T>>,
    /// Called once when unloading, after the session was unbound.
    pub unload: Option<PluginUnloadFn>,
}

impl<T> PluginInfo<T> {
    /// Returns the plugin name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPointer`] if the name is null and
    /// [`Error::InvalidCString`] if it is not valid UTF-8.
    pub fn name(&self) -> Result<&str> {
        if self.name.is_null() {
            return Err(Error::InvalidPointer);
        }
        // SAFETY: a non-null name is a null-terminated string living as long
        // as the descriptor.
        unsafe { CStr::from_ptr(self.name) }
            .to_str()
            .map_err(|_| Error::InvalidCString)
    }
}

// SAFETY: the name points to static, immutable data and the rest are plain
// values.
unsafe impl<T> Sync for PluginInfo<T> {}
// SAFETY: see above.
unsafe impl<T> Send for PluginInfo<T> {}

/// Runs a plugin's init function against the record handed over by the host.
///
/// The init function owns the session and may keep it, for example in a
/// [`SessionSlot`](crate::session::SessionSlot), to call into the host after
/// init returned. Used by [`nif_plugin!`](crate::nif_plugin).
///
/// # Safety
///
/// `record` must be a record produced by the host for this load. The host
/// keeps the record, its table and its state alive for as long as code of
/// the plugin may run, as [`Loader`](crate::loader::Loader) does.
#[doc(hidden)]
pub unsafe fn run_init<T: FunctionTable>(
    record: *const LoadRecord<T>,
    required: u32,
    init: fn(Session<'static, T>) -> Result<()>,
) -> c_int {
    let session = match unsafe { Session::from_record(record, required) } {
        Ok(session) => session,
        Err(err @ Error::VersionMismatch { .. }) => {
            error!("Plugin refused the table it was given: {err}");
            return INIT_VERSION_MISMATCH;
        }
        Err(err) => {
            error!("Plugin could not bind its session: {err}");
            return INIT_FAILED;
        }
    };

    match init(session) {
        Ok(()) => INIT_OK,
        Err(err) => {
            error!("Plugin failed to initialize: {err}");
            INIT_FAILED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        session::SessionState,
        test::{SmallTable, small_table},
    };

    #[test]
    fn test_negotiate() {
        assert!(negotiate(5, 5).is_ok());
        assert!(negotiate(3, 5).is_ok());
        assert_eq!(
            negotiate(6, 5),
            Err(Error::VersionMismatch {
                required: 6,
                provided: 5
            })
        );
    }

    #[test]
    fn test_offer_advertises_lower_version() {
        let table = small_table(3);
        let cell = SessionCell::new();
        let record = LoadRecord::offer(&table, &cell)
            .required(1)
            .advertise(2)
            .flags(LoadFlags::ESCALATE);
        assert_eq!(record.provided_version, 2);
        assert_eq!(record.required_version, 1);
        assert_eq!(record.flags, 1);

        let record = record.advertise(10);
        assert_eq!(record.provided_version, 2);
    }

    #[test]
    fn test_session_from_record() {
        let table = small_table(3);
        let cell = SessionCell::new();
        let record = LoadRecord::offer(&table, &cell).advertise(2);

        let session = unsafe { Session::<SmallTable>::from_record(&raw const record, 2) }.unwrap();
        assert_eq!(session.state(), SessionState::Bound);
        assert_eq!(session.handle().version(), 2);
        assert!(session.resolve(SmallTable::negate).is_err());

        let err = unsafe { Session::<SmallTable>::from_record(&raw const record, 3) }.unwrap_err();
        assert!(err.is_load_error());
    }

    #[test]
    fn test_null_record() {
        let err = unsafe { Session::<SmallTable>::from_record(std::ptr::null(), 0) }.unwrap_err();
        assert_eq!(err, Error::InvalidPointer);
    }

    fn accepting_init(session: Session<'static, SmallTable>) -> Result<()> {
        assert_eq!(session.state(), SessionState::Bound);
        Ok(())
    }

    #[test]
    fn test_init_status() {
        let table = small_table(2);
        let cell = SessionCell::new();
        let record = LoadRecord::offer(&table, &cell);

        let code = unsafe { run_init(&raw const record, 2, accepting_init) };
        assert_eq!(code, INIT_OK);

        let code = unsafe { run_init(&raw const record, 3, accepting_init) };
        assert_eq!(code, INIT_VERSION_MISMATCH);

        let code = unsafe { run_init::<SmallTable>(std::ptr::null(), 1, accepting_init) };
        assert_eq!(code, INIT_FAILED);
    }

    #[test]
    fn test_plugin_name() {
        let info = PluginInfo::<SmallTable> {
            name: c"small".as_ptr(),
            required_version: 1,
            init: None,
            unload: None,
        };
        assert_eq!(info.name(), Ok("small"));

        let info = PluginInfo::<SmallTable> {
            name: std::ptr::null(),
            ..info
        };
        assert_eq!(info.name(), Err(Error::InvalidPointer));
    }
}
