//! Error and result types returned from the library functions.

use std::{
    error::Error as ErrorTrait,
    ffi::NulError,
    fmt::Display,
    num::TryFromIntError,
};

/// The main result type which is passed by the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The main error type which is passed by the library inside the custom
/// [`Result`] type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The plugin requires more slots than the host populated. The load is
    /// refused and no session is left behind.
    VersionMismatch {
        /// Version declared by the plugin.
        required: u32,
        /// Version reported by the host.
        provided: u32,
    },
    /// A slot at or past the table version was invoked.
    UnboundSlot {
        /// Index of the invoked slot.
        slot: usize,
        /// Number of usable slots in the table.
        version: usize,
    },
    /// An operation name was registered twice in the same catalog.
    DuplicateRegistration(String),
    /// An indirected call was made after the session started unloading.
    UseAfterUnload {
        /// Index of the slot that was called.
        slot: usize,
    },
    /// A plugin called into the host while holding no session, before its
    /// init function stored one or after it was released.
    NoSession,
    /// A slot was populated twice while building a table.
    AlreadyPopulated {
        /// Index of the slot.
        slot: usize,
    },
    /// A table was built while a slot below its version was still empty.
    UnpopulatedSlot {
        /// Index of the empty slot.
        slot: usize,
        /// Catalog name of the empty slot.
        name: String,
    },
    /// A slot index or version is larger than the table layout.
    SlotOutOfRange {
        /// The offending index or version.
        slot: usize,
        /// Number of slots in the table layout.
        slots: usize,
    },
    /// No operation with the given name exists in the catalog.
    UnknownOperation(String),
    /// A newer catalog does not extend an older one append-only.
    CatalogDiverged {
        /// First slot that differs.
        slot: usize,
        /// Entry found in the older catalog.
        expected: String,
        /// Entry found in the newer catalog.
        found: String,
    },
    /// A null pointer was given where a valid one was expected.
    InvalidPointer,
    /// A string could not be converted into a C string because it contained
    /// a NUL byte.
    InvalidCString,
    /// An integer did not fit into the type required by the host.
    IntegerOverflow,
    /// The init entry point of a plugin returned a non-zero status.
    InitFailed {
        /// Name of the plugin.
        plugin: String,
        /// Status returned by the plugin.
        code: i32,
    },
    /// A plugin with the same name is already loaded.
    AlreadyLoaded(String),
    /// No plugin with the given name is loaded.
    NotLoaded(String),
    /// A plugin reported a failure of its own.
    Plugin(String),
    /// A dynamic library could not be opened or did not export the expected
    /// symbol.
    Library(String),
}

impl Error {
    /// Returns true if the error must abort the load of a plugin rather than
    /// a single call.
    #[must_use]
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Error::VersionMismatch { .. }
                | Error::InitFailed { .. }
                | Error::AlreadyLoaded(_)
                | Error::Library(_)
        )
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::VersionMismatch { required, provided } => write!(
                f,
                "Plugin requires version {required} but the host provides version {provided}."
            ),
            Error::UnboundSlot { slot, version } => write!(
                f,
                "Slot {slot} is not bound, the table only provides {version} slots."
            ),
            Error::DuplicateRegistration(name) => {
                write!(f, "Operation `{name}` is already registered in the catalog.")
            }
            Error::UseAfterUnload { slot } => {
                write!(f, "Slot {slot} was called after the session was unbound.")
            }
            Error::NoSession => write!(f, "The plugin holds no session."),
            Error::AlreadyPopulated { slot } => write!(f, "Slot {slot} is already populated."),
            Error::UnpopulatedSlot { slot, name } => {
                write!(f, "Slot {slot} (`{name}`) was not populated.")
            }
            Error::SlotOutOfRange { slot, slots } => {
                write!(f, "Slot {slot} is out of range for a table of {slots} slots.")
            }
            Error::UnknownOperation(name) => write!(f, "Unknown operation `{name}`."),
            Error::CatalogDiverged {
                slot,
                expected,
                found,
            } => write!(
                f,
                "Catalog diverged at slot {slot}: expected `{expected}`, found `{found}`."
            ),
            Error::InvalidPointer => write!(f, "Invalid pointer."),
            Error::InvalidCString => write!(f, "String given contains NUL-bytes."),
            Error::IntegerOverflow => {
                write!(f, "Converting integer arguments resulted in an overflow.")
            }
            Error::InitFailed { plugin, code } => {
                write!(f, "Plugin `{plugin}` failed to initialize with status {code}.")
            }
            Error::AlreadyLoaded(name) => write!(f, "Plugin `{name}` is already loaded."),
            Error::NotLoaded(name) => write!(f, "Plugin `{name}` is not loaded."),
            Error::Plugin(message) => write!(f, "Plugin error: {message}"),
            Error::Library(message) => write!(f, "Failed to load library: {message}"),
        }
    }
}

impl ErrorTrait for Error {}

impl From<NulError> for Error {
    fn from(_: NulError) -> Self {
        Self::InvalidCString
    }
}

impl From<TryFromIntError> for Error {
    fn from(_value: TryFromIntError) -> Self {
        Self::IntegerOverflow
    }
}

#[cfg(feature = "anyhow")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Plugin(format!("{err:#}"))
    }
}

#[cfg(feature = "loader")]
impl From<libloading::Error> for Error {
    fn from(err: libloading::Error) -> Self {
        Self::Library(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_version_mismatch() {
        let err = Error::VersionMismatch {
            required: 6,
            provided: 5,
        };
        assert_eq!(
            err.to_string(),
            "Plugin requires version 6 but the host provides version 5."
        );
        assert!(err.is_load_error());
    }

    #[test]
    fn test_call_errors_are_not_load_errors() {
        assert!(!Error::UnboundSlot { slot: 3, version: 2 }.is_load_error());
        assert!(!Error::UseAfterUnload { slot: 0 }.is_load_error());
    }

    #[test]
    fn test_from_conversions() {
        let nul = std::ffi::CString::new("a\0b").unwrap_err();
        assert_eq!(Error::from(nul), Error::InvalidCString);

        let overflow = u8::try_from(300_u32).unwrap_err();
        assert_eq!(Error::from(overflow), Error::IntegerOverflow);
    }
}
