//! The capability catalog: an ordered, append-only list of named operations.
//!
//! Every operation is identified by its slot index, the position at which it
//! was registered. Indices are handed out in registration order, start at
//! zero and are never reused or reordered. A newer catalog only ever appends
//! entries to an older one, which [`check_evolution`] verifies.

use std::{collections::HashMap, fmt::Display};

use crate::error::{Error, Result};

/// The signature of a catalog operation, rendered from its Rust types.
///
/// ```
/// use ext_nif_rs::catalog::Signature;
///
/// let sig = Signature::new("*mut c_void").param("usize");
/// assert_eq!(sig.to_string(), "fn(usize) -> *mut c_void");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    ret: String,
    params: Vec<String>,
    variadic: bool,
}

impl Signature {
    /// Creates a signature with the given return type and no parameters.
    ///
    /// # Arguments
    ///
    /// * `ret` - The return type. `()` for operations returning nothing.
    pub fn new<T: Into<String>>(ret: T) -> Self {
        Self {
            ret: ret.into(),
            params: vec![],
            variadic: false,
        }
    }

    /// Appends a parameter type.
    #[must_use]
    pub fn param<T: Into<String>>(mut self, ty: T) -> Self {
        self.params.push(ty.into());
        self
    }

    /// Marks the signature as taking C variadic arguments after the fixed
    /// parameters.
    #[must_use]
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Returns the return type.
    #[must_use]
    pub fn ret(&self) -> &str {
        &self.ret
    }

    /// Returns the fixed parameter types.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Returns true if the operation takes variadic arguments.
    #[must_use]
    pub fn is_variadic(&self) -> bool {
        self.variadic
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fn(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        if self.variadic {
            if self.params.is_empty() {
                write!(f, "...")?;
            } else {
                write!(f, ", ...")?;
            }
        }
        write!(f, ")")?;
        if self.ret != "()" {
            write!(f, " -> {}", self.ret)?;
        }
        Ok(())
    }
}

/// A single operation of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    name: String,
    signature: Signature,
    slot: usize,
    deprecated: bool,
}

impl CatalogEntry {
    /// Stable name of the operation.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signature of the operation.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Slot index of the operation.
    #[must_use]
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Deprecated entries keep their slot but should not be called by new
    /// plugins.
    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        self.deprecated
    }
}

/// An immutable catalog, built with [`CatalogBuilder`] or generated by
/// [`dispatch_table!`](crate::dispatch_table).
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    by_name: HashMap<String, usize>,
}

impl Catalog {
    /// Creates a new catalog builder.
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Iterates over all entries in slot order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    /// Returns the entry at the given slot.
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&CatalogEntry> {
        self.entries.get(slot)
    }

    /// Returns the entry with the given name.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&CatalogEntry> {
        self.slot_of(name).and_then(|slot| self.get(slot))
    }

    /// Returns the slot index of the operation with the given name.
    #[must_use]
    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Number of entries, which is also the highest version a table of this
    /// catalog can have.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a CatalogEntry;
    type IntoIter = std::slice::Iter<'a, CatalogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Builds a [`Catalog`] by registering operations in slot order.
///
/// ```
/// use ext_nif_rs::catalog::{Catalog, Signature};
///
/// let mut builder = Catalog::builder();
/// assert_eq!(builder.register("a", Signature::new("()")).unwrap(), 0);
/// assert_eq!(builder.register("b", Signature::new("()")).unwrap(), 1);
/// let catalog = builder.build();
/// assert_eq!(catalog.slot_of("b"), Some(1));
/// ```
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    catalog: Catalog,
}

impl CatalogBuilder {
    /// Registers an operation at the next free slot.
    ///
    /// # Arguments
    ///
    /// * `name` - The stable name of the operation.
    /// * `signature` - The signature of the operation.
    ///
    /// # Returns
    ///
    /// The slot index assigned to the operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRegistration`] if an operation with the same
    /// name is already registered.
    pub fn register<T: Into<String>>(&mut self, name: T, signature: Signature) -> Result<usize> {
        let name = name.into();
        if self.catalog.by_name.contains_key(&name) {
            return Err(Error::DuplicateRegistration(name));
        }

        let slot = self.catalog.entries.len();
        self.catalog.by_name.insert(name.clone(), slot);
        self.catalog.entries.push(CatalogEntry {
            name,
            signature,
            slot,
            deprecated: false,
        });
        Ok(slot)
    }

    /// Marks an operation as deprecated. It keeps its slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownOperation`] if no operation has that name.
    pub fn deprecate(&mut self, name: &str) -> Result<()> {
        let slot = self
            .catalog
            .slot_of(name)
            .ok_or_else(|| Error::UnknownOperation(name.to_string()))?;
        self.catalog.entries[slot].deprecated = true;
        Ok(())
    }

    /// Finishes the catalog.
    #[must_use]
    pub fn build(self) -> Catalog {
        self.catalog
    }
}

/// Checks that `newer` only appends to `older`.
///
/// # Errors
///
/// Returns [`Error::CatalogDiverged`] at the first slot of `older` that is
/// missing from `newer` or has a different name or signature there.
pub fn check_evolution(older: &Catalog, newer: &Catalog) -> Result<()> {
    for old in older {
        match newer.get(old.slot) {
            Some(new) if new.name == old.name && new.signature == old.signature => {}
            found => {
                return Err(Error::CatalogDiverged {
                    slot: old.slot,
                    expected: format!("{} {}", old.name, old.signature),
                    found: found.map_or_else(
                        || "<missing>".to_string(),
                        |new| format!("{} {}", new.name, new.signature),
                    ),
                });
            }
        }
    }
    Ok(())
}
