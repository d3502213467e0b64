//! Host side plugin loading.
//!
//! A [`Loader`] owns a populated [`DispatchTable`] and the sessions of every
//! plugin it attached. Plugins are attached either in-process from a
//! [`PluginInfo`] or, with the `loader` feature, from a dynamic library
//! exporting one.

use std::{collections::HashMap, env, fmt::Debug, sync::Arc};

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::{
    error::{Error, Result},
    flags::LoadFlags,
    negotiation::{INIT_OK, LoadRecord, PluginInfo, PluginUnloadFn, negotiate},
    session::{SessionCell, SessionState},
    table::{DispatchTable, FunctionTable},
};

/// Environment variable overriding [`LoaderConfig::info_symbol`].
pub const ENV_INFO_SYMBOL: &str = "EXT_NIF_RS_INFO_SYMBOL";
/// Environment variable overriding [`LoaderConfig::escalate`].
pub const ENV_ESCALATE: &str = "EXT_NIF_RS_ESCALATE";
/// Environment variable overriding [`LoaderConfig::advertised_version`].
pub const ENV_MAX_VERSION: &str = "EXT_NIF_RS_MAX_VERSION";

/// Symbol plugins export their descriptor function under by default.
pub const DEFAULT_INFO_SYMBOL: &str = "nif_plugin_info";

/// Configuration of a [`Loader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    info_symbol: String,
    escalate: bool,
    advertised_version: Option<u32>,
}

impl LoaderConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            info_symbol: DEFAULT_INFO_SYMBOL.to_string(),
            escalate: false,
            advertised_version: None,
        }
    }

    /// Reads the configuration from the environment, falling back to the
    /// defaults for unset or unparsable variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::new();

        if let Some(symbol) = lookup(ENV_INFO_SYMBOL).filter(|s| !s.is_empty()) {
            config.info_symbol = symbol;
        }

        if let Some(value) = lookup(ENV_ESCALATE) {
            match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.escalate = true,
                "0" | "false" | "no" | "off" | "" => config.escalate = false,
                other => warn!("Ignoring {ENV_ESCALATE}={other}"),
            }
        }

        if let Some(value) = lookup(ENV_MAX_VERSION) {
            match value.parse() {
                Ok(version) => config.advertised_version = Some(version),
                Err(_) => warn!("Ignoring {ENV_MAX_VERSION}={value}"),
            }
        }

        config
    }

    /// Sets the symbol looked up in plugin libraries.
    #[must_use]
    pub fn info_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.info_symbol = symbol.into();
        self
    }

    /// Sets whether refused loads and use after unload panic.
    #[must_use]
    pub fn escalate(mut self, escalate: bool) -> Self {
        self.escalate = escalate;
        self
    }

    /// Caps the version reported to plugins.
    #[must_use]
    pub fn advertise(mut self, version: u32) -> Self {
        self.advertised_version = Some(version);
        self
    }

    /// Symbol looked up in plugin libraries.
    #[must_use]
    pub fn get_info_symbol(&self) -> &str {
        &self.info_symbol
    }

    /// Returns true if failures escalate to panics.
    #[must_use]
    pub fn is_escalating(&self) -> bool {
        self.escalate
    }

    /// Cap on the version reported to plugins, if any.
    #[must_use]
    pub fn advertised_version(&self) -> Option<u32> {
        self.advertised_version
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the code of a plugin mapped, such as the library it was loaded from.
type CodeGuard = Box<dyn Send + Sync>;

// Memory a plugin's session points into. Outlives the plugin's code.
struct Binding<T: FunctionTable> {
    cell: Box<SessionCell>,
    record: Box<LoadRecord<T>>,
    _table: Arc<DispatchTable<T>>,
}

struct LoadedPlugin<T: FunctionTable> {
    // Dropped before the binding.
    code: Option<CodeGuard>,
    name: String,
    unload: Option<PluginUnloadFn>,
    binding: Option<Binding<T>>,
}

impl<T: FunctionTable> LoadedPlugin<T> {
    fn state(&self) -> SessionState {
        self.binding
            .as_ref()
            .map_or(SessionState::Unbound, |binding| binding.cell.load())
    }

    // Unbinds the session, runs the unload function and closes the code.
    // Returns the binding, which must be kept until no session handed to the
    // plugin can be used any more.
    fn close(&mut self) -> Option<Binding<T>> {
        let binding = self.binding.take()?;
        let previous = binding.cell.unbind();
        debug!("Unbinding plugin `{}` from {previous:?}", self.name);
        if let Some(unload) = self.unload {
            // SAFETY: the code is still mapped.
            unsafe { unload() };
        }
        drop(self.code.take());
        info!(
            "Unloaded plugin `{}` (version {})",
            self.name, binding.record.provided_version
        );
        Some(binding)
    }
}

impl<T: FunctionTable> Drop for LoadedPlugin<T> {
    fn drop(&mut self) {
        drop(self.close());
    }
}

/// Attaches plugins to a dispatch table and tracks their sessions. Plugins
/// still attached when the loader is dropped are unloaded.
///
/// The session handed to a plugin stays valid until the loader is dropped.
/// After [`Loader::unload`] every call through it fails with
/// [`Error::UseAfterUnload`].
///
/// ```rust
/// use ext_nif_rs::{
///     dispatch_table, error::Result, loader::Loader, nif_plugin, session::Session,
///     table::DispatchTable,
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
/// unsafe extern "C" fn answer() -> i32 {
///     42
/// }
///
/// fn init(session: Session<'static, Callbacks>) -> Result<()> {
///     assert_eq!(unsafe { Api::from(session.handle()).answer() }?, 42);
///     Ok(())
/// }
///
/// nif_plugin! {
///     static PLUGIN: Callbacks = { name: "demo", required: 1, init: init };
/// }
///
/// let table = DispatchTable::builder()
///     .populate(Callbacks::answer, answer)?
///     .build()?;
/// let loader = Loader::new(table);
/// loader.attach(&PLUGIN)?;
/// assert_eq!(loader.loaded(), ["demo"]);
/// loader.unload("demo")?;
/// # Ok::<(), ext_nif_rs::error::Error>(())
/// ```
pub struct Loader<T: FunctionTable> {
    plugins: Mutex<HashMap<String, LoadedPlugin<T>>>,
    retired: Mutex<Vec<Binding<T>>>,
    table: Arc<DispatchTable<T>>,
    config: LoaderConfig,
}

impl<T: FunctionTable> Loader<T> {
    /// Creates a loader with the default configuration.
    ///
    /// # Arguments
    ///
    /// * `table` - The table handed to every attached plugin.
    pub fn new(table: DispatchTable<T>) -> Self {
        Self::with_config(Arc::new(table), LoaderConfig::default())
    }

    /// Creates a loader.
    ///
    /// # Arguments
    ///
    /// * `table` - The table handed to every attached plugin. May be shared
    ///   with other loaders.
    /// * `config` - Loader configuration.
    pub fn with_config(table: Arc<DispatchTable<T>>, config: LoaderConfig) -> Self {
        Self {
            plugins: Mutex::new(HashMap::new()),
            retired: Mutex::new(Vec::new()),
            table,
            config,
        }
    }

    /// Attaches a plugin described in-process.
    ///
    /// Negotiates the version, runs the plugin's init function and registers
    /// the session as [`SessionState::Active`].
    ///
    /// # Errors
    ///
    /// * [`Error::AlreadyLoaded`] if a plugin with the same name is attached.
    /// * [`Error::VersionMismatch`] if the plugin requires more than the
    ///   advertised version.
    /// * [`Error::InitFailed`] if the init function returned a non-zero
    ///   status.
    ///
    /// Nothing is registered on failure.
    ///
    /// # Panics
    ///
    /// Panics instead of returning [`Error::VersionMismatch`] if the loader
    /// escalates.
    pub fn attach(&self, info: &PluginInfo<T>) -> Result<()> {
        self.register(info, None)
    }

    /// Opens a dynamic library and attaches the plugin it exports.
    ///
    /// Returns the name of the plugin.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Library`] if the library cannot be opened or does not
    /// export [`LoaderConfig::get_info_symbol`], and fails like
    /// [`Loader::attach`] otherwise. The library is closed on failure.
    ///
    /// # Safety
    ///
    /// Opening a library runs its initializers, and the exported symbol must
    /// be a [`PluginInfoFn`](crate::negotiation::PluginInfoFn) for the
    /// table `T`.
    #[cfg(feature = "loader")]
    #[cfg_attr(docs, doc(cfg(feature = "loader")))]
    pub unsafe fn load_library(&self, path: impl AsRef<std::ffi::OsStr>) -> Result<String> {
        use crate::negotiation::PluginInfoFn;

        let path = path.as_ref();
        let library = unsafe { libloading::Library::new(path) }?;
        let info = unsafe {
            let describe = library.get::<PluginInfoFn<T>>(self.config.info_symbol.as_bytes())?;
            describe().as_ref()
        }
        .ok_or(Error::InvalidPointer)?;

        let name = info.name()?.to_string();
        debug!("Opened `{}` exporting plugin `{name}`", path.display());
        self.register(info, Some(Box::new(library)))?;
        Ok(name)
    }

    /// Unbinds a plugin, runs its unload function and closes its library.
    ///
    /// The session state is kept until the loader is dropped, so a session
    /// the plugin still holds reports [`SessionState::Unbound`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotLoaded`] if no plugin of that name is attached.
    pub fn unload(&self, name: &str) -> Result<()> {
        let mut plugin = self
            .plugins
            .lock()
            .remove(name)
            .ok_or_else(|| Error::NotLoaded(name.to_string()))?;
        if let Some(binding) = plugin.close() {
            self.retired.lock().push(binding);
        }
        Ok(())
    }

    /// Session state of a plugin, if it is attached.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<SessionState> {
        self.plugins.lock().get(name).map(LoadedPlugin::state)
    }

    /// Names of the attached plugins, sorted.
    #[must_use]
    pub fn loaded(&self) -> Vec<String> {
        let mut names: Vec<_> = self.plugins.lock().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// The table handed to plugins.
    #[must_use]
    pub fn table(&self) -> &Arc<DispatchTable<T>> {
        &self.table
    }

    /// The loader configuration.
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    fn advertised(&self) -> u32 {
        let provided = u32::try_from(self.table.version()).unwrap_or(u32::MAX);
        self.config
            .advertised_version
            .map_or(provided, |cap| cap.min(provided))
    }

    fn register(&self, info: &PluginInfo<T>, code: Option<CodeGuard>) -> Result<()> {
        let name = info.name()?.to_string();
        if self.plugins.lock().contains_key(&name) {
            return Err(Error::AlreadyLoaded(name));
        }

        let provided = self.advertised();
        if let Err(err) = negotiate(info.required_version, provided) {
            assert!(!self.config.escalate, "Refusing plugin `{name}`: {err}");
            return Err(err);
        }

        let mut flags = LoadFlags::empty();
        flags.set(LoadFlags::ESCALATE, self.config.escalate);

        let cell = Box::new(SessionCell::new());
        let record = Box::new(
            LoadRecord::offer(&self.table, &cell)
                .required(info.required_version)
                .advertise(provided)
                .flags(flags),
        );

        cell.advance(SessionState::Unloaded, SessionState::Bound);
        let mut plugin = LoadedPlugin {
            code,
            name: name.clone(),
            unload: info.unload,
            binding: Some(Binding {
                cell,
                record,
                _table: Arc::clone(&self.table),
            }),
        };

        if let Some(init) = info.init {
            let record = plugin
                .binding
                .as_ref()
                .map_or(std::ptr::null(), |binding| &raw const *binding.record);
            // SAFETY: the record, its table and its cell stay alive until the
            // loader is dropped.
            let code = unsafe { init(record) };
            if code != INIT_OK {
                warn!("Plugin `{name}` failed to initialize with status {code}");
                // Unload only follows a successful init.
                plugin.unload = None;
                if let Some(binding) = plugin.close() {
                    self.retired.lock().push(binding);
                }
                return Err(Error::InitFailed { plugin: name, code });
            }
        }
        if let Some(binding) = &plugin.binding {
            binding.cell.advance(SessionState::Bound, SessionState::Active);
        }

        let mut plugins = self.plugins.lock();
        if plugins.contains_key(&name) {
            drop(plugins);
            if let Some(binding) = plugin.close() {
                self.retired.lock().push(binding);
            }
            return Err(Error::AlreadyLoaded(name));
        }
        plugins.insert(name.clone(), plugin);
        drop(plugins);

        info!(
            "Attached plugin `{name}` (requires {}, provided {provided})",
            info.required_version
        );
        Ok(())
    }
}

impl<T: FunctionTable> Debug for Loader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("table", &self.table)
            .field("plugins", &self.loaded())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Weak,
        atomic::{AtomicI32, AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{
        nif_plugin,
        session::{Session, SessionSlot},
        test::{SmallApi, SmallTable, small_table},
    };

    static ANSWERED: AtomicI32 = AtomicI32::new(0);
    static UNLOADED: AtomicUsize = AtomicUsize::new(0);

    fn answering_init(session: Session<'static, SmallTable>) -> Result<()> {
        let api = SmallApi::from(session.handle());
        ANSWERED.store(unsafe { api.answer() }?, Ordering::SeqCst);
        Ok(())
    }

    fn count_unload() {
        UNLOADED.fetch_add(1, Ordering::SeqCst);
    }

    fn failing_init(_session: Session<'static, SmallTable>) -> Result<()> {
        Err(Error::Plugin("no".into()))
    }

    fn noop_init(_session: Session<'static, SmallTable>) -> Result<()> {
        Ok(())
    }

    nif_plugin! {
        static ANSWERING: SmallTable = {
            name: "answering",
            required: 1,
            init: answering_init,
            unload: count_unload,
        };
    }

    nif_plugin! {
        static FAILING: SmallTable = { name: "failing", required: 1, init: failing_init };
    }

    nif_plugin! {
        static GREEDY: SmallTable = { name: "greedy", required: 3, init: noop_init };
    }

    static KEPT: SessionSlot<SmallTable> = SessionSlot::new();

    fn keeping_init(session: Session<'static, SmallTable>) -> Result<()> {
        KEPT.store(session);
        Ok(())
    }

    nif_plugin! {
        static KEEPING: SmallTable = { name: "keeping", required: 1, init: keeping_init };
    }

    fn call_kept() -> Result<()> {
        KEPT.with(|handle| handle.resolve(SmallTable::answer).map(drop))
    }

    // Stands in for a plugin library. Records what the plugin could still
    // reach when it was closed.
    struct MappedCode {
        table: Weak<DispatchTable<SmallTable>>,
        seen: Arc<Mutex<Option<(usize, Result<()>)>>>,
    }

    impl Drop for MappedCode {
        fn drop(&mut self) {
            *self.seen.lock() = Some((self.table.strong_count(), call_kept()));
        }
    }

    #[test]
    fn test_attach_and_unload() {
        let loader = Loader::new(small_table(3));
        loader.attach(&ANSWERING).unwrap();
        assert_eq!(ANSWERED.load(Ordering::SeqCst), 42);
        assert_eq!(loader.state("answering"), Some(SessionState::Active));
        assert_eq!(loader.loaded(), ["answering"]);

        assert_eq!(
            loader.attach(&ANSWERING),
            Err(Error::AlreadyLoaded("answering".into()))
        );

        loader.unload("answering").unwrap();
        assert_eq!(UNLOADED.load(Ordering::SeqCst), 1);
        assert_eq!(loader.state("answering"), None);
        assert_eq!(
            loader.unload("answering"),
            Err(Error::NotLoaded("answering".into()))
        );
    }

    #[test]
    fn test_failing_init_registers_nothing() {
        let loader = Loader::new(small_table(3));
        assert_eq!(
            loader.attach(&FAILING),
            Err(Error::InitFailed {
                plugin: "failing".into(),
                code: crate::negotiation::INIT_FAILED
            })
        );
        assert!(loader.loaded().is_empty());
    }

    #[test]
    fn test_advertised_version_refuses_plugin() {
        let config = LoaderConfig::new().advertise(2);
        let loader = Loader::with_config(Arc::new(small_table(3)), config);
        assert_eq!(
            loader.attach(&GREEDY),
            Err(Error::VersionMismatch {
                required: 3,
                provided: 2
            })
        );
        assert_eq!(loader.state("greedy"), None);
    }

    #[test]
    #[should_panic(expected = "Refusing plugin `greedy`")]
    fn test_escalated_mismatch_panics() {
        let loader = Loader::with_config(
            Arc::new(small_table(2)),
            LoaderConfig::new().escalate(true),
        );
        let _ = loader.attach(&GREEDY);
    }

    #[test]
    fn test_code_is_closed_before_its_binding() {
        let table = Arc::new(small_table(3));
        let loader = Loader::with_config(Arc::clone(&table), LoaderConfig::default());
        let seen = Arc::new(Mutex::new(None));
        let code = MappedCode {
            table: Arc::downgrade(&table),
            seen: Arc::clone(&seen),
        };

        loader.register(&KEEPING, Some(Box::new(code))).unwrap();
        assert_eq!(loader.state("keeping"), Some(SessionState::Active));
        assert_eq!(call_kept(), Ok(()));

        drop(loader);
        let (strong, call) = seen.lock().take().unwrap();
        // The test, the loader and the plugin's binding.
        assert_eq!(strong, 3);
        assert_eq!(call, Err(Error::UseAfterUnload { slot: 0 }));
        assert_eq!(Arc::strong_count(&table), 1);
        drop(KEPT.take());
    }

    #[test]
    fn test_config_from_lookup() {
        let config = LoaderConfig::from_lookup(|key| match key {
            ENV_INFO_SYMBOL => Some("custom_info".into()),
            ENV_ESCALATE => Some("TRUE".into()),
            ENV_MAX_VERSION => Some("7".into()),
            _ => None,
        });
        assert_eq!(config.get_info_symbol(), "custom_info");
        assert!(config.is_escalating());
        assert_eq!(config.advertised_version(), Some(7));

        let config = LoaderConfig::from_lookup(|key| match key {
            ENV_MAX_VERSION => Some("seven".into()),
            ENV_ESCALATE => Some("maybe".into()),
            _ => None,
        });
        assert_eq!(config, LoaderConfig::default());
    }
}
