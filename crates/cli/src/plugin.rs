use std::path::Path;

use anyhow::{Context, Result, bail};
use ext_nif_rs::{
    api::NifCallbacks,
    negotiation::PluginInfoFn,
};
use libloading::Library;

/// What a plugin library declares about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSummary {
    pub name: String,
    pub required_version: u32,
    pub has_init: bool,
    pub has_unload: bool,
}

pub struct Plugin {
    // Keeps the descriptor alive.
    #[allow(dead_code)]
    lib: Library,
    summary: PluginSummary,
}

impl Plugin {
    /// Opens a plugin library and reads its descriptor without running the
    /// plugin's init function.
    pub fn load(path: &Path, symbol: &str) -> Result<Self> {
        let lib = unsafe { Library::new(path) }
            .with_context(|| format!("Failed to load plugin library `{}`", path.display()))?;

        let info = unsafe {
            let describe = lib
                .get::<PluginInfoFn<NifCallbacks>>(symbol.as_bytes())
                .with_context(|| format!("Plugin library does not export `{symbol}`"))?;
            describe().as_ref()
        };
        let Some(info) = info else {
            bail!("`{symbol}` returned a null descriptor");
        };

        let summary = PluginSummary {
            name: info
                .name()
                .with_context(|| "Plugin descriptor has an invalid name")?
                .to_string(),
            required_version: info.required_version,
            has_init: info.init.is_some(),
            has_unload: info.unload.is_some(),
        };

        Ok(Self { lib, summary })
    }

    pub fn summary(&self) -> &PluginSummary {
        &self.summary
    }
}
