#![doc = include_str!("../README.md")]

pub mod header;
mod plugin;

use anyhow::{Context, Result as AResult, bail};
use clap::Parser;
use ext_nif_rs::{
    api::NifCallbacks,
    loader::{DEFAULT_INFO_SYMBOL, LoaderConfig},
    negotiation::negotiate,
    table::FunctionTable,
};

use std::{io::Write, path::PathBuf};

use crate::header::HeaderOptions;

/// Result type returned from the [`run`] function.
pub type CrateResult = AResult<()>;

/// Runs the CLI application. Returns nothing in a result on success.
///
/// # Errors
///
/// Returns an error if the application fails to run.
pub fn run() -> CrateResult {
    let _ = env_logger::builder().try_init();
    let mut args: Vec<_> = std::env::args().collect();

    // When called as a cargo subcommand, the second argument given will be the
    // subcommand, in this case `nif`. We don't want this so we remove from args
    // and pass it to clap.
    if args.get(1).is_some_and(|nth| nth == "nif") {
        args.remove(1);
    }

    Args::parse_from(args).handle()
}

#[derive(Parser)]
#[clap(
    about = "Lists the NIF catalog, renders it as a C header and checks plugin libraries built with `ext-nif-rs`.",
    version = env!("CARGO_PKG_VERSION")
)]
enum Args {
    /// Lists every slot of the NIF catalog.
    Catalog(CatalogArgs),
    /// Renders the NIF catalog as a C header.
    ///
    /// The header declares a struct of function pointers in slot order and
    /// one `#define` per operation calling through a global instance of it.
    /// Entries only present on some targets are rendered for the target
    /// `cargo nif` was built for.
    Header(Header),
    /// Checks that a plugin library can be loaded against the NIF catalog.
    ///
    /// The library is opened and its descriptor read. The plugin's init
    /// function is not run. The symbol and maximum version default to the
    /// `EXT_NIF_RS_INFO_SYMBOL` and `EXT_NIF_RS_MAX_VERSION` variables.
    Check(Check),
}

#[derive(Parser)]
struct CatalogArgs {
    /// Only lists operations whose name contains this text.
    #[arg(long)]
    filter: Option<String>,
    /// Prints names only.
    #[arg(long)]
    names: bool,
}

#[derive(Parser)]
struct Header {
    /// Path the header is written to. Defaults to `nif_callbacks.h` in the
    /// current directory.
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Print the header to stdout rather than write to file. Cannot be used
    /// with `out`.
    #[arg(long, conflicts_with = "out")]
    stdout: bool,
    /// Name of the struct type.
    #[arg(long, default_value = "TNifCallbacks")]
    struct_name: String,
    /// Name of the global instance the operations call through.
    #[arg(long, default_value = "NifCallbacks")]
    instance: String,
}

#[derive(Parser)]
struct Check {
    /// Path to the plugin library.
    library: PathBuf,
    /// Symbol the plugin exports its descriptor under.
    #[arg(long)]
    symbol: Option<String>,
    /// Version to check against. Defaults to the full catalog.
    #[arg(long)]
    max_version: Option<u32>,
}

impl Args {
    pub fn handle(self) -> CrateResult {
        match self {
            Args::Catalog(args) => args.handle(),
            Args::Header(header) => header.handle(),
            Args::Check(check) => check.handle(),
        }
    }
}

impl CatalogArgs {
    pub fn handle(self) -> CrateResult {
        let mut stdout = std::io::stdout().lock();
        let entries = NifCallbacks::catalog().iter().filter(|entry| {
            self.filter
                .as_deref()
                .is_none_or(|filter| entry.name().contains(filter))
        });

        for entry in entries {
            if self.names {
                writeln!(stdout, "{}", entry.name())?;
            } else {
                let deprecated = if entry.is_deprecated() {
                    " (deprecated)"
                } else {
                    ""
                };
                writeln!(
                    stdout,
                    "{:>4}  {} {}{deprecated}",
                    entry.slot(),
                    entry.name(),
                    entry.signature()
                )?;
            }
        }
        Ok(())
    }
}

impl Header {
    pub fn handle(self) -> CrateResult {
        let options = HeaderOptions {
            struct_name: self.struct_name,
            instance: self.instance,
            ..HeaderOptions::default()
        };
        let header = header::render(NifCallbacks::catalog(), &options);

        if self.stdout {
            print!("{header}");
        } else {
            let out = match self.out {
                Some(out) => out,
                None => std::env::current_dir()
                    .with_context(|| "Failed to get current working directory")?
                    .join("nif_callbacks.h"),
            };
            std::fs::write(&out, &header)
                .with_context(|| format!("Failed to write header to `{}`", out.display()))?;
            println!("Wrote {} slots to {}", NifCallbacks::SLOTS, out.display());
        }
        Ok(())
    }
}

impl Check {
    pub fn handle(self) -> CrateResult {
        let config = LoaderConfig::from_env();
        let symbol = self
            .symbol
            .unwrap_or_else(|| config.get_info_symbol().to_string());
        if symbol.is_empty() {
            bail!("Symbol name must not be empty, the default is `{DEFAULT_INFO_SYMBOL}`.");
        }

        let slots = u32::try_from(NifCallbacks::SLOTS).unwrap_or(u32::MAX);
        let provided = self
            .max_version
            .or(config.advertised_version())
            .map_or(slots, |max| max.min(slots));

        let plugin = plugin::Plugin::load(&self.library, &symbol)?;
        let summary = plugin.summary();

        println!("Plugin:    {}", summary.name);
        println!("Requires:  {}", summary.required_version);
        println!("Provided:  {provided} of {slots} slots");
        if !summary.has_init {
            println!("Warning:   the plugin has no init function");
        }
        if summary.has_unload {
            println!("Unload:    yes");
        }

        negotiate(summary.required_version, provided)
            .with_context(|| format!("Plugin `{}` cannot be loaded", summary.name))?;
        println!("Compatible.");
        Ok(())
    }
}
