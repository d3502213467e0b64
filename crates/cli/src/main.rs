//! # `cargo-nif` CLI
//!
//! Lists the NIF catalog, renders it as a C header and checks plugin
//! libraries built with `ext-nif-rs`. Use `cargo nif --help` for more
//! information.

fn main() -> cargo_nif::CrateResult {
    cargo_nif::run()
}
