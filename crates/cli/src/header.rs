//! Renders a catalog as a C header.

use std::fmt::{self, Write};

use ext_nif_rs::catalog::{Catalog, CatalogEntry};

/// Names used in the rendered header.
#[derive(Debug, Clone)]
pub struct HeaderOptions {
    /// Name of the struct type.
    pub struct_name: String,
    /// Name of the global struct instance the `#define`s call through.
    pub instance: String,
    /// Include guard.
    pub guard: String,
}

impl Default for HeaderOptions {
    fn default() -> Self {
        Self {
            struct_name: "TNifCallbacks".into(),
            instance: "NifCallbacks".into(),
            guard: "EXT_NIF_CALLBACKS_H".into(),
        }
    }
}

/// Maps a Rust FFI type, as written in the catalog, to its C spelling.
pub fn c_type(ty: &str) -> String {
    let ty = ty.trim();

    if let Some(rest) = ty.strip_prefix("*mut ") {
        return format!("{}*", c_type(rest));
    }
    if let Some(rest) = ty.strip_prefix("*const ") {
        let inner = c_type(rest);
        return if rest.trim_start().starts_with('*') {
            format!("{inner} const*")
        } else {
            format!("const {inner}*")
        };
    }
    // Callback typedefs are function types on the C side.
    if let Some(inner) = ty.strip_prefix("Option<").and_then(|t| t.strip_suffix('>')) {
        return format!("{}*", c_type(inner));
    }

    match ty {
        "()" | "c_void" => "void",
        "c_char" => "char",
        "c_int" | "i32" => "int",
        "c_uint" | "u32" => "unsigned int",
        "c_long" => "long",
        "c_ulong" => "unsigned long",
        "c_double" | "f64" => "double",
        "usize" => "size_t",
        "isize" => "ptrdiff_t",
        "u8" => "unsigned char",
        "i8" => "signed char",
        "i16" => "int16_t",
        "u16" => "uint16_t",
        "i64" => "int64_t",
        "u64" => "uint64_t",
        other => other,
    }
    .to_string()
}

fn params(entry: &CatalogEntry) -> String {
    let signature = entry.signature();
    let mut params: Vec<_> = signature.params().iter().map(|p| c_type(p)).collect();
    if signature.is_variadic() {
        params.push("...".into());
    }
    if params.is_empty() {
        "void".into()
    } else {
        params.join(", ")
    }
}

/// Renders the header.
///
/// # Arguments
///
/// * `catalog` - The catalog to render, in slot order.
/// * `options` - Names of the generated struct, instance and guard.
pub fn render(catalog: &Catalog, options: &HeaderOptions) -> String {
    let mut out = String::new();
    write_header(&mut out, catalog, options).expect("writing to a String cannot fail");
    out
}

/// Writes the header to `out`.
///
/// # Errors
///
/// Returns an error if `out` fails to write.
pub fn write_header(
    out: &mut impl Write,
    catalog: &Catalog,
    options: &HeaderOptions,
) -> fmt::Result {
    let HeaderOptions {
        struct_name,
        instance,
        guard,
    } = options;

    writeln!(
        out,
        "/* Generated by cargo-nif {} from ext-nif-rs {}. Do not edit. */",
        env!("CARGO_PKG_VERSION"),
        ext_nif_rs::VERSION
    )?;
    writeln!(out, "#ifndef {guard}")?;
    writeln!(out, "#define {guard}")?;
    writeln!(out)?;
    writeln!(out, "#define {guard}_SLOTS {}", catalog.len())?;
    writeln!(out)?;
    writeln!(out, "typedef struct {{")?;
    for entry in catalog {
        let deprecated = if entry.is_deprecated() {
            " deprecated"
        } else {
            ""
        };
        writeln!(
            out,
            "    {} (*{})({}); /* {}{deprecated} */",
            c_type(entry.signature().ret()),
            entry.name(),
            params(entry),
            entry.slot()
        )?;
    }
    writeln!(out, "}} {struct_name};")?;
    writeln!(out)?;
    writeln!(out, "extern {struct_name} {instance};")?;
    writeln!(out)?;
    for entry in catalog {
        writeln!(
            out,
            "#define {name} ({instance}.{name})",
            name = entry.name()
        )?;
    }
    writeln!(out)?;
    writeln!(out, "#endif /* {guard} */")
}

#[cfg(test)]
mod tests {
    use ext_nif_rs::catalog::Signature;

    use super::*;

    #[test]
    fn test_c_type() {
        assert_eq!(c_type("c_int"), "int");
        assert_eq!(c_type("*mut ErlNifEnv"), "ErlNifEnv*");
        assert_eq!(c_type("*const c_char"), "const char*");
        assert_eq!(c_type("*mut *const ERL_NIF_TERM"), "const ERL_NIF_TERM**");
        assert_eq!(c_type("*const *mut c_void"), "void* const*");
        assert_eq!(c_type("Option<ErlNifResourceDtor>"), "ErlNifResourceDtor*");
        assert_eq!(c_type("usize"), "size_t");
        assert_eq!(c_type("()"), "void");
        assert_eq!(c_type("ERL_NIF_TERM"), "ERL_NIF_TERM");
    }

    #[test]
    fn test_render() {
        let mut builder = Catalog::builder();
        builder
            .register("enif_alloc", Signature::new("*mut c_void").param("usize"))
            .unwrap();
        builder
            .register(
                "enif_fprintf",
                Signature::new("c_int")
                    .param("*mut FILE")
                    .param("*const c_char")
                    .variadic(),
            )
            .unwrap();
        builder.register("enif_tick", Signature::new("()")).unwrap();
        builder.deprecate("enif_tick").unwrap();
        let header = render(&builder.build(), &HeaderOptions::default());

        assert!(header.contains("#define EXT_NIF_CALLBACKS_H_SLOTS 3\n"));
        assert!(header.contains("    void* (*enif_alloc)(size_t); /* 0 */\n"));
        assert!(header.contains("    int (*enif_fprintf)(FILE*, const char*, ...); /* 1 */\n"));
        assert!(header.contains("    void (*enif_tick)(void); /* 2 deprecated */\n"));
        assert!(header.contains("} TNifCallbacks;\n"));
        assert!(header.contains("extern TNifCallbacks NifCallbacks;\n"));
        assert!(header.contains("#define enif_alloc (NifCallbacks.enif_alloc)\n"));
        assert!(header.ends_with("#endif /* EXT_NIF_CALLBACKS_H */\n"));

        let alloc = header.find("(*enif_alloc)").unwrap();
        let fprintf = header.find("(*enif_fprintf)").unwrap();
        assert!(alloc < fprintf);
    }

    struct Full(usize);

    impl Write for Full {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            self.0 = self.0.checked_sub(s.len()).ok_or(fmt::Error)?;
            Ok(())
        }
    }

    #[test]
    fn test_write_error_is_returned() {
        let mut builder = Catalog::builder();
        builder
            .register("enif_alloc", Signature::new("*mut c_void").param("usize"))
            .unwrap();
        let catalog = builder.build();

        let mut out = Full(16);
        assert_eq!(
            write_header(&mut out, &catalog, &HeaderOptions::default()),
            Err(fmt::Error)
        );

        let mut out = Full(usize::MAX);
        assert_eq!(write_header(&mut out, &catalog, &HeaderOptions::default()), Ok(()));
    }
}
