//! Macros declaring dispatch tables and plugins, and wrappers around the
//! variadic term constructors.

/// Declares a dispatch table from a single ordered list of operations.
///
/// The list is the catalog definition: each entry becomes, in order,
///
/// * a field of the `#[repr(C)]` table struct holding an optional
///   `unsafe extern "C"` function pointer,
/// * an associated [`Slot`](crate::table::Slot) constant of the same name,
/// * an entry of the catalog returned by
///   [`FunctionTable::catalog`](crate::table::FunctionTable::catalog),
/// * a method of the API handle resolving the slot through a
///   [`Handle`](crate::session::Handle) and calling it.
///
/// New entries must only ever be appended. Entries may carry doc comments
/// and a single `#[cfg(..)]`. An entry marked `@variadic` takes C variadic
/// arguments; its API method returns the resolved function pointer instead of
/// forwarding. `#[link_name = ".."]` overrides the catalog name of an entry
/// whose name is a Rust keyword.
///
/// ```rust
/// use ext_nif_rs::{dispatch_table, table::FunctionTable};
///
/// dispatch_table! {
///     /// Callbacks of the demo host.
///     pub struct DemoCallbacks;
///     /// Calls into the demo host.
///     pub struct DemoApi;
///     prefix = "demo_";
///
///     /// Adds two numbers.
///     fn add(a: i32, b: i32) -> i32;
///     fn log(level: i32, message: *const std::ffi::c_char);
/// }
///
/// assert_eq!(DemoCallbacks::SLOTS, 2);
/// assert_eq!(DemoCallbacks::log.index(), 1);
/// assert_eq!(DemoCallbacks::catalog().slot_of("demo_add"), Some(0));
/// ```
///
/// Each operation is a field of the table, so registering a name twice does
/// not build:
///
/// ```compile_fail
/// ext_nif_rs::dispatch_table! {
///     pub struct TwiceCallbacks;
///     pub struct TwiceApi;
///     prefix = "twice_";
///
///     fn add(a: i32, b: i32) -> i32;
///     fn add(a: i32, b: i32) -> i32;
/// }
/// ```
#[macro_export]
macro_rules! dispatch_table {
    (
        $(#[$table_meta:meta])*
        $vis:vis struct $table:ident;
        $(#[$api_meta:meta])*
        $api_vis:vis struct $api:ident;
        prefix = $prefix:literal;

        $(
            $(#[doc = $doc:literal])*
            $(#[cfg($cfg:meta)])?
            $(#[link_name = $link:literal])?
            $(@$variadic:ident)? fn $name:ident($($arg:ident: $arg_ty:ty),* $(,)?) $(-> $ret:ty)?;
        )*
    ) => {
        $(#[$table_meta])*
        #[repr(C)]
        #[derive(Clone, Copy)]
        $vis struct $table {
            $(
                $(#[doc = $doc])*
                $(#[cfg($cfg)])?
                pub $name: ::core::option::Option<
                    $crate::__slot_fn!($($variadic)? ($($arg_ty),*) $(-> $ret)?)
                >,
            )*
        }

        #[allow(non_upper_case_globals)]
        impl $table {
            $(
                $(#[cfg($cfg)])?
                #[doc = concat!("Slot of the `", stringify!($name), "` operation.")]
                pub const $name: $crate::table::Slot<
                    Self,
                    $crate::__slot_fn!($($variadic)? ($($arg_ty),*) $(-> $ret)?),
                > = unsafe {
                    $crate::table::Slot::new(
                        ::core::mem::offset_of!(Self, $name)
                            / ::core::mem::size_of::<::core::option::Option<$crate::table::RawFn>>(),
                        $crate::__entry_name!($prefix, $name $(, $link)?),
                    )
                };
            )*
        }

        unsafe impl $crate::table::FunctionTable for $table {
            const SLOTS: usize = ::core::mem::size_of::<Self>()
                / ::core::mem::size_of::<::core::option::Option<$crate::table::RawFn>>();

            fn catalog() -> &'static $crate::catalog::Catalog {
                static CATALOG: $crate::once_cell::sync::Lazy<$crate::catalog::Catalog> =
                    $crate::once_cell::sync::Lazy::new(|| {
                        let mut builder = $crate::catalog::Catalog::builder();
                        $(
                            $(#[cfg($cfg)])?
                            {
                                let slot = builder
                                    .register(
                                        $table::$name.name(),
                                        $crate::__signature!($($variadic)? ($($arg_ty),*) $(-> $ret)?),
                                    )
                                    .expect("catalog entries are distinct struct fields");
                                debug_assert_eq!(slot, $table::$name.index());
                            }
                        )*
                        builder.build()
                    });
                &CATALOG
            }

            fn empty() -> Self {
                Self {
                    $(
                        $(#[cfg($cfg)])?
                        $name: None,
                    )*
                }
            }
        }

        impl ::core::fmt::Debug for $table {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.debug_struct(stringify!($table))
                    .field("slots", &<Self as $crate::table::FunctionTable>::SLOTS)
                    .finish_non_exhaustive()
            }
        }

        $(#[$api_meta])*
        #[derive(Debug, Clone, Copy)]
        $api_vis struct $api<'s>($crate::session::Handle<'s, $table>);

        impl<'s> $api<'s> {
            /// Wraps a session handle.
            #[must_use]
            pub fn new(handle: $crate::session::Handle<'s, $table>) -> Self {
                Self(handle)
            }

            /// Returns the underlying session handle.
            #[must_use]
            pub fn handle(&self) -> $crate::session::Handle<'s, $table> {
                self.0
            }

            $(
                $crate::__slot_method! {
                    [$($doc)*] [$($cfg)?] $table $($variadic)? $name($($arg: $arg_ty),*) $(-> $ret)?
                }
            )*
        }

        impl<'s> ::core::convert::From<$crate::session::Handle<'s, $table>> for $api<'s> {
            fn from(handle: $crate::session::Handle<'s, $table>) -> Self {
                Self(handle)
            }
        }
    };
}

/// INTERNAL: Function pointer type of a slot.
#[doc(hidden)]
#[macro_export]
macro_rules! __slot_fn {
    (variadic ($($arg_ty:ty),*) $(-> $ret:ty)?) => {
        unsafe extern "C" fn($($arg_ty,)* ...) $(-> $ret)?
    };
    (($($arg_ty:ty),*) $(-> $ret:ty)?) => {
        unsafe extern "C" fn($($arg_ty),*) $(-> $ret)?
    };
}

/// INTERNAL: Return type of a slot, `()` when omitted.
#[doc(hidden)]
#[macro_export]
macro_rules! __ret_ty {
    () => { () };
    ($ret:ty) => { $ret };
}

/// INTERNAL: Catalog name of an entry.
#[doc(hidden)]
#[macro_export]
macro_rules! __entry_name {
    ($prefix:literal, $name:ident, $link:literal) => {
        $link
    };
    ($prefix:literal, $name:ident) => {
        concat!($prefix, stringify!($name))
    };
}

/// INTERNAL: Catalog signature of an entry.
#[doc(hidden)]
#[macro_export]
macro_rules! __signature {
    (variadic ($($arg_ty:ty),*) $(-> $ret:ty)?) => {
        $crate::__signature!(($($arg_ty),*) $(-> $ret)?).variadic()
    };
    (($($arg_ty:ty),*)) => {
        $crate::catalog::Signature::new("()")
            $(.param(stringify!($arg_ty)))*
    };
    (($($arg_ty:ty),*) -> $ret:ty) => {
        $crate::catalog::Signature::new(stringify!($ret))
            $(.param(stringify!($arg_ty)))*
    };
}

/// INTERNAL: API handle method of an entry.
#[doc(hidden)]
#[macro_export]
macro_rules! __slot_method {
    (
        [$($doc:literal)*] [$($cfg:meta)?] $table:ident variadic
        $name:ident($($arg:ident: $arg_ty:ty),*) $(-> $ret:ty)?
    ) => {
        $(#[doc = $doc])*
        ///
        /// Takes C variadic arguments, so the resolved function pointer is
        /// returned instead of being called.
        ///
        /// # Errors
        ///
        /// Fails if the session was unbound or the table does not provide the
        /// slot.
        $(#[cfg($cfg)])?
        pub fn $name(
            &self,
        ) -> $crate::error::Result<$crate::__slot_fn!(variadic ($($arg_ty),*) $(-> $ret)?)> {
            self.0.resolve($table::$name)
        }
    };
    (
        [$($doc:literal)*] [$($cfg:meta)?] $table:ident
        $name:ident($($arg:ident: $arg_ty:ty),*) $(-> $ret:ty)?
    ) => {
        $(#[doc = $doc])*
        ///
        /// # Errors
        ///
        /// Fails if the session was unbound or the table does not provide the
        /// slot.
        ///
        /// # Safety
        ///
        /// The arguments are handed to the host unchecked and must satisfy the
        /// contract of the host operation.
        $(#[cfg($cfg)])?
        #[allow(clippy::too_many_arguments)]
        pub unsafe fn $name(
            &self,
            $($arg: $arg_ty),*
        ) -> $crate::error::Result<$crate::__ret_ty!($($ret)?)> {
            let function = self.0.resolve($table::$name)?;
            Ok(unsafe { function($($arg),*) })
        }
    };
}

/// Declares the descriptor of a plugin.
///
/// The init function receives the bound [`Session`](crate::session::Session)
/// and returns a [`Result`](crate::error::Result); the generated C entry point
/// reports success or failure to the host. A plugin calling into the host
/// after init stores the session in a
/// [`SessionSlot`](crate::session::SessionSlot) and takes it out again in its
/// unload function. With `export`, the descriptor is also exported under the
/// symbol `nif_plugin_info` so a host can find it in a dynamic library.
///
/// ```rust
/// use ext_nif_rs::{api::NifCallbacks, error::Result, nif_plugin, session::Session};
///
/// fn init(session: Session<'static, NifCallbacks>) -> Result<()> {
///     let _ = session.api();
///     Ok(())
/// }
///
/// nif_plugin! {
///     static PLUGIN: NifCallbacks = {
///         name: "demo",
///         required: 10,
///         init: init,
///     };
/// }
///
/// assert_eq!(PLUGIN.name().unwrap(), "demo");
/// ```
#[macro_export]
macro_rules! nif_plugin {
    (
        export static $ident:ident: $table:ty = {
            name: $name:literal,
            required: $required:expr,
            init: $init:path
            $(, unload: $unload:path)?
            $(,)?
        };
    ) => {
        $crate::nif_plugin! {
            static $ident: $table = {
                name: $name,
                required: $required,
                init: $init
                $(, unload: $unload)?
            };
        }

        /// Returns the descriptor of this plugin.
        #[unsafe(no_mangle)]
        pub extern "C" fn nif_plugin_info() -> *const $crate::negotiation::PluginInfo<$table> {
            &raw const $ident
        }
    };
    (
        $vis:vis static $ident:ident: $table:ty = {
            name: $name:literal,
            required: $required:expr,
            init: $init:path
            $(, unload: $unload:path)?
            $(,)?
        };
    ) => {
        $vis static $ident: $crate::negotiation::PluginInfo<$table> = {
            unsafe extern "C" fn __nif_plugin_init(
                record: *const $crate::negotiation::LoadRecord<$table>,
            ) -> ::std::ffi::c_int {
                unsafe { $crate::negotiation::run_init::<$table>(record, $required, $init) }
            }

            $crate::negotiation::PluginInfo {
                name: concat!($name, "\0").as_ptr().cast(),
                required_version: $required,
                init: Some(__nif_plugin_init),
                unload: $crate::__plugin_unload!($($unload)?),
            }
        };
    };
}

/// INTERNAL: Optional unload function of a plugin.
#[doc(hidden)]
#[macro_export]
macro_rules! __plugin_unload {
    () => {
        None
    };
    ($unload:path) => {{
        unsafe extern "C" fn __nif_plugin_unload() {
            $unload();
        }
        Some(__nif_plugin_unload)
    }};
}

/// Builds a tuple term from any number of terms.
///
/// Expands to a call to `make_tuple_from_array` on the given API handle and
/// must be used where that call is allowed, inside an `unsafe` block.
///
/// # Parameters
///
/// * `$api` - A [`NifApi`](crate::api::NifApi).
/// * `$env` - The environment the tuple is created in.
/// * ...`$term` - The elements.
#[macro_export]
macro_rules! make_tuple {
    ($api:expr, $env:expr $(, $term:expr)* $(,)?) => {
        $crate::_make_term!(make_tuple_from_array, $api, $env $(, $term)*)
    };
}

/// Builds a list term from any number of terms.
///
/// Expands to a call to `make_list_from_array` on the given API handle and
/// must be used where that call is allowed, inside an `unsafe` block.
///
/// # Parameters
///
/// * `$api` - A [`NifApi`](crate::api::NifApi).
/// * `$env` - The environment the list is created in.
/// * ...`$term` - The elements, head first.
#[macro_export]
macro_rules! make_list {
    ($api:expr, $env:expr $(, $term:expr)* $(,)?) => {
        $crate::_make_term!(make_list_from_array, $api, $env $(, $term)*)
    };
}

/// INTERNAL: Calls an array-taking term constructor with the number of terms
/// followed by the terms.
#[doc(hidden)]
#[macro_export]
macro_rules! _make_term {
    ($fn:ident, $api:expr, $env:expr $(, $term:expr)*) => {{
        let terms: [$crate::ffi::ERL_NIF_TERM; $crate::_make_term!(@COUNT; $($term),*)] = [$($term),*];
        $api.$fn(
            $env,
            terms.as_ptr(),
            $crate::_make_term!(@COUNT; $($term),*) as ::std::ffi::c_uint,
        )
    }};

    (@COUNT; $($term:expr),*) => {
        <[()]>::len(&[$($crate::_make_term!(@SUBST; $term)),*])
    };
    (@SUBST; $_:expr) => { () };
}
