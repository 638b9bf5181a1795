use crate::interpreter::ScriptInterpreter;

/// Interface identifier every module declaration must carry.
///
/// Includes the crate version, so a module compiled against another revision
/// of this ABI is rejected at load time instead of misbehaving at call time.
pub const INTERFACE_ID: &str = concat!("scriptor.InterpreterPlugin/", env!("CARGO_PKG_VERSION"));

/// Name of the data symbol exported by [`export_interpreter_plugin!`].
pub const PLUGIN_SYMBOL: &[u8] = b"SCRIPTOR_INTERPRETER_PLUGIN\0";

/// Factory for interpreters of one language.
pub trait InterpreterPlugin {
    /// Language this plugin provides interpreters for.
    fn language(&self) -> &str;

    /// Create a fresh interpreter instance.
    fn create_interpreter(&self) -> Box<dyn ScriptInterpreter>;
}

/// Entry point exported by an interpreter module.
#[repr(C)]
pub struct PluginDeclaration {
    pub interface_id: &'static str,
    pub create: fn() -> Box<dyn InterpreterPlugin>,
}

impl PluginDeclaration {
    /// True when the declaration was built against this ABI revision.
    pub fn is_compatible(&self) -> bool {
        self.interface_id == INTERFACE_ID
    }
}

/// Export an [`InterpreterPlugin`] from a `cdylib` crate.
///
/// The argument is an expression evaluated each time the host loads the
/// module.
#[macro_export]
macro_rules! export_interpreter_plugin {
    ($plugin:expr) => {
        #[doc(hidden)]
        fn __scriptor_create_plugin() -> ::std::boxed::Box<dyn $crate::InterpreterPlugin> {
            ::std::boxed::Box::new($plugin)
        }

        #[doc(hidden)]
        #[unsafe(no_mangle)]
        pub static SCRIPTOR_INTERPRETER_PLUGIN: $crate::PluginDeclaration =
            $crate::PluginDeclaration {
                interface_id: $crate::INTERFACE_ID,
                create: __scriptor_create_plugin,
            };
    };
}
