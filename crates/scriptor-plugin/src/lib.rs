//! Interpreter plugin ABI for scriptor.
//!
//! A loadable interpreter module implements [`InterpreterPlugin`] and exports
//! it with [`export_interpreter_plugin!`]. The host opens the module, finds
//! the exported [`PluginDeclaration`], checks its [`INTERFACE_ID`] and asks
//! the plugin for [`ScriptInterpreter`] instances.
//!
//! # Writing a module
//!
//! ```rust
//! use scriptor_plugin::{
//!     InterpreterPlugin, RunOutcome, ScriptApi, ScriptInterpreter, export_interpreter_plugin,
//! };
//!
//! #[derive(Default)]
//! struct Noop;
//!
//! impl ScriptInterpreter for Noop {
//!     fn set_script_api(&mut self, _api: ScriptApi) {}
//!     fn run(&mut self, _script: &str, params: &[String]) -> RunOutcome {
//!         RunOutcome::Success(params.len() as i32)
//!     }
//!     fn language(&self) -> &str {
//!         "Noop"
//!     }
//! }
//!
//! #[derive(Default)]
//! struct NoopPlugin;
//!
//! impl InterpreterPlugin for NoopPlugin {
//!     fn language(&self) -> &str {
//!         "Noop"
//!     }
//!     fn create_interpreter(&self) -> Box<dyn ScriptInterpreter> {
//!         Box::new(Noop)
//!     }
//! }
//!
//! export_interpreter_plugin!(NoopPlugin::default());
//! ```

pub mod interpreter;
pub mod plugin;

pub use interpreter::{RunOutcome, ScriptApi, ScriptInterpreter};
pub use plugin::{INTERFACE_ID, InterpreterPlugin, PLUGIN_SYMBOL, PluginDeclaration};
