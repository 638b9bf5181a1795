//! Echo interpreter module for scriptor.
//!
//! Built as a `cdylib` this is a loadable interpreter module for the
//! `"Echo"` language; built as an `rlib` it provides [`EchoConsole`], the
//! script API type hosts hand to Echo interpreters.
//!
//! Echo runs one statement per line:
//!
//! ```text
//! # Lines starting with '#' and blank lines are skipped.
//! set name $1
//! print hello $name ($# args)
//! exit 3
//! ```
//!
//! `set` assigns an interpreter global that survives between runs, `fail
//! <text>` stops the script with a failure and `exit <n>` with return value
//! `n`. A script reaching its end returns 0.

mod console;
mod interpreter;

pub use console::EchoConsole;
pub use interpreter::{EchoInterpreter, LANGUAGE};

use scriptor_plugin::{InterpreterPlugin, ScriptInterpreter, export_interpreter_plugin};

/// Plugin handing out [`EchoInterpreter`]s.
#[derive(Debug, Default)]
pub struct EchoPlugin;

impl InterpreterPlugin for EchoPlugin {
    fn language(&self) -> &str {
        LANGUAGE
    }

    fn create_interpreter(&self) -> Box<dyn ScriptInterpreter> {
        Box::new(EchoInterpreter::new())
    }
}

export_interpreter_plugin!(EchoPlugin);
