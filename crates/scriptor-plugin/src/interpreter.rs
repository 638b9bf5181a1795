use std::any::Any;
use std::sync::Arc;

/// Host callback API handed to every interpreter.
///
/// The host decides the concrete type; interpreters downcast it to the API
/// type they were written against. The embedder never looks inside.
pub type ScriptApi = Arc<dyn Any + Send + Sync>;

/// Outcome of a single script run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The script finished and produced a return value.
    Success(i32),
    /// The script raised an error (syntax error, uncaught exception, ...).
    Failure(String),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success(_))
    }
}

/// A live interpreter for one scripting language.
///
/// One instance serves every run of its language, so state the interpreter
/// keeps between runs (globals, loaded libraries) stays visible to later
/// scripts.
pub trait ScriptInterpreter {
    /// Install the host API. Called once per instance, before the first `run`.
    fn set_script_api(&mut self, api: ScriptApi);

    /// Run `script` with positional `params`. Blocks until the script ends.
    fn run(&mut self, script: &str, params: &[String]) -> RunOutcome;

    /// Language served by this interpreter.
    fn language(&self) -> &str;
}
