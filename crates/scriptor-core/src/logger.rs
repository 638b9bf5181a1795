use crate::configuration::ScriptEntry;

/// Observer for embedder activity.
///
/// Called synchronously from inside embedder operations.
pub trait Logger: Send + Sync {
    /// Configuration changes and operation failures.
    fn log_message(&self, message: &str);

    fn script_executed(&self, script: &ScriptEntry, params: &[String], return_value: i32);

    fn script_failed(&self, script: &ScriptEntry, params: &[String], error: &str);
}

/// Forwards observer events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log_message(&self, message: &str) {
        tracing::info!(target: "scriptor", "{message}");
    }

    fn script_executed(&self, script: &ScriptEntry, params: &[String], return_value: i32) {
        tracing::info!(
            target: "scriptor",
            script_id = script.id,
            language = %script.language,
            params = ?params,
            return_value,
            "Script executed"
        );
    }

    fn script_failed(&self, script: &ScriptEntry, params: &[String], error: &str) {
        tracing::warn!(
            target: "scriptor",
            script_id = script.id,
            language = %script.language,
            params = ?params,
            error,
            "Script failed"
        );
    }
}
