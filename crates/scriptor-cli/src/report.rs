use std::io::Write;
use std::sync::Mutex;

use scriptor_core::{Logger, ScriptEntry};
use serde::Serialize;

/// One embedder event, as emitted by [`JsonLogger`].
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Report<'a> {
    Message {
        message: &'a str,
    },
    Executed {
        script_id: u32,
        language: &'a str,
        params: &'a [String],
        return_value: i32,
    },
    Failed {
        script_id: u32,
        language: &'a str,
        params: &'a [String],
        error: &'a str,
    },
}

/// Writes embedder events as one JSON object per line.
pub struct JsonLogger<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLogger<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, report: &Report<'_>) {
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        let written = serde_json::to_writer(&mut *out, report)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(out));
        if let Err(e) = written {
            tracing::warn!(error = %e, "Failed to write report");
        }
    }
}

impl<W: Write + Send> Logger for JsonLogger<W> {
    fn log_message(&self, message: &str) {
        self.emit(&Report::Message { message });
    }

    fn script_executed(&self, script: &ScriptEntry, params: &[String], return_value: i32) {
        self.emit(&Report::Executed {
            script_id: script.id,
            language: &script.language,
            params,
            return_value,
        });
    }

    fn script_failed(&self, script: &ScriptEntry, params: &[String], error: &str) {
        self.emit(&Report::Failed {
            script_id: script.id,
            language: &script.language,
            params,
            error,
        });
    }
}

/// Writes embedder events as plain text lines.
pub struct TextLogger<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> TextLogger<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn line(&self, text: &str) {
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        if let Err(e) = writeln!(out, "{text}") {
            tracing::warn!(error = %e, "Failed to write report");
        }
    }
}

impl<W: Write + Send> Logger for TextLogger<W> {
    fn log_message(&self, message: &str) {
        self.line(message);
    }

    fn script_executed(&self, script: &ScriptEntry, _params: &[String], return_value: i32) {
        self.line(&format!("script {} returned {return_value}", script.id));
    }

    fn script_failed(&self, script: &ScriptEntry, _params: &[String], error: &str) {
        self.line(&format!("script {} failed: {error}", script.id));
    }
}
