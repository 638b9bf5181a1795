use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

type Sink = Box<dyn Fn(&str) + Send + Sync>;

/// Host console exposed to Echo scripts.
///
/// Hosts hand one of these to the embedder as the script API; `print`
/// statements end up in its sink.
pub struct EchoConsole {
    sink: Sink,
}

impl EchoConsole {
    pub fn new(sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }

    /// Console printing one line per statement to stdout.
    pub fn stdout() -> Self {
        Self::new(|line| {
            let mut out = std::io::stdout().lock();
            // A closed stdout is not the script's problem.
            let _ = writeln!(out, "{line}");
        })
    }

    /// Console collecting printed lines in memory.
    pub fn capture() -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let console = Self::new(move |line| {
            if let Ok(mut lines) = sink.lock() {
                lines.push(line.to_string());
            }
        });
        (console, lines)
    }

    pub fn write_line(&self, line: &str) {
        (self.sink)(line);
    }
}

impl fmt::Debug for EchoConsole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EchoConsole").finish_non_exhaustive()
    }
}
