use std::collections::HashMap;
use std::sync::Arc;

use scriptor_plugin::{RunOutcome, ScriptApi, ScriptInterpreter};

use crate::console::EchoConsole;

/// Language name served by this module.
pub const LANGUAGE: &str = "Echo";

const NO_API: &str = "host API has not been set";
const WRONG_API: &str = "host API is not an EchoConsole";

/// Interpreter for Echo scripts.
///
/// Variables assigned with `set` are interpreter globals: they stay visible
/// to every later run on the same instance.
pub struct EchoInterpreter {
    console: Result<Arc<EchoConsole>, &'static str>,
    globals: HashMap<String, String>,
}

impl EchoInterpreter {
    pub fn new() -> Self {
        Self {
            console: Err(NO_API),
            globals: HashMap::new(),
        }
    }

    pub fn global(&self, name: &str) -> Option<&str> {
        self.globals.get(name).map(String::as_str)
    }

    /// Substitute `$#`, `$1`..`$9` and `$name` in `text`.
    fn expand(&self, text: &str, params: &[String]) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }
            match chars.peek().copied() {
                Some('#') => {
                    chars.next();
                    out.push_str(&params.len().to_string());
                }
                Some(digit @ '1'..='9') => {
                    chars.next();
                    let index = usize::from(digit as u8 - b'1');
                    if let Some(param) = params.get(index) {
                        out.push_str(param);
                    }
                }
                Some(first) if is_name_start(first) => {
                    let mut name = String::new();
                    while let Some(&next) = chars.peek() {
                        if !is_name_char(next) {
                            break;
                        }
                        name.push(next);
                        chars.next();
                    }
                    if let Some(value) = self.globals.get(&name) {
                        out.push_str(value);
                    }
                }
                _ => out.push('$'),
            }
        }
        out
    }
}

impl Default for EchoInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptInterpreter for EchoInterpreter {
    fn set_script_api(&mut self, api: ScriptApi) {
        self.console = api.downcast::<EchoConsole>().map_err(|_| WRONG_API);
    }

    fn run(&mut self, script: &str, params: &[String]) -> RunOutcome {
        let console = match &self.console {
            Ok(console) => Arc::clone(console),
            Err(message) => return RunOutcome::Failure((*message).to_string()),
        };

        for (index, line) in script.lines().enumerate() {
            let number = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (keyword, rest) = split_word(line);
            match keyword {
                "print" => console.write_line(&self.expand(rest, params)),
                "set" => {
                    let (name, value) = split_word(rest);
                    if !is_name(name) {
                        return RunOutcome::Failure(format!(
                            "line {number}: invalid variable name '{name}'"
                        ));
                    }
                    let value = self.expand(value, params);
                    self.globals.insert(name.to_string(), value);
                }
                "exit" => {
                    let code = self.expand(rest, params);
                    let code = code.trim();
                    return match code.parse::<i32>() {
                        Ok(value) => RunOutcome::Success(value),
                        Err(_) => RunOutcome::Failure(format!(
                            "line {number}: invalid exit code '{code}'"
                        )),
                    };
                }
                "fail" => return RunOutcome::Failure(self.expand(rest, params)),
                other => {
                    return RunOutcome::Failure(format!(
                        "line {number}: unknown statement '{other}'"
                    ));
                }
            }
        }
        RunOutcome::Success(0)
    }

    fn language(&self) -> &str {
        LANGUAGE
    }
}

/// First whitespace-separated word and the remainder, leading blanks trimmed.
fn split_word(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (text, ""),
    }
}

fn is_name(text: &str) -> bool {
    text.starts_with(is_name_start) && text.chars().all(is_name_char)
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
