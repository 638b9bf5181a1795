//! Shared fixtures: an in-process test interpreter module that records what
//! the embedder does with it, and a logger that records every event.

#![allow(dead_code)]

use std::env::consts::DLL_EXTENSION;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use scriptor_core::{
    Configuration, EmbedderBuilder, InterpreterEntry, Logger, RunOutcome, ScriptApi, ScriptEntry,
    SerialEmbedder, StaticBackend,
};
use scriptor_plugin::{InterpreterPlugin, ScriptInterpreter};
use tempfile::TempDir;

pub const TEST_LANGUAGE: &str = "TestLanguage";
pub const OTHER_LANGUAGE: &str = "OtherLanguage";
pub const MISNAMED_MODULE: &str = "plugins/other_lang.txt";

/// Observations shared between the test and every module it loads.
#[derive(Default)]
pub struct Probe {
    pub opened: AtomicUsize,
    pub live: AtomicUsize,
    pub api_installs: AtomicUsize,
    pub last_api: Mutex<Option<ScriptApi>>,
    pub runs: Mutex<Vec<(String, Vec<String>)>>,
    pub next_failure: Mutex<Option<String>>,
}

impl Probe {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn api_installs(&self) -> usize {
        self.api_installs.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> Vec<(String, Vec<String>)> {
        self.runs.lock().unwrap().clone()
    }

    pub fn fail_next_run(&self, message: &str) {
        *self.next_failure.lock().unwrap() = Some(message.to_string());
    }
}

struct TestInterpreter {
    probe: Arc<Probe>,
    language: &'static str,
    api: Option<ScriptApi>,
    run_count: i32,
}

impl ScriptInterpreter for TestInterpreter {
    fn set_script_api(&mut self, api: ScriptApi) {
        self.probe.api_installs.fetch_add(1, Ordering::SeqCst);
        *self.probe.last_api.lock().unwrap() = Some(Arc::clone(&api));
        self.api = Some(api);
    }

    fn run(&mut self, script: &str, params: &[String]) -> RunOutcome {
        assert!(self.api.is_some(), "run before set_script_api");
        self.probe
            .runs
            .lock()
            .unwrap()
            .push((script.to_string(), params.to_vec()));
        if let Some(message) = self.probe.next_failure.lock().unwrap().take() {
            return RunOutcome::Failure(message);
        }
        // Interpreter-global state: survives between runs.
        self.run_count += 1;
        RunOutcome::Success(self.run_count)
    }

    fn language(&self) -> &str {
        self.language
    }
}

struct TestPlugin {
    probe: Arc<Probe>,
    language: &'static str,
}

impl TestPlugin {
    fn new(probe: &Arc<Probe>, language: &'static str) -> Self {
        probe.opened.fetch_add(1, Ordering::SeqCst);
        probe.live.fetch_add(1, Ordering::SeqCst);
        Self {
            probe: Arc::clone(probe),
            language,
        }
    }
}

impl Drop for TestPlugin {
    fn drop(&mut self) {
        self.probe.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InterpreterPlugin for TestPlugin {
    fn language(&self) -> &str {
        self.language
    }

    fn create_interpreter(&self) -> Box<dyn ScriptInterpreter> {
        Box::new(TestInterpreter {
            probe: Arc::clone(&self.probe),
            language: self.language,
            api: None,
            run_count: 0,
        })
    }
}

/// A path the configuration accepts as a dynamic library.
pub fn module_path(name: &str) -> PathBuf {
    PathBuf::from(format!("plugins/{name}.{DLL_EXTENSION}"))
}

/// Modules: `test_lang` and `test_lang_v2` serve [`TEST_LANGUAGE`],
/// `other_lang` serves [`OTHER_LANGUAGE`], `different` is not an interpreter
/// plugin. [`MISNAMED_MODULE`] also serves [`OTHER_LANGUAGE`] but is not named
/// like a library. Anything else fails to open.
pub fn backend(probe: &Arc<Probe>) -> StaticBackend {
    let mut backend = StaticBackend::new().with_foreign_module(module_path("different"));
    for (path, language) in [
        (module_path("test_lang"), TEST_LANGUAGE),
        (module_path("test_lang_v2"), TEST_LANGUAGE),
        (module_path("other_lang"), OTHER_LANGUAGE),
        (PathBuf::from(MISNAMED_MODULE), OTHER_LANGUAGE),
    ] {
        let probe = Arc::clone(probe);
        backend.register(path, move || {
            Box::new(TestPlugin::new(&probe, language))
        });
    }
    backend
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Message(String),
    Executed {
        id: u32,
        params: Vec<String>,
        return_value: i32,
    },
    Failed {
        id: u32,
        params: Vec<String>,
        error: String,
    },
}

#[derive(Default)]
pub struct RecordingLogger {
    events: Mutex<Vec<Event>>,
}

impl RecordingLogger {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Message(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn last_message(&self) -> Option<String> {
        self.messages().pop()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Logger for RecordingLogger {
    fn log_message(&self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Message(message.to_string()));
    }

    fn script_executed(&self, script: &ScriptEntry, params: &[String], return_value: i32) {
        self.events.lock().unwrap().push(Event::Executed {
            id: script.id,
            params: params.to_vec(),
            return_value,
        });
    }

    fn script_failed(&self, script: &ScriptEntry, params: &[String], error: &str) {
        self.events.lock().unwrap().push(Event::Failed {
            id: script.id,
            params: params.to_vec(),
            error: error.to_string(),
        });
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub probe: Arc<Probe>,
    pub logger: Arc<RecordingLogger>,
    pub api: ScriptApi,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            probe: Arc::new(Probe::default()),
            logger: Arc::new(RecordingLogger::default()),
            api: Arc::new(String::from("host api")),
        }
    }

    /// Write a script file into the fixture directory.
    pub fn script_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Host API plus the `test_lang` interpreter.
    pub fn base_configuration(&self) -> Configuration {
        Configuration::with_parts(
            Some(Arc::clone(&self.api)),
            [InterpreterEntry::new(TEST_LANGUAGE, module_path("test_lang"))],
            [],
        )
    }

    pub fn embedder(&self, conf: Configuration) -> SerialEmbedder {
        EmbedderBuilder::new(conf)
            .backend(backend(&self.probe))
            .logger(self.logger.clone())
            .build_serial()
    }

    pub fn params(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }
}
