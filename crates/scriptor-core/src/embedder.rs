use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use scriptor_plugin::{RunOutcome, ScriptApi};

use crate::backend::{DylibBackend, ModuleBackend};
use crate::configuration::{
    Configuration, InterpreterEntry, ScriptEntry, is_loadable_module_path,
};
use crate::error::{ConfigError, EmbedderError, ExecuteError, LoadError};
use crate::loader::{Interpreter, ModuleLoader};
use crate::logger::Logger;

/// Runs configured scripts through their language's interpreter.
pub trait ScriptEmbedder {
    /// Tear everything down and rebuild from `conf`. All or nothing: on
    /// failure the embedder is left invalid with an empty configuration.
    fn reset(&mut self, conf: Configuration) -> Result<(), EmbedderError>;

    /// Committed configuration; empty while invalid.
    fn configuration(&self) -> &Configuration;

    fn is_valid(&self) -> bool;

    /// Message of the last failed reset, empty when valid.
    fn error_string(&self) -> String;

    /// Run script `script_id`, reporting the outcome to the logger.
    fn execute(&mut self, script_id: u32, params: &[String]) -> Result<i32, ExecuteError>;

    fn add_script(&mut self, script: ScriptEntry) -> Result<(), EmbedderError>;

    fn remove_script(&mut self, script_id: u32) -> Option<ScriptEntry>;

    fn add_interpreter(&mut self, interpreter: InterpreterEntry) -> Result<(), EmbedderError>;

    /// Install or clear the observer.
    fn set_logger(&mut self, logger: Option<Arc<dyn Logger>>);
}

/// The interpreter serving one language, plus the loader owning its module.
struct ActiveInterpreter {
    // Dropped before `loader`.
    interpreter: Interpreter,
    loader: ModuleLoader,
}

impl ActiveInterpreter {
    fn load(
        entry: InterpreterEntry,
        backend: &Arc<dyn ModuleBackend>,
        api: &ScriptApi,
    ) -> Result<Self, LoadError> {
        let mut loader = ModuleLoader::new(entry, Arc::clone(backend));
        let factory = loader.instance()?;
        let mut interpreter = factory.create_interpreter();
        interpreter.set_script_api(Arc::clone(api));
        Ok(Self {
            interpreter,
            loader,
        })
    }

    fn unload(self) {
        let Self {
            interpreter,
            mut loader,
        } = self;
        drop(interpreter);
        loader.unload();
    }
}

/// Synchronous embedder: one interpreter per language, scripts run on the
/// caller's thread.
///
/// Interpreters are long-lived and shared by all scripts of their language,
/// so whatever a script leaves in its interpreter's global state is visible
/// to the next script run there.
pub struct SerialEmbedder {
    configuration: Configuration,
    interpreters: BTreeMap<String, ActiveInterpreter>,
    cache: HashMap<u32, String>,
    last_error: Option<EmbedderError>,
    logger: Option<Arc<dyn Logger>>,
    backend: Arc<dyn ModuleBackend>,
}

impl SerialEmbedder {
    /// Build an embedder loading modules from dynamic libraries.
    ///
    /// The outcome of applying `conf` is available through
    /// [`is_valid`](ScriptEmbedder::is_valid) and
    /// [`error_string`](ScriptEmbedder::error_string).
    pub fn new(conf: Configuration) -> Self {
        Self::with_backend(conf, Arc::new(DylibBackend), None)
    }

    pub fn with_backend(
        conf: Configuration,
        backend: Arc<dyn ModuleBackend>,
        logger: Option<Arc<dyn Logger>>,
    ) -> Self {
        let mut embedder = Self {
            configuration: Configuration::default(),
            interpreters: BTreeMap::new(),
            cache: HashMap::new(),
            last_error: None,
            logger,
            backend,
        };
        // The result is kept in `last_error`.
        let _ = embedder.reset(conf);
        embedder
    }

    /// Languages with a loaded interpreter, in ascending order.
    pub fn loaded_languages(&self) -> impl Iterator<Item = &str> {
        self.interpreters.keys().map(String::as_str)
    }

    pub fn is_cached(&self, script_id: u32) -> bool {
        self.cache.contains_key(&script_id)
    }

    fn clear(&mut self) {
        for (language, active) in std::mem::take(&mut self.interpreters) {
            tracing::debug!(language = %language, "Dropping interpreter");
            active.unload();
        }
        self.cache.clear();
        self.configuration = Configuration::default();
    }

    fn apply(&mut self, conf: Configuration) -> Result<(), EmbedderError> {
        conf.validate().map_err(EmbedderError::InvalidConfiguration)?;
        let api = conf
            .script_api()
            .cloned()
            .ok_or(EmbedderError::InvalidConfiguration(ConfigError::MissingScriptApi))?;

        for entry in conf.interpreters().values() {
            let active = ActiveInterpreter::load(entry.clone(), &self.backend, &api)
                .map_err(EmbedderError::ConfigurationFailed)?;
            self.interpreters.insert(entry.language.clone(), active);
        }

        for script in conf.scripts().values().filter(|s| s.cache_in_memory) {
            let source = read_script(&script.path).ok_or_else(|| {
                EmbedderError::UnreadableCachedSource {
                    id: script.id,
                    path: script.path.clone(),
                }
            })?;
            tracing::debug!(script_id = script.id, bytes = source.len(), "Script cached");
            self.cache.insert(script.id, source);
        }

        self.configuration = conf;
        Ok(())
    }

    fn run_script(&mut self, script: &ScriptEntry, params: &[String]) -> Result<i32, ExecuteError> {
        let source = match self.cache.get(&script.id) {
            Some(cached) if script.cache_in_memory => Cow::Borrowed(cached.as_str()),
            _ => Cow::Owned(
                read_script(&script.path)
                    .ok_or_else(|| ExecuteError::UnreadableScript(script.path.clone()))?,
            ),
        };
        // Unreachable while every committed script has a loaded interpreter.
        let active = self
            .interpreters
            .get_mut(&script.language)
            .ok_or_else(|| ExecuteError::NoInterpreter(script.language.clone()))?;

        match active.interpreter.run(&source, params) {
            RunOutcome::Success(value) => Ok(value),
            RunOutcome::Failure(message) => Err(ExecuteError::ScriptFailed(message)),
        }
    }

    fn log(&self, message: &str) {
        if let Some(logger) = &self.logger {
            logger.log_message(message);
        }
    }

    fn fail(&self, err: EmbedderError) -> Result<(), EmbedderError> {
        tracing::warn!(error = %err, "Embedder operation failed");
        self.log(&err.to_string());
        Err(err)
    }
}

impl ScriptEmbedder for SerialEmbedder {
    fn reset(&mut self, conf: Configuration) -> Result<(), EmbedderError> {
        self.clear();
        match self.apply(conf) {
            Ok(()) => {
                self.last_error = None;
                tracing::info!(
                    interpreters = self.interpreters.len(),
                    scripts = self.configuration.scripts().len(),
                    "Configuration applied"
                );
                self.log("Configuration set successfully.");
                Ok(())
            }
            Err(err) => {
                self.clear();
                self.last_error = Some(err.clone());
                self.fail(err)
            }
        }
    }

    fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    fn is_valid(&self) -> bool {
        self.last_error.is_none()
    }

    fn error_string(&self) -> String {
        self.last_error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    fn execute(&mut self, script_id: u32, params: &[String]) -> Result<i32, ExecuteError> {
        let Some(script) = self.configuration.script(script_id).cloned() else {
            let err = ExecuteError::NoSuchScript(script_id);
            tracing::warn!(script_id, "Unknown script requested");
            if let Some(logger) = &self.logger {
                let placeholder = ScriptEntry {
                    id: script_id,
                    ..ScriptEntry::default()
                };
                logger.script_failed(&placeholder, params, &err.to_string());
            }
            return Err(err);
        };

        tracing::debug!(script_id, language = %script.language, "Executing script");
        let result = self.run_script(&script, params);
        match &result {
            Ok(value) => {
                tracing::info!(script_id, return_value = *value, "Script finished");
                if let Some(logger) = &self.logger {
                    logger.script_executed(&script, params, *value);
                }
            }
            Err(err) => {
                tracing::warn!(script_id, error = %err, "Script failed");
                if let Some(logger) = &self.logger {
                    logger.script_failed(&script, params, &err.to_string());
                }
            }
        }
        result
    }

    fn add_script(&mut self, script: ScriptEntry) -> Result<(), EmbedderError> {
        let previous = self.configuration.script(script.id);
        if previous == Some(&script) {
            self.log(&format!("Script '{}' already exists.", script.id));
            return Ok(());
        }
        let replacing = previous.is_some();

        if !self.interpreters.contains_key(&script.language) {
            return self.fail(EmbedderError::NoSuitableInterpreter {
                id: script.id,
                language: script.language,
            });
        }
        if !script.path.exists() {
            return self.fail(EmbedderError::MissingScriptFile { path: script.path });
        }

        if script.cache_in_memory {
            let Some(source) = read_script(&script.path) else {
                return self.fail(EmbedderError::UnreadableScript {
                    id: script.id,
                    path: script.path,
                });
            };
            self.cache.insert(script.id, source);
        } else {
            self.cache.remove(&script.id);
        }

        let id = script.id;
        self.configuration.add_script(script);
        let verb = if replacing { "replaced" } else { "added" };
        tracing::info!(script_id = id, verb, "Script registered");
        self.log(&format!("Script '{id}' {verb}."));
        Ok(())
    }

    fn remove_script(&mut self, script_id: u32) -> Option<ScriptEntry> {
        let Some(removed) = self.configuration.remove_script(script_id) else {
            self.log(&format!(
                "Could not remove script '{script_id}': No such script."
            ));
            return None;
        };
        self.cache.remove(&script_id);
        tracing::info!(script_id, "Script removed");
        self.log(&format!("Script '{script_id}' removed."));
        Some(removed)
    }

    fn add_interpreter(&mut self, interpreter: InterpreterEntry) -> Result<(), EmbedderError> {
        let already_active = self
            .interpreters
            .get(&interpreter.language)
            .is_some_and(|active| active.loader.entry() == &interpreter);
        if already_active {
            self.log(&format!(
                "Interpreter for '{}' already exists.",
                interpreter.language
            ));
            return Ok(());
        }

        if !is_loadable_module_path(&interpreter.module_path) {
            return self.fail(EmbedderError::InvalidModulePath {
                path: interpreter.module_path,
            });
        }
        let Some(api) = self.configuration.script_api().cloned() else {
            return self.fail(EmbedderError::MissingScriptApi);
        };
        let active = match ActiveInterpreter::load(interpreter.clone(), &self.backend, &api) {
            Ok(active) => active,
            Err(err) => return self.fail(EmbedderError::AddInterpreter(err)),
        };

        let language = interpreter.language.clone();
        let replacing = match self.interpreters.insert(language.clone(), active) {
            Some(previous) => {
                previous.unload();
                true
            }
            None => false,
        };
        self.configuration.add_interpreter(interpreter);
        let verb = if replacing { "replaced" } else { "added" };
        tracing::info!(language = %language, verb, "Interpreter registered");
        self.log(&format!("Interpreter for '{language}' {verb}."));
        Ok(())
    }

    fn set_logger(&mut self, logger: Option<Arc<dyn Logger>>) {
        self.logger = logger;
    }
}

/// Whole-file read. Empty files count as unreadable.
fn read_script(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(source) if !source.is_empty() => Some(source),
        Ok(_) => {
            tracing::debug!(path = %path.display(), "Script file is empty");
            None
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Script file does not open");
            None
        }
    }
}
