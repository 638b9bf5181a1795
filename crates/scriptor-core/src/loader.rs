use std::sync::Arc;

use scriptor_plugin::{RunOutcome, ScriptApi, ScriptInterpreter};

use crate::backend::{LoadedModule, ModuleBackend};
use crate::configuration::InterpreterEntry;
use crate::error::{BackendError, LoadError};

/// Loads, verifies and unloads the module behind one [`InterpreterEntry`].
pub struct ModuleLoader {
    entry: InterpreterEntry,
    backend: Arc<dyn ModuleBackend>,
    module: Option<Arc<LoadedModule>>,
    error: Option<LoadError>,
}

impl ModuleLoader {
    pub fn new(entry: InterpreterEntry, backend: Arc<dyn ModuleBackend>) -> Self {
        Self {
            entry,
            backend,
            module: None,
            error: None,
        }
    }

    pub fn entry(&self) -> &InterpreterEntry {
        &self.entry
    }

    pub fn is_loaded(&self) -> bool {
        self.module.is_some()
    }

    /// Load the module if needed and return its interpreter factory.
    ///
    /// Calling this again while loaded hands out the same module without
    /// reopening it. On failure nothing stays loaded.
    pub fn instance(&mut self) -> Result<InterpreterFactory, LoadError> {
        if let Some(module) = &self.module {
            return Ok(InterpreterFactory {
                module: Arc::clone(module),
            });
        }

        match self.open_verified() {
            Ok(module) => {
                let module = Arc::new(module);
                self.module = Some(Arc::clone(&module));
                self.error = None;
                tracing::info!(
                    language = %self.entry.language,
                    path = %self.entry.module_path.display(),
                    "Interpreter module loaded"
                );
                Ok(InterpreterFactory { module })
            }
            Err(err) => {
                tracing::warn!(
                    language = %self.entry.language,
                    path = %self.entry.module_path.display(),
                    error = %err,
                    "Interpreter module rejected"
                );
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn open_verified(&self) -> Result<LoadedModule, LoadError> {
        let path = &self.entry.module_path;
        let module = self.backend.open(path).map_err(|e| match e {
            BackendError::Open(reason) => LoadError::Open {
                language: self.entry.language.clone(),
                path: path.clone(),
                reason,
            },
            BackendError::Interface(reason) => {
                tracing::debug!(path = %path.display(), reason = %reason, "Interface check failed");
                LoadError::Interface { path: path.clone() }
            }
        })?;

        let found = module.plugin().language();
        if found != self.entry.language {
            // `module` is dropped here, which closes the library again.
            return Err(LoadError::LanguageMismatch {
                path: path.clone(),
                expected: self.entry.language.clone(),
                found: found.to_string(),
            });
        }
        Ok(module)
    }

    /// Release the loader's hold on the module. No-op when not loaded.
    ///
    /// Interpreters created from the module keep it mapped until they are
    /// dropped, so none of them can outlive the code they run.
    pub fn unload(&mut self) {
        if self.module.take().is_some() {
            tracing::info!(
                language = %self.entry.language,
                path = %self.entry.module_path.display(),
                "Interpreter module unloaded"
            );
        }
    }

    pub fn last_error(&self) -> Option<&LoadError> {
        self.error.as_ref()
    }

    /// Message of the last failed [`instance`](Self::instance), empty after a
    /// success.
    pub fn error_string(&self) -> String {
        self.error.as_ref().map(ToString::to_string).unwrap_or_default()
    }
}

/// Creates interpreters from a loaded module.
#[derive(Clone)]
pub struct InterpreterFactory {
    module: Arc<LoadedModule>,
}

impl InterpreterFactory {
    pub fn language(&self) -> &str {
        self.module.plugin().language()
    }

    pub fn create_interpreter(&self) -> Interpreter {
        Interpreter {
            inner: self.module.plugin().create_interpreter(),
            _module: Arc::clone(&self.module),
        }
    }
}

/// A live interpreter instance that keeps its module loaded.
pub struct Interpreter {
    // Dropped before `_module`.
    inner: Box<dyn ScriptInterpreter>,
    _module: Arc<LoadedModule>,
}

impl Interpreter {
    pub fn set_script_api(&mut self, api: ScriptApi) {
        self.inner.set_script_api(api);
    }

    pub fn run(&mut self, script: &str, params: &[String]) -> RunOutcome {
        self.inner.run(script, params)
    }

    pub fn language(&self) -> &str {
        self.inner.language()
    }
}
