use std::collections::HashMap;
use std::path::{Path, PathBuf};

use libloading::Library;
use scriptor_plugin::{INTERFACE_ID, InterpreterPlugin, PLUGIN_SYMBOL, PluginDeclaration};

use crate::error::BackendError;

/// An opened interpreter module whose plugin interface has been verified.
///
/// Field order matters: the plugin (code living inside the library) is
/// dropped before the library is closed.
pub struct LoadedModule {
    plugin: Box<dyn InterpreterPlugin>,
    _library: Option<Library>,
}

impl LoadedModule {
    /// A module backed by code linked into the host.
    pub fn from_plugin(plugin: Box<dyn InterpreterPlugin>) -> Self {
        Self {
            plugin,
            _library: None,
        }
    }

    fn from_library(plugin: Box<dyn InterpreterPlugin>, library: Library) -> Self {
        Self {
            plugin,
            _library: Some(library),
        }
    }

    pub fn plugin(&self) -> &dyn InterpreterPlugin {
        self.plugin.as_ref()
    }
}

/// Opens interpreter modules by path.
pub trait ModuleBackend: Send + Sync {
    /// Open the module at `path` and verify it exports the interpreter plugin
    /// interface. Whatever was opened must be released again on error.
    fn open(&self, path: &Path) -> Result<LoadedModule, BackendError>;
}

/// Loads interpreter modules with the platform's dynamic loader.
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibBackend;

impl ModuleBackend for DylibBackend {
    fn open(&self, path: &Path) -> Result<LoadedModule, BackendError> {
        // SAFETY: running a library's initialisers is inherent to loading an
        // interpreter module; the configuration names trusted modules only.
        let library =
            unsafe { Library::new(path) }.map_err(|e| BackendError::Open(e.to_string()))?;

        // SAFETY: the symbol is the `PluginDeclaration` static emitted by
        // `export_interpreter_plugin!`. Its name is specific to this ABI, and
        // the interface id is compared before anything else is called.
        let create = unsafe {
            let symbol = library
                .get::<*const PluginDeclaration>(PLUGIN_SYMBOL)
                .map_err(|e| BackendError::Interface(format!("no plugin declaration: {e}")))?;
            let declaration: &PluginDeclaration = &**symbol;
            if !declaration.is_compatible() {
                return Err(BackendError::Interface(format!(
                    "declares interface '{}', expected '{INTERFACE_ID}'",
                    declaration.interface_id
                )));
            }
            declaration.create
        };

        let plugin = create();
        tracing::debug!(path = %path.display(), language = plugin.language(), "Dynamic module opened");
        Ok(LoadedModule::from_library(plugin, library))
    }
}

type PluginConstructor = Box<dyn Fn() -> Box<dyn InterpreterPlugin> + Send + Sync>;

enum StaticModule {
    Plugin(PluginConstructor),
    /// Opens fine but exports no interpreter plugin.
    Foreign,
}

/// In-process module registry keyed by module path.
///
/// Lets hosts link interpreters statically while keeping the configuration
/// format unchanged, and gives tests a loader without dynamic libraries.
#[derive(Default)]
pub struct StaticBackend {
    modules: HashMap<PathBuf, StaticModule>,
}

impl StaticBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `path` with plugins built by `constructor`, once per open.
    pub fn with_module<F>(mut self, path: impl Into<PathBuf>, constructor: F) -> Self
    where
        F: Fn() -> Box<dyn InterpreterPlugin> + Send + Sync + 'static,
    {
        self.register(path, constructor);
        self
    }

    /// Serve `path` as a module lacking the interpreter plugin interface.
    pub fn with_foreign_module(mut self, path: impl Into<PathBuf>) -> Self {
        self.modules.insert(path.into(), StaticModule::Foreign);
        self
    }

    pub fn register<F>(&mut self, path: impl Into<PathBuf>, constructor: F)
    where
        F: Fn() -> Box<dyn InterpreterPlugin> + Send + Sync + 'static,
    {
        self.modules
            .insert(path.into(), StaticModule::Plugin(Box::new(constructor)));
    }
}

impl ModuleBackend for StaticBackend {
    fn open(&self, path: &Path) -> Result<LoadedModule, BackendError> {
        match self.modules.get(path) {
            Some(StaticModule::Plugin(constructor)) => Ok(LoadedModule::from_plugin(constructor())),
            Some(StaticModule::Foreign) => Err(BackendError::Interface(
                "no plugin declaration".into(),
            )),
            None => Err(BackendError::Open(format!(
                "no module registered at '{}'",
                path.display()
            ))),
        }
    }
}
