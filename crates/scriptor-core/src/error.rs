use std::path::PathBuf;

use thiserror::Error;

/// First violated rule of a [`Configuration`](crate::Configuration).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Script API has not been set.")]
    MissingScriptApi,

    #[error("At least one interpreter has to be set.")]
    NoInterpreters,

    #[error("No suitable interpreter for '{language}' required by script(id={id}).")]
    NoSuitableInterpreter { id: u32, language: String },

    #[error("Path '{}' for script(id={id}) does not exist.", .path.display())]
    MissingScriptFile { id: u32, path: PathBuf },

    #[error("Module path '{}' of the '{language}' interpreter is not a loadable library.", .path.display())]
    InvalidModulePath { language: String, path: PathBuf },
}

/// Raised by a [`ModuleBackend`](crate::backend::ModuleBackend) that could not
/// produce a module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("{0}")]
    Open(String),

    #[error("{0}")]
    Interface(String),
}

/// Failure of [`ModuleLoader::instance`](crate::loader::ModuleLoader::instance).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Failed to load {language} plugin '{}': {reason}", .path.display())]
    Open {
        language: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Plugin '{}' is not an interpreter plugin", .path.display())]
    Interface { path: PathBuf },

    #[error("Plugin '{}' is not for desired language '{expected}'", .path.display())]
    LanguageMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
}

/// Failure of a reconfiguring embedder operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbedderError {
    #[error("Configuration failed: {0}")]
    InvalidConfiguration(ConfigError),

    #[error("Configuration failed: {0}.")]
    ConfigurationFailed(LoadError),

    #[error("Configuration failed: source file '{}' for script '{id}' does not open or is empty.", .path.display())]
    UnreadableCachedSource { id: u32, path: PathBuf },

    #[error("Could not add script '{id}': No suitable interpreter for language '{language}'.")]
    NoSuitableInterpreter { id: u32, language: String },

    #[error("Could not add script: file '{}' does not exist.", .path.display())]
    MissingScriptFile { path: PathBuf },

    #[error("Could not add script {id}: File '{}' does not open or is empty.", .path.display())]
    UnreadableScript { id: u32, path: PathBuf },

    #[error("Could not add interpreter: {0}.")]
    AddInterpreter(LoadError),

    #[error("Could not add interpreter: script API has not been set.")]
    MissingScriptApi,

    #[error("Could not add interpreter: module path '{}' is not a loadable library.", .path.display())]
    InvalidModulePath { path: PathBuf },
}

/// Failure of a single script execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecuteError {
    #[error("Script '{0}' does not exist.")]
    NoSuchScript(u32),

    #[error("File '{}' does not open or is empty.", .0.display())]
    UnreadableScript(PathBuf),

    #[error("No interpreter is loaded for language '{0}'.")]
    NoInterpreter(String),

    /// Error reported by the interpreter itself.
    #[error("{0}")]
    ScriptFailed(String),
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("cannot read manifest '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest: {0}")]
    Parse(#[from] toml::de::Error),
}
