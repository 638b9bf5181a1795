use std::path::{Path, PathBuf};

use scriptor_plugin::ScriptApi;
use serde::Deserialize;

use crate::configuration::{Configuration, InterpreterEntry, ScriptEntry};
use crate::error::ManifestError;

pub const MANIFEST_FILE: &str = "scriptor.toml";

/// Interpreters and scripts described in TOML.
///
/// ```toml
/// [[interpreter]]
/// language = "Echo"
/// module = "plugins/libscriptor_echo.so"
///
/// [[script]]
/// id = 1
/// path = "scripts/hello.echo"
/// language = "Echo"
/// cache_in_memory = true
/// ```
///
/// The host API is not part of the manifest; it is attached by
/// [`into_configuration`](Self::into_configuration).
#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "interpreter")]
    pub interpreters: Vec<InterpreterEntry>,
    #[serde(default, rename = "script")]
    pub scripts: Vec<ScriptEntry>,
}

impl Manifest {
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(content)?)
    }

    /// Read a manifest, resolving relative paths against its directory.
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest = Self::parse(&content)?;
        if let Some(base) = path.parent() {
            manifest.resolve_paths(base);
        }
        tracing::debug!(
            path = %path.display(),
            interpreters = manifest.interpreters.len(),
            scripts = manifest.scripts.len(),
            "Manifest loaded"
        );
        Ok(manifest)
    }

    /// Default location: ~/.scriptor/scriptor.toml
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".scriptor")
            .join(MANIFEST_FILE)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        for interpreter in &mut self.interpreters {
            if interpreter.module_path.is_relative() {
                interpreter.module_path = base.join(&interpreter.module_path);
            }
        }
        for script in &mut self.scripts {
            if script.path.is_relative() {
                script.path = base.join(&script.path);
            }
        }
    }

    pub fn into_configuration(self, api: ScriptApi) -> Configuration {
        Configuration::with_parts(Some(api), self.interpreters, self.scripts)
    }
}
