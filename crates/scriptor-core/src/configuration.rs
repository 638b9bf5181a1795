use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use scriptor_plugin::ScriptApi;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One script known to the embedder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEntry {
    /// Unique id; adding another entry with the same id replaces this one.
    pub id: u32,
    /// Source file of the script.
    pub path: PathBuf,
    /// Must match the language of a registered interpreter.
    pub language: String,
    /// Keep the source in memory instead of reading it on every run.
    #[serde(default)]
    pub cache_in_memory: bool,
    /// Scheduling priority, 0 is highest. Not used by the serial embedder.
    #[serde(default)]
    pub priority: u32,
}

impl ScriptEntry {
    pub fn new(id: u32, path: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
            language: language.into(),
            cache_in_memory: false,
            priority: 0,
        }
    }

    pub fn cached(mut self, cache_in_memory: bool) -> Self {
        self.cache_in_memory = cache_in_memory;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

/// One interpreter module, registered for a single language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterEntry {
    pub language: String,
    #[serde(rename = "module")]
    pub module_path: PathBuf,
}

impl InterpreterEntry {
    pub fn new(language: impl Into<String>, module_path: impl Into<PathBuf>) -> Self {
        Self {
            language: language.into(),
            module_path: module_path.into(),
        }
    }
}

/// Everything an embedder needs: the host API, interpreters and scripts.
///
/// Pure data. Validation only checks that files exist and that module paths
/// look like dynamic libraries; nothing is loaded or read.
#[derive(Clone, Default)]
pub struct Configuration {
    script_api: Option<ScriptApi>,
    interpreters: BTreeMap<String, InterpreterEntry>,
    scripts: BTreeMap<u32, ScriptEntry>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parts(
        script_api: Option<ScriptApi>,
        interpreters: impl IntoIterator<Item = InterpreterEntry>,
        scripts: impl IntoIterator<Item = ScriptEntry>,
    ) -> Self {
        let mut conf = Self {
            script_api,
            ..Self::default()
        };
        for interpreter in interpreters {
            conf.add_interpreter(interpreter);
        }
        for script in scripts {
            conf.add_script(script);
        }
        conf
    }

    pub fn set_script_api(&mut self, api: ScriptApi) {
        self.script_api = Some(api);
    }

    pub fn script_api(&self) -> Option<&ScriptApi> {
        self.script_api.as_ref()
    }

    /// Register an interpreter, returning the entry it replaced.
    pub fn add_interpreter(&mut self, interpreter: InterpreterEntry) -> Option<InterpreterEntry> {
        self.interpreters
            .insert(interpreter.language.clone(), interpreter)
    }

    pub fn remove_interpreter(&mut self, language: &str) -> Option<InterpreterEntry> {
        self.interpreters.remove(language)
    }

    pub fn interpreter(&self, language: &str) -> Option<&InterpreterEntry> {
        self.interpreters.get(language)
    }

    pub fn interpreters(&self) -> &BTreeMap<String, InterpreterEntry> {
        &self.interpreters
    }

    /// Register a script, returning the entry it replaced.
    pub fn add_script(&mut self, script: ScriptEntry) -> Option<ScriptEntry> {
        self.scripts.insert(script.id, script)
    }

    pub fn remove_script(&mut self, id: u32) -> Option<ScriptEntry> {
        self.scripts.remove(&id)
    }

    pub fn script(&self, id: u32) -> Option<&ScriptEntry> {
        self.scripts.get(&id)
    }

    pub fn scripts(&self) -> &BTreeMap<u32, ScriptEntry> {
        &self.scripts
    }

    /// Check the rules in order and return the first one broken.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.script_api.is_none() {
            return Err(ConfigError::MissingScriptApi);
        }
        if self.interpreters.is_empty() {
            return Err(ConfigError::NoInterpreters);
        }
        for script in self.scripts.values() {
            if !self.interpreters.contains_key(&script.language) {
                return Err(ConfigError::NoSuitableInterpreter {
                    id: script.id,
                    language: script.language.clone(),
                });
            }
            if !script.path.exists() {
                return Err(ConfigError::MissingScriptFile {
                    id: script.id,
                    path: script.path.clone(),
                });
            }
        }
        for interpreter in self.interpreters.values() {
            if !is_loadable_module_path(&interpreter.module_path) {
                return Err(ConfigError::InvalidModulePath {
                    language: interpreter.language.clone(),
                    path: interpreter.module_path.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Empty when valid.
    pub fn error_string(&self) -> String {
        self.validate()
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default()
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        let same_api = match (&self.script_api, &other.script_api) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_api && self.interpreters == other.interpreters && self.scripts == other.scripts
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("script_api", &self.script_api.as_ref().map(|_| "<ScriptApi>"))
            .field("interpreters", &self.interpreters)
            .field("scripts", &self.scripts)
            .finish()
    }
}

#[cfg(windows)]
const MODULE_EXTENSIONS: &[&str] = &["dll"];
#[cfg(target_os = "macos")]
const MODULE_EXTENSIONS: &[&str] = &["dylib", "bundle", "so"];
#[cfg(not(any(windows, target_os = "macos")))]
const MODULE_EXTENSIONS: &[&str] = &["so"];

/// Whether `path` is named like a dynamic library on this platform.
///
/// Only the file name is inspected. Trailing version numbers are accepted
/// (`libfoo.so.1.2`).
pub fn is_loadable_module_path(path: &Path) -> bool {
    let Some(mut name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    while let Some((head, tail)) = name.rsplit_once('.') {
        if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
            name = head;
        } else {
            break;
        }
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty()
                && MODULE_EXTENSIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::consts::DLL_EXTENSION;
    use tempfile::TempDir;

    fn module(name: &str) -> PathBuf {
        PathBuf::from(format!("plugins/{name}.{DLL_EXTENSION}"))
    }

    fn api() -> ScriptApi {
        Arc::new(())
    }

    fn script_file(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, "print hi").unwrap();
        path
    }

    #[test]
    fn default_configuration_is_empty() {
        let conf = Configuration::new();
        assert!(conf.script_api().is_none());
        assert!(conf.interpreters().is_empty());
        assert!(conf.scripts().is_empty());
        assert!(!conf.is_valid());
        assert_eq!(conf.error_string(), "Script API has not been set.");
    }

    #[test]
    fn requires_an_interpreter() {
        let mut conf = Configuration::new();
        conf.set_script_api(api());
        assert_eq!(conf.validate(), Err(ConfigError::NoInterpreters));
        assert_eq!(conf.error_string(), "At least one interpreter has to be set.");
    }

    #[test]
    fn minimal_configuration_is_valid() {
        let dir = TempDir::new().unwrap();
        let path = script_file(&dir, "a.txt");
        let conf = Configuration::with_parts(
            Some(api()),
            [InterpreterEntry::new("Lang", module("modA"))],
            [ScriptEntry::new(0, path, "Lang")],
        );
        assert!(conf.is_valid());
        assert_eq!(conf.error_string(), "");
    }

    #[test]
    fn missing_interpreter_for_script() {
        let dir = TempDir::new().unwrap();
        let path = script_file(&dir, "a.txt");
        let mut conf = Configuration::with_parts(
            Some(api()),
            [
                InterpreterEntry::new("Lang", module("modA")),
                InterpreterEntry::new("Other", module("modB")),
            ],
            [ScriptEntry::new(0, path, "Lang")],
        );
        assert!(conf.is_valid());

        conf.remove_interpreter("Lang");
        assert!(!conf.is_valid());
        assert_eq!(
            conf.error_string(),
            "No suitable interpreter for 'Lang' required by script(id=0)."
        );
    }

    #[test]
    fn missing_script_file() {
        let conf = Configuration::with_parts(
            Some(api()),
            [InterpreterEntry::new("Lang", module("modA"))],
            [ScriptEntry::new(4, "does/not/exist.txt", "Lang")],
        );
        assert_eq!(
            conf.validate(),
            Err(ConfigError::MissingScriptFile {
                id: 4,
                path: PathBuf::from("does/not/exist.txt"),
            })
        );
        assert_eq!(
            conf.error_string(),
            "Path 'does/not/exist.txt' for script(id=4) does not exist."
        );
    }

    #[test]
    fn scripts_are_checked_in_ascending_id_order() {
        let dir = TempDir::new().unwrap();
        let path = script_file(&dir, "a.txt");
        let conf = Configuration::with_parts(
            Some(api()),
            [InterpreterEntry::new("Lang", module("modA"))],
            [
                ScriptEntry::new(9, "missing.txt", "Lang"),
                ScriptEntry::new(2, path, "Unknown"),
            ],
        );
        assert_eq!(
            conf.validate(),
            Err(ConfigError::NoSuitableInterpreter {
                id: 2,
                language: "Unknown".into(),
            })
        );
    }

    #[test]
    fn missing_interpreter_reported_before_missing_file() {
        let conf = Configuration::with_parts(
            Some(api()),
            [InterpreterEntry::new("Lang", module("modA"))],
            [ScriptEntry::new(1, "missing.txt", "Unknown")],
        );
        assert!(matches!(
            conf.validate(),
            Err(ConfigError::NoSuitableInterpreter { id: 1, .. })
        ));
    }

    #[test]
    fn rejects_non_library_module_path() {
        let conf = Configuration::with_parts(
            Some(api()),
            [
                InterpreterEntry::new("B", "plugins/interp.txt"),
                InterpreterEntry::new("A", "plugins/also_bad"),
            ],
            [],
        );
        assert_eq!(
            conf.validate(),
            Err(ConfigError::InvalidModulePath {
                language: "A".into(),
                path: PathBuf::from("plugins/also_bad"),
            })
        );
    }

    #[test]
    fn adding_with_existing_key_replaces_entry() {
        let mut conf = Configuration::new();
        conf.add_interpreter(InterpreterEntry::new("Lang", module("old")));
        let replaced = conf.add_interpreter(InterpreterEntry::new("Lang", module("new")));
        assert_eq!(replaced, Some(InterpreterEntry::new("Lang", module("old"))));
        assert_eq!(conf.interpreters().len(), 1);
        assert_eq!(conf.interpreter("Lang").unwrap().module_path, module("new"));

        conf.add_script(ScriptEntry::new(1, "a.txt", "Lang").cached(true).with_priority(3));
        conf.add_script(ScriptEntry::new(1, "b.txt", "Lang"));
        assert_eq!(conf.scripts().len(), 1);
        assert_eq!(conf.script(1), Some(&ScriptEntry::new(1, "b.txt", "Lang")));
    }

    #[test]
    fn equality_compares_api_identity() {
        let shared = api();
        let a = Configuration::with_parts(Some(shared.clone()), [], []);
        let b = Configuration::with_parts(Some(shared), [], []);
        let c = Configuration::with_parts(Some(api()), [], []);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(Configuration::new(), Configuration::default());
    }

    #[test]
    fn module_path_recognition() {
        assert!(is_loadable_module_path(&module("interp")));
        assert!(is_loadable_module_path(Path::new(&format!(
            "/opt/libinterp.{}",
            DLL_EXTENSION.to_uppercase()
        ))));
        assert!(!is_loadable_module_path(Path::new("interp.txt")));
        assert!(!is_loadable_module_path(Path::new("interp")));
        assert!(!is_loadable_module_path(Path::new(&format!(".{DLL_EXTENSION}"))));
        assert!(!is_loadable_module_path(Path::new("")));
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn versioned_shared_objects_are_libraries() {
        assert!(is_loadable_module_path(Path::new("libinterp.so.1")));
        assert!(is_loadable_module_path(Path::new("libinterp.so.1.2.3")));
        assert!(!is_loadable_module_path(Path::new("libinterp.1")));
    }
}
