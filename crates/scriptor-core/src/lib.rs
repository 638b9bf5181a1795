//! Script embedder for scriptor.
//!
//! Provides [`SerialEmbedder`], which loads one interpreter module per
//! language (see `scriptor-plugin` for the module ABI), keeps selected script
//! sources in memory and runs scripts synchronously, reporting outcomes to an
//! optional [`Logger`].
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scriptor_core::{
//!     Configuration, EmbedderBuilder, InterpreterEntry, ScriptEmbedder, ScriptEntry, TracingLogger,
//! };
//!
//! struct HostApi;
//!
//! let mut conf = Configuration::new();
//! conf.set_script_api(Arc::new(HostApi));
//! conf.add_interpreter(InterpreterEntry::new("Echo", "plugins/libscriptor_echo.so"));
//! conf.add_script(ScriptEntry::new(1, "scripts/hello.echo", "Echo").cached(true));
//!
//! let mut embedder = EmbedderBuilder::new(conf)
//!     .logger(Arc::new(TracingLogger))
//!     .build_serial();
//! assert!(embedder.is_valid(), "{}", embedder.error_string());
//!
//! let status = embedder.execute(1, &["world".to_string()]);
//! ```

pub mod backend;
pub mod builder;
pub mod configuration;
pub mod embedder;
pub mod error;
pub mod loader;
pub mod logger;
pub mod manifest;

pub use backend::{DylibBackend, ModuleBackend, StaticBackend};
pub use builder::EmbedderBuilder;
pub use configuration::{Configuration, InterpreterEntry, ScriptEntry};
pub use embedder::{ScriptEmbedder, SerialEmbedder};
pub use error::{ConfigError, EmbedderError, ExecuteError, LoadError, ManifestError};
pub use logger::{Logger, TracingLogger};
pub use manifest::Manifest;
pub use scriptor_plugin::{RunOutcome, ScriptApi};
