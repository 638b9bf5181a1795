use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use scriptor_core::manifest::MANIFEST_FILE;
use scriptor_core::{EmbedderBuilder, Logger, Manifest, ScriptEmbedder};
use scriptor_echo::EchoConsole;
use tracing_subscriber::{EnvFilter, fmt};

mod report;

use report::{JsonLogger, TextLogger};

#[derive(Parser)]
#[command(
    name = "scriptor",
    about = "Scriptor: run scripts through loadable interpreter modules"
)]
struct Cli {
    /// Manifest to load (default: ./scriptor.toml, then ~/.scriptor/scriptor.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report embedder events as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the manifest and load every interpreter module
    Check,
    /// Run one script; the exit code is its return value
    Run {
        /// Script id
        id: u32,
        /// Positional arguments passed to the script
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// List interpreters and scripts of the manifest
    List,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Diagnostics go to stderr; stdout belongs to the scripts' console.
    let filter = EnvFilter::from_env("SCRIPTOR_LOG");
    if cli.json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let manifest_path = resolve_manifest_path(cli.config)?;
    let manifest = Manifest::from_file(&manifest_path)
        .with_context(|| format!("loading {}", manifest_path.display()))?;
    tracing::debug!(path = %manifest_path.display(), "Using manifest");

    match cli.command {
        Command::List => {
            list(&manifest, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check => {
            let logger = reporter(cli.json);
            let conf = manifest.into_configuration(Arc::new(EchoConsole::stdout()));
            let embedder = EmbedderBuilder::new(conf).logger(logger).build_serial();
            if !embedder.is_valid() {
                bail!("{}", embedder.error_string());
            }
            println!("configuration ok");
            Ok(ExitCode::SUCCESS)
        }
        Command::Run { id, args } => {
            let logger = reporter(cli.json);
            let conf = manifest.into_configuration(Arc::new(EchoConsole::stdout()));
            let mut embedder = EmbedderBuilder::new(conf).logger(logger).build_serial();
            if !embedder.is_valid() {
                bail!("{}", embedder.error_string());
            }
            tracing::info!(script_id = id, args = args.len(), "Running script");
            Ok(match embedder.execute(id, &args) {
                Ok(value) => ExitCode::from(exit_status(value)),
                // Already reported through the logger.
                Err(_) => ExitCode::FAILURE,
            })
        }
    }
}

/// `--config`, then `./scriptor.toml`, then the per-user manifest.
fn resolve_manifest_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let local = PathBuf::from(MANIFEST_FILE);
    if local.exists() {
        return Ok(local);
    }
    let user = Manifest::default_path();
    if user.exists() {
        return Ok(user);
    }
    bail!(
        "no {MANIFEST_FILE} in the current directory and none at {}",
        user.display()
    )
}

fn reporter(json: bool) -> Arc<dyn Logger> {
    if json {
        Arc::new(JsonLogger::new(std::io::stderr()))
    } else {
        Arc::new(TextLogger::new(std::io::stderr()))
    }
}

fn list(manifest: &Manifest, json: bool) -> Result<()> {
    if json {
        let listing = serde_json::json!({
            "interpreters": manifest.interpreters,
            "scripts": manifest.scripts,
        });
        println!("{}", serde_json::to_string(&listing)?);
        return Ok(());
    }

    println!("interpreters:");
    for interpreter in &manifest.interpreters {
        println!(
            "  {:<16} {}",
            interpreter.language,
            interpreter.module_path.display()
        );
    }
    println!("scripts:");
    for script in &manifest.scripts {
        let cached = if script.cache_in_memory { " (cached)" } else { "" };
        println!(
            "  {:>6}  {:<16} {}{cached}",
            script.id,
            script.language,
            script.path.display()
        );
    }
    Ok(())
}

/// Process exit status for a script return value. Values outside 0..=255
/// cannot be represented and map to 1.
fn exit_status(value: i32) -> u8 {
    u8::try_from(value).unwrap_or(1)
}
