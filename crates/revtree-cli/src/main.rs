//! revtree command-line tools.
//!
//! Provides the `revtree` binary. `replay` runs a recorded edit script
//! through the history controller on a manual clock and prints the
//! resulting timeline as JSON; `config` prints the effective configuration.

mod script;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use revtree_core::HistoryConfig;

use crate::script::{replay, Script};

/// Branching undo/redo history tools.
#[derive(Parser)]
#[command(name = "revtree", about = "Branching undo/redo history tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON edit script and print the resulting history.
    Replay {
        /// Path to the script file.
        script: PathBuf,

        /// Config file (camelCase JSON). Overrides the script's own config.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the timeline after every step.
        #[arg(long)]
        trace: bool,
    },
    /// Print the effective configuration: defaults overlaid with REVTREE_* variables.
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Replay {
            script,
            config,
            trace,
        } => run_replay(&script, config.as_deref(), trace),
        Commands::Config => run_config(),
    };
    process::exit(exit_code);
}

/// Execute the replay subcommand.
///
/// Returns exit code: 0 = success, 1 = engine error, 3 = I/O or parse error.
fn run_replay(script_path: &Path, config_path: Option<&Path>, trace: bool) -> i32 {
    let script: Script = match read_json(script_path) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 3;
        }
    };

    let config = match resolve_config(config_path, script.config.clone()) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 3;
        }
    };

    let result = replay(script, config, |step| {
        if trace {
            print_json(&step);
        }
    });

    match result {
        Ok(report) => {
            print_json(&report);
            0
        }
        Err(e) => {
            eprintln!("Replay failed: {}", e);
            1
        }
    }
}

/// Execute the config subcommand.
fn run_config() -> i32 {
    match HistoryConfig::from_env() {
        Ok(config) => {
            print_json(&config);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            3
        }
    }
}

/// Config file first, then the script's own config, then the environment.
fn resolve_config(
    path: Option<&Path>,
    from_script: Option<HistoryConfig>,
) -> Result<HistoryConfig, String> {
    let config = match (path, from_script) {
        (Some(path), _) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("failed to read config '{}': {}", path.display(), e))?;
            HistoryConfig::from_json(&text)
                .map_err(|e| format!("invalid config '{}': {}", path.display(), e))?
        }
        (None, Some(config)) => config,
        (None, None) => HistoryConfig::from_env().map_err(|e| e.to_string())?,
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("failed to parse '{}': {}", path.display(), e))
}

fn print_json<T: serde::Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize output: {}\"}}", e));
    println!("{}", json);
}
