//! Binary entrypoint for mousepin.
//!
//! Headless front-end over the engine: parses the CLI, installs tracing,
//! loads the configuration store (wiring save-on-change persistence), and
//! runs the engine until Ctrl-C. The `check` subcommand validates the
//! persisted configuration and exits.
use std::{
    fs, io,
    path::{Path, PathBuf},
    process,
};

use clap::{Parser, Subcommand};
use config::ConfigStore;
use tracing_subscriber::{fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "mousepin",
    about = "Pin the mouse cursor while a target application is focused",
    version
)]
/// Command-line interface for the `mousepin` binary.
struct Cli {
    /// Optional subcommand.
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the config file
    #[arg(long, value_name = "PATH", default_value = "config/config.json")]
    config: PathBuf,

    /// Logging controls
    #[command(flatten)]
    log: logging::LogArgs,
}

#[derive(Subcommand, Debug)]
/// Top-level CLI subcommands.
enum Command {
    /// Load and validate the configuration then exit.
    Check {
        /// Dump the effective settings as JSON to stdout
        #[arg(long)]
        dump: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let spec = logging::compute_spec(
        cli.log.trace,
        cli.log.debug,
        cli.log.log_level.as_deref(),
        cli.log.log_filter.as_deref(),
    );
    tracing_subscriber::registry()
        .with(logging::env_filter_from_spec(&spec))
        .with(fmt::layer().without_time())
        .try_init()
        .ok();

    match cli.command {
        Some(Command::Check { dump }) => check(&cli.config, dump),
        None => run(&cli.config),
    }
}

/// Validate the persisted record; a missing file is fine (defaults apply).
fn check(path: &Path, dump: bool) {
    match fs::read_to_string(path) {
        Ok(text) => {
            if let Err(err) = serde_json::from_str::<serde_json::Value>(&text) {
                eprintln!("{}: {}", path.display(), err);
                process::exit(1);
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            eprintln!("{}: {}", path.display(), err);
            process::exit(1);
        }
    }

    let store = ConfigStore::load(path);
    if dump {
        match serde_json::to_string_pretty(&store.snapshot()) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("failed to serialize settings: {err}");
                process::exit(1);
            }
        }
    } else {
        println!("OK");
    }
}

#[cfg(target_os = "windows")]
fn run(config_path: &Path) {
    use std::sync::Arc;

    use focus_watcher::RealForegroundOps;
    use tokio_util::sync::CancellationToken;
    use tracing::{error, info};
    use win_hotkey::HookApi;
    use win_pointer::RealPointerOps;

    let store = Arc::new(ConfigStore::load(config_path));
    config::attach_autosave(&store, config_path.to_path_buf());

    let hook = match win_hotkey::Manager::new() {
        Ok(manager) => Arc::new(manager),
        Err(err) => {
            error!(%err, "cannot install the keyboard hook");
            process::exit(1);
        }
    };
    let engine = mousepin_engine::Engine::new(
        store,
        hook.clone() as Arc<dyn HookApi>,
        Arc::new(RealPointerOps::new()),
        Arc::new(RealForegroundOps),
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(err) => {
            error!(%err, "failed to start runtime");
            process::exit(1);
        }
    };

    runtime.block_on(async {
        let stop = CancellationToken::new();
        let signal_stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received; shutting down");
                signal_stop.cancel();
            }
        });
        engine.run(stop).await;
    });

    hook.shutdown();
}

#[cfg(not(target_os = "windows"))]
fn run(_config_path: &Path) {
    eprintln!("mousepin drives Win32 input hooks and only runs on Windows");
    process::exit(2);
}
