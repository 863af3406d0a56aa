use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use owo_colors::OwoColorize;
use raidscope_core::{CancelToken, Config, DataRegistry, RaidSession, RemoteMemory};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod process;

use process::ProcessMemory;

#[derive(Parser)]
#[command(name = "raidscope")]
#[command(about = "Live raid state tracker")]
struct Args {
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Reference data file (items, maps, tasks)
    #[arg(short, long, default_value = "data.json")]
    data: PathBuf,

    /// Game process executable name
    #[arg(short, long, default_value = "game.exe")]
    process: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    ProcessNotRunning,
    WaitingForRaid,
    InRaid,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("raidscope_core=info".parse()?)
                .add_directive("raidscope_cli=info".parse()?),
        )
        .init();

    let args = Args::parse();

    info!("Raidscope {}", env!("CARGO_PKG_VERSION"));

    // Load config
    let config = match Config::load(&args.config) {
        Ok(c) => {
            info!("Loaded config from {:?}", args.config);
            c
        }
        Err(e) => {
            warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        }
    };
    let config = Arc::new(config);

    // The tracker is useless without reference data; fail hard.
    let data = DataRegistry::load(&args.data)
        .with_context(|| format!("Failed to load reference data from {:?}", args.data))?;
    let data = Arc::new(data);

    // Setup graceful shutdown handler
    let shutdown = CancelToken::new();
    let shutdown_ctrlc = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        shutdown_ctrlc.trigger();
    })?;

    let mut status = None;

    // Main loop: wait for process (exits on Ctrl+C)
    while !shutdown.is_cancelled() {
        match ProcessMemory::attach(&args.process) {
            Ok(process) => {
                info!(
                    "Attached to process (pid {}, base {:#x})",
                    process.pid(),
                    process.base_address()
                );
                let mem: Arc<dyn RemoteMemory> = Arc::new(process);

                if let Err(e) = run_tracker(mem, &data, &config, &shutdown, &mut status) {
                    error!("Tracker error: {}", e);
                }
            }
            Err(_) => {
                set_status(&mut status, Status::ProcessNotRunning, "");
            }
        }

        // Interruptible wait before retry
        if shutdown.wait(Duration::from_secs(5)) {
            break;
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Track raids until the process goes away or shutdown is requested.
fn run_tracker(
    mem: Arc<dyn RemoteMemory>,
    data: &Arc<DataRegistry>,
    config: &Arc<Config>,
    shutdown: &CancelToken,
    status: &mut Option<Status>,
) -> Result<()> {
    while !shutdown.is_cancelled() {
        set_status(status, Status::WaitingForRaid, "");

        let session = RaidSession::discover(
            Arc::clone(&mem),
            Arc::clone(data),
            Arc::clone(config),
            shutdown.clone(),
        )?;
        let Some(session) = session else {
            // Shutdown requested during discovery
            return Ok(());
        };
        let session = Arc::new(session);
        session.start()?;

        let map_name = data
            .map(session.map_id())
            .map(|m| m.name.clone())
            .unwrap_or_else(|| session.map_id().to_string());
        set_status(status, Status::InRaid, &map_name);

        while session.is_active() {
            if shutdown.wait(Duration::from_secs(1)) {
                break;
            }
            info!(
                "{}: {} players, {} loot, {} explosives",
                map_name,
                session.players().iter().filter(|p| p.is_active()).count(),
                session.loot().len(),
                session.explosives().len()
            );
        }

        let seconds = Utc::now().signed_duration_since(session.started_at()).num_seconds();
        session.dispose();
        info!("Raid over after {}s", seconds);
    }
    Ok(())
}

/// Print the tracker state, but only on transitions.
fn set_status(current: &mut Option<Status>, next: Status, detail: &str) {
    if *current == Some(next) {
        return;
    }
    *current = Some(next);
    match next {
        Status::ProcessNotRunning => println!("{}", "Waiting for game process...".red()),
        Status::WaitingForRaid => println!("{}", "Process attached. Waiting for raid...".yellow()),
        Status::InRaid => println!("{} {}", "Raid started:".green(), detail.bold()),
    }
}
