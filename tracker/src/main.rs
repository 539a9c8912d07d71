use std::{fs::OpenOptions, net::SocketAddr, path::PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use session_tracker_lib::SystemClock;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracker::{
    config::{ConfigOverrides, TrackerConfig},
    dispatcher::{Command, Exit},
    forward_commands,
    presenter::ConsolePresenter,
    run_tracker,
    sources::{device_endpoint, DeviceEndpoint, GpxReplaySource},
};

#[derive(Parser)]
#[command(name = "tracker")]
#[command(about = "Track a GPS session: time, distance and speed", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Display refresh interval in milliseconds
    #[arg(long, global = true)]
    tick_ms: Option<u64>,
    /// Drop samples older than this many seconds
    #[arg(long, global = true)]
    max_age_secs: Option<u64>,
    /// Warn when no sample arrived for this many seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a GPX track as if a device was reporting it live
    Gpx {
        file: PathBuf,
        #[arg(long)]
        speedup: Option<f64>,
    },
    /// Wait for a device to push samples over TCP
    Listen {
        #[arg(default_value_t = SocketAddr::from(([0, 0, 0, 0], device_endpoint::DEFAULT_PORT)))]
        addr: SocketAddr,
    },
    /// Act as a device and push a GPX track to a listening tracker
    Push {
        addr: SocketAddr,
        file: PathBuf,
        #[arg(long)]
        speedup: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let speedup = match &cli.command {
        Commands::Gpx { speedup, .. } | Commands::Push { speedup, .. } => *speedup,
        Commands::Listen { .. } => None,
    };
    let overrides = ConfigOverrides {
        tick_interval_ms: cli.tick_ms,
        max_sample_age_secs: cli.max_age_secs,
        sample_timeout_secs: cli.timeout_secs,
        replay_speedup: speedup,
        log_file: cli.log_file.clone(),
    };
    let config = TrackerConfig::load(cli.config.as_deref(), overrides)?;

    init_logging(&config)?;

    match cli.command {
        Commands::Gpx { file, .. } => {
            let source = GpxReplaySource::open(&file, config.replay_speedup, SystemClock)
                .with_context(|| format!("Failed to open {:?}", file))?;
            track(source, &config).await
        },
        Commands::Listen { addr } => {
            let source = DeviceEndpoint::bind(addr).await.with_context(|| format!("Failed to listen on {}", addr))?;
            track(source, &config).await
        },
        Commands::Push { addr, file, .. } => {
            let source = GpxReplaySource::open(&file, config.replay_speedup, SystemClock)
                .with_context(|| format!("Failed to open {:?}", file))?;
            let count = device_endpoint::push_samples(addr, source).await?;
            println!("Pushed {} samples to {}", count, addr);
            Ok(())
        },
    }
}

fn init_logging(config: &TrackerConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{}=info,session_tracker_lib=info", env!("CARGO_CRATE_NAME")).into());

    // Logs go to stderr, stdout is the display
    let file_layer = match &config.log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir).with_context(|| format!("Failed to create log directory {:?}", dir))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            Some(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

async fn track<S: session_tracker_lib::PositionSource + 'static>(source: S, config: &TrackerConfig) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel(16);

    tx.send(Command::Start).await?;

    // A blocked stdin read must not hold up runtime shutdown, so it is left on a detached thread
    let stdin_tx = tx.clone();
    std::thread::spawn(move || forward_commands(std::io::stdin().lock(), stdin_tx));

    let ctrl_c_tx = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, shutting down");
            let _ = ctrl_c_tx.send(Command::Shutdown).await;
        }
    });

    // Keep our own sender so the dispatcher only ends on an explicit shutdown
    let (exit, summary) = run_tracker(source, ConsolePresenter::stdout(), config, rx).await;
    drop(tx);

    println!(
        "{} session(s), {} samples, {} stale, {} timeouts, last session {:.0} m",
        summary.sessions, summary.samples_accepted, summary.samples_stale, summary.timeouts, summary.last_session_meters
    );

    match exit {
        Exit::Shutdown | Exit::SourceEnded => Ok(()),
        Exit::SourceFailed(err) => Err(anyhow::anyhow!(err).context("Position source failed")),
    }
}
