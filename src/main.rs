use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::time::Duration;

use gps_tracker_rs::export::{create_gpx_track, local_datetime, summary_line, SessionExport};
use gps_tracker_rs::tracker::default_session_name_now;
use gps_tracker_rs::{
    JsonFileStore, ReplaySource, SessionStore, TimeBasis, Tracker, TrackerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "gps_tracker")]
#[command(about = "GPS trip tracker - replay fix logs, manage saved sessions", long_about = None)]
struct Args {
    /// Session store directory
    #[arg(long, global = true, default_value = "gps_tracker_sessions")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Feed a JSON fix log through the tracker
    Replay {
        /// JSON array of {lat, lng, timestamp, speed} fixes (speed in m/s)
        log_path: PathBuf,

        /// Tracker config JSON (thresholds, time basis)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Throttle window override (ms)
        #[arg(long)]
        throttle_ms: Option<i64>,

        /// Stillness threshold override (km/h)
        #[arg(long)]
        min_speed_kmh: Option<f64>,

        /// Milliseconds between replayed fixes (0 = as fast as possible)
        #[arg(long, default_value = "0")]
        pace_ms: u64,

        /// Save the result under this name (default: timestamped)
        #[arg(long)]
        save: Option<Option<String>>,
    },

    /// List saved sessions, most recent first
    Sessions,

    /// Export a saved session
    Export {
        id: u64,

        #[arg(long, value_enum, default_value = "gpx")]
        format: ExportFormat,

        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ExportFormat {
    Gpx,
    Json,
}

fn load_config(
    path: Option<&PathBuf>,
    throttle_ms: Option<i64>,
    min_speed_kmh: Option<f64>,
) -> Result<TrackerConfig> {
    let mut config = match path {
        Some(p) => TrackerConfig::from_file(p)
            .with_context(|| format!("reading config {}", p.display()))?,
        // Logs are replayed faster than real time, throttle on fix timestamps
        None => TrackerConfig::replay(),
    };
    if let Some(ms) = throttle_ms {
        config.throttle_interval_ms = ms;
    }
    if let Some(kmh) = min_speed_kmh {
        config.min_speed_kmh = kmh;
    }
    if config.time_basis == TimeBasis::Received {
        log::warn!("Replaying with wall-clock throttling; most fixes will be throttled");
    }
    Ok(config)
}

async fn replay(
    store: JsonFileStore,
    log_path: PathBuf,
    config: TrackerConfig,
    pace_ms: u64,
    save: Option<Option<String>>,
) -> Result<()> {
    let mut source = ReplaySource::from_file(&log_path)
        .with_context(|| format!("loading fix log {}", log_path.display()))?;
    let total = source.len();
    if pace_ms > 0 {
        source = source.with_pace(Duration::from_millis(pace_ms));
    }

    let mut tracker = Tracker::new(Box::new(source), Box::new(store), config);
    tracker.start()?;
    let accepted = tracker.run().await;
    let status = tracker.status();
    tracker.stop();

    println!("Fixes: {} received, {} accepted", total, accepted);
    println!("Final status: {:?}", status);
    if let Some(notice) = tracker.notice() {
        println!("Notice: {}", notice);
    }
    println!("Stats: {}", summary_line(&tracker.stats()));

    if let Some(name) = save {
        let name = name.unwrap_or_else(default_session_name_now);
        let id = tracker.save_session(&name)?;
        println!("Saved session {} \"{}\"", id, name);
    }
    Ok(())
}

fn list_sessions(store: &JsonFileStore) -> Result<()> {
    let sessions = store.list_sessions()?;
    if sessions.is_empty() {
        println!("No saved sessions in {}", store.root().display());
        return Ok(());
    }
    for stored in sessions {
        println!(
            "{:>4}  {}  {}  {}",
            stored.id,
            local_datetime(stored.session.end_time),
            stored.session.name,
            summary_line(&stored.session.stats)
        );
    }
    Ok(())
}

fn export(
    store: &JsonFileStore,
    id: u64,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let Some(stored) = store.get_session(id)? else {
        bail!("no saved session with id {}", id);
    };

    let body = match format {
        ExportFormat::Gpx => create_gpx_track(&stored.session)?.to_gpx_xml(),
        ExportFormat::Json => SessionExport::new(stored.session)?.to_json()?,
    };

    match output {
        Some(path) => {
            fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
            println!("Exported session {} to {}", id, path.display());
        }
        None => print!("{}", body),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let store = JsonFileStore::open(&args.store)
        .with_context(|| format!("opening session store {}", args.store.display()))?;

    match args.command {
        Command::Replay {
            log_path,
            config,
            throttle_ms,
            min_speed_kmh,
            pace_ms,
            save,
        } => {
            let config = load_config(config.as_ref(), throttle_ms, min_speed_kmh)?;
            replay(store, log_path, config, pace_ms, save).await
        }
        Command::Sessions => list_sessions(&store),
        Command::Export { id, format, output } => export(&store, id, format, output),
    }
}
