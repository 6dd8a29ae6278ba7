#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the coastal hazard report engine.
//!
//! ```text
//! ocean-watch summary --file reports.json [--json]
//! ocean-watch watch [--config ocean-watch.toml] [--interval-secs 10]
//! ocean-watch demo
//! ```
//!
//! Set `RUST_LOG=info` (or `debug` to see every store mutation) for log
//! output.

mod config;
mod demo;
mod render;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use ocean_watch_reports::{Clock, HazardReportsView, SystemClock, ViewState};
use ocean_watch_source::json_file::JsonFileRemote;
use ocean_watch_source::rest::RestRemote;

use crate::config::WatchConfig;
use crate::render::{render_text, summary_line};

/// How often `watch` recomputes time-window statistics without a change.
const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(
    name = "ocean-watch",
    about = "Aggregate and follow citizen coastal hazard reports"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize reports exported to a JSON file
    Summary {
        /// JSON array of raw report rows
        #[arg(long)]
        file: PathBuf,
        /// Print the aggregate as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Follow a REST remote and log each new aggregate until Ctrl-C
    Watch {
        /// TOML config file (defaults to ./ocean-watch.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Seconds between change polls (overrides the config)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Replay a scripted sequence of changes against an in-memory remote
    Demo,
}

async fn summary(file: PathBuf, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let remote = JsonFileRemote::new(file);
    let mut view = HazardReportsView::new(clock.clone());
    view.mount(&remote).await?;

    let state = view.state();
    let (Some(reports), Some(aggregate)) = (state.reports(), state.aggregate()) else {
        return Err(format!("view did not become ready: {state:?}").into());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(aggregate)?);
    } else {
        print!("{}", render_text(aggregate, reports, &clock.now()));
    }
    Ok(())
}

async fn watch(
    config_path: Option<PathBuf>,
    interval_secs: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = WatchConfig::load(config_path.as_deref())?;
    if let Some(secs) = interval_secs {
        config.poll_interval_secs = secs;
        config.validate()?;
    }

    let remote = RestRemote::new(&config.rest_settings())?;
    log::info!(
        "Watching {} (polling every {}s)",
        remote.endpoint(),
        config.poll_interval_secs
    );

    let mut view = HazardReportsView::new(Arc::new(SystemClock));
    let mut updates = view.watch();
    view.mount(&remote).await?;
    updates.mark_changed();

    let mut refresh = tokio::time::interval(REFRESH_INTERVAL);
    refresh.tick().await;

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                match &*updates.borrow_and_update() {
                    ViewState::Ready { aggregate, .. } => log::info!("{}", summary_line(aggregate)),
                    ViewState::Error(message) => log::error!("{message}"),
                    ViewState::Loading => {}
                }
            }
            _ = refresh.tick() => view.refresh(),
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, shutting down");
                break;
            }
        }
    }

    view.unmount();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Summary { file, json } => summary(file, json).await?,
        Commands::Watch {
            config,
            interval_secs,
        } => watch(config, interval_secs).await?,
        Commands::Demo => demo::run().await?,
    }

    Ok(())
}
