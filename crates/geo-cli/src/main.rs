mod config;
mod sim;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geo_core::time::{now_unix_secs, unix_to_iso8601};
use geo_core::{AnchorHistoryStore, SessionConfig};
use geo_store::{DATA_DIR_ENV, ProfileStore};

use crate::sim::{Scenario, SimOptions};

#[derive(Parser)]
#[command(name = "geoanchor", about = "Geospatial anchor history and session simulator")]
struct Cli {
    /// Device profile to use
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Session config (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored anchor history, newest first
    History {
        /// Print the stored JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Forget all stored anchor history
    Clear,

    /// Export anchor history to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Import anchor history from a JSON file, replacing what is stored
    Import {
        /// Input file path
        path: PathBuf,
    },

    /// Print the effective session config as TOML
    Config,

    /// Run a simulated session against the stored history
    Simulate {
        #[arg(long, value_enum, default_value = "steady")]
        scenario: Scenario,

        /// Maximum number of ticks
        #[arg(long, default_value_t = 120)]
        ticks: u32,

        /// Seconds per tick
        #[arg(long, default_value_t = 1.0, value_parser = parse_dt)]
        dt: f64,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Ticks before the pose first becomes accurate
        #[arg(long, default_value_t = 3)]
        warmup: u32,

        /// Tap every N ticks (0 disables taps)
        #[arg(long, default_value_t = 10)]
        tap_every: u32,

        /// Pace ticks in real time
        #[arg(long)]
        realtime: bool,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
}

/// A tick length must be a positive, finite number of seconds.
fn parse_dt(s: &str) -> std::result::Result<f64, String> {
    let dt = s.parse::<f64>().map_err(|e| e.to_string())?;
    if !dt.is_finite() || dt <= 0.0 {
        return Err(format!("expected a positive number of seconds, got {s}"));
    }
    Ok(dt)
}

fn open_store(cli: &Cli) -> Result<ProfileStore> {
    let base_dir = std::env::var(DATA_DIR_ENV).ok().map(PathBuf::from);
    ProfileStore::open(cli.profile.as_deref(), base_dir.as_deref())
        .context("failed to open profile store")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = config::load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::History { json } => cmd_history(&cli, &config, *json),
        Commands::Clear => cmd_clear(&cli, &config),
        Commands::Export { path } => cmd_export(&cli, path),
        Commands::Import { path } => cmd_import(&cli, &config, path),
        Commands::Config => cmd_config(&config),
        Commands::Simulate {
            scenario,
            ticks,
            dt,
            seed,
            warmup,
            tap_every,
            realtime,
            json,
        } => {
            let opts = SimOptions {
                scenario: *scenario,
                ticks: *ticks,
                dt: *dt,
                seed: *seed,
                warmup: *warmup,
                tap_every: *tap_every,
                realtime: *realtime,
                json: *json,
            };
            cmd_simulate(&cli, config, &opts).await
        }
    }
}

fn format_age(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    format!("{hours}h{minutes:02}m")
}

fn cmd_history(cli: &Cli, config: &SessionConfig, json: bool) -> Result<()> {
    let store = open_store(cli)?;
    if json {
        let out = store
            .store()
            .export_history_string()
            .context("failed to read history")?;
        println!("{out}");
        return Ok(());
    }

    let history = store
        .store()
        .load_history()
        .context("failed to read history")?;
    if history.is_empty() {
        println!("(no anchor history)");
        return Ok(());
    }

    let now = now_unix_secs();
    for entry in history.iter() {
        let age = now.saturating_sub(entry.created_at);
        let expired = if age >= config.history.max_age_secs {
            "  (expired)"
        } else {
            ""
        };
        println!(
            "{}  lat={:.6} lon={:.6} alt={:.2} heading={:.1}  age={}{expired}",
            unix_to_iso8601(entry.created_at),
            entry.latitude,
            entry.longitude,
            entry.altitude,
            entry.heading,
            format_age(age),
        );
    }
    println!("{} record(s)", history.len());
    Ok(())
}

fn cmd_clear(cli: &Cli, config: &SessionConfig) -> Result<()> {
    let store = open_store(cli)?;
    let mut history = AnchorHistoryStore::new(store.into_store(), config.history);
    history.clear().context("failed to clear history")?;
    println!("history cleared");
    Ok(())
}

fn cmd_export(cli: &Cli, path: &Path) -> Result<()> {
    let store = open_store(cli)?;
    store
        .store()
        .export_history_file(path)
        .with_context(|| format!("failed to export history to {}", path.display()))?;
    println!("exported to {}", path.display());
    Ok(())
}

fn cmd_import(cli: &Cli, config: &SessionConfig, path: &Path) -> Result<()> {
    let store = open_store(cli)?;
    let kept = store
        .store()
        .import_history_file(path, &config.history)
        .with_context(|| format!("failed to import history from {}", path.display()))?;
    println!("imported {kept} record(s) from {}", path.display());
    Ok(())
}

fn cmd_config(config: &SessionConfig) -> Result<()> {
    print!("{}", config::render_config(config)?);
    Ok(())
}

async fn cmd_simulate(cli: &Cli, config: SessionConfig, opts: &SimOptions) -> Result<()> {
    let store = open_store(cli)?;
    tracing::info!(
        "simulating {:?} on profile '{}' ({})",
        opts.scenario,
        store.profile(),
        store.path().display()
    );

    let report = {
        let mut stdout = std::io::stdout().lock();
        sim::run(config, store.into_store(), opts, now_unix_secs(), &mut stdout).await?
    };

    if !opts.json {
        println!(
            "final state: {:?}, ticks: {}, anchors: {}, history: {}",
            report.state, report.ticks, report.anchors, report.history
        );
    }
    Ok(())
}
