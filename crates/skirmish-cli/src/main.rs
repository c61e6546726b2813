//! Standalone launcher for the skirmish tactical core.
//!
//! Connects to a running game process, starts the tick loop and keeps it
//! running until the optional duration elapses or the process is interrupted.
//!
//! # Limitations
//!
//! No SIGINT handler is installed. With `--duration-secs` the launcher stops
//! the core cleanly and the current tick finishes. Without it, Ctrl+C ends the
//! process at once, so a tick in progress may have dispatched only part of its
//! orders.
//!
//! # Usage
//!
//! ```bash
//! # Run against the default endpoint until Ctrl+C
//! skirmish
//!
//! # Custom endpoint, faster tick, two seeded assignments, one minute
//! skirmish --host 10.0.0.5 --port 7445 --tick-ms 50 \
//!     --assign 101:2001 --assign 102:2001 --duration-secs 60
//!
//! # Load tuning from a JSON file and log every decision
//! skirmish --config tactics.json --log skirmish=debug
//! ```

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use skirmish_core::{CoreConfig, TacticalCore, UnitId};

#[derive(Parser)]
#[command(name = "skirmish")]
#[command(about = "Real-time tactical micro-management loop for a game agent")]
#[command(version)]
struct Cli {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Game process host
    #[arg(long)]
    host: Option<String>,

    /// Game process port
    #[arg(long)]
    port: Option<u16>,

    /// Tick period in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Log filter, e.g. "skirmish=debug" (defaults to RUST_LOG, then "skirmish=info")
    #[arg(long)]
    log: Option<String>,

    /// Stop after this many seconds (runs until interrupted when absent)
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Seed an assignment as ATTACKER:TARGET; repeatable
    #[arg(long = "assign", value_name = "ATTACKER:TARGET", value_parser = parse_assignment)]
    assignments: Vec<(UnitId, UnitId)>,
}

fn parse_assignment(raw: &str) -> std::result::Result<(UnitId, UnitId), String> {
    let (attacker, target) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected ATTACKER:TARGET, got '{raw}'"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u64>()
            .map(UnitId::new)
            .map_err(|err| format!("invalid unit id '{part}': {err}"))
    };
    Ok((parse(attacker)?, parse(target)?))
}

fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(filter) => tracing_subscriber::EnvFilter::new(filter),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("skirmish=info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(cli: &Cli) -> Result<CoreConfig> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CoreConfig::default(),
    };
    if let Some(host) = &cli.host {
        config.remote.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        config.remote.port = port;
    }
    if let Some(tick_ms) = cli.tick_ms {
        config.runtime.tick_period_ms = tick_ms;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    let config = load_config(&cli)?;
    tracing::info!(
        host = %config.remote.host,
        port = config.remote.port,
        tick_ms = config.runtime.tick_period_ms,
        "skirmish starting"
    );

    let core = TacticalCore::new(config).context("building tactical core")?;
    core.start().context("starting tick loop")?;

    if !cli.assignments.is_empty() {
        let receipt = core.submit(&cli.assignments);
        if !receipt.accepted {
            core.stop();
            bail!("assignments rejected: {}", receipt.message);
        }
        tracing::info!("{}", receipt.message);
    }

    match cli.duration_secs {
        Some(secs) => thread::sleep(Duration::from_secs(secs)),
        None => loop {
            thread::park();
        },
    }

    core.stop();
    tracing::info!("skirmish stopped");
    Ok(())
}
