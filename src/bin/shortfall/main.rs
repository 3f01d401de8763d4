// Shortfall Simulation Runner
// Simulates one miner epoch by epoch and writes sampled statistics as JSONL
//
// Usage:
//   cargo run --release --bin shortfall                                  # strict miner, 1000-token pledge
//   cargo run --release --bin shortfall -- --miner burn --shortfall 1    # burn policy, maximum shortfall
//   cargo run --release --bin shortfall -- --network feb-2023 --strategy power --amount 2
//   cargo run --release --bin shortfall -- --config sim.toml --output out/stats.jsonl
//   RUST_LOG=debug cargo run --bin shortfall -- --epochs 2880           # one day, activation logs

mod scenarios;
mod time_series;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use scenarios::{NetworkPreset, Policy, StrategyKind};
use shortfall_sim::{ChainEpoch, SimConfig, SimError, Simulator};
use time_series::SnapshotWriter;

// ─── CLI ────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "shortfall")]
#[command(version)]
#[command(about = "Storage miner pledge shortfall simulation", long_about = None)]
struct Cli {
    /// TOML simulation config. Replaces the preset flags below.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Epochs to simulate [default: one year]
    #[arg(long)]
    epochs: Option<ChainEpoch>,

    /// Epochs between snapshots [default: one day]
    #[arg(long)]
    stats_interval: Option<ChainEpoch>,

    #[arg(long, value_enum, default_value_t = NetworkPreset::Default)]
    network: NetworkPreset,

    #[arg(long, value_enum, default_value_t = Policy::Strict)]
    miner: Policy,

    /// Initial miner token balance
    #[arg(long, default_value = "0")]
    balance: Decimal,

    /// Vest 75% of each reward over 180 intervals (strict policy only)
    #[arg(long)]
    vesting: bool,

    #[arg(long, value_enum, default_value_t = StrategyKind::Pledge)]
    strategy: StrategyKind,

    /// PiB for the power strategy, tokens for pledge and lease
    #[arg(long)]
    amount: Option<Decimal>,

    /// Sector commitment duration in days
    #[arg(long, default_value_t = 365)]
    duration_days: u64,

    /// Fraction of nominal pledge to take as shortfall, in [0, 1]
    #[arg(long, default_value = "0")]
    shortfall: Decimal,

    /// Write snapshots here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Sim(#[from] SimError),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Cli {
    fn sim_config(&self) -> Result<SimConfig, CliError> {
        let mut cfg = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                toml::from_str(&text)?
            }
            None => {
                let amount = self.amount.unwrap_or_else(|| self.strategy.default_amount());
                SimConfig::new(
                    scenarios::network(self.network),
                    scenarios::miner(self.miner, self.balance, self.vesting),
                    scenarios::strategy(self.strategy, amount, self.duration_days, self.shortfall),
                )
            }
        };
        if let Some(epochs) = self.epochs {
            cfg.epochs = epochs;
        }
        if let Some(interval) = self.stats_interval {
            cfg.stats_interval = interval;
        }
        Ok(cfg)
    }
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn run(cli: &Cli) -> Result<(), CliError> {
    let cfg = cli.sim_config()?;
    let mut sim = Simulator::new(&cfg)?;
    let mut writer = match &cli.output {
        Some(path) => SnapshotWriter::create(path)?,
        None => SnapshotWriter::stdout(),
    };

    let start = Instant::now();
    let mut write_error = None;
    sim.run_with(cfg.epochs, cfg.stats_interval, |snapshot| {
        if write_error.is_none() {
            write_error = writer.write(&snapshot).err();
        }
    })?;
    if let Some(e) = write_error {
        return Err(e.into());
    }
    let written = writer.finish()?;

    info!(
        epochs = cfg.epochs,
        snapshots = written,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "simulated {} epochs",
        cfg.epochs
    );
    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
