// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Pledge Shortfall Simulation Suite - Simulation Core

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{power_to_decimal, ChainEpoch, DAY, YEAR};
use crate::miner::{Miner, MinerConfig, MinerError, MinerSummary};
use crate::network::{NetworkConfig, NetworkState};
use crate::strategy::{MinerStrategy, StrategyConfig};

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SimError {
    #[error("miner error: {0}")]
    Miner(#[from] MinerError),

    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),
}

// ─── Configuration ───────────────────────────────────────────────────────────

fn default_epochs() -> ChainEpoch {
    YEAR
}

fn default_stats_interval() -> ChainEpoch {
    DAY
}

/// Everything needed to build and run one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub miner: MinerConfig,
    pub strategy: StrategyConfig,
    #[serde(default = "default_epochs")]
    pub epochs: ChainEpoch,
    #[serde(default = "default_stats_interval")]
    pub stats_interval: ChainEpoch,
}

impl SimConfig {
    pub fn new(network: NetworkConfig, miner: MinerConfig, strategy: StrategyConfig) -> Self {
        Self {
            network,
            miner,
            strategy,
            epochs: default_epochs(),
            stats_interval: default_stats_interval(),
        }
    }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Miner statistics sampled after an epoch was processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub day: u64,
    pub epoch: ChainEpoch,
    #[serde(flatten)]
    pub miner: MinerSummary,
}

impl Snapshot {
    pub fn new(epoch: ChainEpoch, miner: MinerSummary) -> Self {
        Self { day: epoch / DAY, epoch, miner }
    }
}

// ─── Reward Emitter ──────────────────────────────────────────────────────────

/// Pays the miner its pro-rata share of each epoch's reward.
#[derive(Debug, Clone, Default)]
pub struct RewardEmitter {
    emitted: Decimal,
}

impl RewardEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total paid so far.
    pub fn emitted(&self) -> Decimal {
        self.emitted
    }

    /// Reads network state as of the start of the epoch. No-op without network power.
    pub fn emit(&mut self, net: &NetworkState, miner: &mut dyn Miner) -> Decimal {
        if net.power == 0 {
            return Decimal::ZERO;
        }
        let share = power_to_decimal(miner.power()) / power_to_decimal(net.power);
        let reward = net.epoch_reward * share;
        miner.receive_reward(net, reward);
        self.emitted += reward;
        reward
    }
}

// ─── Simulator ───────────────────────────────────────────────────────────────

/// Epoch driver for one miner on one network.
#[derive(Debug)]
pub struct Simulator {
    net: NetworkState,
    miner: Box<dyn Miner>,
    strategy: MinerStrategy,
    emitter: RewardEmitter,
}

impl Simulator {
    pub fn new(cfg: &SimConfig) -> Result<Self, SimError> {
        let net = NetworkState::new(&cfg.network);
        // Consensus pledge is a share of max(power, baseline).
        if net.power.max(net.baseline_power) == 0 {
            return Err(SimError::InvalidConfig(
                "network needs power or baseline power to size pledge against".into(),
            ));
        }
        let miner = cfg.miner.build()?;
        let strategy = MinerStrategy::new(cfg.strategy.clone())?;
        tracing::debug!(
            policy = miner.policy(),
            balance = %cfg.miner.balance(),
            "miner built"
        );
        Ok(Self { net, miner, strategy, emitter: RewardEmitter::new() })
    }

    pub fn network(&self) -> &NetworkState {
        &self.net
    }

    pub fn miner(&self) -> &dyn Miner {
        self.miner.as_ref()
    }

    pub fn strategy(&self) -> &MinerStrategy {
        &self.strategy
    }

    pub fn reward_emitted(&self) -> Decimal {
        self.emitter.emitted()
    }

    /// One epoch: reward, strategy, miner settlement, then network advancement.
    pub fn tick(&mut self) -> Result<(), SimError> {
        self.emitter.emit(&self.net, self.miner.as_mut());
        self.strategy.act(&self.net, self.miner.as_mut())?;
        self.miner.handle_epoch(&self.net);
        self.net.handle_epoch();
        Ok(())
    }

    /// Runs `epochs` ticks, passing a snapshot to `sink` for every epoch that
    /// is a multiple of `interval` and for the last epoch.
    pub fn run_with<F>(
        &mut self,
        epochs: ChainEpoch,
        interval: ChainEpoch,
        mut sink: F,
    ) -> Result<(), SimError>
    where
        F: FnMut(Snapshot),
    {
        if interval == 0 {
            return Err(SimError::InvalidConfig("stats interval must be positive".into()));
        }
        tracing::info!(
            policy = self.miner.policy(),
            start = self.net.epoch,
            epochs,
            interval,
            "simulation started"
        );
        for i in 0..epochs {
            let epoch = self.net.epoch;
            self.tick()?;
            if epoch % interval == 0 || i + 1 == epochs {
                sink(Snapshot::new(epoch, self.miner.summary()));
            }
        }
        tracing::info!(
            policy = self.miner.policy(),
            end = self.net.epoch,
            power = %self.miner.power(),
            reward_emitted = %self.emitter.emitted(),
            "simulation finished"
        );
        Ok(())
    }

    pub fn run(&mut self, epochs: ChainEpoch, interval: ChainEpoch) -> Result<Vec<Snapshot>, SimError> {
        let mut stats = Vec::new();
        self.run_with(epochs, interval, |s| stats.push(s))?;
        Ok(stats)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
