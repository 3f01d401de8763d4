// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Pledge Shortfall Simulation Suite

//! Epoch-by-epoch simulation of one storage miner's pledge, shortfall, lease
//! and reward accounting against a projected network economy.
//!
//! The [`network`] model sizes pledge and projects rewards; a [`miner`] policy
//! books activations, rewards and expirations; a [`strategy`] decides what to
//! onboard; the [`simulation`] driver sequences them each epoch.

pub mod consts;
pub mod deferred;
pub mod miner;
pub mod network;
pub mod simulation;
pub mod strategy;

pub use consts::{ChainEpoch, Power};
pub use miner::{Activation, Lock, Miner, MinerConfig, MinerError, MinerSummary};
pub use network::{NetworkConfig, NetworkState};
pub use simulation::{RewardEmitter, SimConfig, SimError, Simulator, Snapshot};
pub use strategy::{MinerStrategy, StrategyConfig};
