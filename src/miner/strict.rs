// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Pledge Shortfall Simulation Suite - Strict Pledge Policy

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    check_sector_alignment, Activation, Lock, Miner, MinerError, MinerLedger, SectorBunch,
    VestingSchedule,
};
use crate::consts::{ChainEpoch, Power};
use crate::network::NetworkState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrictConfig {
    pub balance: Decimal,
    /// Reward vesting. `None`, the default, makes every reward immediately available.
    pub vesting: Option<VestingSchedule>,
}

impl Default for StrictConfig {
    fn default() -> Self {
        Self {
            balance: Decimal::ZERO,
            vesting: None,
        }
    }
}

/// Locks the full pledge requirement for every activation. Any gap between
/// requirement and available balance is leased, and rewards repay the lease.
#[derive(Debug, Clone)]
pub struct StrictMiner {
    ledger: MinerLedger,
}

impl StrictMiner {
    pub fn new(cfg: &StrictConfig) -> Result<Self, MinerError> {
        if cfg.balance < Decimal::ZERO {
            return Err(MinerError::InvalidParameter("balance must be non-negative"));
        }
        let ledger = match cfg.vesting {
            Some(schedule) => {
                if schedule.available_share < Decimal::ZERO || schedule.available_share > Decimal::ONE {
                    return Err(MinerError::InvalidParameter("vesting available share must be in [0, 1]"));
                }
                MinerLedger::with_vesting(cfg.balance, schedule)
            }
            None => MinerLedger::new(cfg.balance),
        };
        Ok(Self { ledger })
    }
}

impl Miner for StrictMiner {
    fn ledger(&self) -> &MinerLedger {
        &self.ledger
    }

    fn ledger_mut(&mut self) -> &mut MinerLedger {
        &mut self.ledger
    }

    fn policy(&self) -> &'static str {
        "strict"
    }

    fn activate_sectors(
        &mut self,
        net: &NetworkState,
        power: Power,
        duration: ChainEpoch,
        lock: Lock,
    ) -> Result<Activation, MinerError> {
        check_sector_alignment(power)?;
        let requirement = net.initial_pledge_for_power(power);
        let pledge = lock.resolve(requirement, requirement)?;
        self.ledger.commit(net, power, duration, pledge, pledge);
        tracing::debug!(policy = "strict", power = %power, pledge = %pledge, "sectors activated");
        Ok(Activation { power, pledge })
    }

    fn receive_reward(&mut self, net: &NetworkState, reward: Decimal) {
        self.ledger.earn_reward(reward);
        self.ledger.vest_reward(net.epoch, reward);
        self.ledger.repay_lease_from_available();
    }

    fn handle_expiration(&mut self, bunch: SectorBunch) {
        if self.ledger.remove_power(bunch.power) {
            self.ledger.clear_pledge();
        } else {
            self.ledger.release_pledge(bunch.pledge);
        }
    }
}
