// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Pledge Shortfall Simulation Suite - Burn Shortfall Policy

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{
    check_sector_alignment, Activation, Lock, Miner, MinerError, MinerLedger, MinerSummary,
    SectorBunch,
};
use crate::consts::{power_to_decimal, ChainEpoch, Power};
use crate::network::NetworkState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurnShortfallConfig {
    pub balance: Decimal,
    /// Largest fraction of the requirement that may be left unlocked.
    pub max_shortfall_fraction: Decimal,
    /// Exponent applied to the pending fraction when sizing the fee rate.
    pub shortfall_take_rate_exponent: Decimal,
    /// Fee rate floor while any fee is pending.
    pub base_burn_rate: Decimal,
    /// Reduce the pending fee in proportion to power expiring.
    pub forgive_on_expiration: bool,
}

impl Default for BurnShortfallConfig {
    fn default() -> Self {
        Self {
            balance: Decimal::ZERO,
            max_shortfall_fraction: dec!(0.33),
            shortfall_take_rate_exponent: dec!(0.75),
            base_burn_rate: dec!(0.01),
            forgive_on_expiration: true,
        }
    }
}

/// Locks part of the requirement and owes the rest as a fee, burned from
/// future rewards at a rate rising with the unpaid share.
///
/// ```text
/// rate = min(base + (pending / (locked + pending))^exponent, 1)
/// fee  = min(reward * rate, pending)
/// ```
#[derive(Debug, Clone)]
pub struct BurnShortfallMiner {
    ledger: MinerLedger,
    max_shortfall_fraction: Decimal,
    exponent: Decimal,
    base_burn_rate: Decimal,
    forgive_on_expiration: bool,
    fee_pending: Decimal,
}

impl BurnShortfallMiner {
    pub fn new(cfg: &BurnShortfallConfig) -> Result<Self, MinerError> {
        if cfg.balance < Decimal::ZERO {
            return Err(MinerError::InvalidParameter("balance must be non-negative"));
        }
        if cfg.max_shortfall_fraction < Decimal::ZERO || cfg.max_shortfall_fraction >= Decimal::ONE {
            return Err(MinerError::InvalidParameter("max shortfall fraction must be in [0, 1)"));
        }
        if cfg.shortfall_take_rate_exponent <= Decimal::ZERO {
            return Err(MinerError::InvalidParameter("take rate exponent must be positive"));
        }
        if cfg.base_burn_rate < Decimal::ZERO || cfg.base_burn_rate > Decimal::ONE {
            return Err(MinerError::InvalidParameter("base burn rate must be in [0, 1]"));
        }
        Ok(Self {
            ledger: MinerLedger::new(cfg.balance),
            max_shortfall_fraction: cfg.max_shortfall_fraction,
            exponent: cfg.shortfall_take_rate_exponent,
            base_burn_rate: cfg.base_burn_rate,
            forgive_on_expiration: cfg.forgive_on_expiration,
            fee_pending: Decimal::ZERO,
        })
    }

    pub fn fee_pending(&self) -> Decimal {
        self.fee_pending
    }

    /// Fraction of a reward burned at the current pending balance.
    pub fn fee_rate(&self) -> Decimal {
        if self.fee_pending <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let pending_share = self.fee_pending / (self.ledger.pledge_locked + self.fee_pending);
        let scaled = pending_share
            .checked_powd(self.exponent)
            .unwrap_or(pending_share);
        (self.base_burn_rate + scaled).min(Decimal::ONE)
    }
}

impl Miner for BurnShortfallMiner {
    fn ledger(&self) -> &MinerLedger {
        &self.ledger
    }

    fn ledger_mut(&mut self) -> &mut MinerLedger {
        &mut self.ledger
    }

    fn policy(&self) -> &'static str {
        "burn"
    }

    fn max_pledge_for_tokens(
        &self,
        _net: &NetworkState,
        tokens: Decimal,
        _duration: ChainEpoch,
    ) -> Result<Decimal, MinerError> {
        let denominator = Decimal::ONE - self.max_shortfall_fraction;
        if denominator <= Decimal::ZERO {
            return Err(MinerError::UnboundedShortfall { denominator });
        }
        Ok(tokens / denominator)
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
        let minimum = requirement * (Decimal::ONE - self.max_shortfall_fraction);
        let pledge = lock.resolve(minimum, requirement)?;

        // At the minimum the owed fee is the allowed share itself rather than a
        // difference, so it can sit one unit in the last place off `requirement`.
        let owed = if pledge == minimum {
            requirement * self.max_shortfall_fraction
        } else {
            requirement - pledge
        };
        self.ledger.commit(net, power, duration, pledge, pledge);
        self.fee_pending += owed;
        tracing::debug!(
            policy = "burn",
            power = %power,
            pledge = %pledge,
            fee_pending = %self.fee_pending,
            "sectors activated"
        );
        Ok(Activation { power, pledge })
    }

    fn receive_reward(&mut self, _net: &NetworkState, reward: Decimal) {
        self.ledger.earn_reward(reward);
        let fee = (reward * self.fee_rate()).min(self.fee_pending).min(reward);
        if fee > Decimal::ZERO {
            self.ledger.burn_fee(fee);
            self.fee_pending -= fee;
        }
        super::repayment::assert_within_reward(fee, Decimal::ZERO, reward);
        self.ledger.repay_lease_from_available();
    }

    fn shortfall_fraction(&self, _net: &NetworkState) -> Decimal {
        let nominal = self.ledger.pledge_locked + self.fee_pending;
        if nominal <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.fee_pending / nominal).min(Decimal::ONE)
    }

    fn handle_expiration(&mut self, bunch: SectorBunch) {
        let remaining = self.ledger.power - bunch.power.min(self.ledger.power);
        if self.forgive_on_expiration && self.ledger.power > 0 {
            let kept = power_to_decimal(remaining) / power_to_decimal(self.ledger.power);
            self.fee_pending *= kept;
        }
        if self.ledger.remove_power(bunch.power) {
            self.ledger.clear_pledge();
        } else {
            self.ledger.release_pledge(bunch.pledge);
        }
    }

    fn summary(&self) -> MinerSummary {
        let mut summary = self.ledger.summary();
        summary.pending_fee = Some(self.fee_pending.round_dp(4));
        summary
    }
}
