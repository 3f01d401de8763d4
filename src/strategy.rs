// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Power and pledge targeting.
//!
//! Each epoch the strategy works out how much the miner can lock (available
//! balance plus lease headroom, within the lifetime pledge budget), how much
//! power that buys, and which of power or tokens is the binding constraint.
//! It then makes at most one activation through the [`Miner`] contract.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::consts::{power_serde, round_to_sectors, ChainEpoch, Power, EXBIBYTE};
use crate::miner::{Activation, Lock, Miner, MinerError};
use crate::network::NetworkState;

/// Power ceiling for strategies limited by tokens rather than power.
const UNLIMITED_POWER: Power = 1000 * EXBIBYTE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Maximum power active at any one time.
    #[serde(with = "power_serde")]
    pub max_power: Power,
    /// Lifetime onboarding cap. Expired power does not free room under it.
    #[serde(with = "power_serde")]
    pub max_power_onboard: Power,
    /// Lifetime cap on pledge locked through activations. `None` is unlimited.
    #[serde(default)]
    pub max_pledge_onboard: Option<Decimal>,
    pub commitment_duration: ChainEpoch,
    /// Maximum tokens leased at any one time. `None` is unlimited.
    #[serde(default)]
    pub max_pledge_lease: Option<Decimal>,
    /// Fraction of the nominal pledge to leave as shortfall, in `[0, 1]`.
    /// 1 takes the largest shortfall the miner's policy allows.
    #[serde(default)]
    pub use_shortfall: Decimal,
}

impl StrategyConfig {
    /// Onboards a fixed amount of power, leasing whatever tokens pledge requires.
    pub fn power_limited(power: Power, duration: ChainEpoch, shortfall: Decimal) -> Self {
        Self {
            max_power: power,
            max_power_onboard: power,
            max_pledge_onboard: None,
            commitment_duration: duration,
            max_pledge_lease: None,
            use_shortfall: shortfall,
        }
    }

    /// Locks up to a fixed pledge and onboards as much power as it buys.
    pub fn pledge_limited(pledge: Decimal, duration: ChainEpoch, shortfall: Decimal) -> Self {
        Self {
            max_power: UNLIMITED_POWER,
            max_power_onboard: UNLIMITED_POWER,
            max_pledge_onboard: Some(pledge),
            commitment_duration: duration,
            max_pledge_lease: None,
            use_shortfall: shortfall,
        }
    }

    /// Limited by how many tokens can be leased.
    pub fn pledge_lease_limited(lease: Decimal, duration: ChainEpoch, shortfall: Decimal) -> Self {
        Self {
            max_power: UNLIMITED_POWER,
            max_power_onboard: UNLIMITED_POWER,
            max_pledge_onboard: None,
            commitment_duration: duration,
            max_pledge_lease: Some(lease),
            use_shortfall: shortfall,
        }
    }
}

/// Stateful targeting policy: remembers lifetime onboarded power and pledge.
#[derive(Debug, Clone)]
pub struct MinerStrategy {
    cfg: StrategyConfig,
    onboarded: Power,
    pledged: Decimal,
}

impl MinerStrategy {
    pub fn new(cfg: StrategyConfig) -> Result<Self, MinerError> {
        if cfg.use_shortfall < Decimal::ZERO || cfg.use_shortfall > Decimal::ONE {
            return Err(MinerError::InvalidParameter("use_shortfall must be in [0, 1]"));
        }
        Ok(Self { cfg, onboarded: 0, pledged: Decimal::ZERO })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.cfg
    }

    pub fn onboarded(&self) -> Power {
        self.onboarded
    }

    pub fn pledged(&self) -> Decimal {
        self.pledged
    }

    /// Tokens available to lock this epoch. `None` when no cap applies.
    fn available_lock(&self, miner: &dyn Miner) -> Option<Decimal> {
        let from_lease = self
            .cfg
            .max_pledge_lease
            .map(|max| miner.available_balance() + (max - miner.lease()));
        let from_budget = self.cfg.max_pledge_onboard.map(|max| max - self.pledged);
        match (from_lease, from_budget) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Makes at most one activation. Errors are fatal policy mismatches.
    pub fn act(
        &mut self,
        net: &NetworkState,
        miner: &mut dyn Miner,
    ) -> Result<Option<Activation>, MinerError> {
        let duration = self.cfg.commitment_duration;
        let shortfall = self.cfg.use_shortfall;

        let available_lock = self.available_lock(miner);
        let available_pledge = match available_lock {
            None => None,
            Some(lock) if shortfall == Decimal::ONE => {
                Some(miner.max_pledge_for_tokens(net, lock, duration)?)
            }
            Some(lock) => Some(lock / (Decimal::ONE - shortfall)),
        };
        let power_for_pledge = match available_pledge {
            None => Power::MAX,
            Some(pledge) => net.power_for_initial_pledge(pledge),
        };

        let target_power = self
            .cfg
            .max_power
            .saturating_sub(miner.power())
            .min(self.cfg.max_power_onboard.saturating_sub(self.onboarded));

        let (power, lock) = match available_lock {
            Some(lock) if target_power > power_for_pledge => (power_for_pledge, Lock::amount(lock)),
            // Power binds: take exactly the configured shortfall. A full shortfall
            // locks zero, which asks the policy for its minimum.
            _ => {
                let power = round_to_sectors(target_power);
                let nominal = net.initial_pledge_for_power(power);
                (power, Lock::amount(nominal * (Decimal::ONE - shortfall)))
            }
        };
        let power = round_to_sectors(power);
        if power == 0 {
            return Ok(None);
        }

        let activation = miner.activate_sectors(net, power, duration, lock)?;
        self.onboarded += activation.power;
        self.pledged += activation.pledge;
        tracing::debug!(
            epoch = net.epoch,
            power = %activation.power,
            pledge = %activation.pledge,
            onboarded = %self.onboarded,
            "strategy onboarded power"
        );
        Ok(Some(activation))
    }
}
