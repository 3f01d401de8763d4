// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Miner collateral accounting.
//!
//! One [`Miner`] trait, four policies for covering a pledge shortfall:
//!
//! | Policy | Minimum lock | Shortfall cost |
//! |---|---|---|
//! | [`StrictMiner`] | full requirement | none, lease covers the gap |
//! | [`BurnShortfallMiner`] | `req × (1 − f)` | fee burned from rewards |
//! | [`RepayProportionalMiner`] | `req − repayable rewards` | fee + √-scaled repayment |
//! | [`RepayRatchetMiner`] | `req − repayable rewards` | fee + ratcheted repayment |
//!
//! All state lives in a [`MinerLedger`]; policies add only their own fields.

pub mod burn;
pub mod ledger;
pub mod repay_proportional;
pub mod repay_ratchet;
pub mod repayment;
pub mod strict;

pub use burn::{BurnShortfallConfig, BurnShortfallMiner};
pub use ledger::{MinerLedger, VestingSchedule};
pub use repay_proportional::{RepayProportionalConfig, RepayProportionalMiner};
pub use repay_ratchet::{RepayRatchetConfig, RepayRatchetMiner};
pub use repayment::RepaymentTerms;
pub use strict::{StrictConfig, StrictMiner};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{ChainEpoch, Power, ATTO, SECTOR_SIZE};
use crate::network::NetworkState;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Fatal accounting errors. Each one means the policy parameters and the
/// strategy driving them disagree; the run cannot continue.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MinerError {
    #[error("power {power} is not a multiple of sector size {}", SECTOR_SIZE)]
    UnalignedPower { power: Power },

    #[error("lock {lock} is below the minimum pledge {minimum}")]
    InvalidLock { lock: Decimal, minimum: Decimal },

    #[error("pledge locked {locked} is below the aggregate minimum {minimum}")]
    AggregatePledgeShortfall { locked: Decimal, minimum: Decimal },

    #[error("repayment take rate {rate} exceeds maximum {maximum}")]
    RepaymentRateExceeded { rate: Decimal, maximum: Decimal },

    #[error("shortfall allowance leaves no pledge to lock (denominator {denominator})")]
    UnboundedShortfall { denominator: Decimal },

    #[error("invalid policy parameter: {0}")]
    InvalidParameter(&'static str),
}

pub(crate) fn check_sector_alignment(power: Power) -> Result<(), MinerError> {
    if power % SECTOR_SIZE != 0 {
        return Err(MinerError::UnalignedPower { power });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// One activation batch, held in the expiration table until it expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorBunch {
    pub power: Power,
    pub pledge: Decimal,
}

/// How much pledge to lock for an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    /// The policy's minimum allowed lock.
    Minimum,
    /// The full pledge requirement.
    Full,
    /// A specific amount, clamped down to the full requirement.
    Amount(Decimal),
}

impl Lock {
    /// A zero amount means the policy minimum.
    pub fn amount(value: Decimal) -> Self {
        if value.is_zero() {
            Lock::Minimum
        } else {
            Lock::Amount(value)
        }
    }

    /// Resolves to a concrete lock within `[minimum, full]`.
    pub fn resolve(self, minimum: Decimal, full: Decimal) -> Result<Decimal, MinerError> {
        let minimum = minimum.max(Decimal::ZERO).min(full);
        match self {
            Lock::Minimum => Ok(minimum),
            Lock::Full => Ok(full),
            Lock::Amount(v) if v >= full => Ok(full),
            Lock::Amount(v) if v + ATTO < minimum => Err(MinerError::InvalidLock { lock: v, minimum }),
            Lock::Amount(v) => Ok(v.max(minimum)),
        }
    }
}

/// Outcome of [`Miner::activate_sectors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    pub power: Power,
    pub pledge: Decimal,
}

/// Point-in-time miner statistics. Amounts are rounded to 4 places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinerSummary {
    pub power: Power,
    pub balance: Decimal,
    pub lease: Decimal,
    pub pledge_locked: Decimal,
    pub vesting_locked: Decimal,
    pub available_balance: Decimal,
    pub net_equity: Decimal,
    pub fofr: Decimal,
    pub reward_earned: Decimal,
    pub fee_burned: Decimal,
    pub lease_fee_accrued: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pledge_required: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortfall: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortfall_pct: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repayment_take_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_fee: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Miner
// ---------------------------------------------------------------------------

/// A miner's collateral accounting under one shortfall policy.
pub trait Miner: std::fmt::Debug {
    fn ledger(&self) -> &MinerLedger;

    fn ledger_mut(&mut self) -> &mut MinerLedger;

    /// Short policy name used in logs.
    fn policy(&self) -> &'static str;

    fn power(&self) -> Power {
        self.ledger().power()
    }

    fn lease(&self) -> Decimal {
        self.ledger().lease()
    }

    fn available_balance(&self) -> Decimal {
        self.ledger().available_balance()
    }

    /// Maximum nominal pledge that `tokens` can support for sectors of `duration`.
    fn max_pledge_for_tokens(
        &self,
        _net: &NetworkState,
        tokens: Decimal,
        _duration: ChainEpoch,
    ) -> Result<Decimal, MinerError> {
        Ok(tokens)
    }

    /// Commits new power, locking pledge according to `lock` and leasing
    /// whatever available balance does not cover.
    fn activate_sectors(
        &mut self,
        net: &NetworkState,
        power: Power,
        duration: ChainEpoch,
        lock: Lock,
    ) -> Result<Activation, MinerError>;

    /// Credits a block reward. `reward` must be non-negative.
    fn receive_reward(&mut self, net: &NetworkState, reward: Decimal);

    /// Current shortfall as a fraction of the policy's maximum, in `[0, 1]`.
    fn shortfall_fraction(&self, _net: &NetworkState) -> Decimal {
        Decimal::ZERO
    }

    /// End-of-epoch settlement: lease fee, expirations due, vesting due.
    fn handle_epoch(&mut self, net: &NetworkState) {
        self.ledger_mut().settle_epoch(net);
        let expiring = self.ledger_mut().take_expirations(net.epoch);
        for bunch in expiring {
            tracing::debug!(
                policy = self.policy(),
                epoch = net.epoch,
                power = %bunch.power,
                pledge = %bunch.pledge,
                "sectors expired"
            );
            self.handle_expiration(bunch);
        }
        self.ledger_mut().release_vesting(net.epoch);
    }

    fn handle_expiration(&mut self, bunch: SectorBunch);

    fn summary(&self) -> MinerSummary {
        self.ledger().summary()
    }
}

// ---------------------------------------------------------------------------
// MinerConfig
// ---------------------------------------------------------------------------

/// Policy selection with its constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum MinerConfig {
    Strict(StrictConfig),
    Burn(BurnShortfallConfig),
    RepayProportional(RepayProportionalConfig),
    RepayRatchet(RepayRatchetConfig),
}

impl Default for MinerConfig {
    fn default() -> Self {
        MinerConfig::Strict(StrictConfig::default())
    }
}

impl MinerConfig {
    pub fn build(&self) -> Result<Box<dyn Miner>, MinerError> {
        Ok(match self {
            MinerConfig::Strict(cfg) => Box::new(StrictMiner::new(cfg)?),
            MinerConfig::Burn(cfg) => Box::new(BurnShortfallMiner::new(cfg)?),
            MinerConfig::RepayProportional(cfg) => Box::new(RepayProportionalMiner::new(cfg)?),
            MinerConfig::RepayRatchet(cfg) => Box::new(RepayRatchetMiner::new(cfg)?),
        })
    }

    pub fn balance(&self) -> Decimal {
        match self {
            MinerConfig::Strict(cfg) => cfg.balance,
            MinerConfig::Burn(cfg) => cfg.balance,
            MinerConfig::RepayProportional(cfg) => cfg.balance,
            MinerConfig::RepayRatchet(cfg) => cfg.balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_amount_means_minimum() {
        assert_eq!(Lock::amount(Decimal::ZERO), Lock::Minimum);
        assert_eq!(Lock::amount(dec!(3)), Lock::Amount(dec!(3)));
    }

    #[test]
    fn lock_resolution_bounds() {
        assert_eq!(Lock::Minimum.resolve(dec!(6), dec!(10)), Ok(dec!(6)));
        assert_eq!(Lock::Full.resolve(dec!(6), dec!(10)), Ok(dec!(10)));
        assert_eq!(Lock::Amount(dec!(8)).resolve(dec!(6), dec!(10)), Ok(dec!(8)));
        assert_eq!(Lock::Amount(dec!(12)).resolve(dec!(6), dec!(10)), Ok(dec!(10)));
        assert_eq!(
            Lock::Amount(dec!(5)).resolve(dec!(6), dec!(10)),
            Err(MinerError::InvalidLock { lock: dec!(5), minimum: dec!(6) })
        );
    }

    #[test]
    fn negative_minimum_resolves_to_zero() {
        assert_eq!(Lock::Minimum.resolve(dec!(-2), dec!(10)), Ok(Decimal::ZERO));
    }

    #[test]
    fn alignment_check() {
        assert!(check_sector_alignment(SECTOR_SIZE * 3).is_ok());
        assert_eq!(
            check_sector_alignment(SECTOR_SIZE + 1),
            Err(MinerError::UnalignedPower { power: SECTOR_SIZE + 1 })
        );
    }

    #[test]
    fn config_parses_tagged_policy() {
        let src = r#"
            policy = "burn"
            balance = "100"
            max_shortfall_fraction = "0.5"
        "#;
        let cfg: MinerConfig = toml::from_str(src).expect("test: miner config should parse");
        match &cfg {
            MinerConfig::Burn(burn) => {
                assert_eq!(burn.max_shortfall_fraction, dec!(0.5));
                assert_eq!(burn.shortfall_take_rate_exponent, dec!(0.75));
            }
            other => panic!("unexpected policy {other:?}"),
        }
        assert_eq!(cfg.balance(), dec!(100));
    }

    #[test]
    fn strict_vesting_is_opt_in() {
        let plain: MinerConfig = toml::from_str(r#"policy = "strict""#).expect("test: parse");
        assert_eq!(plain, MinerConfig::Strict(StrictConfig::default()));

        let src = r#"
            policy = "strict"
            vesting = { interval = 100 }
        "#;
        match toml::from_str::<MinerConfig>(src).expect("test: parse") {
            MinerConfig::Strict(StrictConfig { vesting: Some(schedule), .. }) => {
                assert_eq!(schedule.interval, 100);
                assert_eq!(schedule.intervals, 180);
                assert_eq!(schedule.available_share, dec!(0.25));
            }
            other => panic!("unexpected config {other:?}"),
        }
    }

    #[test]
    fn every_policy_builds() {
        for cfg in [
            MinerConfig::Strict(StrictConfig::default()),
            MinerConfig::Burn(BurnShortfallConfig::default()),
            MinerConfig::RepayProportional(RepayProportionalConfig::default()),
            MinerConfig::RepayRatchet(RepayRatchetConfig::default()),
        ] {
            let miner = cfg.build().expect("test: default config should build");
            assert_eq!(miner.power(), 0);
        }
    }
}
