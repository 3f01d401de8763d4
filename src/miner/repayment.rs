// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Pledge Shortfall Simulation Suite - Shortfall Repayment Terms

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{MinerError, MinerLedger, SectorBunch};
use crate::consts::{ChainEpoch, Power, ATTO};
use crate::network::{NetworkState, INITIAL_PLEDGE_PROJECTION_PERIOD, SUPPLY_LOCK_TARGET};

/// Limits on how much future reward a shortfall may be secured against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepaymentTerms {
    /// Longest horizon over which a shortfall is repaid.
    pub max_repayment_term: ChainEpoch,
    /// Largest fraction of rewards that may go to repayment.
    pub max_repayment_reward_fraction: Decimal,
    /// Largest fraction of rewards burned as a fee, reached at full shortfall.
    pub max_fee_reward_fraction: Decimal,
    /// Decay applied when projecting rewards over the repayment term.
    pub reward_projection_decay: Decimal,
}

impl RepaymentTerms {
    pub fn validate(&self) -> Result<(), MinerError> {
        let zero = Decimal::ZERO;
        if self.max_repayment_reward_fraction < zero || self.max_fee_reward_fraction < zero {
            return Err(MinerError::InvalidParameter("reward fractions must be non-negative"));
        }
        if self.max_repayment_reward_fraction + self.max_fee_reward_fraction > Decimal::ONE {
            return Err(MinerError::InvalidParameter(
                "repayment and fee fractions must not exceed the whole reward",
            ));
        }
        if self.reward_projection_decay < zero || self.reward_projection_decay >= Decimal::ONE {
            return Err(MinerError::InvalidParameter("projection decay must be in [0, 1)"));
        }
        Ok(())
    }

    /// Shortfall a batch may take: the repayable share of its projected rewards.
    pub fn batch_shortfall(&self, net: &NetworkState, power: Power, duration: ChainEpoch) -> Decimal {
        let horizon = duration.min(self.max_repayment_term);
        self.max_repayment_reward_fraction
            * net.expected_reward_for_power(power, horizon, self.reward_projection_decay)
    }

    /// Largest shortfall `power` can carry over the full repayment term.
    pub fn max_shortfall(&self, net: &NetworkState, power: Power) -> Decimal {
        self.max_repayment_reward_fraction
            * net.expected_reward_for_power(power, self.max_repayment_term, self.reward_projection_decay)
    }

    /// Nominal pledge `tokens` can support when the rest is borrowed against rewards.
    ///
    /// Both pledge and the permitted shortfall are linear in power, so the
    /// ratio is evaluated at the current epoch reward rather than per unit power:
    ///
    /// ```text
    /// pledge / tokens = 1 / (1 - max_repay * reward(term) / (reward(20d) + 0.3 * supply))
    /// ```
    pub fn max_pledge_for_tokens(
        &self,
        net: &NetworkState,
        tokens: Decimal,
        duration: ChainEpoch,
    ) -> Result<Decimal, MinerError> {
        let horizon = duration.min(self.max_repayment_term);
        let repayable = net.projected_reward(net.epoch_reward, horizon, self.reward_projection_decay);
        let storage = net.projected_reward(
            net.epoch_reward,
            INITIAL_PLEDGE_PROJECTION_PERIOD,
            net.reward_decay,
        );
        let per_pledge = storage + SUPPLY_LOCK_TARGET * net.circulating_supply;
        if per_pledge <= Decimal::ZERO {
            return Ok(tokens);
        }
        let denominator = Decimal::ONE - self.max_repayment_reward_fraction * repayable / per_pledge;
        if denominator <= Decimal::ZERO {
            return Err(MinerError::UnboundedShortfall { denominator });
        }
        Ok(tokens / denominator)
    }
}

/// Shortfall bookkeeping shared by the repayment policies.
#[derive(Debug, Clone, Default)]
pub(super) struct PledgeRequirement {
    pub(super) required: Decimal,
}

impl PledgeRequirement {
    pub(super) fn shortfall(&self, ledger: &MinerLedger) -> Decimal {
        (self.required - ledger.pledge_locked).max(Decimal::ZERO)
    }

    pub(super) fn fraction(
        &self,
        terms: &RepaymentTerms,
        net: &NetworkState,
        ledger: &MinerLedger,
    ) -> Decimal {
        let max = terms.max_shortfall(net, ledger.power);
        if max <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.shortfall(ledger) / max).min(Decimal::ONE)
    }

    /// Releases pledge for an expiring bunch in proportion to the miner's
    /// aggregate satisfaction, not the bunch's own lock.
    pub(super) fn expire(&mut self, ledger: &mut MinerLedger, bunch: SectorBunch) {
        if ledger.remove_power(bunch.power) {
            self.required = Decimal::ZERO;
            ledger.clear_pledge();
            return;
        }
        let release = if self.required > Decimal::ZERO {
            bunch.pledge * (ledger.pledge_locked / self.required).min(Decimal::ONE)
        } else {
            bunch.pledge
        };
        self.required = (self.required - bunch.pledge).max(Decimal::ZERO);
        ledger.release_pledge(release);
    }

    /// Summary fields for a miner with a pledge requirement.
    pub(super) fn annotate(&self, ledger: &MinerLedger, summary: &mut super::MinerSummary) {
        let shortfall = self.shortfall(ledger);
        summary.pledge_required = Some(self.required.round_dp(4));
        summary.shortfall = Some(shortfall.round_dp(4));
        summary.shortfall_pct = Some(if self.required > Decimal::ZERO {
            (dec!(100) * shortfall / self.required).round_dp(2)
        } else {
            Decimal::ZERO
        });
    }
}

/// Checks a single reward split never exceeds the reward, at token resolution.
pub(super) fn assert_within_reward(fee: Decimal, repayment: Decimal, reward: Decimal) {
    assert!(
        fee + repayment <= reward + ATTO,
        "fee {fee} + repayment {repayment} exceeds reward {reward}"
    );
}
