// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Pledge Shortfall Simulation Suite - Ratchet Repayment Policy

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::repayment::{assert_within_reward, PledgeRequirement};
use super::{
    check_sector_alignment, Activation, Lock, Miner, MinerError, MinerLedger, MinerSummary,
    RepaymentTerms, SectorBunch,
};
use crate::consts::{ChainEpoch, Power, ATTO, YEAR};
use crate::network::{NetworkState, BASELINE_GROWTH, REWARD_DECAY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepayRatchetConfig {
    pub balance: Decimal,
    /// Longest horizon over which a shortfall is repaid.
    pub max_repayment_term: ChainEpoch,
    /// Fee fraction at full shortfall. Repayment may take the rest of the reward.
    pub max_fee_reward_fraction: Decimal,
    /// `REWARD_DECAY` assumes a constant power share; adding `BASELINE_GROWTH`
    /// assumes this miner stops while the network grows at the baseline rate.
    pub reward_projection_decay: Decimal,
    /// Recompute the take rate on every activation, not only on those that
    /// left part of the requirement unlocked.
    pub ratchet_on_full_pledge: bool,
}

impl Default for RepayRatchetConfig {
    fn default() -> Self {
        Self {
            balance: Decimal::ZERO,
            max_repayment_term: 3 * YEAR,
            max_fee_reward_fraction: dec!(0.25),
            reward_projection_decay: REWARD_DECAY + BASELINE_GROWTH,
            ratchet_on_full_pledge: false,
        }
    }
}

impl RepayRatchetConfig {
    pub fn terms(&self) -> RepaymentTerms {
        RepaymentTerms {
            max_repayment_term: self.max_repayment_term,
            max_repayment_reward_fraction: Decimal::ONE - self.max_fee_reward_fraction,
            max_fee_reward_fraction: self.max_fee_reward_fraction,
            reward_projection_decay: self.reward_projection_decay,
        }
    }
}

/// Repays a shortfall from rewards at a take rate that only ratchets upward
/// while a shortfall is outstanding, so the total is retired within the term.
/// The rate resets to zero once the shortfall is fully repaid.
#[derive(Debug, Clone)]
pub struct RepayRatchetMiner {
    ledger: MinerLedger,
    terms: RepaymentTerms,
    ratchet_on_full_pledge: bool,
    requirement: PledgeRequirement,
    repayment_take_rate: Decimal,
}

impl RepayRatchetMiner {
    pub fn new(cfg: &RepayRatchetConfig) -> Result<Self, MinerError> {
        if cfg.balance < Decimal::ZERO {
            return Err(MinerError::InvalidParameter("balance must be non-negative"));
        }
        if cfg.max_fee_reward_fraction > Decimal::ONE {
            return Err(MinerError::InvalidParameter("max fee fraction must be at most 1"));
        }
        let terms = cfg.terms();
        terms.validate()?;
        Ok(Self {
            ledger: MinerLedger::new(cfg.balance),
            terms,
            ratchet_on_full_pledge: cfg.ratchet_on_full_pledge,
            requirement: PledgeRequirement::default(),
            repayment_take_rate: Decimal::ZERO,
        })
    }

    pub fn pledge_required(&self) -> Decimal {
        self.requirement.required
    }

    pub fn shortfall(&self) -> Decimal {
        self.requirement.shortfall(&self.ledger)
    }

    pub fn repayment_take_rate(&self) -> Decimal {
        self.repayment_take_rate
    }

    fn reset_take_rate(&mut self) {
        if !self.repayment_take_rate.is_zero() {
            tracing::debug!(policy = "repay-ratchet", "shortfall retired, take rate reset");
        }
        self.repayment_take_rate = Decimal::ZERO;
    }
}

impl Miner for RepayRatchetMiner {
    fn ledger(&self) -> &MinerLedger {
        &self.ledger
    }

    fn ledger_mut(&mut self) -> &mut MinerLedger {
        &mut self.ledger
    }

    fn policy(&self) -> &'static str {
        "repay-ratchet"
    }

    fn max_pledge_for_tokens(
        &self,
        net: &NetworkState,
        tokens: Decimal,
        duration: ChainEpoch,
    ) -> Result<Decimal, MinerError> {
        self.terms.max_pledge_for_tokens(net, tokens, duration)
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
        let minimum = requirement - self.terms.batch_shortfall(net, power, duration);
        let pledge = lock.resolve(minimum, requirement)?;

        // The take rate depends on the shortest duration, so by default only
        // batches that took a shortfall move it.
        let mut take_rate = self.repayment_take_rate;
        if pledge < requirement || self.ratchet_on_full_pledge {
            let total_power = self.ledger.power + power;
            let shortfall = (self.requirement.required + requirement)
                - (self.ledger.pledge_locked + pledge);
            let expected = net.expected_reward_for_power(
                total_power,
                self.terms.max_repayment_term,
                self.terms.reward_projection_decay,
            );
            if shortfall > Decimal::ZERO && expected > Decimal::ZERO {
                let rate = shortfall / expected;
                let maximum = self.terms.max_repayment_reward_fraction;
                if rate > maximum + ATTO {
                    return Err(MinerError::RepaymentRateExceeded { rate, maximum });
                }
                take_rate = take_rate.max(rate.min(maximum));
            }
        }

        self.ledger.commit(net, power, duration, pledge, requirement);
        self.requirement.required += requirement;
        if take_rate > self.repayment_take_rate {
            tracing::debug!(
                policy = "repay-ratchet",
                from = %self.repayment_take_rate,
                to = %take_rate,
                "take rate ratcheted"
            );
            self.repayment_take_rate = take_rate;
        }
        tracing::debug!(
            policy = "repay-ratchet",
            power = %power,
            pledge = %pledge,
            requirement = %requirement,
            "sectors activated"
        );
        Ok(Activation { power, pledge })
    }

    fn receive_reward(&mut self, net: &NetworkState, reward: Decimal) {
        self.ledger.earn_reward(reward);
        let frac = self.shortfall_fraction(net);
        if frac > Decimal::ZERO {
            let fee = reward * frac * self.terms.max_fee_reward_fraction;
            self.ledger.burn_fee(fee);

            let shortfall = self.shortfall();
            let mut repayment = reward * self.repayment_take_rate;
            if repayment >= shortfall {
                repayment = shortfall;
                self.reset_take_rate();
            }
            let repayment = repayment.min(reward - fee);
            self.ledger.lock_pledge(repayment);
            assert_within_reward(fee, repayment, reward);
        }
        self.ledger.repay_lease_from_available();
    }

    fn shortfall_fraction(&self, net: &NetworkState) -> Decimal {
        self.requirement.fraction(&self.terms, net, &self.ledger)
    }

    fn handle_expiration(&mut self, bunch: SectorBunch) {
        self.requirement.expire(&mut self.ledger, bunch);
        if self.requirement.required.is_zero() {
            self.reset_take_rate();
        }
    }

    fn summary(&self) -> MinerSummary {
        let mut summary = self.ledger.summary();
        self.requirement.annotate(&self.ledger, &mut summary);
        summary.repayment_take_rate = Some(self.repayment_take_rate.round_dp(6));
        summary
    }
}
