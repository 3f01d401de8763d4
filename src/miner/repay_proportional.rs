// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Pledge Shortfall Simulation Suite - Proportional Repayment Policy

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::repayment::{assert_within_reward, PledgeRequirement};
use super::{
    check_sector_alignment, Activation, Lock, Miner, MinerError, MinerLedger, MinerSummary,
    RepaymentTerms, SectorBunch,
};
use crate::consts::{ChainEpoch, Power, ATTO, YEAR};
use crate::network::{NetworkState, REWARD_DECAY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepayProportionalConfig {
    pub balance: Decimal,
    pub max_repayment_term: ChainEpoch,
    pub max_repayment_reward_fraction: Decimal,
    pub max_fee_reward_fraction: Decimal,
    /// Repayment take rate at the smallest shortfall, as a fraction of the maximum.
    pub min_repayment_take_fraction: Decimal,
}

impl Default for RepayProportionalConfig {
    fn default() -> Self {
        Self {
            balance: Decimal::ZERO,
            max_repayment_term: YEAR,
            max_repayment_reward_fraction: dec!(0.75),
            max_fee_reward_fraction: dec!(0.25),
            min_repayment_take_fraction: dec!(0.25),
        }
    }
}

impl RepayProportionalConfig {
    /// Rewards are projected with plain reward decay.
    pub fn terms(&self) -> RepaymentTerms {
        RepaymentTerms {
            max_repayment_term: self.max_repayment_term,
            max_repayment_reward_fraction: self.max_repayment_reward_fraction,
            max_fee_reward_fraction: self.max_fee_reward_fraction,
            reward_projection_decay: REWARD_DECAY,
        }
    }
}

/// Borrows pledge against future rewards and repays it from every reward at
/// a rate that scales with the square root of the current shortfall.
///
/// ```text
/// fee       = reward * frac * max_fee
/// repayment = reward * (min_take + (1 - min_take) * sqrt(frac)) * max_repay
/// ```
#[derive(Debug, Clone)]
pub struct RepayProportionalMiner {
    ledger: MinerLedger,
    terms: RepaymentTerms,
    min_take: Decimal,
    requirement: PledgeRequirement,
}

impl RepayProportionalMiner {
    pub fn new(cfg: &RepayProportionalConfig) -> Result<Self, MinerError> {
        if cfg.balance < Decimal::ZERO {
            return Err(MinerError::InvalidParameter("balance must be non-negative"));
        }
        let terms = cfg.terms();
        terms.validate()?;
        if cfg.min_repayment_take_fraction < Decimal::ZERO
            || cfg.min_repayment_take_fraction > Decimal::ONE
        {
            return Err(MinerError::InvalidParameter("min repayment take must be in [0, 1]"));
        }
        Ok(Self {
            ledger: MinerLedger::new(cfg.balance),
            terms,
            min_take: cfg.min_repayment_take_fraction,
            requirement: PledgeRequirement::default(),
        })
    }

    pub fn pledge_required(&self) -> Decimal {
        self.requirement.required
    }

    pub fn shortfall(&self) -> Decimal {
        self.requirement.shortfall(&self.ledger)
    }

    fn repayment_take_rate(&self, frac: Decimal) -> Decimal {
        let root = frac.sqrt().unwrap_or(frac);
        (self.min_take + (Decimal::ONE - self.min_take) * root)
            * self.terms.max_repayment_reward_fraction
    }
}

impl Miner for RepayProportionalMiner {
    fn ledger(&self) -> &MinerLedger {
        &self.ledger
    }

    fn ledger_mut(&mut self) -> &mut MinerLedger {
        &mut self.ledger
    }

    fn policy(&self) -> &'static str {
        "repay-proportional"
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

        // The per-batch minimum must also hold across the whole sector population.
        let total_power = self.ledger.power + power;
        let locked = self.ledger.pledge_locked + pledge;
        let aggregate_minimum =
            net.initial_pledge_for_power(total_power) - self.terms.max_shortfall(net, total_power);
        if locked + ATTO < aggregate_minimum {
            return Err(MinerError::AggregatePledgeShortfall { locked, minimum: aggregate_minimum });
        }

        self.ledger.commit(net, power, duration, pledge, requirement);
        self.requirement.required += requirement;
        tracing::debug!(
            policy = "repay-proportional",
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

            let repayment = (reward * self.repayment_take_rate(frac))
                .min(self.shortfall())
                .min(reward - fee);
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
    }

    fn summary(&self) -> MinerSummary {
        let mut summary = self.ledger.summary();
        self.requirement.annotate(&self.ledger, &mut summary);
        summary
    }
}
