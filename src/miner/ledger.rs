// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Shared miner accounting: balances, lease, locked pledge, reward vesting
//! and the expiration schedule.
//!
//! Every policy composes a [`MinerLedger`] and moves tokens only through its
//! debit/credit helpers, which assert the numeric bounds of each movement:
//!
//! ```text
//! available = balance - pledge_locked - vesting_locked  (never negative)
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{MinerSummary, SectorBunch};
use crate::consts::{ChainEpoch, Power, ATTO};
use crate::deferred::DeferredTable;
use crate::network::NetworkState;

const SUMMARY_DP: u32 = 4;

// ---------------------------------------------------------------------------
// Vesting
// ---------------------------------------------------------------------------

/// Delayed release of earned rewards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VestingSchedule {
    /// Fraction of each reward available immediately.
    pub available_share: Decimal,
    /// Epochs between release chunks.
    pub interval: ChainEpoch,
    /// Number of chunks the vesting part is split into.
    pub intervals: u64,
}

impl Default for VestingSchedule {
    fn default() -> Self {
        Self {
            available_share: dec!(0.25),
            interval: 2800,
            intervals: 180,
        }
    }
}

/// Scheduled vesting releases.
///
/// Rewards earned within one interval all start releasing at the same epoch,
/// so they are accumulated and spread across the table once per interval.
/// The last chunk takes the division remainder.
#[derive(Debug, Clone)]
struct VestingTable {
    schedule: VestingSchedule,
    releases: DeferredTable<Decimal>,
    pending_start: ChainEpoch,
    pending: Decimal,
}

impl VestingTable {
    fn new(schedule: VestingSchedule) -> Self {
        Self {
            schedule,
            releases: DeferredTable::new(),
            pending_start: 0,
            pending: Decimal::ZERO,
        }
    }

    fn lock(&mut self, epoch: ChainEpoch, amount: Decimal) {
        let interval = self.schedule.interval.max(1);
        let start = (epoch / interval) * interval + interval;
        if start != self.pending_start {
            self.flush();
            self.pending_start = start;
        }
        self.pending += amount;
    }

    fn flush(&mut self) {
        if self.pending <= Decimal::ZERO {
            return;
        }
        let chunks = self.schedule.intervals.max(1);
        let interval = self.schedule.interval.max(1);
        let each = self.pending / Decimal::from(chunks);
        let mut remaining = self.pending;
        for i in 0..chunks {
            let amount = if i + 1 == chunks { remaining } else { each };
            *self.releases.entry(self.pending_start + i * interval) += amount;
            remaining -= amount;
        }
        self.pending = Decimal::ZERO;
    }

    /// Total released at or before `epoch`.
    fn release_through(&mut self, epoch: ChainEpoch) -> Decimal {
        if self.pending_start <= epoch {
            self.flush();
        }
        self.releases
            .drain_through(epoch)
            .into_iter()
            .map(|(_, amount)| amount)
            .sum()
    }
}

// ---------------------------------------------------------------------------
// MinerLedger
// ---------------------------------------------------------------------------

/// State common to every accounting policy.
#[derive(Debug, Clone)]
pub struct MinerLedger {
    pub(super) power: Power,
    pub(super) balance: Decimal,
    pub(super) lease: Decimal,
    pub(super) pledge_locked: Decimal,
    pub(super) vesting_locked: Decimal,

    pub(super) reward_earned: Decimal,
    pub(super) fee_burned: Decimal,
    pub(super) lease_fee_accrued: Decimal,
    pub(super) epochs: u64,
    pub(super) pledge_epochs: Decimal,

    expirations: DeferredTable<Vec<SectorBunch>>,
    vesting: Option<VestingTable>,
}

impl MinerLedger {
    pub fn new(balance: Decimal) -> Self {
        assert!(balance >= Decimal::ZERO, "initial balance must be non-negative");
        Self {
            power: 0,
            balance,
            lease: Decimal::ZERO,
            pledge_locked: Decimal::ZERO,
            vesting_locked: Decimal::ZERO,
            reward_earned: Decimal::ZERO,
            fee_burned: Decimal::ZERO,
            lease_fee_accrued: Decimal::ZERO,
            epochs: 0,
            pledge_epochs: Decimal::ZERO,
            expirations: DeferredTable::new(),
            vesting: None,
        }
    }

    pub fn with_vesting(balance: Decimal, schedule: VestingSchedule) -> Self {
        Self {
            vesting: Some(VestingTable::new(schedule)),
            ..Self::new(balance)
        }
    }

    pub fn power(&self) -> Power {
        self.power
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn lease(&self) -> Decimal {
        self.lease
    }

    pub fn pledge_locked(&self) -> Decimal {
        self.pledge_locked
    }

    pub fn vesting_locked(&self) -> Decimal {
        self.vesting_locked
    }

    pub fn reward_earned(&self) -> Decimal {
        self.reward_earned
    }

    pub fn fee_burned(&self) -> Decimal {
        self.fee_burned
    }

    pub fn lease_fee_accrued(&self) -> Decimal {
        self.lease_fee_accrued
    }

    pub fn available_balance(&self) -> Decimal {
        self.balance - (self.pledge_locked + self.vesting_locked)
    }

    /// Time-weighted total return on pledge.
    pub fn fofr(&self) -> Decimal {
        if self.epochs == 0 || self.pledge_epochs <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let mean_pledge = self.pledge_epochs / Decimal::from(self.epochs);
        (self.reward_earned - self.fee_burned - self.lease_fee_accrued) / mean_pledge
    }

    pub fn summary(&self) -> MinerSummary {
        MinerSummary {
            power: self.power,
            balance: self.balance.round_dp(SUMMARY_DP),
            lease: self.lease.round_dp(SUMMARY_DP),
            pledge_locked: self.pledge_locked.round_dp(SUMMARY_DP),
            vesting_locked: self.vesting_locked.round_dp(SUMMARY_DP),
            available_balance: self.available_balance().round_dp(SUMMARY_DP),
            net_equity: (self.balance - self.lease).round_dp(SUMMARY_DP),
            fofr: self.fofr().round_dp(SUMMARY_DP),
            reward_earned: self.reward_earned.round_dp(SUMMARY_DP),
            fee_burned: self.fee_burned.round_dp(SUMMARY_DP),
            lease_fee_accrued: self.lease_fee_accrued.round_dp(SUMMARY_DP),
            pledge_required: None,
            shortfall: None,
            shortfall_pct: None,
            repayment_take_rate: None,
            pending_fee: None,
        }
    }

    // -- Activation and expiration ---------------------------------------

    /// Adds power and locks `lock`, leasing whatever available balance can't cover.
    pub(super) fn commit(
        &mut self,
        net: &NetworkState,
        power: Power,
        duration: ChainEpoch,
        lock: Decimal,
        bunch_pledge: Decimal,
    ) {
        let uncovered = (lock - self.available_balance()).max(Decimal::ZERO);
        self.lease_tokens(uncovered);
        self.power += power;
        self.lock_pledge(lock);
        self.expirations
            .entry(net.epoch + duration)
            .push(SectorBunch { power, pledge: bunch_pledge });
    }

    /// Removes and returns bunches due at or before `epoch`, in schedule order.
    pub(super) fn take_expirations(&mut self, epoch: ChainEpoch) -> Vec<SectorBunch> {
        self.expirations
            .drain_through(epoch)
            .into_iter()
            .flat_map(|(_, bunches)| bunches)
            .collect()
    }

    /// Removes expiring power. Returns true if no power remains.
    pub(super) fn remove_power(&mut self, power: Power) -> bool {
        assert!(power <= self.power, "expiring {power} exceeds active power {}", self.power);
        self.power -= power;
        self.power == 0
    }

    // -- Token movements -------------------------------------------------

    pub(super) fn earn_reward(&mut self, v: Decimal) {
        assert!(v >= Decimal::ZERO, "negative reward {v}");
        self.balance += v;
        self.reward_earned += v;
    }

    /// Locks the vesting part of an earned reward. Returns the immediately available part.
    pub(super) fn vest_reward(&mut self, epoch: ChainEpoch, v: Decimal) -> Decimal {
        assert!(v >= Decimal::ZERO, "negative reward {v}");
        let Some(table) = self.vesting.as_mut() else {
            return v;
        };
        let available = v * table.schedule.available_share;
        let vesting = v - available;
        if vesting > Decimal::ZERO {
            table.lock(epoch, vesting);
            self.vesting_locked += vesting;
        }
        available
    }

    pub(super) fn release_vesting(&mut self, epoch: ChainEpoch) {
        let Some(table) = self.vesting.as_mut() else {
            return;
        };
        let vested = table.release_through(epoch);
        if vested > Decimal::ZERO {
            self.vesting_locked = (self.vesting_locked - vested).max(Decimal::ZERO);
        }
    }

    pub(super) fn burn_fee(&mut self, v: Decimal) {
        assert!(v >= Decimal::ZERO, "negative fee {v}");
        assert!(v <= self.available_balance() + ATTO, "fee {v} exceeds available balance");
        self.balance -= v;
        self.fee_burned += v;
    }

    pub(super) fn lock_pledge(&mut self, v: Decimal) {
        assert!(v >= Decimal::ZERO, "negative pledge lock {v}");
        self.pledge_locked += v;
    }

    pub(super) fn release_pledge(&mut self, v: Decimal) {
        assert!(v >= Decimal::ZERO, "negative pledge release {v}");
        self.pledge_locked = (self.pledge_locked - v).max(Decimal::ZERO);
    }

    pub(super) fn clear_pledge(&mut self) {
        self.pledge_locked = Decimal::ZERO;
    }

    pub(super) fn lease_tokens(&mut self, v: Decimal) {
        assert!(v >= Decimal::ZERO, "negative lease {v}");
        self.balance += v;
        self.lease += v;
    }

    pub(super) fn repay(&mut self, v: Decimal) {
        assert!(v >= Decimal::ZERO, "negative repayment {v}");
        assert!(v <= self.lease, "repayment {v} exceeds lease {}", self.lease);
        assert!(v <= self.available_balance() + ATTO, "repayment {v} exceeds available balance");
        self.balance -= v;
        self.lease -= v;
    }

    /// Repays as much lease as available balance allows.
    pub(super) fn repay_lease_from_available(&mut self) {
        let v = self.lease.min(self.available_balance());
        if v > Decimal::ZERO {
            self.repay(v);
        }
    }

    pub(super) fn accrue_lease_fee(&mut self, v: Decimal) {
        assert!(v >= Decimal::ZERO, "negative lease fee {v}");
        self.lease += v;
        self.lease_fee_accrued += v;
    }

    /// Lease fee accrual and pledge-epoch accounting for one epoch.
    ///
    /// The fee is added to the lease; if the miner has funds it repays next epoch.
    pub(super) fn settle_epoch(&mut self, net: &NetworkState) {
        let fee = net.fee_for_token_lease(self.lease, 1);
        self.accrue_lease_fee(fee);
        self.epochs += 1;
        self.pledge_epochs += self.pledge_locked;
    }
}
