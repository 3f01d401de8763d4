// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Network economic projection model.
//!
//! Pure functions of the current [`NetworkState`] that size the initial pledge
//! for new power, invert that sizing for a token budget, project rewards under
//! geometric decay and price token leases. The only mutation is the per-epoch
//! advancement in [`NetworkState::handle_epoch`]: reward decays, baseline grows.
//!
//! ```text
//! initial_pledge(p) = projected_reward(share(p), 20 days)
//!                   + circulating_supply * 0.30 * p / max(power, baseline)
//! ```

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::consts::{
    decimal_to_power, power_serde, power_to_decimal, round_to_sectors, ChainEpoch, Power, DAY,
    YEAR,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fraction of circulating supply targeted to be locked as consensus pledge.
pub const SUPPLY_LOCK_TARGET: Decimal = dec!(0.30);

/// Window of projected rewards included in the storage pledge term.
pub const INITIAL_PLEDGE_PROJECTION_PERIOD: ChainEpoch = 20 * DAY;

/// Per-epoch reward decay: `reward(t) = reward(0) * (1 - r)^t`, halving every six years.
/// `1 - exp(ln(1/2) / (6 * YEAR))`
pub const REWARD_DECAY: Decimal = dec!(0.0000001098977585096847858589);

/// Per-epoch baseline growth: `baseline(t) = baseline(0) * (1 + b)^t`, tripling yearly.
/// `exp(ln(3) / YEAR) - 1`
pub const BASELINE_GROWTH: Decimal = dec!(0.0000010451035604545442529514);

fn default_reward_decay() -> Decimal {
    REWARD_DECAY
}

fn default_baseline_growth() -> Decimal {
    BASELINE_GROWTH
}

// ---------------------------------------------------------------------------
// NetworkConfig
// ---------------------------------------------------------------------------

/// Initial network parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub epoch: ChainEpoch,
    /// Quality-adjusted power, the denominator of reward share.
    #[serde(with = "power_serde")]
    pub qa_power: Power,
    /// Raw byte power. Informational only.
    #[serde(with = "power_serde", default)]
    pub raw_byte_power: Power,
    #[serde(with = "power_serde")]
    pub baseline_power: Power,
    pub epoch_reward: Decimal,
    #[serde(default = "default_reward_decay")]
    pub reward_decay: Decimal,
    #[serde(default = "default_baseline_growth")]
    pub baseline_growth: Decimal,
    pub circulating_supply: Decimal,
    /// Fee per annum on externally leased tokens.
    pub token_lease_fee: Decimal,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            epoch: 0,
            qa_power: 10_000_000_000_000_000_000,
            raw_byte_power: 10_000_000_000_000_000_000,
            baseline_power: 0,
            epoch_reward: dec!(90),
            reward_decay: REWARD_DECAY,
            baseline_growth: BASELINE_GROWTH,
            circulating_supply: dec!(439000000),
            token_lease_fee: dec!(0.20),
        }
    }
}

impl NetworkConfig {
    /// Mainnet at 2023-02-01 (epoch 2563440), re-based to epoch 0.
    pub fn mainnet_feb_2023() -> Self {
        Self {
            epoch: 0,
            qa_power: 21_530_229_500_983_050_000,
            raw_byte_power: 16_006_761_814_138_290_000,
            baseline_power: 15_690_691_297_578_078_000,
            epoch_reward: dec!(95.0289737891830),
            reward_decay: REWARD_DECAY,
            baseline_growth: BASELINE_GROWTH,
            circulating_supply: dec!(434191286.621853),
            token_lease_fee: dec!(0.20),
        }
    }

    /// Mainnet at 2023-04-01 (epoch 2733360), re-based to epoch 0.
    pub fn mainnet_apr_2023() -> Self {
        Self {
            epoch: 0,
            qa_power: 22_436_033_270_683_107_000,
            raw_byte_power: 14_846_032_093_347_054_000,
            baseline_power: 17_550_994_139_680_311_000,
            epoch_reward: dec!(83.9336912523375),
            reward_decay: REWARD_DECAY,
            baseline_growth: BASELINE_GROWTH,
            circulating_supply: dec!(456583469.869076),
            token_lease_fee: dec!(0.20),
        }
    }
}

// ---------------------------------------------------------------------------
// NetworkState
// ---------------------------------------------------------------------------

/// Network-wide economic state, stepped once per epoch by the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkState {
    pub epoch: ChainEpoch,
    pub power: Power,
    pub baseline_power: Power,
    pub circulating_supply: Decimal,
    pub epoch_reward: Decimal,
    pub reward_decay: Decimal,
    pub baseline_growth: Decimal,
    pub token_lease_fee: Decimal,
}

impl NetworkState {
    pub fn new(cfg: &NetworkConfig) -> Self {
        Self {
            epoch: cfg.epoch,
            power: cfg.qa_power,
            baseline_power: cfg.baseline_power,
            circulating_supply: cfg.circulating_supply,
            epoch_reward: cfg.epoch_reward,
            reward_decay: cfg.reward_decay,
            baseline_growth: cfg.baseline_growth,
            token_lease_fee: cfg.token_lease_fee,
        }
    }

    /// Advances to the next epoch. Must run after all reads for the current epoch.
    pub fn handle_epoch(&mut self) {
        self.epoch += 1;
        self.epoch_reward *= Decimal::ONE - self.reward_decay;
        if self.baseline_power > 0 {
            let grown = power_to_decimal(self.baseline_power) * (Decimal::ONE + self.baseline_growth);
            self.baseline_power = decimal_to_power(grown.round());
        }
        tracing::trace!(epoch = self.epoch, reward = %self.epoch_reward, "network advanced");
    }

    /// The initial pledge requirement for an incremental power addition.
    pub fn initial_pledge_for_power(&self, power: Power) -> Decimal {
        let storage = self.expected_reward_for_power(
            power,
            INITIAL_PLEDGE_PROJECTION_PERIOD,
            self.reward_decay,
        );
        let consensus = self.circulating_supply * SUPPLY_LOCK_TARGET * self.consensus_share(power);
        storage + consensus
    }

    /// The maximum power that can be committed for an incremental pledge.
    ///
    /// Pledge is linear in power, so this divides by the pledge for the whole
    /// network and scales back up. Saturates for budgets far beyond the network.
    pub fn power_for_initial_pledge(&self, pledge: Decimal) -> Power {
        if self.power == 0 || pledge <= Decimal::ZERO {
            return 0;
        }
        let network_pledge = self.initial_pledge_for_power(self.power);
        if network_pledge <= Decimal::ZERO {
            return 0;
        }
        let power = (pledge / network_pledge)
            .checked_mul(power_to_decimal(self.power))
            .map(decimal_to_power)
            .unwrap_or(Power::MAX);
        round_to_sectors(power)
    }

    /// Projected reward for some power over a period, taking decay into account.
    ///
    /// Doesn't use a filtered power estimate or account for baseline minting.
    /// With no network power the flat `duration * epoch_reward` is returned.
    pub fn expected_reward_for_power(
        &self,
        power: Power,
        duration: ChainEpoch,
        decay: Decimal,
    ) -> Decimal {
        if self.power == 0 {
            return self.epoch_reward * Decimal::from(duration);
        }
        let share = power_to_decimal(power) / power_to_decimal(self.power);
        self.projected_reward(self.epoch_reward * share, duration, decay)
    }

    /// Projects a per-epoch reward into the future under geometric decay.
    pub fn projected_reward(
        &self,
        epoch_reward: Decimal,
        duration: ChainEpoch,
        decay: Decimal,
    ) -> Decimal {
        epoch_reward * sum_over_exponential_decay(duration, decay)
    }

    pub fn fee_for_token_lease(&self, amount: Decimal, duration: ChainEpoch) -> Decimal {
        amount * self.token_lease_fee * Decimal::from(duration) / Decimal::from(YEAR)
    }

    /// Share of the consensus pledge denominator represented by `power`.
    /// An empty network (no power, no baseline) gives the whole share.
    fn consensus_share(&self, power: Power) -> Decimal {
        let denominator = self.power.max(self.baseline_power);
        if denominator == 0 {
            return Decimal::ONE;
        }
        power_to_decimal(power) / power_to_decimal(denominator)
    }
}

/// `SUM[(1-r)^x] for x in 0..=duration`, in closed form.
pub fn sum_over_exponential_decay(duration: ChainEpoch, decay: Decimal) -> Decimal {
    if decay.is_zero() {
        return Decimal::from(duration) + Decimal::ONE;
    }
    let retained = (Decimal::ONE - decay).powu(duration);
    (Decimal::ONE - retained + decay * retained) / decay
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{EXBIBYTE, PEBIBYTE, SECTOR_SIZE, TEBIBYTE};

    fn net() -> NetworkState {
        NetworkState::new(&NetworkConfig::default())
    }

    fn close(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn decay_sum_without_decay_counts_terms() {
        assert_eq!(sum_over_exponential_decay(0, Decimal::ZERO), dec!(1));
        assert_eq!(sum_over_exponential_decay(10, Decimal::ZERO), dec!(11));
    }

    #[test]
    fn decay_sum_matches_explicit_series() {
        let decay = dec!(0.1);
        let mut expected = Decimal::ZERO;
        let mut term = Decimal::ONE;
        for _ in 0..=5 {
            expected += term;
            term *= Decimal::ONE - decay;
        }
        let closed = sum_over_exponential_decay(5, decay);
        assert!(close(closed, expected, dec!(0.0000000001)), "{closed} vs {expected}");
    }

    #[test]
    fn decay_sum_is_below_undecayed_count() {
        let sum = sum_over_exponential_decay(YEAR, REWARD_DECAY);
        assert!(sum < Decimal::from(YEAR + 1));
        assert!(sum > Decimal::from(YEAR) * dec!(0.9));
    }

    #[test]
    fn pledge_for_one_tebibyte() {
        let n = net();
        let pledge = n.initial_pledge_for_power(TEBIBYTE);
        // Storage ≈ 90 * 57419 * 2^40 / 1e19 ≈ 0.568, consensus ≈ 1.317e8 * 2^40 / 1e19 ≈ 14.48.
        assert!(pledge > dec!(15.0) && pledge < dec!(15.1), "pledge {pledge}");
    }

    #[test]
    fn pledge_is_zero_for_zero_power() {
        assert_eq!(net().initial_pledge_for_power(0), Decimal::ZERO);
    }

    #[test]
    fn pledge_uses_baseline_when_above_power() {
        let mut n = net();
        let below = n.initial_pledge_for_power(PEBIBYTE);
        n.baseline_power = n.power * 2;
        let above = n.initial_pledge_for_power(PEBIBYTE);
        assert!(above < below, "larger baseline must shrink the consensus term");
    }

    #[test]
    fn power_for_pledge_round_trips() {
        let n = net();
        for power in [SECTOR_SIZE, TEBIBYTE, PEBIBYTE, 3 * PEBIBYTE + 5 * SECTOR_SIZE, EXBIBYTE] {
            let pledge = n.initial_pledge_for_power(power);
            let recovered = n.power_for_initial_pledge(pledge);
            assert!(recovered <= power);
            assert!(power - recovered <= SECTOR_SIZE, "{power} -> {recovered}");
        }
    }

    #[test]
    fn power_for_pledge_saturates_on_huge_budget() {
        let n = net();
        let power = n.power_for_initial_pledge(dec!(10000000000000000000000000000));
        assert_eq!(power % SECTOR_SIZE, 0);
        assert!(power > n.power);
    }

    #[test]
    fn power_for_pledge_zero_inputs() {
        let mut n = net();
        assert_eq!(n.power_for_initial_pledge(Decimal::ZERO), 0);
        assert_eq!(n.power_for_initial_pledge(dec!(-1)), 0);
        n.power = 0;
        assert_eq!(n.power_for_initial_pledge(dec!(1000)), 0);
    }

    #[test]
    fn expected_reward_bootstrap_is_flat() {
        let mut n = net();
        n.power = 0;
        assert_eq!(n.expected_reward_for_power(TEBIBYTE, 100, REWARD_DECAY), dec!(9000));
    }

    #[test]
    fn expected_reward_scales_with_share() {
        let n = net();
        let one = n.expected_reward_for_power(PEBIBYTE, DAY, REWARD_DECAY);
        let two = n.expected_reward_for_power(2 * PEBIBYTE, DAY, REWARD_DECAY);
        assert!(close(two, one * dec!(2), dec!(0.000000000001)));
    }

    #[test]
    fn lease_fee_for_a_year() {
        let n = net();
        assert_eq!(n.fee_for_token_lease(dec!(1000), YEAR), dec!(200));
        assert_eq!(n.fee_for_token_lease(dec!(1000), 0), Decimal::ZERO);
    }

    #[test]
    fn handle_epoch_decays_reward_and_grows_baseline() {
        let mut n = NetworkState::new(&NetworkConfig::mainnet_feb_2023());
        let reward = n.epoch_reward;
        let baseline = n.baseline_power;
        let power = n.power;
        n.handle_epoch();
        assert_eq!(n.epoch, 1);
        assert!(n.epoch_reward < reward);
        assert!(n.baseline_power > baseline);
        assert_eq!(n.power, power);
    }

    #[test]
    fn reward_halves_after_six_years() {
        let mut n = net();
        let start = n.epoch_reward;
        let halved = start * (Decimal::ONE - REWARD_DECAY).powu(6 * YEAR);
        assert!(close(halved, start / dec!(2), dec!(0.0000001)), "{halved}");
        n.handle_epoch();
        assert_eq!(n.epoch_reward, start * (Decimal::ONE - REWARD_DECAY));
    }

    #[test]
    fn zero_baseline_stays_zero() {
        let mut n = net();
        for _ in 0..10 {
            n.handle_epoch();
        }
        assert_eq!(n.baseline_power, 0);
    }

    #[test]
    fn config_parses_string_powers() {
        let toml_src = r#"
            epoch = 0
            qa_power = "21_530_229_500_983_050_000"
            baseline_power = 1000
            epoch_reward = "95.0289737891830"
            circulating_supply = "434191286.621853"
            token_lease_fee = "0.20"
        "#;
        let cfg: NetworkConfig = toml::from_str(toml_src).expect("test: config should parse");
        assert_eq!(cfg.qa_power, 21_530_229_500_983_050_000);
        assert_eq!(cfg.baseline_power, 1000);
        assert_eq!(cfg.reward_decay, REWARD_DECAY);
        assert_eq!(cfg.raw_byte_power, 0);
    }
}
