// Scenario presets for the command-line runner.
// Each preset maps a named choice onto library configuration.

use clap::ValueEnum;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use shortfall_sim::consts::{decimal_to_power, power_to_decimal, round_to_sectors, DAY, PEBIBYTE};
use shortfall_sim::miner::{
    BurnShortfallConfig, RepayProportionalConfig, RepayRatchetConfig, StrictConfig,
    VestingSchedule,
};
use shortfall_sim::{MinerConfig, NetworkConfig, StrategyConfig};

// ─── Network ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NetworkPreset {
    /// 1e19 bytes of power, no baseline, 90 tokens per epoch.
    Default,
    /// Mainnet snapshot, February 2023.
    Feb2023,
    /// Mainnet snapshot, April 2023.
    Apr2023,
}

pub fn network(preset: NetworkPreset) -> NetworkConfig {
    match preset {
        NetworkPreset::Default => NetworkConfig::default(),
        NetworkPreset::Feb2023 => NetworkConfig::mainnet_feb_2023(),
        NetworkPreset::Apr2023 => NetworkConfig::mainnet_apr_2023(),
    }
}

// ─── Miner ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Policy {
    Strict,
    Burn,
    RepayProportional,
    RepayRatchet,
}

pub fn miner(policy: Policy, balance: Decimal, vesting: bool) -> MinerConfig {
    match policy {
        Policy::Strict => MinerConfig::Strict(StrictConfig {
            balance,
            vesting: vesting.then(VestingSchedule::default),
        }),
        Policy::Burn => MinerConfig::Burn(BurnShortfallConfig { balance, ..Default::default() }),
        Policy::RepayProportional => {
            MinerConfig::RepayProportional(RepayProportionalConfig { balance, ..Default::default() })
        }
        Policy::RepayRatchet => {
            MinerConfig::RepayRatchet(RepayRatchetConfig { balance, ..Default::default() })
        }
    }
}

// ─── Strategy ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyKind {
    /// Onboard `amount` PiB, leasing whatever pledge requires.
    Power,
    /// Lock up to `amount` tokens and onboard as much power as they buy.
    Pledge,
    /// Lease up to `amount` tokens.
    Lease,
}

impl StrategyKind {
    pub fn default_amount(self) -> Decimal {
        match self {
            StrategyKind::Power => dec!(1),
            StrategyKind::Pledge | StrategyKind::Lease => dec!(1000),
        }
    }
}

pub fn strategy(
    kind: StrategyKind,
    amount: Decimal,
    duration_days: u64,
    shortfall: Decimal,
) -> StrategyConfig {
    let duration = duration_days * DAY;
    match kind {
        StrategyKind::Power => {
            let power = round_to_sectors(decimal_to_power(amount * power_to_decimal(PEBIBYTE)));
            StrategyConfig::power_limited(power, duration, shortfall)
        }
        StrategyKind::Pledge => StrategyConfig::pledge_limited(amount, duration, shortfall),
        StrategyKind::Lease => StrategyConfig::pledge_lease_limited(amount, duration, shortfall),
    }
}
