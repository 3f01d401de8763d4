// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Pledge Shortfall Simulation Suite - Units and Constants

use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Epoch number on the simulated chain.
pub type ChainEpoch = u64;

/// Storage power in bytes. Mainnet power exceeds `u64::MAX`.
pub type Power = u128;

// ─── Time ────────────────────────────────────────────────────────────────────

/// 30-second epochs.
pub const DAY: ChainEpoch = 2880;
pub const YEAR: ChainEpoch = 365 * DAY;

// ─── Sizes ───────────────────────────────────────────────────────────────────

pub const GIBIBYTE: Power = 1 << 30;
pub const TEBIBYTE: Power = 1 << 40;
pub const PEBIBYTE: Power = 1 << 50;
pub const EXBIBYTE: Power = 1 << 60;

/// Power is committed in whole sectors.
pub const SECTOR_SIZE: Power = 32 * GIBIBYTE;

/// Smallest token unit. Used as comparison tolerance for decimal rounding.
pub const ATTO: Decimal = dec!(0.000000000000000001);

/// Exact decimal form of a power quantity. Saturates at `Decimal::MAX`,
/// far above any physically meaningful power.
pub fn power_to_decimal(power: Power) -> Decimal {
    Decimal::from_u128(power).unwrap_or(Decimal::MAX)
}

/// Truncates a non-negative decimal to whole power units.
pub fn decimal_to_power(value: Decimal) -> Power {
    if value.is_sign_negative() {
        return 0;
    }
    value.trunc().to_u128().unwrap_or(Power::MAX)
}

/// Rounds power down to a whole number of sectors.
pub fn round_to_sectors(power: Power) -> Power {
    (power / SECTOR_SIZE) * SECTOR_SIZE
}

/// Serde adapter for power fields in configuration files.
///
/// TOML integers are 64-bit signed, so large powers are written as strings.
/// Either form is accepted on input; output is always a string.
pub mod power_serde {
    use super::Power;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(u64),
        Str(String),
    }

    pub fn serialize<S: Serializer>(power: &Power, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&power.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Power, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Int(v) => Ok(Power::from(v)),
            Repr::Str(s) => s
                .replace('_', "")
                .parse::<Power>()
                .map_err(serde::de::Error::custom),
        }
    }
}
