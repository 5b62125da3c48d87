use std::{
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
    ops::{Div, Mul},
    str::FromStr,
};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Euro per kilowatt-hour.
#[must_use]
#[derive(
    Clone,
    Copy,
    Default,
    Deserialize,
    Serialize,
    derive_more::Add,
    derive_more::AddAssign,
    derive_more::From,
    derive_more::FromStr,
    derive_more::Sub,
    derive_more::Sum,
)]
pub struct KilowattHourRate(pub f64);

impl KilowattHourRate {
    pub const ZERO: Self = Self(0.0);

    /// Round half away from zero to the specified number of decimal places.
    pub fn round_to(self, n_decimals: i32) -> Self {
        let scale = 10_f64.powi(n_decimals);
        Self((self.0 * scale).round() / scale)
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl PartialEq for KilowattHourRate {
    fn eq(&self, other: &Self) -> bool {
        OrderedFloat(self.0) == OrderedFloat(other.0)
    }
}

impl Eq for KilowattHourRate {}

impl PartialOrd for KilowattHourRate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KilowattHourRate {
    fn cmp(&self, other: &Self) -> Ordering {
        OrderedFloat(self.0).cmp(&OrderedFloat(other.0))
    }
}

impl Mul<f64> for KilowattHourRate {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<f64> for KilowattHourRate {
    type Output = Self;

    fn div(self, rhs: f64) -> Self::Output {
        Self(self.0 / rhs)
    }
}

impl Display for KilowattHourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5} €/kWh", self.0)
    }
}

impl Debug for KilowattHourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}€/kWh", self.0)
    }
}

/// Value-added tax percentage, `0..=100`.
#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct VatRate(u8);

impl VatRate {
    /// Standard Portuguese VAT rate for electricity.
    pub const DEFAULT: Self = Self(23);

    pub const fn try_new(percent: u8) -> Result<Self, InvalidVatRate> {
        if percent <= 100 { Ok(Self(percent)) } else { Err(InvalidVatRate(percent)) }
    }

    #[must_use]
    pub const fn percent(self) -> u8 {
        self.0
    }

    /// Multiplier to apply to a VAT-exclusive price.
    #[must_use]
    pub fn multiplier(self) -> f64 {
        1.0 + f64::from(self.0) / 100.0
    }

    pub fn apply(self, rate: KilowattHourRate) -> KilowattHourRate {
        rate * self.multiplier()
    }
}

impl Default for VatRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for VatRate {
    type Error = InvalidVatRate;

    fn try_from(percent: u8) -> Result<Self, Self::Error> {
        Self::try_new(percent)
    }
}

impl From<VatRate> for u8 {
    fn from(vat_rate: VatRate) -> Self {
        vat_rate.0
    }
}

impl FromStr for VatRate {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let percent = s.trim().trim_end_matches('%').parse::<u8>()?;
        Ok(Self::try_new(percent)?)
    }
}

impl Display for VatRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[derive(Copy, Clone, Debug, thiserror::Error)]
#[error("VAT rate must be within 0..=100%, got {0}%")]
pub struct InvalidVatRate(pub u8);
