use chrono::{DateTime, NaiveDate, TimeDelta};
use chrono_tz::Tz;
use serde::Serialize;

use crate::quantity::KilowattHourRate;

/// A single 15-minute feed entry for one provider and tariff.
#[must_use]
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PriceInterval {
    pub timestamp: DateTime<Tz>,

    /// Original interval label, for example `[00:00-00:15[`.
    #[serde(rename = "interval")]
    pub label: String,

    /// Final price: market price, regulated access cost, provider margin, and fixed costs.
    #[serde(rename = "price")]
    pub price_excl_vat: KilowattHourRate,

    #[serde(rename = "price_w_vat")]
    pub price_incl_vat: KilowattHourRate,

    /// OMIE market price.
    pub market_price: KilowattHourRate,

    /// Regulated network access tariff («TAR»).
    #[serde(rename = "tar_cost")]
    pub regulated_cost: KilowattHourRate,
}

impl PriceInterval {
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Average of the intervals within one hour.
#[must_use]
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct HourlyPrice {
    /// Start of the hour.
    pub timestamp: DateTime<Tz>,

    #[serde(rename = "interval")]
    pub label: String,

    #[serde(rename = "price")]
    pub price_excl_vat: KilowattHourRate,

    #[serde(rename = "price_w_vat")]
    pub price_incl_vat: KilowattHourRate,
}

impl HourlyPrice {
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    #[must_use]
    pub fn end(&self) -> DateTime<Tz> {
        self.timestamp + TimeDelta::hours(1)
    }

    #[must_use]
    pub fn contains(&self, time: DateTime<Tz>) -> bool {
        (self.timestamp <= time) && (time < self.end())
    }
}
