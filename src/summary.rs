use chrono::{DateTime, NaiveDate, TimeDelta};
use chrono_tz::Tz;
use itertools::{Itertools, MinMaxResult};
use serde::Serialize;

use crate::{price::HourlyPrice, quantity::KilowattHourRate};

#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DayRange {
    pub min_excl_vat: KilowattHourRate,
    pub max_excl_vat: KilowattHourRate,
    pub min_incl_vat: KilowattHourRate,
    pub max_incl_vat: KilowattHourRate,
}

impl DayRange {
    fn new<'a>(prices: impl IntoIterator<Item = &'a HourlyPrice> + Clone) -> Option<Self> {
        let (min_excl_vat, max_excl_vat) =
            min_max(prices.clone().into_iter().map(|price| price.price_excl_vat))?;
        let (min_incl_vat, max_incl_vat) =
            min_max(prices.into_iter().map(|price| price.price_incl_vat))?;
        Some(Self { min_excl_vat, max_excl_vat, min_incl_vat, max_incl_vat })
    }
}

fn min_max(rates: impl Iterator<Item = KilowattHourRate>) -> Option<(KilowattHourRate, KilowattHourRate)> {
    match rates.minmax() {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(rate) => Some((rate, rate)),
        MinMaxResult::MinMax(min, max) => Some((min, max)),
    }
}

/// What a dashboard shows: the current price and the daily ranges.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub current: Option<HourlyPrice>,
    pub today: Option<DayRange>,
    pub tomorrow: Option<DayRange>,
}

impl Summary {
    /// Summarize the hourly prices of today and tomorrow.
    ///
    /// Without any price for today, the summary is empty, even if tomorrow is known.
    pub fn new(prices: &[HourlyPrice], now: DateTime<Tz>) -> Self {
        let today = now.date_naive();
        let tomorrow = today + TimeDelta::days(1);
        let on = |date: NaiveDate| prices.iter().filter(move |price| price.date() == date);

        let Some(today_range) = DayRange::new(on(today)) else {
            return Self::default();
        };
        let current = prices
            .iter()
            .find(|price| price.contains(now))
            .or_else(|| on(today).last())
            .cloned();
        Self { current, today: Some(today_range), tomorrow: DayRange::new(on(tomorrow)) }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::Europe::Lisbon;

    use super::*;

    fn price(day: u32, hour: u32, price: f64) -> HourlyPrice {
        HourlyPrice {
            timestamp: Lisbon.with_ymd_and_hms(2025, 11, day, hour, 0, 0).unwrap(),
            label: format!("[{hour:02}:00-{:02}:00[", (hour + 1) % 24),
            price_excl_vat: KilowattHourRate(price),
            price_incl_vat: KilowattHourRate(price * 2.0),
        }
    }

    #[test]
    fn test_empty() {
        let now = Lisbon.with_ymd_and_hms(2025, 11, 18, 10, 30, 0).unwrap();
        assert_eq!(Summary::new(&[], now), Summary::default());
    }

    #[test]
    fn test_no_today_means_nothing() {
        let now = Lisbon.with_ymd_and_hms(2025, 11, 18, 10, 30, 0).unwrap();
        assert_eq!(Summary::new(&[price(19, 0, 0.1)], now), Summary::default());
    }

    #[test]
    fn test_current_and_ranges() {
        let now = Lisbon.with_ymd_and_hms(2025, 11, 18, 1, 30, 0).unwrap();
        let prices = [
            price(18, 0, 0.2),
            price(18, 1, 0.1),
            price(18, 2, 0.3),
            price(19, 0, 0.05),
            price(19, 1, 0.4),
        ];
        let summary = Summary::new(&prices, now);
        assert_eq!(summary.current, Some(prices[1].clone()));
        assert_eq!(
            summary.today,
            Some(DayRange {
                min_excl_vat: KilowattHourRate(0.1),
                max_excl_vat: KilowattHourRate(0.3),
                min_incl_vat: KilowattHourRate(0.2),
                max_incl_vat: KilowattHourRate(0.6),
            }),
        );
        let tomorrow = summary.tomorrow.unwrap();
        assert_eq!(tomorrow.min_excl_vat, KilowattHourRate(0.05));
        assert_eq!(tomorrow.max_incl_vat, KilowattHourRate(0.8));
    }

    #[test]
    fn test_current_falls_back_to_last_price_of_today() {
        let now = Lisbon.with_ymd_and_hms(2025, 11, 18, 23, 30, 0).unwrap();
        let prices = [price(18, 0, 0.2), price(18, 1, 0.1)];
        let summary = Summary::new(&prices, now);
        assert_eq!(summary.current, Some(prices[1].clone()));
        assert!(summary.tomorrow.is_none());
    }
}
