use chrono::{DateTime, TimeDelta, Timelike};
use chrono_tz::Tz;
use itertools::Itertools;

use crate::{
    price::{HourlyPrice, PriceInterval},
    quantity::KilowattHourRate,
};

const N_DECIMALS: i32 = 5;

impl<T> AverageHourly for T where T: ?Sized {}

pub trait AverageHourly {
    /// Average the intervals by hour, in ascending order of the hours.
    ///
    /// Intervals within an hour keep their input order, which defines the synthesized label.
    fn average_hourly<'a>(self) -> Vec<HourlyPrice>
    where
        Self: Sized + IntoIterator<Item = &'a PriceInterval>,
    {
        self.into_iter()
            .into_group_map_by(|interval| truncate_to_hour(interval.timestamp))
            .into_iter()
            .sorted_unstable_by_key(|(hour, _)| *hour)
            .map(|(hour, intervals)| average(hour, &intervals))
            .collect()
    }
}

fn average(hour: DateTime<Tz>, intervals: &[&PriceInterval]) -> HourlyPrice {
    #[expect(clippy::cast_precision_loss)]
    let n = intervals.len() as f64;
    let price_excl_vat: KilowattHourRate =
        intervals.iter().map(|interval| interval.price_excl_vat).sum();
    let price_incl_vat: KilowattHourRate =
        intervals.iter().map(|interval| interval.price_incl_vat).sum();
    let label = match (intervals.first(), intervals.last()) {
        (Some(first), Some(last)) => synthesize_label(&first.label, &last.label),
        _ => String::new(),
    };
    HourlyPrice {
        timestamp: hour,
        label,
        price_excl_vat: (price_excl_vat / n).round_to(N_DECIMALS),
        price_incl_vat: (price_incl_vat / n).round_to(N_DECIMALS),
    }
}

/// Zero out minutes, seconds, and nanoseconds on the local clock.
fn truncate_to_hour(timestamp: DateTime<Tz>) -> DateTime<Tz> {
    timestamp
        - TimeDelta::minutes(i64::from(timestamp.minute()))
        - TimeDelta::seconds(i64::from(timestamp.second()))
        - TimeDelta::nanoseconds(i64::from(timestamp.nanosecond()))
}

/// `[00:00-00:15[` + `[00:45-01:00[` → `[00:00-01:00[`.
fn synthesize_label(first: &str, last: &str) -> String {
    let is_decoration = |c: char| matches!(c, '[' | ']' | ' ');
    let start = first.split('-').next().unwrap_or_default().trim_matches(is_decoration);
    let end = last.split('-').nth(1).unwrap_or_default().trim_matches(is_decoration);
    format!("[{start}-{end}[")
}
