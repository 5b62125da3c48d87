//! Price feed CSV parser.
//!
//! The feed combines every provider and tariff into one file, one row per 15-minute interval:
//!
//! ```csv
//! tarifario,opcao,dia,intervalo,col,omie,tar
//! Galp Plano Dinâmico,Simples,18/11/2025,[00:00-00:15[,0.18000,0.10000,0.05000
//! ```

use std::collections::HashSet;

use chrono::{MappedLocalTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use csv::{ReaderBuilder, StringRecord};

use crate::{
    prelude::*,
    price::PriceInterval,
    quantity::{KilowattHourRate, VatRate},
    tariff::Tariff,
};

const N_DECIMALS: i32 = 5;

/// Strip the leading UTF-8 byte-order mark, if any.
#[must_use]
pub fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}

#[must_use]
#[derive(Debug, Default)]
pub struct Parsed {
    pub intervals: Vec<PriceInterval>,

    /// Rows with a malformed date, interval, or missing column.
    pub n_skipped_invalid: usize,

    /// Rows with a blank or non-numeric price.
    pub n_skipped_nan: usize,
}

impl Parsed {
    /// Keep only the intervals on the specified date.
    pub fn retain_on(mut self, on: NaiveDate) -> Self {
        self.intervals.retain(|interval| interval.date() == on);
        self
    }
}

/// Parse the feed and keep the rows of the specified provider and tariff.
#[must_use]
#[derive(Copy, Clone)]
pub struct Parser<'a> {
    pub provider: &'a str,
    pub tariff: Tariff,
    pub vat_rate: VatRate,
    pub timezone: Tz,
}

impl Parser<'_> {
    #[instrument(skip_all, fields(provider = self.provider, tariff = %self.tariff, vat = %self.vat_rate))]
    pub fn parse(self, content: &str) -> Parsed {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(strip_bom(content).as_bytes());
        let columns = match reader.headers() {
            Ok(headers) => Columns::new(headers),
            Err(error) => {
                warn!(%error, "failed to read the header");
                return Parsed::default();
            }
        };

        let mut parsed = Parsed::default();
        let mut localizer = Localizer::new(self.timezone);

        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(error) => {
                    debug!(%error, "unreadable row");
                    parsed.n_skipped_invalid += 1;
                    continue;
                }
            };
            if columns.get(&record, columns.provider) != Some(self.provider)
                || columns.get(&record, columns.tariff) != Some(self.tariff.source_name())
            {
                continue;
            }
            match self.parse_row(&columns, &record, &mut localizer) {
                Ok(interval) => parsed.intervals.push(interval),
                Err(RowError::Invalid) => parsed.n_skipped_invalid += 1,
                Err(RowError::NotANumber) => parsed.n_skipped_nan += 1,
            }
        }

        if parsed.n_skipped_nan != 0 {
            info!(n_rows = parsed.n_skipped_nan, "skipped rows with blank or non-numeric prices");
        }
        if parsed.n_skipped_invalid != 0 {
            warn!(n_rows = parsed.n_skipped_invalid, "skipped invalid rows");
        }
        info!(n_intervals = parsed.intervals.len(), "parsed");
        parsed
    }

    fn parse_row(
        self,
        columns: &Columns,
        record: &StringRecord,
        localizer: &mut Localizer,
    ) -> Result<PriceInterval, RowError> {
        let date = columns.get(record, columns.date).and_then(parse_date).ok_or(RowError::Invalid)?;
        let label = columns.get(record, columns.interval).ok_or(RowError::Invalid)?;
        let start_time = parse_interval_start(label).ok_or(RowError::Invalid)?;
        let timestamp = localizer.localize(date.and_time(start_time)).ok_or(RowError::Invalid)?;

        let final_price = columns.get_rate(record, columns.final_price).ok_or(RowError::NotANumber)?;
        let market_price = columns.get_rate(record, columns.market_price).ok_or(RowError::NotANumber)?;
        let regulated_cost =
            columns.get_rate(record, columns.regulated_cost).ok_or(RowError::NotANumber)?;

        Ok(PriceInterval {
            timestamp,
            label: label.to_owned(),
            price_excl_vat: final_price.round_to(N_DECIMALS),
            price_incl_vat: self.vat_rate.apply(final_price).round_to(N_DECIMALS),
            market_price: market_price.round_to(N_DECIMALS),
            regulated_cost: regulated_cost.round_to(N_DECIMALS),
        })
    }
}

#[derive(Copy, Clone, Debug)]
enum RowError {
    Invalid,
    NotANumber,
}

/// Column positions resolved from the header.
struct Columns {
    provider: Option<usize>,
    tariff: Option<usize>,
    date: Option<usize>,
    interval: Option<usize>,
    final_price: Option<usize>,
    market_price: Option<usize>,
    regulated_cost: Option<usize>,
}

impl Columns {
    fn new(headers: &StringRecord) -> Self {
        let position = |name: &str| headers.iter().position(|header| header.trim() == name);
        Self {
            provider: position("tarifario"),
            tariff: position("opcao"),
            date: position("dia"),
            interval: position("intervalo"),
            final_price: position("col"),
            market_price: position("omie"),
            regulated_cost: position("tar"),
        }
    }

    fn get<'r>(&self, record: &'r StringRecord, column: Option<usize>) -> Option<&'r str> {
        column.and_then(|index| record.get(index))
    }

    /// Missing, blank, non-numeric, and non-finite values are all rejected.
    fn get_rate(&self, record: &StringRecord, column: Option<usize>) -> Option<KilowattHourRate> {
        let value = self.get(record, column)?.trim();
        if value.is_empty() {
            return None;
        }
        value.parse::<KilowattHourRate>().ok().filter(|rate| rate.is_finite())
    }
}

/// Parse `DD/MM/YYYY`.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let mut parts = value.trim().split('/');
    let (Some(day), Some(month), Some(year), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Find `[HH:MM-` anywhere in the label and return the start time.
fn parse_interval_start(label: &str) -> Option<NaiveTime> {
    label.match_indices('[').find_map(|(index, _)| {
        let bytes = label.as_bytes().get(index + 1..index + 7)?;
        let is_match = bytes[0].is_ascii_digit()
            && bytes[1].is_ascii_digit()
            && bytes[2] == b':'
            && bytes[3].is_ascii_digit()
            && bytes[4].is_ascii_digit()
            && bytes[5] == b'-';
        if !is_match {
            return None;
        }
        let hour = u32::from(bytes[0] - b'0') * 10 + u32::from(bytes[1] - b'0');
        let minute = u32::from(bytes[3] - b'0') * 10 + u32::from(bytes[4] - b'0');
        Some(NaiveTime::from_hms_opt(hour, minute, 0))
    })?
}

/// Map the feed's wall-clock times onto the timezone.
///
/// On the autumn transition the feed repeats the ambiguous hour: the first occurrence is
/// the earlier instant, the second one is the later instant.
struct Localizer {
    timezone: Tz,
    seen_ambiguous: HashSet<NaiveDateTime>,
}

impl Localizer {
    fn new(timezone: Tz) -> Self {
        Self { timezone, seen_ambiguous: HashSet::new() }
    }

    fn localize(&mut self, local: NaiveDateTime) -> Option<chrono::DateTime<Tz>> {
        match self.timezone.from_local_datetime(&local) {
            MappedLocalTime::Single(timestamp) => Some(timestamp),
            MappedLocalTime::Ambiguous(earliest, latest) => {
                if self.seen_ambiguous.insert(local) { Some(earliest) } else { Some(latest) }
            }
            MappedLocalTime::None => {
                debug!(%local, "non-existent local time");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};
    use chrono_tz::Europe::Lisbon;

    use super::*;

    const HEADER: &str = "tarifario,opcao,dia,intervalo,col,omie,tar\n";

    fn parser(provider: &str) -> Parser<'_> {
        Parser {
            provider,
            tariff: Tariff::Simple,
            vat_rate: VatRate::DEFAULT,
            timezone: Lisbon,
        }
    }

    #[test]
    fn test_parse_galp_simple_ok() {
        let content = format!(
            "{HEADER}Galp Plano Dinâmico,Simples,18/11/2025,[00:00-00:15[,0.18000,0.10000,0.05000\n"
        );
        let parsed = parser("Galp Plano Dinâmico").parse(&content);
        assert_eq!(parsed.n_skipped_invalid, 0);
        assert_eq!(parsed.n_skipped_nan, 0);
        assert_eq!(parsed.intervals.len(), 1);

        let interval = &parsed.intervals[0];
        assert_eq!(interval.timestamp, Lisbon.with_ymd_and_hms(2025, 11, 18, 0, 0, 0).unwrap());
        assert_eq!(interval.label, "[00:00-00:15[");
        assert_eq!(interval.price_excl_vat, KilowattHourRate(0.18));
        assert_eq!(interval.price_incl_vat, KilowattHourRate(0.2214));
        assert_eq!(interval.market_price, KilowattHourRate(0.1));
        assert_eq!(interval.regulated_cost, KilowattHourRate(0.05));
    }

    #[test]
    fn test_strips_bom() {
        let content = format!(
            "\u{feff}{HEADER}Galp Plano Dinâmico,Simples,18/11/2025,[00:15-00:30[,0.1,0.1,0.1\n"
        );
        assert_eq!(parser("Galp Plano Dinâmico").parse(&content).intervals.len(), 1);
    }

    #[test]
    fn test_other_providers_and_tariffs_are_skipped_silently() {
        let content = format!(
            "{HEADER}\
            G9 Smart Dynamic,Simples,18/11/2025,[00:00-00:15[,0.2,0.1,0.05\n\
            Galp Plano Dinâmico,Bi-horário - Ciclo Diário,18/11/2025,[00:00-00:15[,0.2,0.1,0.05\n\
            G9 Smart Dynamic,Simples,garbage,nonsense,,,\n\
            Galp Plano Dinâmico,Simples,18/11/2025,[00:00-00:15[,0.18,0.1,0.05\n"
        );
        let parsed = parser("Galp Plano Dinâmico").parse(&content);
        assert_eq!(parsed.n_skipped_invalid, 0);
        assert_eq!(parsed.n_skipped_nan, 0);
        assert_eq!(parsed.intervals.len(), 1);
        assert_eq!(parsed.intervals[0].price_excl_vat, KilowattHourRate(0.18));
    }

    #[test]
    fn test_invalid_rows_are_counted() {
        let content = format!(
            "{HEADER}\
            EZU Tarifa Coletiva,Simples,18-11-2025,[00:00-00:15[,0.2,0.1,0.05\n\
            EZU Tarifa Coletiva,Simples,31/02/2025,[00:00-00:15[,0.2,0.1,0.05\n\
            EZU Tarifa Coletiva,Simples,18/11/2025,00:00-00:15,0.2,0.1,0.05\n\
            EZU Tarifa Coletiva,Simples,18/11/2025,[24:00-24:15[,0.2,0.1,0.05\n\
            EZU Tarifa Coletiva,Simples,18/11/2025,[00:15-00:30[,0.2,0.1,0.05\n"
        );
        let parsed = parser("EZU Tarifa Coletiva").parse(&content);
        assert_eq!(parsed.n_skipped_invalid, 4);
        assert_eq!(parsed.n_skipped_nan, 0);
        assert_eq!(parsed.intervals.len(), 1);
    }

    #[test]
    fn test_blank_and_non_numeric_prices_are_counted_separately() {
        let content = format!(
            "{HEADER}\
            EZU Tarifa Coletiva,Simples,18/11/2025,[00:00-00:15[,,0.1,0.05\n\
            EZU Tarifa Coletiva,Simples,18/11/2025,[00:15-00:30[,0.2,  ,0.05\n\
            EZU Tarifa Coletiva,Simples,18/11/2025,[00:30-00:45[,0.2,0.1,abc\n\
            EZU Tarifa Coletiva,Simples,18/11/2025,[00:45-01:00[,NaN,0.1,0.05\n\
            EZU Tarifa Coletiva,Simples,18/11/2025,[01:00-01:15[,0.2,0.1,0.05\n"
        );
        let parsed = parser("EZU Tarifa Coletiva").parse(&content);
        assert_eq!(parsed.n_skipped_nan, 4);
        assert_eq!(parsed.n_skipped_invalid, 0);
        assert_eq!(parsed.intervals.len(), 1);
    }

    #[test]
    fn test_missing_price_column_counts_as_nan() {
        let content = "tarifario,opcao,dia,intervalo,col,omie\n\
            EZU Tarifa Coletiva,Simples,18/11/2025,[00:00-00:15[,0.2,0.1\n";
        let parsed = parser("EZU Tarifa Coletiva").parse(content);
        assert_eq!(parsed.n_skipped_nan, 1);
        assert!(parsed.intervals.is_empty());
    }

    #[test]
    fn test_missing_date_column_counts_as_invalid() {
        let content = "tarifario,opcao,intervalo,col,omie,tar\n\
            EZU Tarifa Coletiva,Simples,[00:00-00:15[,0.2,0.1,0.05\n";
        let parsed = parser("EZU Tarifa Coletiva").parse(content);
        assert_eq!(parsed.n_skipped_invalid, 1);
    }

    #[test]
    fn test_input_order_is_preserved() {
        let content = format!(
            "{HEADER}\
            EZU Tarifa Coletiva,Simples,19/11/2025,[00:00-00:15[,0.3,0.1,0.05\n\
            EZU Tarifa Coletiva,Simples,18/11/2025,[23:45-00:00[,0.2,0.1,0.05\n"
        );
        let parsed = parser("EZU Tarifa Coletiva").parse(&content);
        assert_eq!(parsed.intervals[0].timestamp.day(), 19);
        assert_eq!(parsed.intervals[1].timestamp.day(), 18);
    }

    #[test]
    fn test_retain_on() {
        let content = format!(
            "{HEADER}\
            EZU Tarifa Coletiva,Simples,18/11/2025,[00:00-00:15[,0.3,0.1,0.05\n\
            EZU Tarifa Coletiva,Simples,19/11/2025,[00:00-00:15[,0.2,0.1,0.05\n"
        );
        let parsed = parser("EZU Tarifa Coletiva")
            .parse(&content)
            .retain_on(NaiveDate::from_ymd_opt(2025, 11, 19).unwrap());
        assert_eq!(parsed.intervals.len(), 1);
        assert_eq!(parsed.intervals[0].price_excl_vat, KilowattHourRate(0.2));
    }

    #[test]
    fn test_spring_forward_gap_is_invalid() {
        // Lisbon skips 01:00–02:00 on the last Sunday of March.
        let content = format!(
            "{HEADER}\
            EZU Tarifa Coletiva,Simples,30/03/2025,[01:15-01:30[,0.3,0.1,0.05\n\
            EZU Tarifa Coletiva,Simples,30/03/2025,[02:15-02:30[,0.3,0.1,0.05\n"
        );
        let parsed = parser("EZU Tarifa Coletiva").parse(&content);
        assert_eq!(parsed.n_skipped_invalid, 1);
        assert_eq!(parsed.intervals.len(), 1);
        assert_eq!(parsed.intervals[0].timestamp.hour(), 2);
    }

    #[test]
    fn test_repeated_fall_back_hour_maps_to_both_instants() {
        // Lisbon repeats 01:00–02:00 on the last Sunday of October.
        let content = format!(
            "{HEADER}\
            EZU Tarifa Coletiva,Simples,26/10/2025,[01:00-01:15[,0.3,0.1,0.05\n\
            EZU Tarifa Coletiva,Simples,26/10/2025,[01:00-01:15[,0.2,0.1,0.05\n"
        );
        let parsed = parser("EZU Tarifa Coletiva").parse(&content);
        assert_eq!(parsed.intervals.len(), 2);
        let (first, second) = (&parsed.intervals[0], &parsed.intervals[1]);
        assert_eq!(second.timestamp - first.timestamp, chrono::TimeDelta::hours(1));
        assert_eq!(first.date(), second.date());
    }

    #[test]
    fn test_parse_interval_start() {
        assert_eq!(parse_interval_start("[23:45-00:00["), NaiveTime::from_hms_opt(23, 45, 0));
        assert_eq!(parse_interval_start(" [07:15-07:30["), NaiveTime::from_hms_opt(7, 15, 0));
        assert_eq!(parse_interval_start("[7:15-7:30["), None);
        assert_eq!(parse_interval_start("["), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("18/11/2025"), NaiveDate::from_ymd_opt(2025, 11, 18));
        assert_eq!(parse_date("18/11/2025/1"), None);
        assert_eq!(parse_date("2025-11-18"), None);
    }
}
