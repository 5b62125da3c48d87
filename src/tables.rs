use chrono::DateTime;
use chrono_tz::Tz;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use itertools::Itertools;

use crate::{
    price::HourlyPrice,
    quantity::KilowattHourRate,
    summary::{DayRange, Summary},
    tariff::{KNOWN_PROVIDERS, Tariff},
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

pub fn build_prices_table(prices: &[HourlyPrice], now: DateTime<Tz>) -> Table {
    let median_rate = median(prices.iter().map(|price| price.price_incl_vat));

    let mut table = new_table();
    table.set_header(vec!["Date", "Start", "End", "Interval", "Excl. VAT", "Incl. VAT"]);
    for price in prices {
        let is_current = price.contains(now);
        let mut row = vec![
            Cell::new(price.timestamp.format("%Y-%m-%d")).add_attribute(Attribute::Dim),
            Cell::new(price.timestamp.format("%H:%M")),
            Cell::new(price.end().format("%H:%M")).add_attribute(Attribute::Dim),
            Cell::new(&price.label).add_attribute(Attribute::Dim),
            Cell::new(price.price_excl_vat).set_alignment(CellAlignment::Right),
            Cell::new(price.price_incl_vat).set_alignment(CellAlignment::Right).fg(
                if price.price_incl_vat >= median_rate { Color::Red } else { Color::Green },
            ),
        ];
        if is_current {
            row = row.into_iter().map(|cell| cell.add_attribute(Attribute::Bold)).collect();
        }
        table.add_row(row);
    }
    table
}

pub fn build_summary_table(summary: &Summary) -> Table {
    let mut table = new_table();
    table.set_header(vec!["", "Min excl. VAT", "Max excl. VAT", "Min incl. VAT", "Max incl. VAT"]);
    if let Some(current) = &summary.current {
        table.add_row(vec![
            Cell::new(format!("Now {}", current.label)).add_attribute(Attribute::Bold),
            Cell::new(current.price_excl_vat).set_alignment(CellAlignment::Right),
            Cell::new(""),
            Cell::new(current.price_incl_vat).set_alignment(CellAlignment::Right).fg(Color::Cyan),
            Cell::new(""),
        ]);
    }
    for (title, range) in [("Today", &summary.today), ("Tomorrow", &summary.tomorrow)] {
        match range {
            Some(range) => table.add_row(range_row(title, range)),
            None => table.add_row(vec![
                Cell::new(title),
                Cell::new("not available").add_attribute(Attribute::Dim),
            ]),
        };
    }
    table
}

fn range_row(title: &str, range: &DayRange) -> Vec<Cell> {
    vec![
        Cell::new(title),
        Cell::new(range.min_excl_vat).set_alignment(CellAlignment::Right).fg(Color::Green),
        Cell::new(range.max_excl_vat).set_alignment(CellAlignment::Right).fg(Color::Red),
        Cell::new(range.min_incl_vat).set_alignment(CellAlignment::Right).fg(Color::Green),
        Cell::new(range.max_incl_vat).set_alignment(CellAlignment::Right).fg(Color::Red),
    ]
}

pub fn build_tariffs_table() -> Table {
    let mut table = new_table();
    table.set_header(vec!["Code", "Feed name"]);
    for tariff in Tariff::ALL {
        table.add_row(vec![
            Cell::new(tariff.code()).add_attribute(Attribute::Bold),
            Cell::new(tariff.source_name()),
        ]);
    }
    table
}

pub fn build_providers_table() -> Table {
    let mut table = new_table();
    table.set_header(vec!["Provider"]);
    for provider in KNOWN_PROVIDERS {
        table.add_row(vec![provider]);
    }
    table
}

fn median(rates: impl Iterator<Item = KilowattHourRate>) -> KilowattHourRate {
    let rates = rates.sorted_unstable().collect_vec();
    rates.get(rates.len() / 2).copied().unwrap_or(KilowattHourRate::ZERO)
}
