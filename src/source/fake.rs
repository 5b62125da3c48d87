//! In-memory price source and feed builder for tests.

use std::{
    fmt::Write,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Timelike};
use chrono_tz::Tz;
use parking_lot::Mutex;
use reqwest::Url;

use crate::source::{FetchError, PriceSource};

pub const PROVIDER: &str = "Galp Plano Dinâmico";

/// Serves fixed content and counts the calls. Missing content responds with not-found.
#[derive(Default)]
pub struct FakeSource {
    pub live: Option<String>,
    pub historical: Option<String>,
    pub n_live: AtomicUsize,
    pub n_historical: AtomicUsize,
    pub since: Mutex<Option<DateTime<Tz>>>,
}

#[async_trait]
impl PriceSource for FakeSource {
    async fn fetch_live(&self) -> Result<String, FetchError> {
        self.n_live.fetch_add(1, Ordering::Relaxed);
        self.live.clone().ok_or_else(|| FetchError::NotFound {
            url: Url::parse("https://example.com/main/prices.csv").unwrap(),
        })
    }

    async fn fetch_historical(&self, since: DateTime<Tz>) -> Result<String, FetchError> {
        self.n_historical.fetch_add(1, Ordering::Relaxed);
        *self.since.lock() = Some(since);
        self.historical.clone().ok_or(FetchError::NoCommits { date: since.date_naive() })
    }
}

/// Feed with `n_rows` consecutive 15-minute intervals from midnight, wrapping around after 96.
pub fn feed(on: NaiveDate, n_rows: usize, price: f64) -> String {
    let mut content = "tarifario,opcao,dia,intervalo,col,omie,tar\n".to_owned();
    let midnight = on.and_time(NaiveTime::MIN);
    for i in 0..n_rows {
        let start = midnight + TimeDelta::minutes(15 * i64::try_from(i % 96).unwrap());
        let end = start + TimeDelta::minutes(15);
        writeln!(
            content,
            "{PROVIDER},Simples,{},[{:02}:{:02}-{:02}:{:02}[,{price:.5},0.10000,0.05000",
            on.format("%d/%m/%Y"),
            start.hour(),
            start.minute(),
            end.hour(),
            end.minute(),
        )
        .unwrap();
    }
    content
}
