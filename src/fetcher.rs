//! Price resolution: memory cache, then local snapshots, then the remote feed.

use bon::Builder;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::{
    aggregate::AverageHourly,
    cache::{CacheKey, MemoryCache},
    parser::Parser,
    prelude::*,
    price::{HourlyPrice, PriceInterval},
    quantity::VatRate,
    source::{FetchError, PriceSource},
    store::{LocalStore, StoreError},
    tariff::Tariff,
};

/// Number of 15-minute intervals in a regular day.
const N_DAY_INTERVALS: usize = 96;

#[derive(Clone, Debug, Builder)]
pub struct PriceRequest {
    #[builder(into)]
    pub provider: String,

    pub tariff: Tariff,

    #[builder(default)]
    pub vat_rate: VatRate,

    /// Defaults to today in the feed timezone.
    pub target_date: Option<NaiveDate>,

    #[builder(default)]
    pub bypass_cache: bool,
}

impl PriceRequest {
    const fn parser(&self, timezone: Tz) -> Parser<'_> {
        Parser { provider: self.provider.as_str(), tariff: self.tariff, vat_rate: self.vat_rate, timezone }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DateClass {
    Past,
    Today,
    Tomorrow,
}

impl DateClass {
    /// Anything other than today or tomorrow is considered past, including later days.
    #[must_use]
    pub fn classify(on: NaiveDate, today: NaiveDate) -> Self {
        if on == today {
            Self::Today
        } else if today.succ_opt() == Some(on) {
            Self::Tomorrow
        } else {
            Self::Past
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// There are no prices for the date, as opposed to a failure to get them.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Fetch(error) => error.is_not_found(),
            Self::Store(_) => false,
        }
    }
}

pub struct PriceFetcher<S> {
    source: S,
    store: LocalStore,
    cache: MemoryCache,
    timezone: Tz,
}

impl<S: PriceSource> PriceFetcher<S> {
    pub const fn new(source: S, store: LocalStore, cache: MemoryCache, timezone: Tz) -> Self {
        Self { source, store, cache, timezone }
    }

    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    #[cfg(test)]
    pub const fn source(&self) -> &S {
        &self.source
    }

    pub async fn get_prices(&self, request: &PriceRequest) -> Result<Vec<HourlyPrice>, Error> {
        self.get_prices_at(request, Utc::now()).await
    }

    #[instrument(
        skip_all,
        fields(provider = %request.provider, tariff = %request.tariff, on = ?request.target_date),
    )]
    pub async fn get_prices_at(
        &self,
        request: &PriceRequest,
        now: DateTime<Utc>,
    ) -> Result<Vec<HourlyPrice>, Error> {
        let today = now.with_timezone(&self.timezone).date_naive();
        let on = request.target_date.unwrap_or(today);
        let class = DateClass::classify(on, today);
        debug!(%on, ?class, "resolving…");

        let key = CacheKey { on, provider: request.provider.clone(), tariff: request.tariff };
        if let Some(prices) = self.cache.get(&key, request.bypass_cache, now) {
            return Ok(prices);
        }

        let parser = request.parser(self.timezone);
        let intervals = match class {
            DateClass::Past => self.resolve_past(parser, on, request.bypass_cache).await?,
            DateClass::Today | DateClass::Tomorrow => {
                self.resolve_current(parser, on, class, request.bypass_cache).await?
            }
        };

        let prices = intervals.iter().average_hourly();
        info!(%on, n_intervals = intervals.len(), n_prices = prices.len(), "resolved");
        self.cache.set(key, prices.clone(), now);
        Ok(prices)
    }

    async fn resolve_past(
        &self,
        parser: Parser<'_>,
        on: NaiveDate,
        bypass: bool,
    ) -> Result<Vec<PriceInterval>, Error> {
        if !bypass && let Some(content) = self.store.load(on).await? {
            debug!("using the local snapshot");
            return Ok(parser.parse(&content).retain_on(on).intervals);
        }
        let content = self.source.fetch_historical(self.start_of_day(on)).await?;
        self.store.save(on, &content).await?;
        Ok(parser.parse(&content).retain_on(on).intervals)
    }

    async fn resolve_current(
        &self,
        parser: Parser<'_>,
        on: NaiveDate,
        class: DateClass,
        bypass: bool,
    ) -> Result<Vec<PriceInterval>, Error> {
        if class == DateClass::Today
            && !bypass
            && let Some(content) = self.store.load(on).await?
        {
            let intervals = parser.parse(&content).retain_on(on).intervals;
            if intervals.len() >= N_DAY_INTERVALS {
                debug!(n_intervals = intervals.len(), "local snapshot is complete");
                return Ok(intervals);
            }
            debug!(n_intervals = intervals.len(), "local snapshot is incomplete");
        }

        let content = self.source.fetch_live().await?;
        let intervals = parser.parse(&content).retain_on(on).intervals;

        // Not atomic: a concurrent resolution may have replaced the file since it was read.
        let n_existing = self
            .store
            .load(on)
            .await?
            .map(|existing| parser.parse(&existing).retain_on(on).intervals.len());
        match n_existing {
            Some(n_existing) if intervals.len() <= n_existing => {
                debug!(n_existing, n_fetched = intervals.len(), "keeping the local snapshot");
            }
            _ => self.store.save(on, &content).await?,
        }
        Ok(intervals)
    }

    fn start_of_day(&self, on: NaiveDate) -> DateTime<Tz> {
        let midnight = on.and_time(NaiveTime::MIN);
        self.timezone
            .from_local_datetime(&midnight)
            .earliest()
            .unwrap_or_else(|| self.timezone.from_utc_datetime(&midnight))
    }
}
