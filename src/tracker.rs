use chrono::{DateTime, NaiveDate, TimeDelta, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::{
    fetcher::{self, PriceFetcher, PriceRequest},
    prelude::*,
    price::HourlyPrice,
    quantity::VatRate,
    source::PriceSource,
    summary::Summary,
    tariff::Tariff,
};

/// Local hour from which tomorrow's prices are usually published.
const PUBLICATION_HOUR: u32 = 13;

#[must_use]
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub updated_at: DateTime<Tz>,

    /// Today's and then tomorrow's hourly prices.
    pub prices: Vec<HourlyPrice>,

    pub summary: Summary,
}

/// Keeps track of today's and tomorrow's prices for a single provider and tariff.
pub struct Tracker<S> {
    fetcher: PriceFetcher<S>,
    provider: String,
    tariff: Tariff,
    vat_rate: VatRate,
}

impl<S: PriceSource> Tracker<S> {
    pub fn new(
        fetcher: PriceFetcher<S>,
        provider: impl Into<String>,
        tariff: Tariff,
        vat_rate: VatRate,
    ) -> Self {
        Self { fetcher, provider: provider.into(), tariff, vat_rate }
    }

    /// Refresh the prices.
    ///
    /// Any failure fails the whole update. Unpublished tomorrow's prices are not a failure,
    /// they are merely empty.
    #[instrument(skip_all, fields(provider = %self.provider, tariff = %self.tariff, force = force))]
    pub async fn update(&self, now: DateTime<Utc>, force: bool) -> Result<Snapshot, fetcher::Error> {
        let local_now = now.with_timezone(&self.fetcher.timezone());
        let today = local_now.date_naive();
        let tomorrow = today + TimeDelta::days(1);

        let mut prices = self.fetcher.get_prices_at(&self.request(today, force), now).await?;
        let bypass_tomorrow = force || local_now.hour() >= PUBLICATION_HOUR;
        prices.extend(self.fetcher.get_prices_at(&self.request(tomorrow, bypass_tomorrow), now).await?);

        let summary = Summary::new(&prices, local_now);
        let current = summary.current.as_ref().map(|price| price.price_incl_vat);
        info!(n_prices = prices.len(), ?current, "updated");
        Ok(Snapshot { updated_at: local_now, prices, summary })
    }

    fn request(&self, on: NaiveDate, bypass_cache: bool) -> PriceRequest {
        PriceRequest::builder()
            .provider(self.provider.clone())
            .tariff(self.tariff)
            .vat_rate(self.vat_rate)
            .target_date(on)
            .bypass_cache(bypass_cache)
            .build()
    }
}
