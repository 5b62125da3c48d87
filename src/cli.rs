use std::path::PathBuf;

use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use reqwest::Url;

use crate::{
    cache::MemoryCache,
    fetcher::{PriceFetcher, PriceRequest},
    prelude::*,
    quantity::VatRate,
    source::github::GitHub,
    store::LocalStore,
    tariff::Tariff,
    tracker::Tracker,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve the hourly prices for a single day.
    #[clap(name = "prices")]
    Prices(Box<PricesArgs>),

    /// Show the current price and today's and tomorrow's ranges.
    #[clap(name = "summary")]
    Summary(Box<SummaryArgs>),

    /// Keep updating the summary.
    #[clap(name = "watch")]
    Watch(Box<WatchArgs>),

    /// List the known providers and tariffs.
    #[clap(name = "providers")]
    Providers,
}

/// Where the price feed lives.
#[derive(Clone, Parser)]
pub struct SourceArgs {
    /// Base URL of the raw files, followed by the revision and the file path.
    #[clap(
        long = "raw-base-url",
        env = "LINCE_RAW_BASE_URL",
        default_value = "https://raw.githubusercontent.com/tiagofelicia/tiagofelicia.github.io/"
    )]
    pub raw_base_url: Url,

    /// Repository API URL, which lists the commits.
    #[clap(
        long = "api-base-url",
        env = "LINCE_API_BASE_URL",
        default_value = "https://api.github.com/repos/tiagofelicia/tiagofelicia.github.io/"
    )]
    pub api_base_url: Url,

    /// Feed file path within the repository.
    #[clap(long = "file-path", env = "LINCE_FILE_PATH", default_value = "data/precos-horarios.csv")]
    pub file_path: String,

    #[clap(long, env = "LINCE_BRANCH", default_value = "main")]
    pub branch: String,
}

/// Which prices to resolve, and where to keep them.
#[derive(Parser)]
pub struct FeedArgs {
    /// Provider name exactly as it appears in the feed, for example «G9 Smart Dynamic».
    #[clap(long, env = "LINCE_PROVIDER")]
    pub provider: String,

    /// Tariff code, for example `BIHORARIO_SEMANAL`, or its name in the feed.
    #[clap(long, env = "LINCE_TARIFF", default_value = "SIMPLE")]
    pub tariff: Tariff,

    /// VAT percent.
    #[clap(long = "vat", env = "LINCE_VAT", default_value = "23")]
    pub vat_rate: VatRate,

    /// Feed timezone: defines calendar days and hours.
    #[clap(long, env = "LINCE_TIMEZONE", default_value = "Europe/Lisbon")]
    pub timezone: Tz,

    /// Local snapshot directory.
    #[clap(long = "data-dir", env = "LINCE_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    #[clap(flatten)]
    pub source: SourceArgs,
}

impl FeedArgs {
    pub fn fetcher(&self) -> Result<PriceFetcher<GitHub>> {
        let source = GitHub::try_new(
            self.source.raw_base_url.clone(),
            self.source.api_base_url.clone(),
            &self.source.file_path,
            &self.source.branch,
        )
        .context("failed to create the feed client")?;
        Ok(PriceFetcher::new(
            source,
            LocalStore::new(&self.data_dir),
            MemoryCache::default(),
            self.timezone,
        ))
    }

    pub fn tracker(&self) -> Result<Tracker<GitHub>> {
        Ok(Tracker::new(self.fetcher()?, self.provider.clone(), self.tariff, self.vat_rate))
    }
}

#[derive(Parser)]
pub struct PricesArgs {
    /// Day to resolve, today by default.
    #[clap(long)]
    pub date: Option<NaiveDate>,

    /// Ignore the cached prices and the complete local snapshot.
    #[clap(long)]
    pub bypass_cache: bool,

    /// Print JSON instead of a table.
    #[clap(long)]
    pub json: bool,

    #[clap(flatten)]
    pub feed: FeedArgs,
}

impl PricesArgs {
    pub fn request(&self) -> PriceRequest {
        PriceRequest::builder()
            .provider(self.feed.provider.clone())
            .tariff(self.feed.tariff)
            .vat_rate(self.feed.vat_rate)
            .maybe_target_date(self.date)
            .bypass_cache(self.bypass_cache)
            .build()
    }
}

#[derive(Parser)]
pub struct SummaryArgs {
    #[clap(long)]
    pub bypass_cache: bool,

    #[clap(long)]
    pub json: bool,

    #[clap(flatten)]
    pub feed: FeedArgs,
}

#[derive(Parser)]
pub struct WatchArgs {
    #[clap(long, env = "LINCE_WATCH_INTERVAL", default_value = "5m")]
    pub interval: humantime::Duration,

    #[clap(flatten)]
    pub feed: FeedArgs,
}
