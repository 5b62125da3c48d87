use std::time::Duration;

use chrono::Utc;
use clap::{Parser, crate_version};
use lince::{
    cli::{Args, Command, PricesArgs, SummaryArgs, WatchArgs},
    prelude::*,
    tables::{build_prices_table, build_providers_table, build_summary_table, build_tariffs_table},
};
use tokio::time::{MissedTickBehavior, interval};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::Prices(args) => prices(&args).await,
        Command::Summary(args) => summary(&args).await,
        Command::Watch(args) => watch(&args).await,
        Command::Providers => {
            println!("{}", build_providers_table());
            println!("{}", build_tariffs_table());
            Ok(())
        }
    }
}

#[instrument(skip_all)]
async fn prices(args: &PricesArgs) -> Result {
    let fetcher = args.feed.fetcher()?;
    let request = args.request();
    let prices = fetcher.get_prices(&request).await.with_context(|| {
        format!("failed to get the prices for `{}` ({})", request.provider, request.tariff)
    })?;
    if prices.is_empty() {
        warn!(provider = %request.provider, "no prices, check the provider and tariff names");
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&prices)?);
    } else {
        println!("{}", build_prices_table(&prices, Utc::now().with_timezone(&fetcher.timezone())));
    }
    Ok(())
}

#[instrument(skip_all)]
async fn summary(args: &SummaryArgs) -> Result {
    let snapshot = args
        .feed
        .tracker()?
        .update(Utc::now(), args.bypass_cache)
        .await
        .context("failed to update the prices")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("{}", build_summary_table(&snapshot.summary));
    }
    Ok(())
}

#[instrument(skip_all, fields(interval = %args.interval))]
async fn watch(args: &WatchArgs) -> Result {
    let tracker = args.feed.tracker()?;
    let period: Duration = args.interval.into();
    ensure!(!period.is_zero(), "the interval must be positive");

    let mut interval = interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match tracker.update(Utc::now(), false).await {
            Ok(snapshot) => println!("{}", build_summary_table(&snapshot.summary)),
            Err(error) => error!("failed to update the prices: {:#}", Error::from(error)),
        }
    }
}
