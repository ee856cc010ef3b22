//! PriceFeed CLI
//!
//! Usage: pricefeed [--config path] <aggregate|report|publish|watch|serve>

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pricefeed::config::AppConfig;
use pricefeed::{store, Feed, FeedBuilder, FeedData};

#[derive(Debug, Parser)]
#[command(name = "pricefeed", version, about = "Multi-source spot price feed")]
struct Cli {
    /// Configuration file (defaults to config/default and config/local)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one aggregation pass
    Aggregate,
    /// Print the feed report as JSON
    Report,
    /// Print the current `{ts, price}` for a downstream publisher
    Publish,
    /// Aggregate every heartbeat until Ctrl-C
    Watch,
    /// Serve the feed over HTTP (requires the `server` feature)
    Serve,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(config.logging.json);

    info!("🚀 PriceFeed {} | {}", env!("CARGO_PKG_VERSION"), config.digest());

    let store = store::from_config(&config)?;
    let feed = FeedBuilder::configured(&config, store)?
        .publish_handler(publish_json)
        .build();

    match cli.command {
        Command::Aggregate => aggregate_once(&feed).await,
        Command::Report => print_report(&feed).await,
        Command::Publish => publish(&feed).await,
        Command::Watch => watch(&feed).await,
        Command::Serve => serve(feed, &config).await,
    }
}

async fn aggregate_once(feed: &Feed) -> Result<()> {
    feed.aggregate().await?;
    let (price, ts) = feed.current_estimate().await?;
    info!(feed = %feed.symbol(), estimator = %feed.aggregation_type(), price, ts, "✅ Aggregation complete");
    Ok(())
}

async fn print_report(feed: &Feed) -> Result<()> {
    let report = feed.report().await?;
    let json = serde_json::to_string_pretty(&report).context("Failed to encode report")?;
    println!("{}", json);
    Ok(())
}

fn publish_json(data: FeedData) -> String {
    serde_json::json!({ "ts": data.ts, "price": data.price }).to_string()
}

async fn publish(feed: &Feed) -> Result<()> {
    let body = feed
        .publish()
        .await?
        .context("Feed has no publish handler")?;
    println!("{}", body);
    Ok(())
}

/// Passes run back to back in one task, so two never overlap
async fn watch(feed: &Feed) -> Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(feed.heartbeat_secs()));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(feed = %feed.symbol(), heartbeat_secs = feed.heartbeat_secs(), "👀 Watching");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = aggregate_once(feed).await {
                    error!(feed = %feed.symbol(), error = %e, "Aggregation failed");
                    if e.downcast_ref::<pricefeed::FeedError>().is_some_and(|e| e.is_corruption()) {
                        return Err(e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("🛑 Shutting down");
                return Ok(());
            }
        }
    }
}

#[cfg(feature = "server")]
async fn serve(feed: Feed, config: &AppConfig) -> Result<()> {
    pricefeed::server::start_server(std::sync::Arc::new(feed), &config.server.bind).await
}

#[cfg(not(feature = "server"))]
async fn serve(_feed: Feed, _config: &AppConfig) -> Result<()> {
    anyhow::bail!("pricefeed was built without the `server` feature")
}
