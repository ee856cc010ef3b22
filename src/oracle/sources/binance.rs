//! Binance REST ticker source
//!
//! Reads the last traded price for a spot pair from `/api/v3/ticker/price`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::oracle::sources::SpotSource;
use crate::types::{now_secs, SourceDescriptor, SpotPrice};

const BINANCE_TICKER_URL: &str = "https://data.binance.com/api/v3/ticker/price";

#[derive(Debug, Clone)]
pub struct BinanceSource {
    client: reqwest::Client,
    base_url: String,
    symbol: String,
    unit: String,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

impl BinanceSource {
    pub fn new(symbol: &str, unit: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: BINANCE_TICKER_URL.to_string(),
            symbol: symbol.to_uppercase(),
            unit: unit.to_uppercase(),
        })
    }

    /// Point the source at a different ticker endpoint (mirrors, testnets)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Trading pair, e.g. `BTCUSDT`
    pub fn pair(&self) -> String {
        format!("{}{}", self.symbol, self.unit)
    }

    async fn try_fetch(&self) -> Result<SpotPrice> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("symbol", self.pair())])
            .send()
            .await
            .context("Failed to fetch ticker from Binance")?;

        if !response.status().is_success() {
            bail!("Binance API returned error: {}", response.status());
        }

        let body = response
            .text()
            .await
            .context("Failed to read Binance ticker response")?;

        parse_ticker(&body, &self.unit, now_secs())
    }
}

/// Parse a `{"symbol": "...", "price": "<decimal>"}` ticker reply
pub(crate) fn parse_ticker(body: &str, unit: &str, ts: i64) -> Result<SpotPrice> {
    let ticker: TickerPrice =
        serde_json::from_str(body).context("Failed to parse Binance ticker response")?;

    let price: f64 = ticker
        .price
        .trim()
        .parse()
        .with_context(|| format!("Invalid Binance price: {}", ticker.price))?;

    Ok(SpotPrice {
        ts,
        unit: unit.to_string(),
        price_last: price,
        price_unit: price,
    })
}

#[async_trait]
impl SpotSource for BinanceSource {
    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::new("Binance Exchange", "Exchange", self.pair())
    }

    async fn fetch_spot_price(&self) -> SpotPrice {
        match self.try_fetch().await {
            Ok(spot) => {
                tracing::debug!(source = %"Binance", pair = %self.pair(), price = spot.price_last, "Spot price");
                spot
            }
            Err(e) => {
                tracing::warn!(source = %"Binance", pair = %self.pair(), error = %e, "Spot price unavailable");
                SpotPrice::empty(self.unit.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_uppercased() {
        let source = BinanceSource::new("btc", "usdt", Duration::from_secs(1)).unwrap();
        assert_eq!(source.pair(), "BTCUSDT");
        assert_eq!(source.descriptor().source, "BTCUSDT");
        assert_eq!(source.descriptor().kind, "Exchange");
    }

    #[test]
    fn test_parse_ticker() {
        let spot = parse_ticker(r#"{"symbol":"BTCUSDT","price":"27123.45000000"}"#, "USDT", 1_700_000_000)
            .unwrap();
        assert_eq!(spot.ts, 1_700_000_000);
        assert_eq!(spot.unit, "USDT");
        assert_eq!(spot.price_last, 27123.45);
        assert_eq!(spot.price_unit, 27123.45);
    }

    #[test]
    fn test_parse_ticker_rejects_bad_payloads() {
        assert!(parse_ticker(r#"{"code":-1121,"msg":"Invalid symbol."}"#, "USDT", 0).is_err());
        assert!(parse_ticker(r#"{"price":"abc"}"#, "USDT", 0).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_yields_empty_price() {
        let source = BinanceSource::new("BTC", "USDT", Duration::from_millis(200))
            .unwrap()
            .with_base_url("http://127.0.0.1:9/api/v3/ticker/price");

        let spot = source.fetch_spot_price().await;
        assert_eq!(spot.price_last, 0.0);
        assert_eq!(spot.unit, "USDT");
    }
}
