//! AMM pair-reserve source
//!
//! Prices `token1` in units of `token0` from a UniswapV2-style pair's
//! `getReserves()`, then converts to USD through a CoinGecko-compatible
//! simple price endpoint unless `token0` already is USD.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use ethers::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::oracle::sources::SpotSource;
use crate::types::{now_secs, SourceDescriptor, SpotPrice};

abigen!(
    UniswapV2Pair,
    r#"[
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast)
    ]"#
);

/// Reserves are reported in 18-decimal fixed point
const RESERVE_SCALE: f64 = 1e18;

/// One side of an AMM pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairToken {
    pub symbol: String,
    /// Id used with the USD price endpoint; defaults to the lowercased symbol
    #[serde(default)]
    pub price_id: Option<String>,
}

impl PairToken {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            price_id: None,
        }
    }

    fn is_usd(&self) -> bool {
        self.symbol.eq_ignore_ascii_case("usd")
    }

    fn price_id(&self) -> String {
        self.price_id
            .clone()
            .unwrap_or_else(|| self.symbol.to_lowercase())
    }
}

pub struct PairReserveSource {
    contract: UniswapV2Pair<Provider<Http>>,
    pair: String,
    network: String,
    token0: PairToken,
    token1: PairToken,
    price_api: String,
    client: reqwest::Client,
}

impl PairReserveSource {
    pub fn new(
        rpc_url: &str,
        pair: &str,
        network: &str,
        token0: PairToken,
        token1: PairToken,
        price_api: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("Invalid RPC url: {}", rpc_url))?;
        let address: Address = pair
            .parse()
            .with_context(|| format!("Invalid pair address: {}", pair))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            contract: UniswapV2Pair::new(address, Arc::new(provider)),
            pair: pair.to_string(),
            network: network.to_string(),
            token0,
            token1,
            price_api: price_api.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn reserves(&self) -> Result<(f64, f64)> {
        let (reserve0, reserve1, _) = self
            .contract
            .get_reserves()
            .call()
            .await
            .context("getReserves() call failed")?;

        Ok((
            reserve0 as f64 / RESERVE_SCALE,
            reserve1 as f64 / RESERVE_SCALE,
        ))
    }

    async fn usd_unit_price(&self) -> Result<f64> {
        let id = self.token0.price_id();
        let url = format!("{}/simple/price", self.price_api);

        let response = self
            .client
            .get(&url)
            .query(&[("ids", id.as_str()), ("vs_currencies", "USD")])
            .send()
            .await
            .context("Failed to fetch USD unit price")?;

        if !response.status().is_success() {
            bail!("Price API returned error: {}", response.status());
        }

        let body = response.text().await.context("Failed to read price API response")?;
        parse_unit_price(&body, &id)
    }

    async fn try_fetch(&self) -> Result<SpotPrice> {
        let (reserve0, reserve1) = self.reserves().await?;

        let unit_price = if self.token0.is_usd() {
            None
        } else {
            Some(self.usd_unit_price().await?)
        };

        spot_from_reserves(reserve0, reserve1, unit_price, &self.token0.symbol, now_secs())
    }
}

/// Parse `{"<id>": {"usd": <f64>}}`
pub(crate) fn parse_unit_price(body: &str, id: &str) -> Result<f64> {
    let prices: HashMap<String, HashMap<String, f64>> =
        serde_json::from_str(body).context("Failed to parse price API response")?;

    prices
        .get(id)
        .and_then(|quotes| quotes.get("usd"))
        .copied()
        .ok_or_else(|| anyhow!("No USD price for {}", id))
}

/// Spot reading from scaled reserves; `unit_price` converts `token0` to USD
pub(crate) fn spot_from_reserves(
    reserve0: f64,
    reserve1: f64,
    unit_price: Option<f64>,
    unit: &str,
    ts: i64,
) -> Result<SpotPrice> {
    if reserve0 <= 0.0 || reserve1 <= 0.0 {
        bail!("Pair has no liquidity (reserves {} / {})", reserve0, reserve1);
    }

    let price_unit = reserve0 / reserve1;
    let price_last = match unit_price {
        Some(usd) => usd * price_unit,
        None => price_unit,
    };

    Ok(SpotPrice {
        ts,
        unit: unit.to_string(),
        price_last,
        price_unit,
    })
}

#[async_trait]
impl SpotSource for PairReserveSource {
    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::new(
            format!("{}/{} {}", self.token0.symbol, self.token1.symbol, self.network),
            "AMM",
            self.pair.clone(),
        )
    }

    async fn fetch_spot_price(&self) -> SpotPrice {
        match self.try_fetch().await {
            Ok(spot) => {
                tracing::debug!(source = %self.network, pair = %self.pair, price = spot.price_last, "Spot price");
                spot
            }
            Err(e) => {
                tracing::warn!(source = %self.network, pair = %self.pair, error = %e, "Spot price unavailable");
                SpotPrice::empty(self.token0.symbol.clone())
            }
        }
    }
}
