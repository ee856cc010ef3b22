//! Source configuration entries

use serde::Deserialize;
use std::fmt;

use crate::oracle::PairToken;
use crate::types::EstimatorKind;

/// `feed.estimator` value: a strategy, or `none` for unpersisted snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorSetting {
    None,
    Median,
    Twap,
}

impl EstimatorSetting {
    pub fn kind(self) -> Option<EstimatorKind> {
        match self {
            EstimatorSetting::None => None,
            EstimatorSetting::Median => Some(EstimatorKind::Median),
            EstimatorSetting::Twap => Some(EstimatorKind::Twap),
        }
    }
}

impl fmt::Display for EstimatorSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => f.write_str(kind.label()),
            None => f.write_str("none"),
        }
    }
}

/// One configured price source, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Binance spot ticker for `symbol` quoted in `unit` (e.g. BTC / USDT)
    Binance { symbol: String, unit: String },
    /// UniswapV2-style pair read over JSON-RPC
    PairReserves {
        rpc_url: String,
        /// Pair contract address
        pair: String,
        #[serde(default = "default_network")]
        network: String,
        token0: PairToken,
        token1: PairToken,
        #[serde(default = "default_price_api")]
        price_api: String,
    },
}

fn default_network() -> String {
    "AMM".to_string()
}

fn default_price_api() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}
