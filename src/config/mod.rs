//! Configuration management for PriceFeed
//!
//! Loads from YAML/TOML files + environment variables via .env

mod types;

pub use types::*;

use anyhow::{bail, Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::types::{EstimatorKind, DEFAULT_UNIT};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Short symbol, also the feed id used in storage keys (e.g. BTC)
    pub symbol: String,
    /// Quote currency of the published price
    pub unit: String,
    /// Display name
    pub name: String,
    pub description: String,
    /// Seconds between aggregation passes in watch mode
    pub heartbeat_secs: u64,
    /// Deviation threshold advertised to consumers
    pub deviation_threshold: f64,
    pub estimator: EstimatorSetting,
    /// Per-request timeout for source connectors in milliseconds
    pub source_timeout_ms: u64,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// "memory" or "rest"
    pub kind: String,
    /// REST endpoint base URL
    pub endpoint: String,
    /// Bearer token for the REST endpoint
    pub token: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable ones
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address for `serve`
    pub bind: String,
}

impl AppConfig {
    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let builder = Config::builder()
            // Feed defaults
            .set_default("feed.symbol", "BTC")?
            .set_default("feed.unit", DEFAULT_UNIT)?
            .set_default("feed.name", "Bitcoin")?
            .set_default("feed.description", "")?
            .set_default("feed.heartbeat_secs", 10)?
            .set_default("feed.deviation_threshold", 0.5)?
            .set_default("feed.estimator", "none")?
            .set_default("feed.source_timeout_ms", 10_000)?
            // Store defaults
            .set_default("store.kind", "memory")?
            .set_default("store.endpoint", "")?
            .set_default("store.token", "")?
            .set_default("store.timeout_ms", 5000)?
            // Logging defaults
            .set_default("logging.json", false)?
            // Server defaults
            .set_default("server.bind", "0.0.0.0:8080")?;
        Ok(builder)
    }

    /// Load configuration from file and environment.
    ///
    /// With no explicit path, `config/default` and `config/local` are read if
    /// present. Environment variables (`PRICEFEED__FEED__SYMBOL`, ...) win.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let mut builder = Self::defaults()?;
        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder
                .add_source(File::with_name("config/default").required(false))
                .add_source(File::with_name("config/local").required(false)),
        };

        let config = builder
            .add_source(Environment::with_prefix("PRICEFEED").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Load from an in-memory YAML document layered over the defaults
    pub fn from_yaml(document: &str) -> Result<Self> {
        let config = Self::defaults()?
            .add_source(File::from_str(document, FileFormat::Yaml))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Configured estimator, `None` for "none"
    pub fn estimator(&self) -> Option<EstimatorKind> {
        self.feed.estimator.kind()
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.feed.source_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store.timeout_ms)
    }

    /// Reject combinations that would only fail later at runtime
    pub fn validate(&self) -> Result<()> {
        if self.feed.symbol.trim().is_empty() {
            bail!("feed.symbol must not be empty");
        }

        if self.feed.heartbeat_secs == 0 {
            bail!("feed.heartbeat_secs must be positive");
        }

        match self.store.kind.as_str() {
            "memory" => {}
            "rest" => {
                if self.store.endpoint.is_empty() {
                    bail!("store.endpoint is required for the rest store");
                }
            }
            other => bail!("Unknown store.kind '{}' (expected memory or rest)", other),
        }

        Ok(())
    }

    /// Generate a digest of the config (without secrets) for logging
    pub fn digest(&self) -> String {
        format!(
            "feed={} unit={} estimator={} sources={} store={} heartbeat={}s",
            self.feed.symbol,
            self.feed.unit,
            self.feed.estimator,
            self.feed.sources.len(),
            self.store.kind,
            self.feed.heartbeat_secs
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config.feed.symbol, "BTC");
        assert_eq!(config.feed.unit, "USD");
        assert_eq!(config.feed.heartbeat_secs, 10);
        assert_eq!(config.feed.deviation_threshold, 0.5);
        assert_eq!(config.estimator(), None);
        assert!(config.feed.sources.is_empty());
        assert_eq!(config.store.kind, "memory");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_sources_and_estimator() {
        let yaml = r#"
feed:
  symbol: BNB
  estimator: twap
  sources:
    - kind: binance
      symbol: BNB
      unit: USDT
    - kind: pair_reserves
      rpc_url: https://bsc-dataseed.binance.org
      pair: "0x1111111111111111111111111111111111111111"
      network: Baryon Network
      token0:
        symbol: BUSD
        price_id: binance-usd
      token1:
        symbol: BNB
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.estimator(), Some(EstimatorKind::Twap));
        assert_eq!(config.feed.sources.len(), 2);
        assert_eq!(
            config.feed.sources[0],
            SourceConfig::Binance {
                symbol: "BNB".into(),
                unit: "USDT".into()
            }
        );
        match &config.feed.sources[1] {
            SourceConfig::PairReserves {
                network,
                token0,
                price_api,
                ..
            } => {
                assert_eq!(network, "Baryon Network");
                assert_eq!(token0.price_id.as_deref(), Some("binance-usd"));
                assert_eq!(price_api, "https://api.coingecko.com/api/v3");
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_estimator() {
        assert!(AppConfig::from_yaml("feed:\n  estimator: vwap\n").is_err());
    }

    #[test]
    fn test_estimator_setting() {
        let config = AppConfig::from_yaml("feed:\n  estimator: median\n").unwrap();
        assert_eq!(config.feed.estimator, EstimatorSetting::Median);
        assert_eq!(config.estimator(), Some(EstimatorKind::Median));
        assert!(config.digest().contains("estimator=median"));

        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config.feed.estimator, EstimatorSetting::None);
        assert!(config.digest().contains("estimator=none"));
    }

    #[test]
    fn test_rest_store_needs_endpoint() {
        assert!(AppConfig::from_yaml("store:\n  kind: rest\n").is_err());
        let config = AppConfig::from_yaml(
            "store:\n  kind: rest\n  endpoint: https://kv.example.com\n  token: abc\n",
        )
        .unwrap();
        assert_eq!(config.store.endpoint, "https://kv.example.com");
    }

    #[test]
    fn test_digest_omits_token() {
        let config = AppConfig::from_yaml(
            "store:\n  kind: rest\n  endpoint: https://kv.example.com\n  token: supersecret\n",
        )
        .unwrap();
        assert!(!config.digest().contains("supersecret"));
        assert!(config.to_string().contains("store=rest"));
    }
}
