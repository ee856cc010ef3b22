//! Price source implementations (Binance ticker, AMM pair reserves)

mod binance;
mod pair_reserves;

pub use binance::BinanceSource;
pub use pair_reserves::{PairReserveSource, PairToken};

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SourceConfig;
use crate::types::{SourceDescriptor, SpotPrice};

/// Trait for spot price sources
///
/// Fetching never fails at this boundary: a source that cannot produce a
/// reading logs the cause and returns an empty `SpotPrice`.
#[async_trait]
pub trait SpotSource: Send + Sync {
    /// Name, kind and origin of the source, for feed reports
    fn descriptor(&self) -> SourceDescriptor;

    /// Fetch the latest spot reading
    async fn fetch_spot_price(&self) -> SpotPrice;
}

/// Build a source from its configuration entry
pub fn build_source(config: &SourceConfig, timeout: Duration) -> Result<Arc<dyn SpotSource>> {
    let source: Arc<dyn SpotSource> = match config {
        SourceConfig::Binance { symbol, unit } => {
            Arc::new(BinanceSource::new(symbol, unit, timeout)?)
        }
        SourceConfig::PairReserves {
            rpc_url,
            pair,
            network,
            token0,
            token1,
            price_api,
        } => Arc::new(PairReserveSource::new(
            rpc_url,
            pair,
            network,
            token0.clone(),
            token1.clone(),
            price_api,
            timeout,
        )?),
    };

    tracing::debug!(source = ?source.descriptor(), "Source configured");
    Ok(source)
}
