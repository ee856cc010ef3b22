//! Oracle module - spot price sources
//!
//! Connectors report one timestamped reading each on demand; the snapshot
//! price is their plain mean.

pub mod sources;

pub use sources::{build_source, BinanceSource, PairReserveSource, PairToken, SpotSource};

use std::sync::Arc;

/// Unweighted mean of every source's latest `price_last`.
///
/// Sources are queried one after another. An empty source list yields `0.0`.
pub async fn snapshot_price(sources: &[Arc<dyn SpotSource>]) -> f64 {
    if sources.is_empty() {
        return 0.0;
    }

    let mut cumulative = 0.0;
    for source in sources {
        let spot = source.fetch_spot_price().await;
        cumulative += spot.price_last;
    }

    cumulative / sources.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SourceDescriptor, SpotPrice};
    use async_trait::async_trait;

    struct FixedSource(f64);

    #[async_trait]
    impl SpotSource for FixedSource {
        fn descriptor(&self) -> SourceDescriptor {
            SourceDescriptor::new("Fixed", "Test", "fixed")
        }

        async fn fetch_spot_price(&self) -> SpotPrice {
            SpotPrice {
                ts: 1,
                unit: "USD".to_string(),
                price_last: self.0,
                price_unit: self.0,
            }
        }
    }

    #[tokio::test]
    async fn test_snapshot_price_mean() {
        let sources: Vec<Arc<dyn SpotSource>> = vec![
            Arc::new(FixedSource(100.0)),
            Arc::new(FixedSource(110.0)),
            Arc::new(FixedSource(120.0)),
        ];
        assert_eq!(snapshot_price(&sources).await, 110.0);
    }

    #[tokio::test]
    async fn test_snapshot_price_no_sources() {
        assert_eq!(snapshot_price(&[]).await, 0.0);
    }

    #[tokio::test]
    async fn test_snapshot_price_counts_empty_readings() {
        let sources: Vec<Arc<dyn SpotSource>> =
            vec![Arc::new(FixedSource(200.0)), Arc::new(FixedSource(0.0))];
        assert_eq!(snapshot_price(&sources).await, 100.0);
    }
}
