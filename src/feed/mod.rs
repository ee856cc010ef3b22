//! Feed - a named asset with its price sources and optional estimator
//!
//! The feed is the thin orchestration layer: it triggers aggregation passes,
//! answers read requests for the current estimate and report, and hands the
//! estimate to a caller-supplied publish handler.

mod builder;

pub use builder::FeedBuilder;

use serde::Serialize;
use std::sync::Arc;

use crate::aggregation::Aggregation;
use crate::error::FeedResult;
use crate::oracle::{snapshot_price, SpotSource};
use crate::types::{now_secs, SourceDescriptor};

/// Estimator slot of a feed
#[derive(Debug, Clone)]
pub enum FeedEstimator {
    /// Estimates are computed fresh from the sources and never persisted
    None,
    Configured(Aggregation),
}

impl FeedEstimator {
    /// Label exposed to consumers: "median", "twap" or "none"
    pub fn label(&self) -> &'static str {
        match self {
            FeedEstimator::None => "none",
            FeedEstimator::Configured(aggregation) => aggregation.kind().label(),
        }
    }
}

/// Payload handed to a feed's publish handler
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeedData {
    pub ts: i64,
    pub price: f64,
}

/// Turns the current feed data into the response body of a publish request
pub type PublishHandler = Box<dyn Fn(FeedData) -> String + Send + Sync>;

/// JSON document served for a feed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedReport {
    pub name: String,
    pub symbol: String,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub aggregation_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deviation_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat: Option<u64>,
    pub price: f64,
    pub ts: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceDescriptor>,
}

pub struct Feed {
    pub(crate) symbol: String,
    pub(crate) unit: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) heartbeat_secs: u64,
    pub(crate) deviation_threshold: f64,
    pub(crate) sources: Vec<Arc<dyn SpotSource>>,
    pub(crate) estimator: FeedEstimator,
    pub(crate) publish_handler: Option<PublishHandler>,
}

impl Feed {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn heartbeat_secs(&self) -> u64 {
        self.heartbeat_secs
    }

    pub fn sources(&self) -> &[Arc<dyn SpotSource>] {
        &self.sources
    }

    pub fn estimator(&self) -> &FeedEstimator {
        &self.estimator
    }

    /// "median", "twap" or "none"
    pub fn aggregation_type(&self) -> &'static str {
        self.estimator.label()
    }

    /// Run one aggregation pass if an estimator is configured.
    ///
    /// The resulting state lives in the store; nothing is returned.
    pub async fn aggregate(&self) -> FeedResult<()> {
        if let FeedEstimator::Configured(aggregation) = &self.estimator {
            aggregation.aggregate(&self.sources).await?;
        }
        Ok(())
    }

    /// Current `(price, ts)`.
    ///
    /// Reads the persisted estimate when an estimator is configured, otherwise
    /// averages the sources now without persisting anything.
    pub async fn current_estimate(&self) -> FeedResult<(f64, i64)> {
        match &self.estimator {
            FeedEstimator::Configured(aggregation) => {
                let state = aggregation.fetch_data().await?;
                Ok((state.estimate, state.ts))
            }
            FeedEstimator::None => Ok((snapshot_price(&self.sources).await, now_secs())),
        }
    }

    /// Persisted price only; `0.0` without an estimator or stored data
    pub async fn fetch_last_price(&self) -> FeedResult<f64> {
        match &self.estimator {
            FeedEstimator::Configured(aggregation) => aggregation.fetch_last_price().await,
            FeedEstimator::None => Ok(0.0),
        }
    }

    pub async fn feed_data(&self) -> FeedResult<FeedData> {
        let (price, ts) = self.current_estimate().await?;
        Ok(FeedData { ts, price })
    }

    /// Run the publish handler over the current estimate.
    ///
    /// `None` when no handler is registered.
    pub async fn publish(&self) -> FeedResult<Option<String>> {
        let Some(handler) = &self.publish_handler else {
            tracing::debug!(feed = %self.symbol, "No publish handler, skipping publish");
            return Ok(None);
        };

        let data = self.feed_data().await?;
        tracing::info!(feed = %self.symbol, price = data.price, ts = data.ts, "📤 Publishing");
        Ok(Some(handler(data)))
    }

    pub async fn report(&self) -> FeedResult<FeedReport> {
        let (price, ts) = self.current_estimate().await?;
        let configured = matches!(self.estimator, FeedEstimator::Configured(_));

        Ok(FeedReport {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            unit: self.unit.clone(),
            description: Some(self.description.clone()).filter(|d| !d.is_empty()),
            aggregation_type: self.aggregation_type().to_string(),
            deviation_threshold: configured.then_some(self.deviation_threshold),
            heartbeat: configured.then_some(self.heartbeat_secs),
            price,
            ts,
            sources: self.sources.iter().map(|s| s.descriptor()).collect(),
        })
    }
}

impl std::fmt::Debug for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feed")
            .field("symbol", &self.symbol)
            .field("unit", &self.unit)
            .field("name", &self.name)
            .field("sources", &self.sources.len())
            .field("estimator", &self.estimator)
            .field("publish_handler", &self.publish_handler.is_some())
            .finish()
    }
}
