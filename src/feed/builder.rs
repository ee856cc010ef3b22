//! Fluent construction of feeds, by hand or from configuration

use anyhow::{Context, Result};
use std::sync::Arc;

use super::{Feed, FeedData, FeedEstimator, PublishHandler};
use crate::aggregation::Aggregation;
use crate::config::AppConfig;
use crate::oracle::{build_source, SpotSource};
use crate::store::StateStore;
use crate::types::{EstimatorKind, DEFAULT_UNIT};

pub struct FeedBuilder {
    symbol: String,
    unit: String,
    name: String,
    description: String,
    heartbeat_secs: u64,
    deviation_threshold: f64,
    sources: Vec<Arc<dyn SpotSource>>,
    estimator: Option<(EstimatorKind, Arc<dyn StateStore>)>,
    publish_handler: Option<PublishHandler>,
}

impl FeedBuilder {
    /// Start a feed for `symbol` (also its storage id), e.g. `("BTC", "Bitcoin")`
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            unit: DEFAULT_UNIT.to_string(),
            name: name.into(),
            description: String::new(),
            heartbeat_secs: 10,
            deviation_threshold: 0.5,
            sources: Vec::new(),
            estimator: None,
            publish_handler: None,
        }
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn heartbeat(mut self, heartbeat_secs: u64) -> Self {
        self.heartbeat_secs = heartbeat_secs;
        self
    }

    pub fn deviation_threshold(mut self, threshold: f64) -> Self {
        self.deviation_threshold = threshold;
        self
    }

    /// Persist estimates of `kind` in `store`
    pub fn estimator(mut self, kind: EstimatorKind, store: Arc<dyn StateStore>) -> Self {
        self.estimator = Some((kind, store));
        self
    }

    /// Answer publish requests with `handler` applied to the current estimate
    pub fn publish_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(FeedData) -> String + Send + Sync + 'static,
    {
        self.publish_handler = Some(Box::new(handler));
        self
    }

    pub fn source(mut self, source: Arc<dyn SpotSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn build(self) -> Feed {
        let estimator = match self.estimator {
            Some((kind, store)) => FeedEstimator::Configured(Aggregation::new(
                self.symbol.clone(),
                kind,
                self.unit.clone(),
                store,
            )),
            None => FeedEstimator::None,
        };

        Feed {
            symbol: self.symbol,
            unit: self.unit,
            name: self.name,
            description: self.description,
            heartbeat_secs: self.heartbeat_secs,
            deviation_threshold: self.deviation_threshold,
            sources: self.sources,
            estimator,
            publish_handler: self.publish_handler,
        }
    }

    /// Build the configured feed, connecting its sources to `store`
    pub fn from_config(config: &AppConfig, store: Arc<dyn StateStore>) -> Result<Feed> {
        Ok(Self::configured(config, store)?.build())
    }

    /// Builder preloaded from `config`, for callers that still attach a
    /// publish handler
    pub fn configured(config: &AppConfig, store: Arc<dyn StateStore>) -> Result<Self> {
        let feed = &config.feed;
        let mut builder = FeedBuilder::new(&feed.symbol, &feed.name)
            .unit(&feed.unit)
            .description(&feed.description)
            .heartbeat(feed.heartbeat_secs)
            .deviation_threshold(feed.deviation_threshold);

        if let Some(kind) = config.estimator() {
            builder = builder.estimator(kind, store);
        }

        for (index, source) in feed.sources.iter().enumerate() {
            let source = build_source(source, config.source_timeout())
                .with_context(|| format!("Invalid feed.sources[{}]", index))?;
            builder = builder.source(source);
        }

        Ok(builder)
    }
}
