//! Core types used throughout PriceFeed
//!
//! Defines observations, spot readings, estimator kinds and source descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency unit assumed when a feed or persisted record does not name one
pub const DEFAULT_UNIT: &str = "USD";

/// Current wall-clock time in whole seconds
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// A single timestamped price reading kept in an aggregation window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub ts: i64,
    pub unit: String,
    pub value: f64,
}

impl Observation {
    pub fn new(ts: i64, unit: impl Into<String>, value: f64) -> Self {
        Self {
            ts,
            unit: unit.into(),
            value,
        }
    }
}

/// Latest reading returned by a price source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotPrice {
    pub ts: i64,
    pub unit: String,
    /// Price expressed in the feed's quote currency
    pub price_last: f64,
    /// Raw price in the source's own unit (equals `price_last` for CEX tickers)
    pub price_unit: f64,
}

impl SpotPrice {
    /// Empty reading, what a source reports when it has nothing
    pub fn empty(unit: impl Into<String>) -> Self {
        Self {
            ts: 0,
            unit: unit.into(),
            price_last: 0.0,
            price_unit: 0.0,
        }
    }
}

impl Default for SpotPrice {
    fn default() -> Self {
        Self::empty(DEFAULT_UNIT)
    }
}

impl fmt::Display for SpotPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @ {}", self.price_last, self.unit, self.ts)
    }
}

/// Estimator strategies a feed can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    Median,
    Twap,
}

impl EstimatorKind {
    /// Label used in storage keys and feed reports
    pub fn label(&self) -> &'static str {
        match self {
            EstimatorKind::Median => "median",
            EstimatorKind::Twap => "twap",
        }
    }
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Human-facing identity of a price source, listed in feed reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
}

impl SourceDescriptor {
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            source: source.into(),
        }
    }
}
