//! Aggregation state - the persisted per-feed window and last estimate
//!
//! Wire format is a flat JSON object:
//! `{"ts": 1700000000, "unit": "USD", "price": 101.5, "prices": [{"ts", "unit", "value"}, ...]}`.
//! Older writers used `priceMean` instead of `price`; both are read, `price` is written.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::types::Observation;

/// Number of observations retained per window
pub const WINDOW_CAPACITY: usize = 10;

/// Rolling state for one `(feed, estimator)` pair
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationState {
    /// Timestamp of the latest insertion (seconds)
    pub ts: i64,
    pub unit: String,
    /// Last published aggregate price
    pub estimate: f64,
    /// Oldest-first, at most `WINDOW_CAPACITY` entries
    pub window: VecDeque<Observation>,
    /// Caller-owned flag carried for schema compatibility; the engine never reads it
    pub is_valid: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateRecord {
    #[serde(default)]
    ts: Option<i64>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(rename = "priceMean", default, skip_serializing_if = "Option::is_none")]
    price_mean: Option<f64>,
    #[serde(default)]
    prices: Vec<ObservationRecord>,
    #[serde(rename = "isValid", default, skip_serializing_if = "is_false")]
    is_valid: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ObservationRecord {
    #[serde(default)]
    ts: Option<i64>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PriceOnly {
    #[serde(default)]
    price: Option<f64>,
    #[serde(rename = "priceMean", default)]
    price_mean: Option<f64>,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl AggregationState {
    /// Zero-value state: nothing observed yet
    pub fn empty(unit: impl Into<String>) -> Self {
        Self {
            ts: 0,
            unit: unit.into(),
            estimate: 0.0,
            window: VecDeque::with_capacity(WINDOW_CAPACITY + 1),
            is_valid: false,
        }
    }

    /// Append an observation, stamp the state with it and evict the oldest
    /// entries beyond `WINDOW_CAPACITY`.
    pub fn insert(&mut self, ts: i64, unit: &str, value: f64) {
        self.window.push_back(Observation::new(ts, unit, value));
        self.ts = ts;
        self.unit = unit.to_string();

        while self.window.len() > WINDOW_CAPACITY {
            self.window.pop_front();
        }
    }

    /// Window values in insertion order
    pub fn values(&self) -> Vec<f64> {
        self.window.iter().map(|o| o.value).collect()
    }

    /// Decode a stored blob. An empty blob is the zero-value state; fields
    /// missing from a well-formed record fall back to `0` / `default_unit`.
    pub fn decode(blob: &str, default_unit: &str) -> Result<Self, serde_json::Error> {
        if blob.trim().is_empty() {
            return Ok(Self::empty(default_unit));
        }

        let record: StateRecord = serde_json::from_str(blob)?;

        let mut window: VecDeque<Observation> = record
            .prices
            .into_iter()
            .map(|o| Observation {
                ts: o.ts.unwrap_or(0),
                unit: o.unit.unwrap_or_else(|| default_unit.to_string()),
                value: o.value.unwrap_or(0.0),
            })
            .collect();

        // Foreign writers may have kept more than we do
        while window.len() > WINDOW_CAPACITY {
            window.pop_front();
        }

        Ok(Self {
            ts: record.ts.unwrap_or(0),
            unit: record.unit.unwrap_or_else(|| default_unit.to_string()),
            estimate: record.price.or(record.price_mean).unwrap_or(0.0),
            window,
            is_valid: record.is_valid,
        })
    }

    /// Encode into the canonical `price` schema
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let record = StateRecord {
            ts: Some(self.ts),
            unit: Some(self.unit.clone()),
            price: Some(self.estimate),
            price_mean: None,
            prices: self
                .window
                .iter()
                .map(|o| ObservationRecord {
                    ts: Some(o.ts),
                    unit: Some(o.unit.clone()),
                    value: Some(o.value),
                })
                .collect(),
            is_valid: self.is_valid,
        };
        serde_json::to_string(&record)
    }
}

/// Read only the published price from a stored blob.
///
/// Returns `0.0` when the blob is empty, the field is missing, or the stored
/// price is not positive.
pub fn decode_last_price(blob: &str) -> Result<f64, serde_json::Error> {
    if blob.trim().is_empty() {
        return Ok(0.0);
    }

    let record: PriceOnly = serde_json::from_str(blob)?;
    Ok(record
        .price
        .or(record.price_mean)
        .filter(|p| *p > 0.0)
        .unwrap_or(0.0))
}
