//! Aggregation engine - folds spot snapshots into a persisted window
//!
//! One invocation reads the state record, appends the current snapshot,
//! recomputes the estimate with the configured strategy and writes the record
//! back. There is no locking or versioning around that read-modify-write:
//! overlapping invocations for the same key can drop an observation, so
//! callers run them one at a time per key.

mod median;
mod state;
mod twap;

pub use median::median;
pub use state::{decode_last_price, AggregationState, WINDOW_CAPACITY};
pub use twap::{time_weighted_price, twap};

use std::sync::Arc;

use crate::error::{FeedError, FeedResult};
use crate::oracle::{snapshot_price, SpotSource};
use crate::store::StateStore;
use crate::types::{now_secs, EstimatorKind};

/// Storage key for a feed's state under a given estimator
pub fn storage_key(feed_id: &str, kind: EstimatorKind) -> String {
    format!("{}_{}_data", feed_id, kind.label()).to_lowercase()
}

/// Recompute the estimate for a freshly extended window
fn estimate(kind: EstimatorKind, state: &AggregationState, ts_latest: i64, snapshot: f64) -> f64 {
    match kind {
        EstimatorKind::Median => median(&state.values()).unwrap_or(snapshot),
        EstimatorKind::Twap => twap(&state.window, ts_latest, snapshot),
    }
}

/// Estimator bound to one feed and its state store
#[derive(Clone)]
pub struct Aggregation {
    feed_id: String,
    kind: EstimatorKind,
    unit: String,
    store: Arc<dyn StateStore>,
}

impl Aggregation {
    pub fn new(
        feed_id: impl Into<String>,
        kind: EstimatorKind,
        unit: impl Into<String>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            feed_id: feed_id.into(),
            kind,
            unit: unit.into(),
            store,
        }
    }

    pub fn kind(&self) -> EstimatorKind {
        self.kind
    }

    pub fn feed_id(&self) -> &str {
        &self.feed_id
    }

    pub fn storage_key(&self) -> String {
        storage_key(&self.feed_id, self.kind)
    }

    /// Load the persisted state; absent data is the zero-value state
    pub async fn fetch_data(&self) -> FeedResult<AggregationState> {
        let key = self.storage_key();
        let blob = self.store.get(&key).await?;
        AggregationState::decode(&blob, &self.unit).map_err(|e| FeedError::corrupt(key, e))
    }

    /// Persist `state`. Store write failures are logged, not returned.
    pub async fn save_data(&self, state: &AggregationState) -> FeedResult<()> {
        let key = self.storage_key();
        let blob = state.encode().map_err(FeedError::Encode)?;

        if let Err(e) = self.store.set(&key, &blob).await {
            tracing::warn!(feed = %self.feed_id, key = %key, error = %e, "State write failed");
        }
        Ok(())
    }

    /// Published price only, without decoding the whole record.
    ///
    /// `0.0` when nothing is stored or the stored price is not positive.
    pub async fn fetch_last_price(&self) -> FeedResult<f64> {
        let key = self.storage_key();
        let blob = self.store.get(&key).await?;
        decode_last_price(&blob).map_err(|e| FeedError::corrupt(key, e))
    }

    /// Append `snapshot` at `ts` and recompute the estimate in place
    pub fn fold(&self, state: &mut AggregationState, ts: i64, snapshot: f64) {
        state.insert(ts, &self.unit, snapshot);
        state.estimate = estimate(self.kind, state, ts, snapshot);
        state.ts = ts;
    }

    /// Run one aggregation pass at the current time
    pub async fn aggregate(&self, sources: &[Arc<dyn SpotSource>]) -> FeedResult<AggregationState> {
        self.aggregate_at(sources, now_secs()).await
    }

    /// Run one aggregation pass stamped with `ts`.
    ///
    /// With no sources the stored state is returned untouched and nothing is
    /// written.
    pub async fn aggregate_at(
        &self,
        sources: &[Arc<dyn SpotSource>],
        ts: i64,
    ) -> FeedResult<AggregationState> {
        let mut state = self.fetch_data().await?;

        if sources.is_empty() {
            tracing::debug!(feed = %self.feed_id, estimator = %self.kind, "No sources, skipping aggregation");
            return Ok(state);
        }

        let snapshot = snapshot_price(sources).await;
        self.fold(&mut state, ts, snapshot);
        self.save_data(&state).await?;

        tracing::info!(
            feed = %self.feed_id,
            estimator = %self.kind,
            snapshot = snapshot,
            estimate = state.estimate,
            window = state.window.len(),
            "Aggregated"
        );

        Ok(state)
    }
}

impl std::fmt::Debug for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregation")
            .field("feed_id", &self.feed_id)
            .field("kind", &self.kind)
            .field("unit", &self.unit)
            .finish()
    }
}
