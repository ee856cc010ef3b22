//! Time-weighted average price over an observation window
//!
//! Left-Riemann weighting: each price is weighted by the time until the
//! *next* sample, and the sum is normalized by the time from the oldest
//! sample to `ts_latest`. The newest sample therefore carries no weight of
//! its own until a later one arrives.

use std::collections::VecDeque;

use crate::types::Observation;

/// Raw time-weighted price, or `0.0` when it cannot be computed
/// (fewer than two samples, or no elapsed time).
///
/// Intervals are taken in `f64` so any stored `ts` pair is representable.
pub fn time_weighted_price(window: &VecDeque<Observation>, ts_latest: i64) -> f64 {
    let mut cumulative = 0.0;
    let mut ts_first: Option<i64> = None;

    for (prev, next) in window.iter().zip(window.iter().skip(1)) {
        cumulative += prev.value * (next.ts as f64 - prev.ts as f64);
        ts_first.get_or_insert(prev.ts);
    }

    let Some(ts_first) = ts_first else {
        return 0.0;
    };

    let elapsed = ts_latest as f64 - ts_first as f64;
    if elapsed == 0.0 {
        return 0.0;
    }

    let weighted = cumulative / elapsed;
    if weighted.is_finite() {
        weighted
    } else {
        0.0
    }
}

/// TWAP estimate, falling back to `snapshot` when the weighted price is
/// zero or undefined.
pub fn twap(window: &VecDeque<Observation>, ts_latest: i64, snapshot: f64) -> f64 {
    let weighted = time_weighted_price(window, ts_latest);
    if weighted == 0.0 || weighted.is_nan() {
        snapshot
    } else {
        weighted
    }
}
