//! PriceFeed Library
//!
//! Multi-source spot price feeds with persisted median and TWAP estimators

pub mod aggregation;
pub mod config;
pub mod error;
pub mod feed;
pub mod oracle;
pub mod store;
pub mod types;

#[cfg(feature = "server")]
pub mod server;

pub use error::{FeedError, FeedResult, StoreError};
pub use feed::{Feed, FeedBuilder, FeedData, FeedEstimator, FeedReport, PublishHandler};
