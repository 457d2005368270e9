//! # Speedtest Collector
//!
//! Core of the exporter: runs speedtests on demand, caches the latest result and
//! exposes it as Prometheus metrics.
//!
//! ## Architecture
//!
//! - **`ResultCache`**: single slot holding the latest [`MeasurementResult`], with an
//!   expiry that leaves room for the next run, optionally persisted to disk
//! - **`SpeedtestCollector`**: `prometheus` collector that answers from the cache and
//!   runs at most one speedtest at a time when the cache has expired
//! - **`speedtest`**: providers that actually measure the connection
//!
//! ## Flow
//!
//! A scrape asks the collector for a result. A valid cache entry is returned
//! right away. Otherwise the caller takes the execution lock, checks the cache
//! again, and only then runs a speedtest whose result is cached and returned to
//! everybody that waited for it.

#[macro_use]
extern crate tracing;

mod cache;
mod collector;
mod error;
mod result;
pub mod speedtest;

pub use cache::{
    ResultCache,
    ADDITIONAL_GRACE,
    MINIMUM_GRACE,
};
pub use collector::{
    ExecutionLock,
    SpeedtestCollector,
    LABELS,
};
pub use error::CollectorError;
pub use result::{
    Measurement,
    MeasurementResult,
    MAX_DURATION_MS,
};
pub use speedtest::Speedtest;
