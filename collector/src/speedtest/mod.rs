//! # Speedtest Providers
//!
//! Everything that can produce a [`MeasurementResult`]:
//!
//! - **`SpeedtestCli`**: runs the Ookla `speedtest` binary and parses its JSON report
//! - **`MockSpeedtest`**: deterministic provider for tests and demos
//!
//! Providers never fail. Problems while running a test are logged and
//! reported as a failed [`MeasurementResult`].

mod cli;
mod mock;
mod output;

use crate::{
    CollectorError,
    Measurement,
    MeasurementResult,
};
use chrono::{
    DateTime,
    Utc,
};
pub use cli::SpeedtestCli;
pub use mock::MockSpeedtest;
use std::{
    fmt::Debug,
    sync::Arc,
    time::Duration,
};

/// Executable used when no path to the speedtest binary is configured.
pub const DEFAULT_EXECUTABLE: &str = "speedtest";

/// Something that can run a speedtest.
///
/// `run` blocks for the whole duration of the test, which is commonly 20-30s.
pub trait Speedtest: Debug + Send + Sync {
    fn run(&self) -> MeasurementResult;
}

/// Create the provider for the given executable name or path,
/// falling back to [`DEFAULT_EXECUTABLE`].
pub fn create_speedtest(executable: Option<&str>) -> Result<Arc<dyn Speedtest>, CollectorError> {
    let executable = executable.filter(|e| !e.is_empty()).unwrap_or(DEFAULT_EXECUTABLE);
    debug!(executable, "Using external speedtest-cli binary");
    Ok(Arc::new(SpeedtestCli::new(executable)?))
}

/// Convert bytes to megabits
pub(crate) fn bytes_to_mbits(bytes: i64) -> f64 {
    bytes_to_mb(bytes) * 8.0
}

/// Convert bytes to megabytes
pub(crate) fn bytes_to_mb(bytes: i64) -> f64 {
    bytes as f64 / 1_000_000.0
}

fn log_success(result: &MeasurementResult, elapsed: Duration) {
    info!(
        jitter_ms = result.jitter_latency(),
        ping_ms = result.ping(),
        download_mbps = result.download_speed(),
        upload_mbps = result.upload_speed(),
        data_used_mb = result.data_used(),
        server = result.server_host(),
        isp = result.client_isp(),
        elapsed = ?elapsed,
        "Successfully ran speedtest"
    );
}

/// Successful result with fixed values, useful for tests and demos.
pub fn mock_result(timestamp: DateTime<Utc>) -> MeasurementResult {
    MeasurementResult::success(
        Measurement {
            jitter_latency: 0.5,
            ping: 15.0,
            download_speed: 876.53,
            upload_speed: 12.34,
            data_used: 950.3079,
            server_id: "1234".to_string(),
            server_host: "example.org".to_string(),
            client_isp: "Foo Corp.".to_string(),
            client_ip: "127.0.0.1".to_string(),
        },
        Duration::from_millis(251_234),
    )
    .with_timestamp(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_units() {
        assert_eq!(bytes_to_mb(1_500_000), 1.5);
        assert_eq!(bytes_to_mbits(12_500_000), 100.0);
        assert_eq!(bytes_to_mbits(0), 0.0);
    }

    #[test]
    fn create_speedtest_fails_for_unknown_binary() {
        let err = create_speedtest(Some("speedtest-binary-that-does-not-exist")).unwrap_err();
        assert!(matches!(err, CollectorError::SpeedtestNotFound { .. }));
    }
}
