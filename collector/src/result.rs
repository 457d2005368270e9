use chrono::{
    DateTime,
    SubsecRound as _,
    TimeDelta,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::time::Duration;

/// Outcome of a single speedtest run.
///
/// A failed result only carries the time the failure was recorded, every other
/// field stays at its zero value. Successful results always carry the wall-clock
/// duration of the measurement, which the cache uses to size its grace period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    #[serde(rename = "jitter_latency_ms")]
    jitter_latency: f64,
    #[serde(rename = "ping_ms")]
    ping: f64,
    #[serde(rename = "download_mbps")]
    download_speed: f64,
    #[serde(rename = "upload_mbps")]
    upload_speed: f64,
    #[serde(rename = "data_used_mb")]
    data_used: f64,
    server_id: String,
    server_host: String,
    client_isp: String,
    client_ip: String,
    success: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
    #[serde(deserialize_with = "bounded_duration_ms")]
    duration_ms: i64,
}

/// Upper bound for a recorded duration, leaves room for the grace arithmetic.
pub const MAX_DURATION_MS: i64 = i64::MAX / 2;

/// Numbers and identity reported by a successful speedtest, without the
/// bookkeeping fields that [`MeasurementResult`] adds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurement {
    pub jitter_latency: f64,
    pub ping: f64,
    pub download_speed: f64,
    pub upload_speed: f64,
    pub data_used: f64,
    pub server_id: String,
    pub server_host: String,
    pub client_isp: String,
    pub client_ip: String,
}

impl MeasurementResult {
    /// Result for a speedtest that finished, stamped with the current time.
    pub fn success(measurement: Measurement, duration: Duration) -> Self {
        let Measurement {
            jitter_latency,
            ping,
            download_speed,
            upload_speed,
            data_used,
            server_id,
            server_host,
            client_isp,
            client_ip,
        } = measurement;

        Self {
            jitter_latency,
            ping,
            download_speed,
            upload_speed,
            data_used,
            server_id,
            server_host,
            client_isp,
            client_ip,
            success: true,
            timestamp: now(),
            duration_ms: i64::try_from(duration.as_millis())
                .unwrap_or(MAX_DURATION_MS)
                .min(MAX_DURATION_MS),
        }
    }

    /// Result for a speedtest that could not be completed.
    pub fn failed() -> Self {
        Self {
            jitter_latency: 0.0,
            ping: 0.0,
            download_speed: 0.0,
            upload_speed: 0.0,
            data_used: 0.0,
            server_id: String::new(),
            server_host: String::new(),
            client_isp: String::new(),
            client_ip: String::new(),
            success: false,
            timestamp: now(),
            duration_ms: 0,
        }
    }

    /// Moves the timestamp, used to replay old results.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp.trunc_subsecs(3);
        self
    }

    /// Jitter of the ping in ms
    pub fn jitter_latency(&self) -> f64 {
        self.jitter_latency
    }

    /// Ping in ms
    pub fn ping(&self) -> f64 {
        self.ping
    }

    /// Download speed in Mbit/s
    pub fn download_speed(&self) -> f64 {
        self.download_speed
    }

    /// Upload speed in Mbit/s
    pub fn upload_speed(&self) -> f64 {
        self.upload_speed
    }

    /// Data used by the speedtest in MB
    pub fn data_used(&self) -> f64 {
        self.data_used
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn server_host(&self) -> &str {
        &self.server_host
    }

    pub fn client_isp(&self) -> &str {
        &self.client_isp
    }

    pub fn client_ip(&self) -> &str {
        &self.client_ip
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    pub fn duration(&self) -> TimeDelta {
        TimeDelta::try_milliseconds(self.duration_ms).unwrap_or(TimeDelta::MAX)
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_json(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }
}

fn bounded_duration_ms<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let duration_ms = i64::deserialize(deserializer)?;
    if !(0..=MAX_DURATION_MS).contains(&duration_ms) {
        return Err(serde::de::Error::custom(format!(
            "duration_ms {duration_ms} is out of range 0..={MAX_DURATION_MS}"
        )));
    }
    Ok(duration_ms)
}

// The persisted record only keeps millisecond precision.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> MeasurementResult {
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
    }

    #[test]
    fn failed_result_only_carries_timestamp() {
        let before = Utc::now().trunc_subsecs(3);
        let result = MeasurementResult::failed();

        assert!(!result.is_success());
        assert!(result.timestamp() >= before);
        assert_eq!(result.duration_ms(), 0);
        assert_eq!(result.download_speed(), 0.0);
        assert_eq!(result.client_ip(), "");
        assert_eq!(result.server_id(), "");
    }

    #[test]
    fn success_records_duration() {
        let result = sample();

        assert!(result.is_success());
        assert_eq!(result.duration_ms(), 251_234);
        assert_eq!(result.duration(), TimeDelta::milliseconds(251_234));
    }

    #[test]
    fn json_uses_stable_keys() {
        let timestamp = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let result = sample().with_timestamp(timestamp);

        let value: serde_json::Value = serde_json::from_slice(&result.to_json().unwrap()).unwrap();

        assert_eq!(value["jitter_latency_ms"], 0.5);
        assert_eq!(value["ping_ms"], 15.0);
        assert_eq!(value["download_mbps"], 876.53);
        assert_eq!(value["upload_mbps"], 12.34);
        assert_eq!(value["data_used_mb"], 950.3079);
        assert_eq!(value["server_id"], "1234");
        assert_eq!(value["server_host"], "example.org");
        assert_eq!(value["client_isp"], "Foo Corp.");
        assert_eq!(value["client_ip"], "127.0.0.1");
        assert_eq!(value["success"], true);
        assert_eq!(value["timestamp"], 1_700_000_000_123i64);
        assert_eq!(value["duration_ms"], 251_234);

        assert_eq!(MeasurementResult::from_json(&result.to_json().unwrap()).unwrap(), result);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(MeasurementResult::from_json(b"Not json at all").is_err());
    }

    #[test]
    fn rejects_out_of_range_duration() {
        for duration_ms in [i64::MAX, i64::MIN, -1, MAX_DURATION_MS + 1] {
            let mut value: serde_json::Value = serde_json::from_slice(&sample().to_json().unwrap()).unwrap();
            value["duration_ms"] = duration_ms.into();
            let data = serde_json::to_vec(&value).unwrap();

            assert!(MeasurementResult::from_json(&data).is_err(), "{duration_ms}");
        }
    }

    #[test]
    fn with_timestamp_keeps_millisecond_precision() {
        let timestamp = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let result = sample().with_timestamp(timestamp);

        assert_eq!(result.timestamp(), DateTime::from_timestamp_millis(1_700_000_000_123).unwrap());
        assert_eq!(MeasurementResult::from_json(&result.to_json().unwrap()).unwrap(), result);
    }
}
