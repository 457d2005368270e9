use serde::Deserialize;

/// JSON report printed by `speedtest --format=json-pretty`.
/// Only the parts the exporter publishes are decoded, the measurements
/// themselves are mandatory.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct Report {
    pub ping: Ping,
    pub download: Bandwidth,
    pub upload: Bandwidth,
    #[serde(default)]
    pub isp: String,
    #[serde(default)]
    pub interface: Interface,
    #[serde(default)]
    pub server: Server,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct Ping {
    pub jitter: f64,
    pub latency: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct Bandwidth {
    /// Bytes per second
    pub bandwidth: i64,
    pub bytes: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(super) struct Interface {
    pub external_ip: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct Server {
    pub id: i64,
    pub host: String,
}
