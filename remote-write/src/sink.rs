use crate::{
    convert::write_request,
    RemoteWriteError,
};
use chrono::Utc;
use prometheus::proto::MetricFamily;
use prost::Message as _;
use reqwest::header::{
    CONTENT_ENCODING,
    CONTENT_TYPE,
    USER_AGENT,
};
use std::{
    future::Future,
    pin::Pin,
    time::Duration,
};
use url::Url;

const HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_JOB_NAME: &str = "speedtest-exporter";
const REMOTE_WRITE_VERSION_HEADER: &str = "X-Prometheus-Remote-Write-Version";
const REMOTE_WRITE_VERSION: &str = "0.1.0";

/// Destination for metric snapshots.
pub trait RemoteSink: Send + Sync {
    /// Push one snapshot, returns the number of samples written.
    fn push(
        &self,
        snapshot: Vec<MetricFamily>,
    ) -> Pin<Box<dyn Future<Output = Result<usize, RemoteWriteError>> + Send + '_>>;
}

/// Prometheus remote_write endpoint.
#[derive(Debug, Clone)]
pub struct RemoteWriteSink {
    endpoint: Url,
    instance: String,
    job: String,
    basic_auth: Option<(String, String)>,
    client: reqwest::Client,
}

impl RemoteWriteSink {
    /// Create a sink for the given endpoint.
    /// The instance label defaults to the hostname, the job label to [`DEFAULT_JOB_NAME`].
    pub fn new(endpoint: &str) -> Result<Self, RemoteWriteError> {
        if endpoint.is_empty() {
            return Err(RemoteWriteError::MissingEndpoint);
        }
        let endpoint = Url::parse(endpoint).map_err(|source| RemoteWriteError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        })?;
        let client = reqwest::Client::builder().timeout(HTTP_CLIENT_TIMEOUT).build()?;

        Ok(Self {
            endpoint,
            instance: default_instance(),
            job: DEFAULT_JOB_NAME.to_string(),
            basic_auth: None,
            client,
        })
    }

    /// Send basic auth credentials with every push. Both need to be non-empty.
    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Result<Self, RemoteWriteError> {
        if username.is_empty() || password.is_empty() {
            return Err(RemoteWriteError::MissingAuthCredentials);
        }
        self.basic_auth = Some((username.to_string(), password.to_string()));
        Ok(self)
    }

    pub fn with_instance(mut self, instance: &str) -> Result<Self, RemoteWriteError> {
        if instance.is_empty() {
            return Err(RemoteWriteError::MissingInstance);
        }
        self.instance = instance.to_string();
        Ok(self)
    }

    pub fn with_job(mut self, job: &str) -> Result<Self, RemoteWriteError> {
        if job.is_empty() {
            return Err(RemoteWriteError::MissingJob);
        }
        self.job = job.to_string();
        Ok(self)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    async fn write(&self, snapshot: Vec<MetricFamily>) -> Result<usize, RemoteWriteError> {
        let request = write_request(&snapshot, &self.instance, &self.job, Utc::now().timestamp_millis())?;
        let samples = request.timeseries.iter().map(|ts| ts.samples.len()).sum();
        let body = snap::raw::Encoder::new().compress_vec(&request.encode_to_vec())?;

        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_ENCODING, "snappy")
            .header(CONTENT_TYPE, "application/x-protobuf")
            .header(USER_AGENT, concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .header(REMOTE_WRITE_VERSION_HEADER, REMOTE_WRITE_VERSION)
            .body(body);
        if let Some((username, password)) = &self.basic_auth {
            builder = builder.basic_auth(username, Some(password));
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteWriteError::Status { status, body });
        }

        Ok(samples)
    }
}

impl RemoteSink for RemoteWriteSink {
    fn push(
        &self,
        snapshot: Vec<MetricFamily>,
    ) -> Pin<Box<dyn Future<Output = Result<usize, RemoteWriteError>> + Send + '_>> {
        Box::pin(self.write(snapshot))
    }
}

fn default_instance() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_requires_endpoint() {
        assert!(matches!(RemoteWriteSink::new(""), Err(RemoteWriteError::MissingEndpoint)));
        assert!(matches!(
            RemoteWriteSink::new("not a url"),
            Err(RemoteWriteError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn defaults() {
        let sink = RemoteWriteSink::new("https://example.org/api/v1/write").unwrap();

        assert_eq!(sink.endpoint().as_str(), "https://example.org/api/v1/write");
        assert_eq!(sink.job(), DEFAULT_JOB_NAME);
        assert!(!sink.instance().is_empty());
    }

    #[test]
    fn options_are_validated() {
        let sink = || RemoteWriteSink::new("https://example.org/").unwrap();

        assert!(matches!(
            sink().with_basic_auth("user", ""),
            Err(RemoteWriteError::MissingAuthCredentials)
        ));
        assert!(matches!(
            sink().with_basic_auth("", "secret"),
            Err(RemoteWriteError::MissingAuthCredentials)
        ));
        assert!(matches!(sink().with_instance(""), Err(RemoteWriteError::MissingInstance)));
        assert!(matches!(sink().with_job(""), Err(RemoteWriteError::MissingJob)));

        let sink = sink()
            .with_basic_auth("user", "secret")
            .and_then(|s| s.with_instance("test"))
            .and_then(|s| s.with_job("speedtest"))
            .unwrap();
        assert_eq!(sink.instance(), "test");
        assert_eq!(sink.job(), "speedtest");
    }
}
