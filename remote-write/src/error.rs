#[derive(thiserror::Error, Debug)]
pub enum RemoteWriteError {
    #[error("no endpoint for prometheus remote_write provided")]
    MissingEndpoint,
    #[error("invalid remote_write endpoint {endpoint:?}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    #[error("need both username and password, at least one of them is empty")]
    MissingAuthCredentials,
    #[error("no instance name provided")]
    MissingInstance,
    #[error("no job name provided")]
    MissingJob,
    #[error("only a single instance of the client can run at a time")]
    AlreadyRunning,
    #[error("push interval must be greater than zero")]
    InvalidInterval,
    #[error("the client needs to be started from within a tokio runtime")]
    NoRuntime,
    #[error("received metric {name:?} with unsupported type {kind:?}")]
    UnsupportedMetricType { name: String, kind: prometheus::proto::MetricType },
    #[error("failed to encode remote_write request: {0}")]
    Encode(#[from] snap::Error),
    #[error("failed to send metrics to remote endpoint: {0}")]
    Request(#[from] reqwest::Error),
    #[error("remote endpoint responded with {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },
}
