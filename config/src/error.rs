use std::{
    path::PathBuf,
    time::Duration,
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yml::Error),
    #[error("remote_write is enabled but no url is provided")]
    MissingRemoteEndpoint,
    #[error("need both username and password for remote_write, at least one of them is empty")]
    MissingAuthCredentials,
    #[error("interval is too short, needs to be at least 30s, current {}", humantime::format_duration(*.0))]
    InvalidInterval(Duration),
}
