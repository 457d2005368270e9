#[macro_use]
extern crate tracing;

pub mod duration;
mod env;
mod error;
mod log_level;

pub use env::expand_env;
pub use error::ConfigError;
pub use log_level::{
    LogLevel,
    UnknownLogLevel,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_CACHE_PATH: &str = "/cache/speedtest-result.json";
/// Pushing more often than this would mostly resend the same cached result.
pub const MINIMUM_PUSH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub log_level: LogLevel,
    pub port: u16,
    /// How long a measurement is served from the cache. Also the remote_write push interval.
    #[serde(with = "duration")]
    pub cache: Duration,
    /// Executable name or path of the Ookla speedtest CLI.
    #[serde(rename = "speedtestCLI", skip_serializing_if = "Option::is_none")]
    pub speedtest_cli: Option<String>,
    pub persist_cache: bool,
    pub cache_path: PathBuf,
    pub instance: String,
    pub remote: RemoteConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoteConfig {
    pub enable: bool,
    pub url: String,
    pub instance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    pub username: String,
    pub password: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            port: DEFAULT_PORT,
            cache: DEFAULT_CACHE_TIME,
            speedtest_cli: None,
            persist_cache: false,
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            instance: default_instance(),
            remote: RemoteConfig::default(),
        }
    }
}

impl Config {
    /// Load the config from `path`, or the defaults when no path is given.
    ///
    /// With `expand_env`, environment variables in the file are expanded before parsing.
    pub fn load(path: Option<&Path>, expand_env: bool) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Self::parse("");
        };

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = if expand_env {
            Self::parse(&env::expand_env(&content))?
        } else {
            Self::parse(&content)?
        };
        debug!(?path, "Loaded config");
        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str::<Self>(content)?
        };

        if config.instance.is_empty() {
            config.instance = default_instance();
        }
        if config.remote.instance.is_empty() {
            config.remote.instance = config.instance.clone();
        }
        if config.speedtest_cli.as_deref() == Some("") {
            config.speedtest_cli = None;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.remote.enable {
            return Ok(());
        }

        if self.remote.url.is_empty() {
            return Err(ConfigError::MissingRemoteEndpoint);
        }
        if self.remote.username.is_empty() != self.remote.password.is_empty() {
            return Err(ConfigError::MissingAuthCredentials);
        }
        if self.cache < MINIMUM_PUSH_INTERVAL {
            return Err(ConfigError::InvalidInterval(self.cache));
        }
        Ok(())
    }
}

impl RemoteConfig {
    pub fn has_basic_auth(&self) -> bool {
        !self.username.is_empty()
    }
}

fn default_instance() -> String {
    match hostname::get().map(|name| name.into_string()) {
        Ok(Ok(name)) if !name.is_empty() => name,
        Ok(_) => {
            warn!("Hostname is empty or not valid UTF-8, using localhost as instance");
            "localhost".to_string()
        }
        Err(err) => {
            warn!("Failed to retrieve hostname, using localhost as instance: {err}");
            "localhost".to_string()
        }
    }
}
