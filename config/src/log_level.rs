use serde::{
    Deserialize,
    Serialize,
};
use strum::{
    Display,
    EnumIter,
    EnumString,
};

#[derive(
    Debug, Default, Clone, Copy, Display, EnumIter, EnumString, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
#[serde(try_from = "String", into = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level {0:?}, expected one of debug, info, warn or error")]
pub struct UnknownLogLevel(pub String);

impl LogLevel {
    pub fn as_level(self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = UnknownLogLevel;

    fn try_from(value: String) -> Result<Self, UnknownLogLevel> {
        value.parse().map_err(|_| UnknownLogLevel(value))
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator as _;

    #[test]
    fn parses_case_insensitive() {
        for (input, expected) in [
            ("debug", LogLevel::Debug),
            ("INFO", LogLevel::Info),
            ("Warn", LogLevel::Warn),
            ("eRRor", LogLevel::Error),
        ] {
            assert_eq!(LogLevel::try_from(input.to_string()), Ok(expected), "{input}");
        }
    }

    #[test]
    fn rejects_unknown_level() {
        assert_eq!(
            LogLevel::try_from("verbose".to_string()),
            Err(UnknownLogLevel("verbose".to_string()))
        );
        assert!(LogLevel::try_from("warning".to_string()).is_err());
    }

    #[test]
    fn displays_lowercase() {
        let names: Vec<String> = LogLevel::iter().map(String::from).collect();
        assert_eq!(names, ["debug", "info", "warn", "error"]);
    }
}
