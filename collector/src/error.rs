#[derive(thiserror::Error, Debug)]
pub enum CollectorError {
    #[error("no speedtest provided, can not collect metrics")]
    NoSpeedtest,
    #[error("could not find speedtest executable {executable:?}: {source}")]
    SpeedtestNotFound {
        executable: String,
        #[source]
        source: which::Error,
    },
    #[error("invalid metric description: {0}")]
    InvalidMetric(#[from] prometheus::Error),
}
