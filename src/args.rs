use clap::Parser;
use std::path::PathBuf;

/// Prometheus exporter for network speedtests
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Optional path to the config file.
    #[arg(long, env = "SPEEDTEST_EXPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Used together with `--config`, expands environment variables in the config file.
    #[arg(long, action)]
    pub env: bool,
}
