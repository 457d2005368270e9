use clap::Parser;
use color_eyre::Result;
use eyre::Context as _;
use speedtest_exporter::{
    init_logging,
    Args,
    Exporter,
};
use speedtest_exporter_config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let config = Config::load(args.config.as_deref(), args.env)
        .wrap_err_with(|| format!("Could not load configuration from {:?}", args.config))?;
    init_logging(config.log_level)?;

    Exporter::new(config)?.run().await
}
