use crate::server::create_router;
use color_eyre::Result;
use eyre::Context as _;
use prometheus::Registry;
use speedtest_exporter_collector::{
    speedtest::create_speedtest,
    ExecutionLock,
    ResultCache,
    Speedtest,
    SpeedtestCollector,
};
use speedtest_exporter_config::Config;
use speedtest_exporter_remote_write::{
    RemoteWriteSink,
    WriteClient,
};
use std::{
    future::Future,
    net::SocketAddr,
    sync::Arc,
};
use tokio::net::TcpListener;

/// The wired up exporter: one collector behind a registry, served over HTTP and
/// optionally pushed to a remote_write endpoint.
pub struct Exporter {
    config: Config,
    registry: Arc<Registry>,
    write_client: Option<WriteClient>,
}

impl Exporter {
    pub fn new(config: Config) -> Result<Self> {
        let speedtest = create_speedtest(config.speedtest_cli.as_deref()).wrap_err("Failed to initialize speedtest")?;
        Self::with_speedtest(config, speedtest)
    }

    pub fn with_speedtest(config: Config, speedtest: Arc<dyn Speedtest>) -> Result<Self> {
        Self::with_execution_lock(config, speedtest, ExecutionLock::new())
    }

    /// Speedtests of every exporter sharing `execution_lock` never overlap.
    pub fn with_execution_lock(
        config: Config,
        speedtest: Arc<dyn Speedtest>,
        execution_lock: ExecutionLock,
    ) -> Result<Self> {
        let cache = Arc::new(ResultCache::new(
            config.persist_cache,
            Some(config.cache_path.clone()),
            config.cache,
        ));
        let collector = SpeedtestCollector::new(Some(cache), Some(speedtest), config.instance.clone())
            .wrap_err("Failed to create collector")?
            .with_execution_lock(execution_lock);

        let registry = Registry::new();
        registry
            .register(Box::new(collector))
            .wrap_err("Failed to register collector")?;
        let registry = Arc::new(registry);

        let write_client = if config.remote.enable {
            let sink = remote_write_sink(&config).wrap_err("Failed to create remote_write client")?;
            Some(WriteClient::new(registry.clone(), Arc::new(sink)))
        } else {
            None
        };

        Ok(Self {
            config,
            registry,
            write_client,
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Listen on all interfaces until Ctrl-C or SIGTERM.
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = TcpListener::bind(addr)
            .await
            .wrap_err_with(|| format!("Failed to listen on {addr}"))?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves. The remote_write client runs for as long as the server does.
    pub async fn serve(self, listener: TcpListener, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        if let Some(client) = &self.write_client {
            info!(interval = ?self.config.cache, "Starting remote_write client");
            client.run(self.config.cache)?;
        }

        info!("Starting http server on {}", listener.local_addr()?);
        let result = axum::serve(listener, create_router(self.registry.clone()))
            .with_graceful_shutdown(shutdown)
            .await
            .wrap_err("Failed to run http server");

        if let Some(client) = &self.write_client {
            client.stop();
        }
        result
    }
}

fn remote_write_sink(config: &Config) -> Result<RemoteWriteSink> {
    let remote = &config.remote;
    let mut sink = RemoteWriteSink::new(&remote.url)?.with_instance(&remote.instance)?;
    if let Some(job) = remote.job_name.as_deref().filter(|job| !job.is_empty()) {
        sink = sink.with_job(job)?;
    }
    if remote.has_basic_auth() {
        sink = sink.with_basic_auth(&remote.username, &remote.password)?;
    }
    Ok(sink)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
