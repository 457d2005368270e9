use crate::{
    RemoteSink,
    RemoteWriteError,
};
use prometheus::proto::MetricFamily;
use std::{
    sync::{
        atomic::{
            AtomicBool,
            Ordering,
        },
        Arc,
        Mutex,
        PoisonError,
    },
    time::Duration,
};
use tokio::{
    runtime::Handle,
    time::MissedTickBehavior,
};
use tokio_util::sync::{
    CancellationToken,
    DropGuard,
};

/// Anything that can produce a snapshot of its metrics.
pub trait MetricsSource: Send + Sync {
    /// May block while a collector refreshes its values.
    fn gather(&self) -> Vec<MetricFamily>;
}

impl MetricsSource for prometheus::Registry {
    fn gather(&self) -> Vec<MetricFamily> {
        prometheus::Registry::gather(self)
    }
}

/// Periodically pushes the metrics of a [`MetricsSource`] into a [`RemoteSink`].
///
/// Dropping the client stops the background loop.
pub struct WriteClient {
    source: Arc<dyn MetricsSource>,
    sink: Arc<dyn RemoteSink>,
    running: Arc<AtomicBool>,
    task_guard: Mutex<Option<DropGuard>>,
}

impl WriteClient {
    pub fn new(source: Arc<dyn MetricsSource>, sink: Arc<dyn RemoteSink>) -> Self {
        Self {
            source,
            sink,
            running: Arc::new(AtomicBool::new(false)),
            task_guard: Mutex::new(None),
        }
    }

    /// Start pushing in the background, once right away and then every `interval`.
    /// Returns immediately. Fails if the loop is already running.
    pub fn run(&self, interval: Duration) -> Result<(), RemoteWriteError> {
        if interval.is_zero() {
            return Err(RemoteWriteError::InvalidInterval);
        }
        let handle = Handle::try_current().map_err(|_| RemoteWriteError::NoRuntime)?;

        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RemoteWriteError::AlreadyRunning);
        }

        let token = CancellationToken::new();
        *self.task_guard.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone().drop_guard());

        let running = RunningGuard(self.running.clone());
        let source = self.source.clone();
        let sink = self.sink.clone();

        handle.spawn(async move {
            let _running = running;
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            info!(?interval, "Started pushing metrics to remote endpoint");
            loop {
                push(&source, sink.as_ref()).await;

                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
            }
            info!("Stopped pushing metrics to remote endpoint");
        });

        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Cancel the background loop.
    ///
    /// Does not wait for a push that is already in flight, the loop exits at the next tick boundary.
    pub fn stop(&self) {
        if let Some(guard) = self.task_guard.lock().unwrap_or_else(PoisonError::into_inner).take() {
            debug!("Stopping remote write client");
            drop(guard);
        }
    }
}

impl std::fmt::Debug for WriteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteClient")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

async fn push(source: &Arc<dyn MetricsSource>, sink: &dyn RemoteSink) {
    let snapshot = {
        let source = source.clone();
        match tokio::task::spawn_blocking(move || source.gather()).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!("Failed to gather metrics: {err}");
                return;
            }
        }
    };

    match sink.push(snapshot).await {
        Ok(samples) => debug!(samples, "Pushed metrics to remote endpoint"),
        Err(err) => error!("Failed to push metrics to remote endpoint: {err}"),
    }
}

struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
