use crate::{
    speedtest::Speedtest,
    CollectorError,
    MeasurementResult,
    ResultCache,
};
use prometheus::{
    core::{
        Collector,
        Desc,
    },
    proto::MetricFamily,
    Gauge,
    GaugeVec,
    Opts,
};
use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
    },
};

/// Labels attached to every measurement sample.
pub const LABELS: [&str; 3] = ["ip", "isp", "instance"];

struct GaugeSpec {
    name: &'static str,
    help: &'static str,
    value: fn(&MeasurementResult) -> f64,
}

const MEASUREMENTS: [GaugeSpec; 5] = [
    GaugeSpec {
        name: "speedtest_jitter_latency_milliseconds",
        help: "Speedtest current Jitter in ms",
        value: MeasurementResult::jitter_latency,
    },
    GaugeSpec {
        name: "speedtest_ping_latency_milliseconds",
        help: "Speedtest current Ping in ms",
        value: MeasurementResult::ping,
    },
    GaugeSpec {
        name: "speedtest_download_megabits_per_second",
        help: "Speedtest current Download Speed in Mbit/s",
        value: MeasurementResult::download_speed,
    },
    GaugeSpec {
        name: "speedtest_upload_megabits_per_second",
        help: "Speedtest current Upload Speed in Mbit/s",
        value: MeasurementResult::upload_speed,
    },
    GaugeSpec {
        name: "speedtest_data_used_megabytes",
        help: "Data used for speedtest in MB",
        value: MeasurementResult::data_used,
    },
];

const UP_NAME: &str = "speedtest_up";
const UP_HELP: &str = "Indicates if the speedtest was successful";

/// Serializes speedtest runs. Two tests running at the same time on the same
/// link would skew each other's results.
///
/// Clones share the same lock, so a process should create one and hand it to
/// every collector.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLock(Arc<Mutex<()>>);

impl ExecutionLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn acquire(&self) -> MutexGuard<'_, ()> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Prometheus collector that serves the cached speedtest result and runs a new
/// test once the cache has expired.
pub struct SpeedtestCollector {
    cache: Option<Arc<ResultCache>>,
    speedtest: Arc<dyn Speedtest>,
    instance: String,
    execution_lock: ExecutionLock,
    descs: Vec<Desc>,
}

impl SpeedtestCollector {
    /// Create a new collector, fails if no speedtest is provided.
    ///
    /// Without a cache every collection runs a new speedtest.
    pub fn new(
        cache: Option<Arc<ResultCache>>,
        speedtest: Option<Arc<dyn Speedtest>>,
        instance: impl Into<String>,
    ) -> Result<Self, CollectorError> {
        let speedtest = speedtest.ok_or(CollectorError::NoSpeedtest)?;

        let variable_labels: Vec<String> = LABELS.iter().map(|l| l.to_string()).collect();
        let mut descs = MEASUREMENTS
            .iter()
            .map(|gauge| {
                Desc::new(
                    gauge.name.to_string(),
                    gauge.help.to_string(),
                    variable_labels.clone(),
                    HashMap::new(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        descs.push(Desc::new(
            UP_NAME.to_string(),
            UP_HELP.to_string(),
            Vec::new(),
            HashMap::new(),
        )?);

        Ok(Self {
            cache,
            speedtest,
            instance: instance.into(),
            execution_lock: ExecutionLock::new(),
            descs,
        })
    }

    /// Share the execution lock with other collectors of this process.
    pub fn with_execution_lock(mut self, execution_lock: ExecutionLock) -> Self {
        self.execution_lock = execution_lock;
        self
    }

    pub fn cache(&self) -> Option<&Arc<ResultCache>> {
        self.cache.as_ref()
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Latest speedtest result, either from the cache or from a new run.
    ///
    /// At most one speedtest runs at a time. Callers that arrive while a test is
    /// running wait for it and get the same result.
    pub fn result(&self) -> Arc<MeasurementResult> {
        if let (Some(result), true) = self.read_cache() {
            debug!("Cache has not expired, returning cached results");
            return result;
        }

        let _guard = self.execution_lock.acquire();
        // Another caller may have run a speedtest while this one waited.
        if let (Some(result), true) = self.read_cache() {
            debug!("Cache has been renewed, returning cached results");
            return result;
        }

        debug!("Cache expired, running new speedtest");
        let result = Arc::new(self.speedtest.run());
        self.save_cache(Arc::clone(&result));
        result
    }

    fn read_cache(&self) -> (Option<Arc<MeasurementResult>>, bool) {
        match &self.cache {
            Some(cache) => cache.read(),
            None => (None, false),
        }
    }

    fn save_cache(&self, result: Arc<MeasurementResult>) {
        if let Some(cache) = &self.cache {
            cache.save(result);
            if let Some(expires_at) = cache.expires_at() {
                debug!(%expires_at, "Next speedtest will not be executed before");
            }
        }
    }
}

impl fmt::Debug for SpeedtestCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeedtestCollector")
            .field("cache", &self.cache)
            .field("speedtest", &self.speedtest)
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

impl Collector for SpeedtestCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        debug!("Starting collection of speedtest metrics");
        let result = self.result();
        let mut families = Vec::with_capacity(MEASUREMENTS.len() + 1);

        // A failed test only reports `up`, zeros would look like real measurements.
        if result.is_success() {
            let label_values = [result.client_ip(), result.client_isp(), self.instance.as_str()];
            for gauge in &MEASUREMENTS {
                match labelled_gauge(gauge.name, gauge.help, &label_values, (gauge.value)(&result)) {
                    Ok(mut collected) => families.append(&mut collected),
                    Err(err) => error!(metric = gauge.name, %err, "Could not create metric"),
                }
            }
        }

        let up = if result.is_success() { 1.0 } else { 0.0 };
        match gauge(UP_NAME, UP_HELP, up) {
            Ok(mut collected) => families.append(&mut collected),
            Err(err) => error!(metric = UP_NAME, %err, "Could not create metric"),
        }

        debug!("Finished collection of speedtest metrics");
        families
    }
}

fn labelled_gauge(name: &str, help: &str, label_values: &[&str], value: f64) -> prometheus::Result<Vec<MetricFamily>> {
    let vec = GaugeVec::new(Opts::new(name, help), &LABELS)?;
    vec.get_metric_with_label_values(label_values)?.set(value);
    Ok(vec.collect())
}

fn gauge(name: &str, help: &str, value: f64) -> prometheus::Result<Vec<MetricFamily>> {
    let gauge = Gauge::with_opts(Opts::new(name, help))?;
    gauge.set(value);
    Ok(gauge.collect())
}
