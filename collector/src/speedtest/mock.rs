use super::Speedtest;
use crate::MeasurementResult;
use std::{
    fmt,
    sync::{
        atomic::{
            AtomicUsize,
            Ordering,
        },
        Arc,
    },
    time::Duration,
};

/// Provider with a canned answer.
#[derive(Default)]
pub struct MockSpeedtest {
    /// Called on every run before the result is produced.
    pub callback: Option<Box<dyn Fn() + Send + Sync>>,
    /// Return a failed result instead of [`MockSpeedtest::result`].
    pub fail: bool,
    /// Simulated duration of a run.
    pub delay: Duration,
    pub result: Option<MeasurementResult>,
    runs: Arc<AtomicUsize>,
}

impl MockSpeedtest {
    pub fn new(result: MeasurementResult) -> Self {
        Self {
            result: Some(result),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_callback(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Number of runs so far.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for MockSpeedtest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockSpeedtest")
            .field("fail", &self.fail)
            .field("delay", &self.delay)
            .field("result", &self.result)
            .field("runs", &self.runs())
            .finish_non_exhaustive()
    }
}

impl Speedtest for MockSpeedtest {
    fn run(&self) -> MeasurementResult {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(callback) = &self.callback {
            callback();
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        match (&self.result, self.fail) {
            (Some(result), false) => result.clone(),
            _ => MeasurementResult::failed(),
        }
    }
}
