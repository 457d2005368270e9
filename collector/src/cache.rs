use crate::MeasurementResult;
use chrono::{
    DateTime,
    TimeDelta,
    Utc,
};
use std::{
    fs::OpenOptions,
    io::Read as _,
    path::{
        Path,
        PathBuf,
    },
    sync::{
        Arc,
        PoisonError,
        RwLock,
    },
    time::Duration,
};

/// Lower bound for the grace period subtracted from the cache time.
///
/// When the exporter is scraped at a fixed interval this makes sure a new
/// speedtest runs roughly every `cache_time` instead of one scrape later.
pub const MINIMUM_GRACE: TimeDelta = TimeDelta::seconds(30);

/// Added on top of the duration of the last speedtest.
pub const ADDITIONAL_GRACE: TimeDelta = TimeDelta::seconds(5);

/// Single slot cache for the latest [`MeasurementResult`], optionally
/// persisted to disk so a restart does not trigger an immediate speedtest.
#[derive(Debug)]
pub struct ResultCache {
    persist: bool,
    path: Option<PathBuf>,
    cache_time: Duration,
    entry: RwLock<Option<Arc<MeasurementResult>>>,
}

impl ResultCache {
    /// Create a new cache and try to seed it from disk when `persist` is set.
    ///
    /// Never fails: when the file cannot be opened persistence is turned off for
    /// the lifetime of the cache, unreadable or malformed content is discarded.
    pub fn new(persist: bool, path: Option<PathBuf>, cache_time: Duration) -> Self {
        let path = path.filter(|p| !p.as_os_str().is_empty());
        let mut cache = Self {
            persist: persist && path.is_some(),
            path,
            cache_time,
            entry: RwLock::new(None),
        };

        if let (true, Some(path)) = (cache.persist, cache.path.as_deref()) {
            match load(path) {
                Load::Unavailable => cache.persist = false,
                Load::Empty => {}
                Load::Entry(result) => cache.entry = RwLock::new(Some(Arc::new(result))),
            }
        }

        cache
    }

    pub fn persist(&self) -> bool {
        self.persist
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn cache_time(&self) -> Duration {
        self.cache_time
    }

    /// Current entry and whether it is still valid.
    pub fn read(&self) -> (Option<Arc<MeasurementResult>>, bool) {
        self.read_at(Utc::now())
    }

    /// Same as [`ResultCache::read`] with an explicit point in time.
    pub fn read_at(&self, now: DateTime<Utc>) -> (Option<Arc<MeasurementResult>>, bool) {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        match entry.as_ref() {
            Some(result) => {
                let valid = now < self.expires_at_for(result);
                (Some(Arc::clone(result)), valid)
            }
            None => (None, false),
        }
    }

    /// Replace the current entry and write it to disk if persistence is enabled.
    /// Write failures are logged, the in-memory entry is kept regardless.
    pub fn save(&self, result: Arc<MeasurementResult>) {
        let mut entry = self.entry.write().unwrap_or_else(PoisonError::into_inner);

        if let (true, Some(path)) = (self.persist, self.path.as_deref()) {
            match result.to_json() {
                Ok(data) => {
                    if let Err(err) = std::fs::write(path, data) {
                        error!(file = %path.display(), %err, "Could not write cache to disk");
                    }
                }
                Err(err) => error!(%err, "Could not serialize result to JSON"),
            }
        }

        *entry = Some(result);
    }

    /// Point in time after which the current entry is no longer valid,
    /// `None` if there is no entry.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry.as_deref().map(|result| self.expires_at_for(result))
    }

    /// Out of range values never panic, they make the entry invalid.
    fn expires_at_for(&self, result: &MeasurementResult) -> DateTime<Utc> {
        let grace = result
            .duration()
            .checked_add(&ADDITIONAL_GRACE)
            .unwrap_or(TimeDelta::MAX)
            .max(MINIMUM_GRACE);
        let Some(lifetime) = TimeDelta::from_std(self.cache_time)
            .unwrap_or(TimeDelta::MAX)
            .checked_sub(&grace)
        else {
            return DateTime::<Utc>::MIN_UTC;
        };

        result
            .timestamp()
            .checked_add_signed(lifetime)
            .unwrap_or(if lifetime < TimeDelta::zero() {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }
}

enum Load {
    Unavailable,
    Empty,
    Entry(MeasurementResult),
}

fn load(path: &Path) -> Load {
    let mut file = match OpenOptions::new().read(true).write(true).create(true).truncate(false).open(path) {
        Ok(file) => file,
        Err(err) => {
            info!(file = %path.display(), %err, "Failed to open cache file, will not persist cache to disk");
            return Load::Unavailable;
        }
    };

    let mut data = Vec::new();
    if let Err(err) = file.read_to_end(&mut data) {
        info!(file = %path.display(), %err, "Could not initialize cache from disk");
        return Load::Empty;
    }

    if data.is_empty() {
        info!(file = %path.display(), "Cache file is empty, starting with empty cache");
        return Load::Empty;
    }

    match MeasurementResult::from_json(&data) {
        Ok(result) => {
            info!(file = %path.display(), "Initialized cache from disk");
            Load::Entry(result)
        }
        Err(err) => {
            info!(file = %path.display(), %err, "Could not parse cache data from disk");
            Load::Empty
        }
    }
}
