//! The filter store: the locked collection of filter records and its public operations.
//!
//! Every read or write of the collection goes through [`Filters::lock`]. The lock is a
//! plain `std::sync::Mutex` and is never held across an `.await`, a network call, or a
//! file write. Results of I/O done outside the lock are merged back by locating the
//! record again by URL.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::config::{Config, FilterSource};
use crate::error::FilterError;
use crate::fetcher::{self, HttpClient, ReqwestClient};
use crate::filter::{Filter, ModifyStatus, UpdateEvent};
use crate::fs_abstraction::{FileSystem, RealFileSystem};
use crate::notify::NotificationBus;

/// Hands out revision ids.
///
/// Ids follow wall-clock seconds but are strictly increasing, so two refreshes
/// within the same second still get distinct files.
pub(crate) struct IdGenerator {
    last: Mutex<u64>,
}

impl IdGenerator {
    pub(crate) fn new(floor: u64) -> Self {
        Self {
            last: Mutex::new(floor),
        }
    }

    pub(crate) fn next(&self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        *last = now.max(last.saturating_add(1));
        *last
    }
}

pub(crate) struct Inner {
    pub(crate) filters: Vec<Filter>,
    /// Set when a download attached a pending revision since the last swap
    pub(crate) updated: bool,
}

/// Runtime settings copied out of [`Config`] at open time.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) filter_dir: PathBuf,
    pub(crate) update_interval: chrono::Duration,
    pub(crate) poll_interval: Duration,
    pub(crate) max_filter_size: usize,
    config: Config,
}

/// The set of subscribed filters plus everything needed to refresh them.
pub struct Filters {
    pub(crate) settings: Settings,
    pub(crate) client: Arc<dyn HttpClient>,
    pub(crate) fs: Arc<dyn FileSystem>,
    pub(crate) state: Mutex<Inner>,
    pub(crate) observers: NotificationBus,
    pub(crate) ids: IdGenerator,
    pub(crate) wake: Notify,
    pub(crate) task_running: AtomicBool,
}

impl Filters {
    /// Open the store with the production HTTP client and filesystem.
    pub fn from_config(config: &Config) -> Result<Self, FilterError> {
        let client = ReqwestClient::new(config.download_timeout()).map_err(|e| {
            FilterError::Config(format!("Failed to create HTTP client: {}", e))
        })?;
        Self::open(config, Arc::new(client), Arc::new(RealFileSystem))
    }

    /// Create the storage directory and load the configured filters.
    ///
    /// For each filter whose file is present, the file's mtime becomes its last
    /// update time and the rule count is recomputed from its content. Filters
    /// without a readable file are due immediately.
    pub fn open(
        config: &Config,
        client: Arc<dyn HttpClient>,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self, FilterError> {
        config
            .validate()
            .map_err(|e| FilterError::Config(e.to_string()))?;
        fs.create_dir_all(&config.filter_dir)
            .map_err(|e| FilterError::io(&config.filter_dir, e))?;

        let settings = Settings {
            filter_dir: config.filter_dir.clone(),
            update_interval: config.update_interval(),
            poll_interval: config.poll_interval(),
            max_filter_size: config.max_filter_size,
            config: Config {
                filters: Vec::new(),
                ..config.clone()
            },
        };

        let mut filters = Vec::with_capacity(config.filters.len());
        for source in &config.filters {
            let mut f = Filter::new(
                source.id,
                source.enabled,
                source.name.clone(),
                source.url.clone(),
            );
            let path = settings.filter_path(f.id);
            match fs.modified(&path) {
                Ok(mtime) => {
                    let mtime = DateTime::<Utc>::from(mtime);
                    f.last_updated = Some(mtime);
                    f.next_due = Some(mtime + settings.update_interval);
                }
                Err(e) => {
                    warn!("Filter {} has no usable file {:?}: {}", f.url, path, e);
                    filters.push(f);
                    continue;
                }
            }
            match fs.read(&path) {
                Ok(body) => f.rule_count = fetcher::classify(&body),
                Err(e) => warn!("Failed to read filter file {:?}: {}", path, e),
            }
            filters.push(f);
        }

        let max_id = config.filters.iter().map(|f| f.id).max().unwrap_or(0);
        info!(
            "Loaded {} filters from {:?}",
            filters.len(),
            settings.filter_dir
        );

        Ok(Self {
            observers: NotificationBus::new(config.observer_timeout()),
            settings,
            client,
            fs,
            state: Mutex::new(Inner {
                filters,
                updated: false,
            }),
            ids: IdGenerator::new(max_id),
            wake: Notify::new(),
            task_running: AtomicBool::new(false),
        })
    }

    /// Acquire the collection lock.
    ///
    /// Every critical section leaves the collection consistent, so a poisoned
    /// lock is recovered rather than propagated.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Inner> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Directory holding the filter files.
    pub fn filter_dir(&self) -> &Path {
        &self.settings.filter_dir
    }

    /// Path of the file for revision `id`.
    pub fn filter_path(&self, id: u64) -> PathBuf {
        self.settings.filter_path(id)
    }

    /// Register an observer called before and after each swap batch.
    pub fn add_observer<F>(&self, handler: F)
    where
        F: Fn(UpdateEvent) + Send + Sync + 'static,
    {
        self.observers.subscribe(Arc::new(handler));
    }

    /// Subscribe to a new filter.
    ///
    /// The list is downloaded and written to disk before the record is inserted;
    /// if the download fails the filter is never added.
    pub async fn add(&self, name: &str, url: &str) -> Result<Filter, FilterError> {
        self.check_unique(name, url)?;

        let id = self.ids.next();
        let body = fetcher::download(self.client.as_ref(), url, self.settings.max_filter_size)
            .await
            .map_err(|source| {
                debug!("Couldn't download filter from {}: {}", url, source);
                FilterError::Download {
                    url: url.to_string(),
                    source,
                }
            })?;

        let path = self.filter_path(id);
        self.fs
            .write_atomic(&path, &body)
            .map_err(|e| FilterError::io(&path, e))?;
        debug!("Saved filter {} at {:?}", url, path);

        let now = Utc::now();
        let mut f = Filter::new(id, true, name.to_string(), url.to_string());
        f.rule_count = fetcher::classify(&body);
        f.last_updated = Some(now);
        f.next_due = Some(now + self.settings.update_interval);

        let inserted = {
            let mut state = self.lock();
            if find_conflict(&state.filters, name, url, None) {
                None
            } else {
                state.filters.push(f.clone());
                Some(f)
            }
        };

        match inserted {
            Some(mut f) => {
                info!("Added filter {} ({} rules)", f.url, f.rule_count);
                f.path = path;
                Ok(f)
            }
            None => {
                // Lost a race with a concurrent add of the same filter
                self.remove_quietly(&path);
                Err(duplicate(name, url))
            }
        }
    }

    /// Unsubscribe from the filter with this URL.
    ///
    /// Returns the removed record with its resolved path; the caller owns deleting
    /// that file. A not-yet-swapped revision file is removed here.
    pub fn delete(&self, url: &str) -> Option<Filter> {
        let mut removed = {
            let mut state = self.lock();
            let idx = state.filters.iter().position(|f| f.url == url)?;
            state.filters.remove(idx)
        };

        if let Some(pending) = removed.pending_revision.take() {
            self.remove_quietly(&self.filter_path(pending));
        }
        info!("Removed filter {}", url);
        removed.path = self.filter_path(removed.id);
        Some(removed)
    }

    /// Change a filter's name, enabled flag and URL.
    ///
    /// Returns [`ModifyStatus::NOT_FOUND`] when no filter has `url`, otherwise
    /// flags for what changed. A new URL or name already used by another filter
    /// is rejected without changing anything.
    pub fn modify(
        &self,
        url: &str,
        enabled: bool,
        name: &str,
        new_url: &str,
    ) -> Result<ModifyStatus, FilterError> {
        let mut stale = None;
        let status = {
            let mut state = self.lock();
            let Some(idx) = state.filters.iter().position(|f| f.url == url) else {
                return Ok(ModifyStatus::NOT_FOUND);
            };
            if find_conflict(&state.filters, name, new_url, Some(idx)) {
                return Err(duplicate(name, new_url));
            }

            let f = &mut state.filters[idx];
            let mut status = ModifyStatus::empty();
            f.name = name.to_string();

            if f.enabled != enabled {
                f.enabled = enabled;
                status |= ModifyStatus::CHANGED_ENABLED;
                if enabled {
                    f.next_due = None;
                }
            }

            if f.url != new_url {
                f.url = new_url.to_string();
                status |= ModifyStatus::CHANGED_URL;
                // Content downloaded from the old URL must not be swapped in
                stale = f.pending_revision.take();
                f.next_due = None;
            }
            status
        };

        if let Some(pending) = stale {
            self.remove_quietly(&self.filter_path(pending));
        }
        if status.contains(ModifyStatus::CHANGED_URL) || status.contains(ModifyStatus::CHANGED_ENABLED)
        {
            self.wake.notify_one();
        }
        debug!("Modified filter {}: {}", url, status);
        Ok(status)
    }

    /// Snapshot of all filters with resolved paths.
    pub fn list(&self) -> Vec<Filter> {
        let state = self.lock();
        state
            .filters
            .iter()
            .map(|f| {
                let mut copy = f.clone();
                copy.path = self.filter_path(f.id);
                copy
            })
            .collect()
    }

    /// Configuration reflecting the live collection, ready to be saved.
    pub fn snapshot_config(&self) -> Config {
        let state = self.lock();
        Config {
            filters: state
                .filters
                .iter()
                .map(|f| FilterSource {
                    id: f.id,
                    enabled: f.enabled,
                    name: f.name.clone(),
                    url: f.url.clone(),
                })
                .collect(),
            ..self.settings.config.clone()
        }
    }

    /// Make every enabled filter due now and wake the scheduler.
    pub fn refresh_all(&self) -> usize {
        let count = {
            let mut state = self.lock();
            let mut count = 0;
            for f in state.filters.iter_mut().filter(|f| f.enabled) {
                f.next_due = None;
                count += 1;
            }
            count
        };
        self.wake.notify_one();
        debug!("Marked {} filters for refresh", count);
        count
    }

    fn check_unique(&self, name: &str, url: &str) -> Result<(), FilterError> {
        let state = self.lock();
        if find_conflict(&state.filters, name, url, None) {
            return Err(duplicate(name, url));
        }
        Ok(())
    }

    /// Best-effort removal of a file nobody will serve.
    pub(crate) fn remove_quietly(&self, path: &Path) {
        if let Err(e) = self.fs.remove_file(path) {
            debug!("Failed to remove {:?}: {}", path, e);
        }
    }
}

impl Settings {
    pub(crate) fn filter_path(&self, id: u64) -> PathBuf {
        self.filter_dir.join(format!("{}.txt", id))
    }
}

/// Whether any filter other than `skip` already uses `name` or `url`.
fn find_conflict(filters: &[Filter], name: &str, url: &str, skip: Option<usize>) -> bool {
    filters
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != skip)
        .any(|(_, f)| f.name == name || f.url == url)
}

fn duplicate(name: &str, url: &str) -> FilterError {
    FilterError::Duplicate {
        name: name.to_string(),
        url: url.to_string(),
    }
}
