//! Background refresh of filter lists.
//!
//! One task walks the filters one at a time:
//!
//! 1. Claim the first enabled filter that is due, pushing its next due time one
//!    interval ahead (under the lock).
//! 2. Download it into a new revision file (no lock held).
//! 3. Attach the revision to the record found again by URL (under the lock).
//!
//! When nothing is due, all pending revisions are swapped in together and the
//! task sleeps for the poll period. Served files are never touched here.

use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::fetcher;
use crate::filter::Filter;
use crate::store::Filters;

impl Filters {
    /// Spawn the refresh task. Returns `None` if it is already running.
    pub fn start(self: &Arc<Self>, token: CancellationToken) -> Option<JoinHandle<()>> {
        if self.task_running.swap(true, Ordering::SeqCst) {
            return None;
        }
        let filters = Arc::clone(self);
        Some(tokio::spawn(async move {
            filters.run(token).await;
            filters.task_running.store(false, Ordering::SeqCst);
        }))
    }

    /// The refresh loop. Returns once `token` is cancelled.
    pub async fn run(&self, token: CancellationToken) {
        info!(
            "Filter refresh started (interval: {}h, poll: {:?})",
            self.settings.update_interval.num_hours(),
            self.settings.poll_interval
        );

        loop {
            if token.is_cancelled() {
                break;
            }
            if self.refresh_next().await {
                continue;
            }

            self.apply_update().await;

            tokio::select! {
                _ = token.cancelled() => break,
                _ = self.wake.notified() => debug!("Filter refresh woken"),
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }

        info!("Filter refresh stopped");
    }

    /// Refresh the next due filter, if any.
    ///
    /// Returns `false` when no filter is due. A failed download is dropped; the
    /// filter is retried once its next due time comes around.
    pub async fn refresh_next(&self) -> bool {
        let Some(claimed) = self.claim_next_due() else {
            return false;
        };

        let id = self.ids.next();
        let body = match fetcher::download(
            self.client.as_ref(),
            &claimed.url,
            self.settings.max_filter_size,
        )
        .await
        {
            Ok(body) => body,
            Err(e) => {
                warn!("Couldn't download filter from {}: {}", claimed.url, e);
                return true;
            }
        };

        let path = self.filter_path(id);
        if let Err(e) = self.fs.write_atomic(&path, &body) {
            warn!("Failed to write filter revision {:?}: {}", path, e);
            return true;
        }
        debug!("Saved filter {} at {:?}", claimed.url, path);

        let rule_count = fetcher::classify(&body);
        let (attached, superseded) = {
            let mut state = self.lock();
            match state.filters.iter_mut().find(|f| f.url == claimed.url) {
                Some(f) => {
                    let superseded = f.pending_revision.replace(id);
                    f.rule_count = rule_count;
                    f.last_updated = Some(Utc::now());
                    state.updated = true;
                    (true, superseded)
                }
                None => (false, None),
            }
        };

        if !attached {
            debug!("Filter {} was removed during download", claimed.url);
            self.remove_quietly(&path);
        }
        if let Some(old) = superseded.filter(|old| *old != id) {
            self.remove_quietly(&self.filter_path(old));
        }
        true
    }

    /// Find the first due filter and push its next due time one interval ahead.
    fn claim_next_due(&self) -> Option<Filter> {
        let now = Utc::now();
        let mut state = self.lock();
        let f = state.filters.iter_mut().find(|f| f.is_due(now))?;
        f.next_due = Some(now + self.settings.update_interval);
        Some(f.clone())
    }
}
