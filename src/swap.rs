//! Promotion of pending revisions to active ones.

use std::path::PathBuf;
use tracing::{debug, error, info};

use crate::error::FilterError;
use crate::filter::UpdateEvent;
use crate::store::Filters;

impl Filters {
    /// Swap every pending revision in, between `BeforeUpdate` and `AfterUpdate`
    /// notifications.
    ///
    /// Each pending file is renamed over its filter's served file, so the
    /// served path never changes and readers see either the old or the new
    /// content. A failed rename is logged and that filter keeps its old content
    /// until a later download. Does nothing, and notifies nobody, when no
    /// filter has a pending revision.
    ///
    /// Returns the number of filters swapped.
    pub async fn apply_update(&self) -> usize {
        {
            let mut state = self.lock();
            if !state.updated {
                debug!("No filters were updated");
                return 0;
            }
            state.updated = false;
            let has_pending = state
                .filters
                .iter()
                .any(|f| f.pending_revision.is_some_and(|p| p != f.id));
            if !has_pending {
                debug!("Pending revisions were discarded before the swap");
                return 0;
            }
        }

        self.observers.notify(UpdateEvent::BeforeUpdate).await;

        let mut swapped = 0;
        let mut orphans: Vec<PathBuf> = Vec::new();
        {
            let mut state = self.lock();
            for f in state.filters.iter_mut() {
                let Some(pending) = f.pending_revision.take() else {
                    continue;
                };
                if pending == f.id {
                    continue;
                }

                let from = self.filter_path(pending);
                let to = self.filter_path(f.id);
                match self.fs.rename(&from, &to) {
                    Ok(()) => swapped += 1,
                    Err(source) => {
                        let err = FilterError::Rename {
                            from: from.clone(),
                            to,
                            source,
                        };
                        error!("Filter {} not updated: {}", f.url, err);
                        orphans.push(from);
                    }
                }
            }
        }

        for path in &orphans {
            self.remove_quietly(path);
        }
        info!("{} filters were updated", swapped);

        self.observers.notify(UpdateEvent::AfterUpdate).await;
        swapped
    }
}
