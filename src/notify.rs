//! Observer callbacks fired around a swap batch.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{error, warn};

use crate::filter::UpdateEvent;

/// Callback registered by a consumer of the filter files.
pub type EventHandler = Arc<dyn Fn(UpdateEvent) + Send + Sync>;

/// Ordered list of observers, called one at a time in registration order.
pub struct NotificationBus {
    handlers: Mutex<Vec<EventHandler>>,
    timeout: Duration,
}

impl NotificationBus {
    /// Each observer call is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
            timeout,
        }
    }

    pub fn subscribe(&self, handler: EventHandler) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Call every observer with `event` and wait for each to return.
    ///
    /// Observers run on the blocking pool. One that exceeds the timeout is
    /// left running detached and the next observer is called.
    pub async fn notify(&self, event: UpdateEvent) {
        let handlers = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for (idx, handler) in handlers.into_iter().enumerate() {
            let task = tokio::task::spawn_blocking(move || handler(event));
            match tokio::time::timeout(self.timeout, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Observer {} failed on {:?}: {}", idx, event, e),
                Err(_) => warn!(
                    "Observer {} did not return within {:?} on {:?}",
                    idx, self.timeout, event
                ),
            }
        }
    }
}
