//! Long-running refresh daemon.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::filter::UpdateEvent;
use crate::lock::LockGuard;
use crate::signal::cancel_on_signal;
use crate::store::Filters;

/// Refresh filters until SIGINT/SIGTERM, then persist the filter list.
pub async fn run(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let _lock = LockGuard::acquire(&config.filter_dir)?;

    let filters = Arc::new(Filters::from_config(&config)?);
    filters.add_observer(|event| match event {
        UpdateEvent::BeforeUpdate => info!("Replacing filter files"),
        UpdateEvent::AfterUpdate => info!("Filter files replaced"),
    });

    let token = CancellationToken::new();
    cancel_on_signal(token.clone());

    let Some(handle) = filters.start(token) else {
        anyhow::bail!("Filter refresh is already running");
    };
    handle.await.context("Filter refresh task failed")?;

    filters
        .snapshot_config()
        .save(config_path)
        .context("Failed to save filter list on shutdown")?;
    Ok(())
}
