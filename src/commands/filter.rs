//! Filter management commands: add, remove, modify, list, refresh.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;

use crate::config::{validate_source, Config};
use crate::filter::ModifyStatus;
use crate::lock::LockGuard;
use crate::store::Filters;
use crate::utils::{format_age, format_count, truncate};

/// Subscribe to a filter list
pub async fn add(name: &str, url: &str, config_path: &Path) -> Result<()> {
    validate_source(name, url)?;
    let config = Config::load_or_default(config_path)?;

    // Acquire lock to prevent concurrent config modifications
    let _lock = LockGuard::acquire(&config.filter_dir)?;

    let filters = Filters::from_config(&config)?;
    let added = filters.add(name, url).await?;
    filters.snapshot_config().save(config_path)?;

    println!(
        "[OK] Added filter '{}' ({} rules)",
        added.name,
        format_count(added.rule_count)
    );
    println!("     Stored at {}", added.path.display());
    Ok(())
}

/// Unsubscribe from a filter list and delete its file
pub async fn remove(url: &str, config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let _lock = LockGuard::acquire(&config.filter_dir)?;

    let filters = Filters::from_config(&config)?;
    let Some(removed) = filters.delete(url) else {
        println!("Filter with URL '{}' not found.", url);
        anyhow::bail!("Filter not found");
    };

    filters.snapshot_config().save(config_path)?;

    match std::fs::remove_file(&removed.path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to delete {:?}", removed.path));
        }
    }

    println!("[OK] Removed filter '{}'", removed.name);
    Ok(())
}

/// Change a filter's name, URL or enabled state
pub async fn modify(
    url: &str,
    name: Option<String>,
    new_url: Option<String>,
    enabled: Option<bool>,
    config_path: &Path,
) -> Result<()> {
    let config = Config::load(config_path)?;
    let _lock = LockGuard::acquire(&config.filter_dir)?;

    let filters = Filters::from_config(&config)?;
    let Some(current) = filters.list().into_iter().find(|f| f.url == url) else {
        println!("Filter with URL '{}' not found.", url);
        anyhow::bail!("Filter not found");
    };

    let name = name.unwrap_or(current.name);
    let new_url = new_url.unwrap_or_else(|| url.to_string());
    validate_source(&name, &new_url)?;

    let status = filters.modify(url, enabled.unwrap_or(current.enabled), &name, &new_url)?;
    if status.is_not_found() {
        anyhow::bail!("Filter not found");
    }
    filters.snapshot_config().save(config_path)?;

    println!("[OK] Filter '{}': {}", name, status);
    if status.contains(ModifyStatus::CHANGED_URL) || status.contains(ModifyStatus::CHANGED_ENABLED)
    {
        println!("     Run 'filtersync refresh' to download it now");
    }
    Ok(())
}

/// List subscribed filters
pub async fn list(json: bool, config_path: &Path) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let filters = Filters::from_config(&config)?;
    let list = filters.list();

    if json {
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    println!();
    println!("Filters ({} total):", list.len());
    println!();

    if list.is_empty() {
        println!("  (none - add one with 'filtersync add --name <name> --url <url>')");
        println!();
        return Ok(());
    }

    let now = Utc::now();
    println!(
        "  {:<3} {:<24} {:>8} {:>10}  URL",
        "", "NAME", "RULES", "UPDATED"
    );
    for f in &list {
        println!(
            "  [{}] {:<24} {:>8} {:>10}  {}",
            if f.enabled { "x" } else { " " },
            truncate(&f.name, 24),
            format_count(f.rule_count),
            format_age(f.last_updated, now),
            f.url
        );
    }
    println!();

    Ok(())
}

/// Download every enabled filter now and swap the results in
pub async fn refresh(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let _lock = LockGuard::acquire(&config.filter_dir)?;

    let filters = Filters::from_config(&config)?;
    let due = filters.refresh_all();
    while filters.refresh_next().await {}
    let swapped = filters.apply_update().await;

    filters.snapshot_config().save(config_path)?;

    println!("[OK] Updated {} of {} enabled filters", swapped, due);
    if swapped < due {
        println!("     Some downloads failed; run with --verbose for details");
    }
    Ok(())
}
