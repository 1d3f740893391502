//! # filtersync - Rule list refresh engine
//!
//! Maintains a set of named, URL-backed text rule lists ("filters") for a
//! downstream rule engine, keeping local copies fresh with periodic background
//! refresh.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        filtersync                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                                 │
//! │    └── Commands: run, add, remove, modify, list, refresh    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Store (Filters)                                            │
//! │    └── Mutex-guarded records: add/delete/modify/list        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scheduler                                                  │
//! │    └── claim due filter → download → attach pending rev     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Swap                                                       │
//! │    └── BeforeUpdate → rename pending over active → After    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Fetcher (reqwest + rustls)    FileSystem (atomic writes)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## On-disk layout
//!
//! One file per revision, `<id>.txt`, directly in the storage directory. The
//! content is the raw downloaded body. A filter is always served from the file
//! named by its id; a refreshed revision lives next to it under a new id until
//! the swap renames it over the served file.
//!
//! ## Example Usage
//!
//! ```no_run
//! use filtersync::config::Config;
//! use filtersync::filter::UpdateEvent;
//! use filtersync::store::Filters;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("/etc/filtersync/config.yaml")?;
//!     let filters = Arc::new(Filters::from_config(&config)?);
//!
//!     filters.add_observer(|event| match event {
//!         UpdateEvent::BeforeUpdate => { /* stop reading filter files */ }
//!         UpdateEvent::AfterUpdate => { /* reload filter files */ }
//!     });
//!
//!     filters.add("AdGuard DNS filter", "https://example.org/filter.txt").await?;
//!
//!     let token = CancellationToken::new();
//!     if let Some(handle) = filters.start(token.clone()) {
//!         handle.await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`store`] - The filter collection and its public operations
//! - [`scheduler`] - Background refresh loop
//! - [`swap`] - Batched promotion of pending revisions
//! - [`notify`] - Observer callbacks around a swap
//! - [`fetcher`] - HTTP download and rule counting
//! - [`fs_abstraction`] - Filesystem seam for atomic writes and renames
//! - [`config`] - Configuration parsing and validation
//! - [`cli`] / [`commands`] - Command-line interface
//! - [`lock`] - Advisory lock on the storage directory
//! - [`signal`] - Graceful shutdown signal handling

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod fs_abstraction;
pub mod lock;
pub mod notify;
pub mod scheduler;
pub mod signal;
pub mod store;
pub mod swap;
pub mod utils;

#[cfg(test)]
mod testutil;

pub use config::Config;
pub use error::{DownloadError, FilterError};
pub use filter::{Filter, ModifyStatus, UpdateEvent};
pub use store::Filters;
