//! Filter records and the small value types shared by the store, scheduler and swap.

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// One subscribed rule list.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Filter {
    /// Active revision id, also the stem of the served file.
    pub id: u64,
    pub enabled: bool,
    pub name: String,
    pub url: String,

    /// Resolved path of the served file. Only filled in on copies handed out by the store.
    pub path: PathBuf,

    pub rule_count: u64,
    pub last_updated: Option<DateTime<Utc>>,

    #[serde(skip)]
    pub(crate) next_due: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub(crate) pending_revision: Option<u64>,
}

impl Filter {
    pub(crate) fn new(id: u64, enabled: bool, name: String, url: String) -> Self {
        Self {
            id,
            enabled,
            name,
            url,
            path: PathBuf::new(),
            rule_count: 0,
            last_updated: None,
            next_due: None,
            pending_revision: None,
        }
    }

    /// Downloaded revision waiting for the next swap, if any.
    pub fn pending_revision(&self) -> Option<u64> {
        self.pending_revision
    }

    /// When the scheduler will next consider this filter. `None` means due now.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.next_due
    }

    pub(crate) fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_due.map_or(true, |due| due <= now)
    }
}

bitflags! {
    /// Bit flags returned by [`Filters::modify`](crate::store::Filters::modify).
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ModifyStatus: u8 {
        const NOT_FOUND = 1;
        const CHANGED_ENABLED = 2;
        const CHANGED_URL = 4;
    }
}

impl ModifyStatus {
    pub fn is_not_found(&self) -> bool {
        self.contains(Self::NOT_FOUND)
    }
}

impl fmt::Display for ModifyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_not_found() {
            return f.write_str("not found");
        }
        let mut parts = Vec::new();
        if self.contains(Self::CHANGED_ENABLED) {
            parts.push("enabled changed");
        }
        if self.contains(Self::CHANGED_URL) {
            parts.push("url changed");
        }
        if parts.is_empty() {
            f.write_str("unchanged")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

/// Points in the swap protocol at which observers are called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateEvent {
    /// Fired before any filter file is renamed. Consumers should stop reading filter files.
    BeforeUpdate,
    /// Fired after every rename attempt in the batch.
    AfterUpdate,
}
