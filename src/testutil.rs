//! Shared fixtures for unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::config::Config;
use crate::error::DownloadError;
use crate::fetcher::{HttpClient, HttpResponse};
use crate::fs_abstraction::RealFileSystem;
use crate::store::Filters;

/// In-memory HTTP client serving canned responses per URL.
#[derive(Clone, Default)]
pub(crate) struct StaticClient {
    responses: Arc<Mutex<HashMap<String, (u16, Vec<u8>)>>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl StaticClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&self, url: &str, status: u16, body: &[u8]) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.to_vec()));
    }

    pub(crate) fn hits(&self, url: &str) -> usize {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl HttpClient for StaticClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, DownloadError> {
        *self.hits.lock().unwrap().entry(url.to_string()).or_default() += 1;
        match self.responses.lock().unwrap().get(url) {
            Some((status, body)) => Ok(HttpResponse {
                status: *status,
                body: body.clone(),
            }),
            None => Err(DownloadError::Transport(format!("no route to {}", url))),
        }
    }
}

pub(crate) fn test_config(dir: &TempDir) -> Config {
    Config {
        filter_dir: dir.path().join("filters"),
        update_interval_hours: 1,
        poll_interval_secs: 3600,
        observer_timeout_secs: 5,
        ..Config::default()
    }
}

pub(crate) fn open_store(dir: &TempDir, client: StaticClient) -> Filters {
    Filters::open(&test_config(dir), Arc::new(client), Arc::new(RealFileSystem)).unwrap()
}
