//! End-to-end refresh and swap through the public API.

use async_trait::async_trait;
use filtersync::config::Config;
use filtersync::fetcher::{HttpClient, HttpResponse};
use filtersync::fs_abstraction::RealFileSystem;
use filtersync::{DownloadError, FilterError, Filters, UpdateEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Serves whatever body was last published for a URL.
#[derive(Clone, Default)]
struct Mirror {
    bodies: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl Mirror {
    fn publish(&self, url: &str, body: &[u8]) {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_vec());
    }

    fn take_down(&self, url: &str) {
        self.bodies.lock().unwrap().remove(url);
    }
}

#[async_trait]
impl HttpClient for Mirror {
    async fn get(&self, url: &str) -> Result<HttpResponse, DownloadError> {
        Ok(match self.bodies.lock().unwrap().get(url) {
            Some(body) => HttpResponse {
                status: 200,
                body: body.clone(),
            },
            None => HttpResponse {
                status: 404,
                body: Vec::new(),
            },
        })
    }
}

fn open(dir: &TempDir, mirror: &Mirror) -> Filters {
    let config = Config {
        filter_dir: dir.path().join("filters"),
        update_interval_hours: 1,
        observer_timeout_secs: 5,
        ..Config::default()
    };
    Filters::open(&config, Arc::new(mirror.clone()), Arc::new(RealFileSystem)).unwrap()
}

#[tokio::test]
async fn test_add_then_duplicate_url_keeps_one_record() {
    let dir = TempDir::new().unwrap();
    let mirror = Mirror::default();
    mirror.publish("http://a/list.txt", b"# comment\nrule1\n\nrule2\n");
    let filters = open(&dir, &mirror);

    let added = filters.add("first", "http://a/list.txt").await.unwrap();
    assert_eq!(added.rule_count, 2);
    assert_eq!(
        std::fs::read(&added.path).unwrap(),
        b"# comment\nrule1\n\nrule2\n"
    );

    let err = filters.add("second", "http://a/list.txt").await.unwrap_err();
    assert!(matches!(err, FilterError::Duplicate { .. }));
    assert_eq!(filters.list().len(), 1);
}

#[tokio::test]
async fn test_refresh_cycle_swaps_only_after_sweep() {
    let dir = TempDir::new().unwrap();
    let mirror = Mirror::default();
    mirror.publish("http://a/1.txt", b"one\n");
    mirror.publish("http://a/2.txt", b"two\n");
    let filters = open(&dir, &mirror);
    let first = filters.add("one", "http://a/1.txt").await.unwrap();
    let second = filters.add("two", "http://a/2.txt").await.unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    filters.add_observer(move |e| sink.lock().unwrap().push(e));

    mirror.publish("http://a/1.txt", b"one\nmore\n");
    mirror.take_down("http://a/2.txt");
    assert_eq!(filters.refresh_all(), 2);

    assert!(filters.refresh_next().await);
    // Served content is untouched until the swap
    assert_eq!(std::fs::read(&first.path).unwrap(), b"one\n");
    assert!(filters.refresh_next().await);
    assert!(!filters.refresh_next().await);

    assert_eq!(filters.apply_update().await, 1);
    assert_eq!(std::fs::read(&first.path).unwrap(), b"one\nmore\n");
    // A failed download leaves the old content in place
    assert_eq!(std::fs::read(&second.path).unwrap(), b"two\n");
    assert_eq!(
        *events.lock().unwrap(),
        vec![UpdateEvent::BeforeUpdate, UpdateEvent::AfterUpdate]
    );

    let list = filters.list();
    assert_eq!(list[0].rule_count, 2);
    assert_eq!(list[1].rule_count, 1);
}

#[tokio::test]
async fn test_background_task_applies_refresh() {
    let dir = TempDir::new().unwrap();
    let mirror = Mirror::default();
    mirror.publish("http://a/1.txt", b"v1\n");
    let filters = Arc::new(open(&dir, &mirror));
    let added = filters.add("one", "http://a/1.txt").await.unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    filters.add_observer(move |e| {
        let _ = tx.send(e);
    });

    let token = CancellationToken::new();
    let handle = filters.start(token.clone()).unwrap();

    mirror.publish("http://a/1.txt", b"v2\n");
    filters.refresh_all();

    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        if event == UpdateEvent::AfterUpdate {
            break;
        }
    }
    assert_eq!(std::fs::read(&added.path).unwrap(), b"v2\n");

    token.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_snapshot_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let mirror = Mirror::default();
    mirror.publish("http://a/1.txt", b"rule\n");
    let filters = open(&dir, &mirror);
    filters.add("one", "http://a/1.txt").await.unwrap();

    let path = dir.path().join("config.yaml");
    filters.snapshot_config().save(&path).unwrap();

    let config = Config::load(&path).unwrap();
    let reopened =
        Filters::open(&config, Arc::new(mirror.clone()), Arc::new(RealFileSystem)).unwrap();
    let list = reopened.list();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].name, "one");
    assert_eq!(list[0].rule_count, 1);
}
