use std::sync::{Arc, Mutex, Once};

use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use watch_core::{BatchKind, FieldMap, RemoteItem, RunMode, StateStore, StopReason, WatchConfig};
use watch_engine::{
    collect_pool, DigestDispatcher, DispatchError, DispatchOutcome, FetchPlan, FileDispatcher,
    FileStateStore, PageError, PageSource, WatchRunner,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(watch_logging::initialize_for_tests);
}

fn t(hour: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
}

fn doc(id: &str, hour: i64, tags: &[&str]) -> Value {
    json!({
        "id": id,
        "name": format!("Map {id}"),
        "createdAt": t(hour).to_rfc3339(),
        "tags": tags,
    })
}

/// In-memory listing; pages past the end are empty.
#[derive(Default)]
struct FakeListing {
    pages: Mutex<Vec<Vec<Value>>>,
    failing: Mutex<Option<u32>>,
    requests: Mutex<Vec<u32>>,
}

impl FakeListing {
    fn new(pages: Vec<Vec<Value>>) -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(pages),
            ..Self::default()
        })
    }

    fn fail_at(&self, index: u32) {
        *self.failing.lock().unwrap() = Some(index);
    }

    fn set_pages(&self, pages: Vec<Vec<Value>>) {
        *self.pages.lock().unwrap() = pages;
    }

    fn take_requests(&self) -> Vec<u32> {
        self.requests.lock().unwrap().drain(..).collect()
    }
}

#[async_trait::async_trait]
impl PageSource for FakeListing {
    async fn fetch_page(&self, index: u32) -> Result<Vec<Value>, PageError> {
        self.requests.lock().unwrap().push(index);
        if *self.failing.lock().unwrap() == Some(index) {
            return Err(network_error(index));
        }
        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(index as usize)
            .cloned()
            .unwrap_or_default())
    }
}

fn network_error(index: u32) -> PageError {
    PageError {
        page: index,
        kind: watch_engine::PageFailureKind::Network,
        message: "connection reset".to_string(),
    }
}

#[derive(Clone, Default)]
struct RecordingDispatcher {
    calls: Arc<Mutex<Vec<(Vec<String>, String, bool)>>>,
    fail: bool,
}

impl RecordingDispatcher {
    fn calls(&self) -> Vec<(Vec<String>, String, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

impl DigestDispatcher for RecordingDispatcher {
    fn dispatch(
        &self,
        items: &[RemoteItem],
        label: &str,
        is_preview: bool,
    ) -> Result<(), DispatchError> {
        self.calls.lock().unwrap().push((
            items.iter().map(|i| i.identity.clone()).collect(),
            label.to_string(),
            is_preview,
        ));
        if self.fail {
            Err(DispatchError::Delivery("smtp unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

fn config(tags: &[&str], preview: usize) -> WatchConfig {
    WatchConfig {
        label: "metal".to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        preview_count: preview,
        ..WatchConfig::default()
    }
}

fn runner(
    config: WatchConfig,
    listing: Arc<FakeListing>,
    dir: &TempDir,
    dispatcher: RecordingDispatcher,
) -> WatchRunner<FileStateStore> {
    let store = FileStateStore::new(dir.path().join("state.json"), config.delivered_capacity)
        .expect("store");
    WatchRunner::new(
        config,
        FieldMap::default(),
        listing,
        store,
        Box::new(dispatcher),
    )
    .with_clock(Arc::new(|| t(100)))
}

#[tokio::test]
async fn seed_then_delta_delivers_only_new_items() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let listing = FakeListing::new(vec![
        vec![doc("m5", 5, &["metal"]), doc("m4", 4, &["metal"]), doc("m3", 3, &["metal"])],
        vec![doc("m2", 2, &["metal"]), doc("m1", 1, &["metal"])],
    ]);
    let dispatcher = RecordingDispatcher::default();
    let runner = runner(config(&["metal"], 3), listing.clone(), &dir, dispatcher.clone());

    let seed = runner.run().await;
    assert_eq!(seed.mode, RunMode::Seed);
    assert_eq!(seed.kind, BatchKind::Preview);
    assert_eq!(seed.batch_ids(), vec!["m5", "m4", "m3"]);
    assert_eq!(seed.stop_reason, StopReason::Exhausted);
    assert_eq!(seed.watermark_after, Some(t(5)));
    assert!(seed.state_saved);
    assert_eq!(
        runner.store().load().delivered_ids.iter().collect::<Vec<_>>(),
        vec!["m5", "m4", "m3"]
    );
    assert_eq!(listing.take_requests(), vec![0, 1, 2]);

    listing.set_pages(vec![
        vec![doc("m7", 7, &["metal"]), doc("p6", 6, &["pop"]), doc("m4", 4, &["metal"])],
        vec![doc("m3", 3, &["metal"])],
    ]);
    let delta = runner.run().await;
    assert_eq!(delta.mode, RunMode::Delta { watermark: t(5) });
    assert_eq!(delta.kind, BatchKind::New);
    assert_eq!(delta.batch_ids(), vec!["m7"]);
    assert_eq!(delta.stop_reason, StopReason::CutoffReached);
    assert_eq!(delta.watermark_after, Some(t(7)));
    // The first page already reached past the watermark.
    assert_eq!(listing.take_requests(), vec![0]);

    let again = runner.run().await;
    assert_eq!(again.kind, BatchKind::Preview);
    assert_eq!(again.watermark_after, Some(t(7)));

    let calls = dispatcher.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1], (vec!["m7".to_string()], "metal".to_string(), false));
    assert!(calls[2].2);
}

#[tokio::test]
async fn page_failure_truncates_pool_and_run_completes() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let listing = FakeListing::new(vec![
        vec![doc("a", 9, &[]), doc("b", 8, &[])],
        vec![doc("c", 7, &[])],
    ]);
    listing.fail_at(1);
    let dispatcher = RecordingDispatcher::default();
    let runner = runner(config(&[], 5), listing.clone(), &dir, dispatcher.clone());

    let report = runner.run().await;
    assert_eq!(report.stop_reason, StopReason::PageFailed);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.batch_ids(), vec!["a", "b"]);
    assert!(report.state_saved);
    assert_eq!(report.dispatch, DispatchOutcome::Sent);
}

#[tokio::test]
async fn empty_filtered_pool_falls_back_to_unfiltered_preview() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let listing = FakeListing::new(vec![vec![doc("p2", 2, &["pop"]), doc("p1", 1, &["pop"])]]);
    let dispatcher = RecordingDispatcher::default();
    let runner = runner(config(&["metal"], 1), listing.clone(), &dir, dispatcher.clone());

    let report = runner.run().await;
    assert!(report.used_fallback);
    assert_eq!(report.kind, BatchKind::Preview);
    assert_eq!(report.batch_ids(), vec!["p2"]);
    // Fallback items are never recorded as delivered.
    assert!(runner.store().load().delivered_ids.is_empty());
    assert_eq!(runner.store().load().watermark, Some(t(2)));
}

#[tokio::test]
async fn undated_item_is_delivered_once_then_previewed() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let listing = FakeListing::new(vec![vec![doc("old", 1, &["metal"])]]);
    let dispatcher = RecordingDispatcher::default();
    let runner = runner(config(&["metal"], 5), listing.clone(), &dir, dispatcher.clone());

    // Seed a watermark ahead of the listing, with nothing delivered.
    let mut state = runner.store().load();
    state.watermark = Some(t(10));
    runner.store().save(&state).unwrap();

    listing.set_pages(vec![vec![json!({ "id": "undated", "tags": ["metal"] })]]);
    let first = runner.run().await;
    assert_eq!(first.kind, BatchKind::New);
    assert_eq!(first.batch_ids(), vec!["undated"]);

    let second = runner.run().await;
    assert_eq!(second.kind, BatchKind::Preview);
    assert_eq!(second.batch_ids(), vec!["undated"]);
    assert_eq!(runner.store().load().delivered_ids.len(), 1);
}

#[tokio::test]
async fn dry_run_computes_and_saves_but_skips_dispatch() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let listing = FakeListing::new(vec![vec![doc("a", 3, &[])]]);
    let dispatcher = RecordingDispatcher::default();
    let config = WatchConfig {
        dry_run: true,
        ..config(&[], 5)
    };
    let runner = runner(config, listing, &dir, dispatcher.clone());

    let report = runner.run().await;
    assert_eq!(report.dispatch, DispatchOutcome::SkippedDryRun);
    assert!(dispatcher.calls().is_empty());
    assert_eq!(runner.store().load().watermark, Some(t(3)));
}

#[tokio::test]
async fn dispatch_failure_keeps_saved_state() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let listing = FakeListing::new(vec![vec![doc("a", 3, &[])]]);
    let dispatcher = RecordingDispatcher {
        fail: true,
        ..RecordingDispatcher::default()
    };
    let runner = runner(config(&[], 5), listing, &dir, dispatcher);

    let report = runner.run().await;
    assert!(matches!(report.dispatch, DispatchOutcome::Failed(_)));
    assert!(report.state_saved);
    let state = runner.store().load();
    assert_eq!(state.watermark, Some(t(3)));
    assert_eq!(state.delivered_ids.iter().collect::<Vec<_>>(), vec!["a"]);
}

#[tokio::test]
async fn future_items_clamp_watermark_to_now() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let listing = FakeListing::new(vec![vec![doc("future", 500, &[])]]);
    let runner = runner(config(&[], 5), listing, &dir, RecordingDispatcher::default());

    let report = runner.run().await;
    assert_eq!(report.watermark_after, Some(t(100)));
}

#[tokio::test]
async fn page_cap_bounds_seed_scan() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let pages: Vec<Vec<Value>> = (0..10)
        .map(|p| vec![doc(&format!("i{p}"), 100 - p, &[])])
        .collect();
    let listing = FakeListing::new(pages);
    let config = WatchConfig {
        seed_max_pages: 3,
        ..config(&[], 5)
    };
    let runner = runner(config, listing.clone(), &dir, RecordingDispatcher::default());

    let report = runner.run().await;
    assert_eq!(report.stop_reason, StopReason::PageCap);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(listing.take_requests(), vec![0, 1, 2]);
}

#[tokio::test]
async fn collect_pool_normalizes_in_page_order() {
    let listing = FakeListing::new(vec![
        vec![doc("a", 3, &["X"]), json!({ "name": "loose" })],
        vec![],
    ]);
    let pool = collect_pool(
        listing.as_ref(),
        &FieldMap::default(),
        FetchPlan {
            max_pages: 5,
            cutoff: None,
        },
    )
    .await;
    let ids: Vec<_> = pool.items.iter().map(|i| i.identity.as_str()).collect();
    assert_eq!(ids, vec!["a", "n:loose@"]);
    assert!(pool.items[0].tags.contains("x"));
    assert_eq!(pool.stop_reason, StopReason::Exhausted);
}

#[test]
fn run_blocking_drives_a_full_run() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let listing = FakeListing::new(vec![vec![doc("a", 3, &[])]]);
    let runner = runner(config(&[], 5), listing, &dir, RecordingDispatcher::default());
    let report = runner.run_blocking().expect("runtime");
    assert_eq!(report.batch_ids(), vec!["a"]);
}

#[test]
fn file_dispatcher_writes_digest_and_manifest() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("digest");
    let item = RemoteItem::new("a").with_name("Song").with_created_at(t(1));
    FileDispatcher::new(out.clone())
        .dispatch(&[item], "metal", false)
        .unwrap();

    let html = std::fs::read_to_string(out.join("digest.html")).unwrap();
    assert!(html.contains("[metal] 1 new item"));
    let manifest: Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("digest.json")).unwrap()).unwrap();
    assert_eq!(manifest["count"], 1);
    assert_eq!(manifest["is_preview"], false);
    assert_eq!(manifest["items"][0]["identity"], "a");
}

/// Clears the run label inside every fetch, as a task resumed on a fresh
/// worker thread would see it.
struct LabelClearingListing(Arc<FakeListing>);

#[async_trait::async_trait]
impl PageSource for LabelClearingListing {
    async fn fetch_page(&self, index: u32) -> Result<Vec<Value>, PageError> {
        watch_logging::set_run_label("");
        self.0.fetch_page(index).await
    }
}

#[derive(Clone, Default)]
struct LabelRecordingDispatcher {
    seen: Arc<Mutex<Vec<String>>>,
}

impl DigestDispatcher for LabelRecordingDispatcher {
    fn dispatch(&self, _: &[RemoteItem], _: &str, _: bool) -> Result<(), DispatchError> {
        self.seen.lock().unwrap().push(watch_logging::run_label());
        Ok(())
    }
}

#[tokio::test]
async fn collect_pool_restores_run_label_after_each_page() {
    init_logging();
    watch_logging::set_run_label("metal");
    let listing = LabelClearingListing(FakeListing::new(vec![
        vec![doc("a", 3, &[])],
        vec![doc("b", 2, &[])],
    ]));
    let pool = collect_pool(
        &listing,
        &FieldMap::default(),
        FetchPlan {
            max_pages: 5,
            cutoff: None,
        },
    )
    .await;
    assert_eq!(pool.items.len(), 2);
    assert_eq!(watch_logging::run_label(), "metal");
}

#[tokio::test]
async fn run_label_survives_fetches_through_dispatch() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let listing = FakeListing::new(vec![vec![doc("a", 3, &["rock"])]]);
    let store = FileStateStore::new(dir.path().join("state.json"), 100).expect("store");
    let dispatcher = LabelRecordingDispatcher::default();
    // "rock" never passes the "metal" tag filter, so the fallback fetch runs too.
    let runner = WatchRunner::new(
        config(&["metal"], 5),
        FieldMap::default(),
        Arc::new(LabelClearingListing(listing)),
        store,
        Box::new(dispatcher.clone()),
    )
    .with_clock(Arc::new(|| t(100)));

    let report = runner.run().await;
    assert!(report.used_fallback);
    assert_eq!(*dispatcher.seen.lock().unwrap(), vec!["metal".to_string()]);
}
