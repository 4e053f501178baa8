//! Visit/redirect integration tests
//!
//! These tests drive the public visit router end to end: resolution,
//! the 302/404/500 state machine, background click recording, and the
//! decoupling of redirect latency from recording latency.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use lynks::analytics::models::{DailyCount, HourCount};
use lynks::clicks::{ClickRecorder, RecorderSettings};
use lynks::models::{ClickEvent, Link, NewLink};
use lynks::store::{LinkStore, MemoryStore, SqliteStore, StoreError, StoreResult};
use lynks::visit;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceExt;

/// Helper to create test storage
async fn create_test_store() -> Arc<dyn LinkStore> {
    let store = SqliteStore::new("sqlite::memory:", 5).await.unwrap();
    store.init().await.unwrap();
    Arc::new(store)
}

fn test_link(id: &str, url: &str) -> NewLink {
    NewLink {
        id: id.to_string(),
        user_id: "user1".to_string(),
        title: "My site".to_string(),
        url: url.to_string(),
        icon: None,
        color: None,
        is_visible: true,
        position: 0,
    }
}

fn default_recorder(store: Arc<dyn LinkStore>) -> Arc<ClickRecorder> {
    Arc::new(ClickRecorder::new(store, RecorderSettings::default()))
}

/// Wait for the background recording task to land, bounded
async fn wait_for_events(store: &Arc<dyn LinkStore>, link_id: &str, expected: i64) {
    for _ in 0..50 {
        if store.count_click_events(link_id).await.unwrap() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "expected {} click events for '{}' within the polling window",
        expected, link_id
    );
}

/// Store double that fails every call, simulating an unreachable backend
struct FailingStore;

#[async_trait::async_trait]
impl LinkStore for FailingStore {
    async fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }
    async fn create_link(&self, _link: NewLink) -> StoreResult<Link> {
        Err(StoreError::Other(anyhow::anyhow!("store unavailable")))
    }
    async fn get_link(&self, _link_id: &str) -> anyhow::Result<Option<Link>> {
        Err(anyhow::anyhow!("store unavailable"))
    }
    async fn get_link_authoritative(&self, _link_id: &str) -> anyhow::Result<Option<Link>> {
        Err(anyhow::anyhow!("store unavailable"))
    }
    async fn list_links(&self, _user_id: &str) -> anyhow::Result<Vec<Link>> {
        Err(anyhow::anyhow!("store unavailable"))
    }
    async fn set_visibility(&self, _link_id: &str, _visible: bool) -> anyhow::Result<bool> {
        Err(anyhow::anyhow!("store unavailable"))
    }
    async fn increment_clicks(&self, _link_id: &str) -> anyhow::Result<bool> {
        Err(anyhow::anyhow!("store unavailable"))
    }
    async fn set_clicks(&self, _link_id: &str, _clicks: i64) -> anyhow::Result<bool> {
        Err(anyhow::anyhow!("store unavailable"))
    }
    async fn insert_click_event(
        &self,
        _link_id: &str,
        _visitor_id: Option<&str>,
        _clicked_at: i64,
    ) -> anyhow::Result<ClickEvent> {
        Err(anyhow::anyhow!("store unavailable"))
    }
    async fn count_click_events(&self, _link_id: &str) -> anyhow::Result<i64> {
        Err(anyhow::anyhow!("store unavailable"))
    }
    async fn daily_counts(
        &self,
        _link_id: &str,
        _start: i64,
        _end: i64,
    ) -> anyhow::Result<Vec<DailyCount>> {
        Err(anyhow::anyhow!("store unavailable"))
    }
    async fn unique_visitors(&self, _link_id: &str, _start: i64, _end: i64) -> anyhow::Result<i64> {
        Err(anyhow::anyhow!("store unavailable"))
    }
    async fn hourly_histogram(
        &self,
        _link_id: &str,
        _start: i64,
        _end: i64,
    ) -> anyhow::Result<Vec<HourCount>> {
        Err(anyhow::anyhow!("store unavailable"))
    }
    async fn all_link_ids(&self) -> anyhow::Result<Vec<String>> {
        Err(anyhow::anyhow!("store unavailable"))
    }
}

/// Store double whose event append never completes, simulating a store
/// stuck mid-recording
struct StalledStore {
    inner: MemoryStore,
}

#[async_trait::async_trait]
impl LinkStore for StalledStore {
    async fn init(&self) -> anyhow::Result<()> {
        self.inner.init().await
    }
    async fn create_link(&self, link: NewLink) -> StoreResult<Link> {
        self.inner.create_link(link).await
    }
    async fn get_link(&self, link_id: &str) -> anyhow::Result<Option<Link>> {
        self.inner.get_link(link_id).await
    }
    async fn get_link_authoritative(&self, link_id: &str) -> anyhow::Result<Option<Link>> {
        self.inner.get_link_authoritative(link_id).await
    }
    async fn list_links(&self, user_id: &str) -> anyhow::Result<Vec<Link>> {
        self.inner.list_links(user_id).await
    }
    async fn set_visibility(&self, link_id: &str, visible: bool) -> anyhow::Result<bool> {
        self.inner.set_visibility(link_id, visible).await
    }
    async fn increment_clicks(&self, link_id: &str) -> anyhow::Result<bool> {
        self.inner.increment_clicks(link_id).await
    }
    async fn set_clicks(&self, link_id: &str, clicks: i64) -> anyhow::Result<bool> {
        self.inner.set_clicks(link_id, clicks).await
    }
    async fn insert_click_event(
        &self,
        _link_id: &str,
        _visitor_id: Option<&str>,
        _clicked_at: i64,
    ) -> anyhow::Result<ClickEvent> {
        std::future::pending::<()>().await;
        unreachable!()
    }
    async fn count_click_events(&self, link_id: &str) -> anyhow::Result<i64> {
        self.inner.count_click_events(link_id).await
    }
    async fn daily_counts(
        &self,
        link_id: &str,
        start: i64,
        end: i64,
    ) -> anyhow::Result<Vec<DailyCount>> {
        self.inner.daily_counts(link_id, start, end).await
    }
    async fn unique_visitors(&self, link_id: &str, start: i64, end: i64) -> anyhow::Result<i64> {
        self.inner.unique_visitors(link_id, start, end).await
    }
    async fn hourly_histogram(
        &self,
        link_id: &str,
        start: i64,
        end: i64,
    ) -> anyhow::Result<Vec<HourCount>> {
        self.inner.hourly_histogram(link_id, start, end).await
    }
    async fn all_link_ids(&self) -> anyhow::Result<Vec<String>> {
        self.inner.all_link_ids().await
    }
}

#[tokio::test]
async fn test_visit_redirects_and_records() {
    // abc123 -> https://example.com with counter 5: a visit from v1
    // yields a 302, counter 6, one attributed event
    let store = create_test_store().await;
    store
        .create_link(test_link("abc123", "https://example.com"))
        .await
        .unwrap();
    store.set_clicks("abc123", 5).await.unwrap();

    let app = visit::create_visit_router(store.clone(), default_recorder(store.clone()));

    let request = Request::builder()
        .uri("/visit/abc123?vid=v1")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND, "should return 302");
    assert_eq!(
        response.headers().get("location").unwrap(),
        "https://example.com"
    );

    wait_for_events(&store, "abc123", 1).await;

    let link = store.get_link_authoritative("abc123").await.unwrap().unwrap();
    assert_eq!(link.clicks, 6, "counter should go from 5 to 6");
    assert_eq!(
        store.unique_visitors("abc123", 0, i64::MAX).await.unwrap(),
        1,
        "the event should be attributed to v1"
    );
}

#[tokio::test]
async fn test_visit_uses_cookie_identity() {
    let store = create_test_store().await;
    store
        .create_link(test_link("cookie1", "https://example.com/c"))
        .await
        .unwrap();

    let app = visit::create_visit_router(store.clone(), default_recorder(store.clone()));

    let request = Request::builder()
        .uri("/visit/cookie1")
        .header("cookie", "visitor_id=browser-token-1")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    wait_for_events(&store, "cookie1", 1).await;
    assert_eq!(
        store.unique_visitors("cookie1", 0, i64::MAX).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_visit_nonexistent_link() {
    // No such link: 404, and nothing is written anywhere
    let store = create_test_store().await;
    let app = visit::create_visit_router(store.clone(), default_recorder(store.clone()));

    let request = Request::builder()
        .uri("/visit/zzz999")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.count_click_events("zzz999").await.unwrap(), 0);
}

#[tokio::test]
async fn test_visit_malformed_id() {
    let store = create_test_store().await;
    let app = visit::create_visit_router(store.clone(), default_recorder(store.clone()));

    let request = Request::builder()
        .uri("/visit/bad%20id")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response.status(),
        StatusCode::NOT_FOUND,
        "malformed ids should 404, not become store queries"
    );
}

#[tokio::test]
async fn test_visit_hidden_link_still_redirects_and_counts() {
    // Hiding only removes the link from the public page; a direct visit
    // to its address follows it and is counted like any other
    let store = create_test_store().await;
    store
        .create_link(test_link("hidden1", "https://example.com"))
        .await
        .unwrap();
    store.set_visibility("hidden1", false).await.unwrap();

    let app = visit::create_visit_router(store.clone(), default_recorder(store.clone()));

    let request = Request::builder()
        .uri("/visit/hidden1")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get("location").unwrap(),
        "https://example.com"
    );

    wait_for_events(&store, "hidden1", 1).await;
    let link = store.get_link_authoritative("hidden1").await.unwrap().unwrap();
    assert_eq!(link.clicks, 1);
}

#[tokio::test]
async fn test_visit_store_failure_is_500() {
    let failing: Arc<dyn LinkStore> = Arc::new(FailingStore);
    let app = visit::create_visit_router(failing.clone(), default_recorder(failing));

    let request = Request::builder()
        .uri("/visit/abc123")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_recording_failure_does_not_block_redirect() {
    // Store up for resolution, down for recording: the visitor still
    // gets the 302, no event lands, the counter is unchanged
    let resolve_store = create_test_store().await;
    resolve_store
        .create_link(test_link("abc123", "https://example.com"))
        .await
        .unwrap();

    let recording_store: Arc<dyn LinkStore> = Arc::new(FailingStore);
    let recorder = Arc::new(ClickRecorder::new(
        recording_store,
        RecorderSettings {
            max_attempts: 2,
            retry_backoff: Duration::from_millis(5),
        },
    ));

    let app = visit::create_visit_router(resolve_store.clone(), recorder);

    let request = Request::builder()
        .uri("/visit/abc123")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(resolve_store.count_click_events("abc123").await.unwrap(), 0);
    let link = resolve_store
        .get_link_authoritative("abc123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(link.clicks, 0, "counter must stay untouched");
}

#[tokio::test]
async fn test_redirect_latency_decoupled_from_recording() {
    // A recording path that never completes must not delay the 302
    let stalled = Arc::new(StalledStore {
        inner: MemoryStore::new(),
    });
    stalled
        .create_link(test_link("slow1", "https://example.com/slow"))
        .await
        .unwrap();

    let store: Arc<dyn LinkStore> = stalled;
    let app = visit::create_visit_router(store.clone(), default_recorder(store));

    let request = Request::builder()
        .uri("/visit/slow1")
        .body(Body::empty())
        .unwrap();

    let started = Instant::now();
    let response = tokio::time::timeout(Duration::from_secs(2), app.oneshot(request))
        .await
        .expect("redirect must not wait on recording")
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "redirect took {:?}, recording latency leaked into the response",
        started.elapsed()
    );
}

#[tokio::test]
async fn test_concurrent_visits_count_every_click() {
    let store = create_test_store().await;
    store
        .create_link(test_link("popular", "https://example.com"))
        .await
        .unwrap();

    let app = visit::create_visit_router(store.clone(), default_recorder(store.clone()));

    let mut handles = vec![];
    for i in 0..50 {
        let app_clone = app.clone();
        handles.push(tokio::spawn(async move {
            let request = Request::builder()
                .uri(format!("/visit/popular?vid=v{}", i % 10))
                .body(Body::empty())
                .unwrap();
            app_clone.oneshot(request).await
        }));
    }

    let mut success_count = 0;
    for handle in handles {
        if let Ok(Ok(response)) = handle.await {
            if response.status() == StatusCode::FOUND {
                success_count += 1;
            }
        }
    }
    assert_eq!(success_count, 50, "all 50 redirects should succeed");

    wait_for_events(&store, "popular", 50).await;

    let link = store.get_link_authoritative("popular").await.unwrap().unwrap();
    assert_eq!(link.clicks, 50, "no increment may be lost under concurrency");
    assert_eq!(store.count_click_events("popular").await.unwrap(), 50);
    assert_eq!(
        store.unique_visitors("popular", 0, i64::MAX).await.unwrap(),
        10
    );
}

#[tokio::test]
async fn test_health_check() {
    let store = create_test_store().await;
    let app = visit::create_visit_router(store.clone(), default_recorder(store));

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
