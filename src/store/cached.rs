use crate::analytics::models::{DailyCount, HourCount};
use crate::models::{ClickEvent, Link, NewLink};
use crate::store::{LinkStore, StoreResult};
use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Read-caching wrapper for the resolution hot path.
///
/// Only `get_link` is served from cache; every write passes straight
/// through. A cached entry may carry a stale `clicks` value until the TTL
/// expires, which is fine: the resolver only needs `url`, and visibility
/// changes invalidate the entry for the listing side.
pub struct CachedStore {
    inner: Arc<dyn LinkStore>,
    read_cache: Cache<String, Option<Link>>,
}

impl CachedStore {
    pub fn new(inner: Arc<dyn LinkStore>, max_entries: u64, ttl_secs: u64) -> Self {
        let read_cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { inner, read_cache }
    }

    async fn invalidate(&self, link_id: &str) {
        self.read_cache.invalidate(link_id).await;
    }
}

#[async_trait]
impl LinkStore for CachedStore {
    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn create_link(&self, link: NewLink) -> StoreResult<Link> {
        let created = self.inner.create_link(link).await?;

        self.read_cache
            .insert(created.id.clone(), Some(created.clone()))
            .await;

        Ok(created)
    }

    async fn get_link(&self, link_id: &str) -> Result<Option<Link>> {
        if let Some(cached) = self.read_cache.get(link_id).await {
            return Ok(cached);
        }

        let result = self.inner.get_link(link_id).await?;

        self.read_cache
            .insert(link_id.to_string(), result.clone())
            .await;

        Ok(result)
    }

    async fn get_link_authoritative(&self, link_id: &str) -> Result<Option<Link>> {
        let db_value = self.inner.get_link_authoritative(link_id).await?;

        // Keep cache in sync with the latest database read
        self.read_cache
            .insert(link_id.to_string(), db_value.clone())
            .await;

        Ok(db_value)
    }

    async fn list_links(&self, user_id: &str) -> Result<Vec<Link>> {
        self.inner.list_links(user_id).await
    }

    async fn set_visibility(&self, link_id: &str, visible: bool) -> Result<bool> {
        let updated = self.inner.set_visibility(link_id, visible).await?;

        if updated {
            self.invalidate(link_id).await;
        }

        Ok(updated)
    }

    async fn increment_clicks(&self, link_id: &str) -> Result<bool> {
        // Pass through untouched; the cached counter goes stale for at
        // most one TTL, and authoritative reads bypass the cache
        self.inner.increment_clicks(link_id).await
    }

    async fn set_clicks(&self, link_id: &str, clicks: i64) -> Result<bool> {
        let updated = self.inner.set_clicks(link_id, clicks).await?;

        if updated {
            self.invalidate(link_id).await;
        }

        Ok(updated)
    }

    async fn insert_click_event(
        &self,
        link_id: &str,
        visitor_id: Option<&str>,
        clicked_at: i64,
    ) -> Result<ClickEvent> {
        self.inner
            .insert_click_event(link_id, visitor_id, clicked_at)
            .await
    }

    async fn count_click_events(&self, link_id: &str) -> Result<i64> {
        self.inner.count_click_events(link_id).await
    }

    async fn daily_counts(&self, link_id: &str, start: i64, end: i64) -> Result<Vec<DailyCount>> {
        self.inner.daily_counts(link_id, start, end).await
    }

    async fn unique_visitors(&self, link_id: &str, start: i64, end: i64) -> Result<i64> {
        self.inner.unique_visitors(link_id, start, end).await
    }

    async fn hourly_histogram(&self, link_id: &str, start: i64, end: i64) -> Result<Vec<HourCount>> {
        self.inner.hourly_histogram(link_id, start, end).await
    }

    async fn all_link_ids(&self) -> Result<Vec<String>> {
        self.inner.all_link_ids().await
    }
}
