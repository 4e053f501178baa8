use crate::analytics::models::{DailyCount, HourCount};
use crate::models::{ClickEvent, Link, NewLink};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("link id already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The one store contract every backend satisfies.
///
/// The original product talked to two hosted document databases through
/// near-identical get/update/insert/query calls; this trait is that
/// contract, so any backend can sit behind the resolver and recorder.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Initialize the storage (create tables, indexes, etc.)
    async fn init(&self) -> Result<()>;

    /// Create a new link with a caller-provided id
    async fn create_link(&self, link: NewLink) -> StoreResult<Link>;

    /// Get a link by id
    async fn get_link(&self, link_id: &str) -> Result<Option<Link>>;

    /// Get a link by id, bypassing any read cache
    async fn get_link_authoritative(&self, link_id: &str) -> Result<Option<Link>>;

    /// List a user's links in display order
    async fn list_links(&self, user_id: &str) -> Result<Vec<Link>>;

    /// Show or hide a link on the public page
    async fn set_visibility(&self, link_id: &str, visible: bool) -> Result<bool>;

    /// Atomically increment the cached click counter.
    ///
    /// Must be an in-place increment at the store level (no read step),
    /// so concurrent visits to the same link never lose updates.
    /// Returns false if the link no longer exists.
    async fn increment_clicks(&self, link_id: &str) -> Result<bool>;

    /// Overwrite the cached click counter (reconciliation only)
    async fn set_clicks(&self, link_id: &str, clicks: i64) -> Result<bool>;

    /// Append an immutable click event
    async fn insert_click_event(
        &self,
        link_id: &str,
        visitor_id: Option<&str>,
        clicked_at: i64,
    ) -> Result<ClickEvent>;

    /// Ground-truth click total for a link
    async fn count_click_events(&self, link_id: &str) -> Result<i64>;

    /// Clicks per UTC day within `[start, end)`
    async fn daily_counts(&self, link_id: &str, start: i64, end: i64) -> Result<Vec<DailyCount>>;

    /// Distinct non-null visitor ids within `[start, end)`
    async fn unique_visitors(&self, link_id: &str, start: i64, end: i64) -> Result<i64>;

    /// Clicks per hour-of-day (UTC) within `[start, end)`
    async fn hourly_histogram(&self, link_id: &str, start: i64, end: i64) -> Result<Vec<HourCount>>;

    /// Ids of every stored link (reconciliation scan)
    async fn all_link_ids(&self) -> Result<Vec<String>>;
}
