use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user-owned link shown on the public profile page.
///
/// `clicks` is a denormalized cache of the number of `click_events` rows
/// referencing this link; the event log is the source of truth and the
/// reconcile job repairs drift.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Link {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub is_visible: bool,
    pub position: i64,
    pub clicks: i64,
    pub created_at: i64,
}

/// Fields supplied when creating a link (counter and timestamp are set by
/// the store).
#[derive(Debug, Clone)]
pub struct NewLink {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub is_visible: bool,
    pub position: i64,
}

/// Immutable record of one visit to a link. Never updated or deleted by
/// the interactive path.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClickEvent {
    pub id: i64,
    pub link_id: String,
    pub visitor_id: Option<String>,
    pub clicked_at: i64,
}
