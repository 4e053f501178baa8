use crate::analytics::models::{DailyCount, HourCount};
use crate::models::{ClickEvent, Link, NewLink};
use crate::store::{LinkStore, StoreError, StoreResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct SqliteStore {
    pool: Arc<SqlitePool>,
}

impl SqliteStore {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

const LINK_COLUMNS: &str =
    "id, user_id, title, url, icon, color, is_visible, position, clicks, created_at";

#[async_trait]
impl LinkStore for SqliteStore {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                icon TEXT,
                color TEXT,
                is_visible INTEGER NOT NULL DEFAULT 1,
                position INTEGER NOT NULL DEFAULT 0,
                clicks INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_user ON links(user_id)")
            .execute(self.pool.as_ref())
            .await?;

        // Insert-only event log, the source of truth for analytics
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS click_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                link_id TEXT NOT NULL,
                visitor_id TEXT,
                clicked_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_click_events_link_time ON click_events(link_id, clicked_at)",
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn create_link(&self, link: NewLink) -> StoreResult<Link> {
        let created_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| StoreError::Other(e.into()))?
            .as_secs() as i64;

        let result = sqlx::query(
            r#"
            INSERT INTO links (id, user_id, title, url, icon, color, is_visible, position, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&link.id)
        .bind(&link.user_id)
        .bind(&link.title)
        .bind(&link.url)
        .bind(&link.icon)
        .bind(&link.color)
        .bind(link.is_visible)
        .bind(link.position)
        .bind(created_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StoreError::Other(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict);
        }

        let row = sqlx::query_as::<_, Link>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE id = ?"
        ))
        .bind(&link.id)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| StoreError::Other(e.into()))?;

        Ok(row)
    }

    async fn get_link(&self, link_id: &str) -> Result<Option<Link>> {
        let link = sqlx::query_as::<_, Link>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE id = ?"
        ))
        .bind(link_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn get_link_authoritative(&self, link_id: &str) -> Result<Option<Link>> {
        self.get_link(link_id).await
    }

    async fn list_links(&self, user_id: &str) -> Result<Vec<Link>> {
        let links = sqlx::query_as::<_, Link>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE user_id = ? ORDER BY position, created_at"
        ))
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(links)
    }

    async fn set_visibility(&self, link_id: &str, visible: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE links SET is_visible = ? WHERE id = ?")
            .bind(visible)
            .bind(link_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_clicks(&self, link_id: &str) -> Result<bool> {
        // In-place increment; no read step, so concurrent visits cannot
        // lose updates
        let result = sqlx::query("UPDATE links SET clicks = clicks + 1 WHERE id = ?")
            .bind(link_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_clicks(&self, link_id: &str, clicks: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE links SET clicks = ? WHERE id = ?")
            .bind(clicks)
            .bind(link_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_click_event(
        &self,
        link_id: &str,
        visitor_id: Option<&str>,
        clicked_at: i64,
    ) -> Result<ClickEvent> {
        let result = sqlx::query(
            r#"
            INSERT INTO click_events (link_id, visitor_id, clicked_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(link_id)
        .bind(visitor_id)
        .bind(clicked_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(ClickEvent {
            id: result.last_insert_rowid(),
            link_id: link_id.to_string(),
            visitor_id: visitor_id.map(|v| v.to_string()),
            clicked_at,
        })
    }

    async fn count_click_events(&self, link_id: &str) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM click_events WHERE link_id = ?",
        )
        .bind(link_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn daily_counts(&self, link_id: &str, start: i64, end: i64) -> Result<Vec<DailyCount>> {
        let rows = sqlx::query_as::<_, DailyCount>(
            r#"
            SELECT (clicked_at / 86400) * 86400 AS day_start, COUNT(*) AS clicks
            FROM click_events
            WHERE link_id = ? AND clicked_at >= ? AND clicked_at < ?
            GROUP BY day_start
            ORDER BY day_start
            "#,
        )
        .bind(link_id)
        .bind(start)
        .bind(end)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn unique_visitors(&self, link_id: &str, start: i64, end: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT visitor_id)
            FROM click_events
            WHERE link_id = ? AND visitor_id IS NOT NULL
              AND clicked_at >= ? AND clicked_at < ?
            "#,
        )
        .bind(link_id)
        .bind(start)
        .bind(end)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn hourly_histogram(&self, link_id: &str, start: i64, end: i64) -> Result<Vec<HourCount>> {
        let rows = sqlx::query_as::<_, HourCount>(
            r#"
            SELECT (clicked_at % 86400) / 3600 AS hour, COUNT(*) AS clicks
            FROM click_events
            WHERE link_id = ? AND clicked_at >= ? AND clicked_at < ?
            GROUP BY hour
            ORDER BY hour
            "#,
        )
        .bind(link_id)
        .bind(start)
        .bind(end)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn all_link_ids(&self) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM links")
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(ids)
    }
}
