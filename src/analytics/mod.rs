//! Read-side rollups over the click-event log.
//!
//! The event log is the ground truth; everything here is a query, never a
//! write. These are the numbers the dashboard shows: clicks per day,
//! unique visitors, peak hour.

pub mod models;

pub use models::{DailyCount, HourCount, LinkStats};

use crate::store::LinkStore;
use anyhow::{Context, Result};
use std::sync::Arc;

pub struct AnalyticsReader {
    store: Arc<dyn LinkStore>,
}

impl AnalyticsReader {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self { store }
    }

    /// Clicks per UTC day for one link within `[start, end)`
    pub async fn daily_counts(
        &self,
        link_id: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<DailyCount>> {
        self.store.daily_counts(link_id, start, end).await
    }

    /// Hour of day (UTC) with the most clicks; ties break toward the
    /// earlier hour. None when the window holds no events.
    pub async fn peak_hour(&self, link_id: &str, start: i64, end: i64) -> Result<Option<i64>> {
        let histogram = self.store.hourly_histogram(link_id, start, end).await?;
        Ok(peak_of(&histogram))
    }

    /// Full summary for one link over `[start, end)`
    pub async fn link_stats(&self, link_id: &str, start: i64, end: i64) -> Result<LinkStats> {
        let link = self
            .store
            .get_link_authoritative(link_id)
            .await?
            .with_context(|| format!("no such link: {link_id}"))?;

        let event_count = self.store.count_click_events(link_id).await?;
        let unique_visitors = self.store.unique_visitors(link_id, start, end).await?;
        let histogram = self.store.hourly_histogram(link_id, start, end).await?;

        Ok(LinkStats {
            link_id: link.id,
            cached_clicks: link.clicks,
            event_count,
            unique_visitors,
            peak_hour: peak_of(&histogram),
        })
    }
}

fn peak_of(histogram: &[HourCount]) -> Option<i64> {
    histogram
        .iter()
        .max_by(|a, b| a.clicks.cmp(&b.clicks).then(b.hour.cmp(&a.hour)))
        .map(|h| h.hour)
}
