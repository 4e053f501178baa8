//! Row types for click-event rollups

use serde::{Deserialize, Serialize};

/// Clicks within one UTC day. `day_start` is the Unix timestamp of
/// midnight at the start of the day.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DailyCount {
    pub day_start: i64,
    pub clicks: i64,
}

/// Clicks within one hour-of-day bucket (0..=23, UTC), summed across the
/// queried window.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HourCount {
    pub hour: i64,
    pub clicks: i64,
}

/// Per-link summary combining the cached counter with ground truth from
/// the event log.
#[derive(Debug, Clone, Serialize)]
pub struct LinkStats {
    pub link_id: String,
    /// Denormalized counter on the link row
    pub cached_clicks: i64,
    /// `count(click_events)` for the link, all time
    pub event_count: i64,
    /// Distinct non-null visitor ids in the queried window
    pub unique_visitors: i64,
    /// Hour of day (UTC) with the most clicks in the window, if any
    pub peak_hour: Option<i64>,
}
