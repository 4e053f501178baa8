use crate::analytics::models::{DailyCount, HourCount};
use crate::models::{ClickEvent, Link, NewLink};
use crate::store::{LinkStore, StoreError, StoreResult};
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// In-memory backend used for tests and local development.
///
/// Links live in a DashMap so the counter increment happens under the
/// shard lock for that key, giving the same no-lost-updates guarantee the
/// SQL backends get from `clicks = clicks + 1`.
pub struct MemoryStore {
    links: DashMap<String, Link>,
    events: DashMap<i64, ClickEvent>,
    next_event_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            links: DashMap::new(),
            events: DashMap::new(),
            next_event_id: AtomicI64::new(1),
        }
    }

    fn events_in_window(&self, link_id: &str, start: i64, end: i64) -> Vec<ClickEvent> {
        self.events
            .iter()
            .filter(|entry| {
                let ev = entry.value();
                ev.link_id == link_id && ev.clicked_at >= start && ev.clicked_at < end
            })
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn create_link(&self, link: NewLink) -> StoreResult<Link> {
        let created_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| StoreError::Other(e.into()))?
            .as_secs() as i64;

        let row = Link {
            id: link.id.clone(),
            user_id: link.user_id,
            title: link.title,
            url: link.url,
            icon: link.icon,
            color: link.color,
            is_visible: link.is_visible,
            position: link.position,
            clicks: 0,
            created_at,
        };

        // Entry API keeps the existence check and insert under one shard
        // lock, matching the SQL ON CONFLICT DO NOTHING semantics
        match self.links.entry(link.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::Conflict),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(row.clone());
                Ok(row)
            }
        }
    }

    async fn get_link(&self, link_id: &str) -> Result<Option<Link>> {
        Ok(self.links.get(link_id).map(|entry| entry.value().clone()))
    }

    async fn get_link_authoritative(&self, link_id: &str) -> Result<Option<Link>> {
        self.get_link(link_id).await
    }

    async fn list_links(&self, user_id: &str) -> Result<Vec<Link>> {
        let mut links: Vec<Link> = self
            .links
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        links.sort_by_key(|l| (l.position, l.created_at));
        Ok(links)
    }

    async fn set_visibility(&self, link_id: &str, visible: bool) -> Result<bool> {
        match self.links.get_mut(link_id) {
            Some(mut entry) => {
                entry.value_mut().is_visible = visible;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn increment_clicks(&self, link_id: &str) -> Result<bool> {
        match self.links.get_mut(link_id) {
            Some(mut entry) => {
                entry.value_mut().clicks += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_clicks(&self, link_id: &str, clicks: i64) -> Result<bool> {
        match self.links.get_mut(link_id) {
            Some(mut entry) => {
                entry.value_mut().clicks = clicks;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_click_event(
        &self,
        link_id: &str,
        visitor_id: Option<&str>,
        clicked_at: i64,
    ) -> Result<ClickEvent> {
        let id = self.next_event_id.fetch_add(1, Ordering::Relaxed);
        let event = ClickEvent {
            id,
            link_id: link_id.to_string(),
            visitor_id: visitor_id.map(|v| v.to_string()),
            clicked_at,
        };
        self.events.insert(id, event.clone());
        Ok(event)
    }

    async fn count_click_events(&self, link_id: &str) -> Result<i64> {
        let count = self
            .events
            .iter()
            .filter(|entry| entry.value().link_id == link_id)
            .count();
        Ok(count as i64)
    }

    async fn daily_counts(&self, link_id: &str, start: i64, end: i64) -> Result<Vec<DailyCount>> {
        let mut days: BTreeMap<i64, i64> = BTreeMap::new();
        for event in self.events_in_window(link_id, start, end) {
            let day_start = (event.clicked_at / 86400) * 86400;
            *days.entry(day_start).or_insert(0) += 1;
        }
        Ok(days
            .into_iter()
            .map(|(day_start, clicks)| DailyCount { day_start, clicks })
            .collect())
    }

    async fn unique_visitors(&self, link_id: &str, start: i64, end: i64) -> Result<i64> {
        let mut visitors: Vec<String> = self
            .events_in_window(link_id, start, end)
            .into_iter()
            .filter_map(|ev| ev.visitor_id)
            .collect();
        visitors.sort();
        visitors.dedup();
        Ok(visitors.len() as i64)
    }

    async fn hourly_histogram(&self, link_id: &str, start: i64, end: i64) -> Result<Vec<HourCount>> {
        let mut hours: BTreeMap<i64, i64> = BTreeMap::new();
        for event in self.events_in_window(link_id, start, end) {
            let hour = (event.clicked_at % 86400) / 3600;
            *hours.entry(hour).or_insert(0) += 1;
        }
        Ok(hours
            .into_iter()
            .map(|(hour, clicks)| HourCount { hour, clicks })
            .collect())
    }

    async fn all_link_ids(&self) -> Result<Vec<String>> {
        Ok(self.links.iter().map(|entry| entry.key().clone()).collect())
    }
}
