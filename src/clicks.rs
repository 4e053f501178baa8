use crate::store::LinkStore;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    /// The click event could not be appended. Nothing was written; the
    /// counter is left untouched so it never runs ahead of the log.
    #[error("failed to append click event")]
    EventAppend(#[source] anyhow::Error),
    /// The event was appended but the counter increment kept failing.
    /// The counter now undercounts until reconciliation repairs it.
    #[error("failed to increment click counter")]
    CounterIncrement(#[source] anyhow::Error),
}

/// Retry policy for the counter increment. Bounded, so a degraded store
/// sheds increments instead of piling up retries.
#[derive(Debug, Clone)]
pub struct RecorderSettings {
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

/// Records one visit: append the immutable click event, then bump the
/// cached counter.
///
/// The append comes first because the event log is the source of truth;
/// a lost increment is an undercount the reconcile job can repair, but a
/// lost event is gone for good.
pub struct ClickRecorder {
    store: Arc<dyn LinkStore>,
    settings: RecorderSettings,
}

impl ClickRecorder {
    pub fn new(store: Arc<dyn LinkStore>, settings: RecorderSettings) -> Self {
        Self { store, settings }
    }

    pub async fn record(&self, link_id: &str, visitor_id: Option<&str>) -> Result<(), RecordError> {
        let clicked_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| RecordError::EventAppend(e.into()))
            .map(|d| d.as_secs() as i64)?;

        self.store
            .insert_click_event(link_id, visitor_id, clicked_at)
            .await
            .map_err(RecordError::EventAppend)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.store.increment_clicks(link_id).await {
                // Ok(false): link deleted between resolve and record;
                // the event stands and there is no counter to bump
                Ok(_) => return Ok(()),
                Err(err) if attempt < self.settings.max_attempts => {
                    tracing::warn!(
                        link_id = %link_id,
                        attempt,
                        error = %err,
                        "click counter increment failed, retrying"
                    );
                    tokio::time::sleep(self.settings.retry_backoff * attempt).await;
                }
                Err(err) => return Err(RecordError::CounterIncrement(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewLink;
    use crate::store::MemoryStore;

    fn test_link(id: &str) -> NewLink {
        NewLink {
            id: id.to_string(),
            user_id: "user1".to_string(),
            title: "t".to_string(),
            url: "https://example.com".to_string(),
            icon: None,
            color: None,
            is_visible: true,
            position: 0,
        }
    }

    #[tokio::test]
    async fn record_appends_event_and_increments_counter() {
        let store = Arc::new(MemoryStore::new());
        store.create_link(test_link("abc123")).await.unwrap();

        let recorder = ClickRecorder::new(store.clone(), RecorderSettings::default());
        recorder.record("abc123", Some("v1")).await.unwrap();

        let link = store.get_link("abc123").await.unwrap().unwrap();
        assert_eq!(link.clicks, 1);
        assert_eq!(store.count_click_events("abc123").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn record_without_visitor_is_unattributed() {
        let store = Arc::new(MemoryStore::new());
        store.create_link(test_link("anon")).await.unwrap();

        let recorder = ClickRecorder::new(store.clone(), RecorderSettings::default());
        recorder.record("anon", None).await.unwrap();

        assert_eq!(store.count_click_events("anon").await.unwrap(), 1);
        assert_eq!(store.unique_visitors("anon", 0, i64::MAX).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_records_lose_no_increments() {
        let store = Arc::new(MemoryStore::new());
        store.create_link(test_link("popular")).await.unwrap();

        let recorder = Arc::new(ClickRecorder::new(
            store.clone(),
            RecorderSettings::default(),
        ));

        let mut handles = vec![];
        for i in 0..50 {
            let recorder = Arc::clone(&recorder);
            handles.push(tokio::spawn(async move {
                let visitor = format!("v{}", i % 10);
                recorder.record("popular", Some(&visitor)).await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let link = store.get_link("popular").await.unwrap().unwrap();
        assert_eq!(link.clicks, 50, "no increment may be lost");
        assert_eq!(store.count_click_events("popular").await.unwrap(), 50);
    }

    #[tokio::test]
    async fn deleted_link_keeps_the_event() {
        let store = Arc::new(MemoryStore::new());

        let recorder = ClickRecorder::new(store.clone(), RecorderSettings::default());
        // No such link: the append still lands, the increment is a no-op
        recorder.record("ghost", Some("v1")).await.unwrap();

        assert_eq!(store.count_click_events("ghost").await.unwrap(), 1);
    }
}
