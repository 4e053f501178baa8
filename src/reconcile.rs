//! Counter reconciliation.
//!
//! The cached `clicks` counter on each link can drift below the event
//! log when an increment is dropped after its event was appended. This
//! job recomputes every counter from `count(click_events)`, the ground
//! truth. Runs on demand from the admin CLI or periodically in the
//! server.

use crate::store::LinkStore;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info};

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub links_checked: u64,
    pub counters_repaired: u64,
}

pub struct Reconciler {
    store: Arc<dyn LinkStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self { store }
    }

    /// Set every link's counter to its event count. Links whose counter
    /// already matches are left untouched.
    pub async fn reconcile_all(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for link_id in self.store.all_link_ids().await? {
            report.links_checked += 1;

            let event_count = self.store.count_click_events(&link_id).await?;
            let link = match self.store.get_link_authoritative(&link_id).await? {
                Some(link) => link,
                // Deleted since the scan; nothing to repair
                None => continue,
            };

            if link.clicks != event_count {
                self.store.set_clicks(&link_id, event_count).await?;
                report.counters_repaired += 1;
                info!(
                    link_id = %link_id,
                    cached = link.clicks,
                    actual = event_count,
                    "repaired click counter"
                );
            }
        }

        Ok(report)
    }
}

/// Spawn the periodic reconciliation task. The first run happens one
/// full interval after startup.
pub fn spawn_periodic(store: Arc<dyn LinkStore>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let reconciler = Reconciler::new(store);
        let mut ticker = time::interval(interval);
        // Skip the first tick which fires immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match reconciler.reconcile_all().await {
                Ok(report) => {
                    info!(
                        links_checked = report.links_checked,
                        counters_repaired = report.counters_repaired,
                        "reconciliation pass complete"
                    );
                }
                Err(err) => {
                    error!(error = %err, "reconciliation pass failed");
                }
            }
        }
    })
}
