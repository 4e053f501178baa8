use crate::models::Link;
use crate::store::LinkStore;
use std::sync::Arc;
use thiserror::Error;

/// Longest link id we will even send to the store
pub const MAX_LINK_ID_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// No such link, or the id is malformed. Surfaces as a 404.
    #[error("link not found")]
    NotFound,
    /// The store itself failed during lookup. Surfaces as a 500 and is
    /// safe for the client to retry.
    #[error("link lookup failed")]
    Failed(#[from] anyhow::Error),
}

/// Maps an opaque link id to its stored record. Read-only.
#[derive(Clone)]
pub struct LinkResolver {
    store: Arc<dyn LinkStore>,
}

impl LinkResolver {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self { store }
    }

    /// Hidden links still resolve: hiding only removes a link from the
    /// public page, a direct visit to its address follows it and counts.
    pub async fn resolve(&self, link_id: &str) -> Result<Link, ResolveError> {
        // Reject malformed ids before they become store queries
        if !is_well_formed(link_id) {
            return Err(ResolveError::NotFound);
        }

        self.store
            .get_link(link_id)
            .await?
            .ok_or(ResolveError::NotFound)
    }
}

fn is_well_formed(link_id: &str) -> bool {
    !link_id.is_empty()
        && link_id.len() <= MAX_LINK_ID_LEN
        && link_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
