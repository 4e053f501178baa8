use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::clicks::ClickRecorder;
use crate::resolve::LinkResolver;
use crate::store::LinkStore;

use super::handlers::{health_check, visit_link, VisitState};
use super::middleware::stamp_visit_start;

/// Build the public visit router.
///
/// The resolver and recorder take separate store handles so recording
/// failures stay isolated from resolution (and so tests can fail one
/// side independently).
pub fn create_visit_router(store: Arc<dyn LinkStore>, recorder: Arc<ClickRecorder>) -> Router {
    let state = Arc::new(VisitState {
        resolver: LinkResolver::new(store),
        recorder,
    });

    Router::new()
        .route("/", get(health_check))
        .route("/visit/{link_id}", get(visit_link))
        .layer(middleware::from_fn(stamp_visit_start))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
