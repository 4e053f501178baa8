use axum::{
    extract::{Path, Query, State},
    http::{
        header::{HeaderMap, HeaderValue, LOCATION},
        StatusCode,
    },
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::middleware::VisitStart;
use crate::clicks::ClickRecorder;
use crate::resolve::{LinkResolver, ResolveError};
use crate::visitor;

pub struct VisitState {
    pub resolver: LinkResolver,
    pub recorder: Arc<ClickRecorder>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Deserialize)]
pub struct VisitQuery {
    pub vid: Option<String>,
}

/// Resolve a link and redirect to its destination, recording the click
/// in the background.
///
/// The 302 goes out as soon as resolution succeeds; recording runs in a
/// detached task so a slow or failing store can undercount a click but
/// never delay or fail the redirect.
pub async fn visit_link(
    State(state): State<Arc<VisitState>>,
    Path(link_id): Path<String>,
    Query(query): Query<VisitQuery>,
    Extension(VisitStart(visit_start)): Extension<VisitStart>,
    headers: HeaderMap,
) -> Response {
    let link = match state.resolver.resolve(&link_id).await {
        Ok(link) => link,
        Err(ResolveError::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "link not found".to_string(),
                }),
            )
                .into_response();
        }
        Err(ResolveError::Failed(err)) => {
            tracing::error!(link_id = %link_id, error = %err, "link lookup failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal server error".to_string(),
                }),
            )
                .into_response();
        }
    };

    let location = match HeaderValue::from_str(&link.url) {
        Ok(value) => value,
        Err(_) => {
            tracing::error!(link_id = %link.id, "stored destination is not a valid Location header");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal server error".to_string(),
                }),
            )
                .into_response();
        }
    };

    let visitor_id = visitor::from_request(&headers, query.vid.as_deref());

    // Fire-and-forget: the task outlives this request, so recording
    // completes even if the client drops the connection right after the
    // redirect
    let recorder = Arc::clone(&state.recorder);
    let record_link_id = link.id.clone();
    tokio::spawn(async move {
        let vid = visitor_id.as_ref().map(|v| v.as_str());
        if let Err(err) = recorder.record(&record_link_id, vid).await {
            tracing::warn!(link_id = %record_link_id, error = %err, "click recording failed");
        }
    });

    let mut response_headers = HeaderMap::new();
    response_headers.insert(LOCATION, location);
    if let Ok(value) = HeaderValue::from_str(&visit_start.elapsed().as_millis().to_string()) {
        response_headers.insert("x-lynks-timing-total-ms", value);
    }

    (StatusCode::FOUND, response_headers).into_response()
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    #[derive(Serialize)]
    struct HealthResponse {
        status: String,
    }

    Json(HealthResponse {
        status: "OK".to_string(),
    })
}
