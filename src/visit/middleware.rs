use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;

/// When the visit request entered the router; the handler reports the
/// elapsed time in the timing header on the redirect.
#[derive(Copy, Clone)]
pub struct VisitStart(pub Instant);

pub async fn stamp_visit_start(mut request: Request<Body>, next: Next) -> Response {
    request.extensions_mut().insert(VisitStart(Instant::now()));
    next.run(request).await
}
