//! The HTTP front end: `/log` (tail + filter + redirect) and `/ls` (local or
//! cluster-wide listing), assembled the way the teacher assembles its API
//! router in `crates/librqbit/src/http_api.rs` — routes, a permissive CORS
//! layer, and a tracing span per request.

pub mod error;
pub mod log;
pub mod ls;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::ClusterState;

/// `"t"`/`"true"` (case-insensitive) is truthy; anything else, including
/// absence, is not. Used for the `g` and `r` query flags.
pub(crate) fn is_truthy(value: &Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("t") | Some("true")
    )
}

pub(crate) fn wants_json(headers: &axum::http::HeaderMap) -> bool {
    headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"))
}

pub fn router(state: ClusterState) -> Router {
    Router::new()
        .route("/log", get(log::handle_log))
        .route("/ls", get(ls::handle_ls))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
