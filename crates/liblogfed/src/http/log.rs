use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::Query;
use serde::Deserialize;

use super::error::{ApiError, Result};
use super::is_truthy;
use crate::self_id::primary_ipv4_and_hostname;
use crate::state::ClusterState;
use crate::tail::{TailCount, emit_stream};

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(rename = "fn", default)]
    pub fn_: Option<String>,
    #[serde(default)]
    pub n: Option<i64>,
    #[serde(default)]
    pub ftr: Vec<String>,
    #[serde(default)]
    pub r: Option<String>,
}

pub async fn handle_log(
    State(state): State<ClusterState>,
    Query(query): Query<LogQuery>,
) -> Result<Response> {
    let fn_ = query
        .fn_
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing required query parameter 'fn'"))?;

    if fn_.contains('/') || fn_.contains("..") {
        return Err(ApiError::bad_request("fn must be a flat filename"));
    }

    if is_truthy(&query.r) {
        if let Some(location) = redirect_location(&state, fn_, &query)? {
            let mut response = StatusCode::MOVED_PERMANENTLY.into_response();
            response
                .headers_mut()
                .insert(header::LOCATION, HeaderValue::from_str(&location).map_err(|e| {
                    ApiError::from(anyhow::Error::from(e).context("building redirect Location header"))
                })?);
            return Ok(response);
        }
    }

    let path = state.log_root.join(fn_);
    if tokio::fs::metadata(&path).await.is_err() {
        return Err(ApiError::not_found(format!("{fn_} not found")));
    }

    let filters = crate::filter::FilterSpec::parse(query.ftr.iter().map(String::as_str));
    let count = TailCount::from_query(query.n);
    let stream = emit_stream(path, count, filters);

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(stream),
    )
        .into_response())
}

/// If `fn` is known to live on a remote peer per the File Index, build the
/// `Location` this request should redirect to. Returns `None` when the file
/// is local, unknown, or happens to resolve to this very node (in which
/// case serving locally is equivalent and avoids a pointless hop).
fn redirect_location(state: &ClusterState, fn_: &str, query: &LogQuery) -> Result<Option<String>> {
    let Some(peer) = state.file_index.load().get(fn_).cloned() else {
        return Ok(None);
    };

    let (_, self_ip) = primary_ipv4_and_hostname()?;
    if peer.ip == self_ip.to_string() && peer.port == state.http_port {
        return Ok(None);
    }

    let mut location = format!(
        "http://{}:{}/log?fn={}",
        peer.ip,
        peer.port,
        urlencoding::encode(fn_)
    );
    if let Some(n) = query.n {
        location.push_str(&format!("&n={n}"));
    }
    for clause in &query.ftr {
        location.push_str("&ftr=");
        location.push_str(&clause.replace(' ', "+"));
    }
    Ok(Some(location))
}
