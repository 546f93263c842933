use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{ApiError, Result};
use super::{is_truthy, wants_json};
use crate::self_id::primary_ipv4_and_hostname;
use crate::state::ClusterState;

#[derive(Debug, Deserialize)]
pub struct LsQuery {
    #[serde(rename = "fn", default)]
    pub fn_: String,
    #[serde(default)]
    pub g: Option<String>,
}

#[derive(Serialize)]
struct LocalListing {
    host: String,
    ip: String,
    port: u16,
    files: Vec<String>,
}

#[derive(Serialize)]
struct ClusterListing {
    ip: String,
    port: u16,
    files: Vec<String>,
}

pub async fn handle_ls(
    State(state): State<ClusterState>,
    Query(query): Query<LsQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    if is_truthy(&query.g) {
        return Ok(cluster_listing(&state, wants_json(&headers)));
    }
    local_listing(&state, &query.fn_, wants_json(&headers)).await
}

async fn local_listing(state: &ClusterState, subpath: &str, json: bool) -> Result<Response> {
    if subpath.contains("..") {
        return Err(ApiError::bad_request("fn must not contain '..'"));
    }
    let dir = state.log_root.join(subpath.trim_start_matches('/'));

    let mut read_dir = tokio::fs::read_dir(&dir)
        .await
        .map_err(|_| ApiError::not_found(format!("{} not found", dir.display())))?;

    let mut files = Vec::new();
    loop {
        let entry = read_dir
            .next_entry()
            .await
            .map_err(|e| ApiError::from(anyhow::Error::from(e)))?;
        let Some(entry) = entry else { break };
        if let Ok(name) = entry.file_name().into_string() {
            files.push(name);
        } else {
            warn!(dir = %dir.display(), "skipping non-utf8 directory entry");
        }
    }
    files.sort();

    if json {
        let (host, ip) = primary_ipv4_and_hostname()?;
        let body = LocalListing {
            host,
            ip: ip.to_string(),
            port: state.http_port,
            files,
        };
        Ok(axum::Json(body).into_response())
    } else {
        Ok((StatusCode::OK, files.join(" ")).into_response())
    }
}

fn cluster_listing(state: &ClusterState, json: bool) -> Response {
    let peer_files = state.peer_files.load();

    if json {
        let listings: Vec<ClusterListing> = peer_files
            .iter()
            .map(|(key, files)| {
                let (ip, port) = split_peer_key(key);
                ClusterListing {
                    ip,
                    port,
                    files: files.clone(),
                }
            })
            .collect();
        axum::Json(listings).into_response()
    } else {
        let mut body = String::new();
        for (key, files) in peer_files.iter() {
            body.push_str(key);
            body.push_str(":\n");
            for file in files {
                body.push_str(file);
                body.push('\n');
            }
            body.push('\n');
        }
        (StatusCode::OK, body).into_response()
    }
}

fn split_peer_key(key: &str) -> (String, u16) {
    match key.rsplit_once(':') {
        Some((ip, port)) => (ip.to_string(), port.parse().unwrap_or(0)),
        None => (key.to_string(), 0),
    }
}
