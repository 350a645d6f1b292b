//! Public rotation endpoint.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use rotation::RequestMeta;
use tracing::info;

use crate::error::Result;
use crate::state::AppState;

/// Redirect a visitor to the next agent's `wa.me` link.
pub async fn rotate(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Response> {
    let meta = request_meta(&headers, peer.map(|ConnectInfo(addr)| addr));
    let dispatch = state.dispatcher.dispatch(&slug, meta).await?;

    info!(
        group = %dispatch.group_slug,
        agent_id = dispatch.agent.agent_id,
        slot = dispatch.slot,
        "Rotation redirect"
    );

    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, dispatch.redirect_url),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
    )
        .into_response())
}

/// Collect visitor metadata for the click log.
///
/// The client IP is the first `X-Forwarded-For` hop when present, otherwise
/// the socket peer.
pub fn request_meta(headers: &HeaderMap, peer: Option<SocketAddr>) -> RequestMeta {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    RequestMeta {
        user_agent: header_value(header::USER_AGENT),
        ip_address: forwarded.or_else(|| peer.map(|addr| addr.ip().to_string())),
        referrer: header_value(header::REFERER),
    }
}
