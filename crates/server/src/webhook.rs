//! Webhook gate: authenticated trigger for a repository sync.
//!
//! One endpoint, signed payloads only. The body is opaque bytes; only the
//! signature over it matters. Rejections stay deliberately vague beyond
//! which check failed being logged server-side.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{error, info};

use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "x-hub-signature-256";

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/github-commit", post(github_commit))
        .with_state(state)
}

/// Constant-time check of `sha256=<hex>` against the body's HMAC.
fn verify_signature(secret: &str, body: &[u8], header: &str) -> bool {
    let Some(hex_digest) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(supplied) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&supplied).is_ok()
}

async fn github_commit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        info!(remote = %remote, "post request without x-hub-signature-256 header");
        return (StatusCode::FORBIDDEN, "x-hub-signature-256 header is missing!").into_response();
    };

    if !verify_signature(&state.secret, &body, signature) {
        info!(remote = %remote, "post request with invalid signature");
        return (StatusCode::FORBIDDEN, "signature doesn't match!").into_response();
    }

    info!(remote = %remote, "post request with valid signature");

    if !state.guard.try_begin() {
        return (StatusCode::SERVICE_UNAVAILABLE, "update already in progress").into_response();
    }
    let result = state.sync.sync().await;
    state.guard.end();

    match result {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            error!("repository sync failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "sync failed").into_response()
        }
    }
}
