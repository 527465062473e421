//! Webhook handlers
//!
//! Live-coverage reports from the newsroom's document-database listener.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::domain::entities::Slug;
use crate::error::AppError;
use crate::AppState;

/// Live-coverage webhook payload
#[derive(Debug, Deserialize)]
pub struct LiveCoveragePayload {
    pub slug: String,
    pub live: bool,
}

#[derive(Debug, Serialize)]
pub struct LiveCoverageResponse {
    pub slug: String,
    pub live: bool,
    /// Open sessions that had not seen this article go live yet
    pub notified: usize,
}

/// Verify the HMAC-SHA256 signature of a webhook body
fn verify_signature(payload: &[u8], signature: Option<&str>, secret: &Option<String>) -> bool {
    let Some(secret) = secret else {
        // No secret configured, skip verification (development mode)
        tracing::warn!("Live webhook secret not configured, skipping signature verification");
        return true;
    };

    let Some(sig_header) = signature else {
        tracing::warn!("No signature provided in live-coverage webhook");
        return false;
    };

    let expected_hex = sig_header.strip_prefix("sha256=").unwrap_or(sig_header);

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => {
            tracing::error!("Invalid live webhook secret key");
            return false;
        }
    };

    mac.update(payload);

    let expected_bytes = match hex::decode(expected_hex) {
        Ok(bytes) => bytes,
        Err(_) => {
            tracing::warn!("Invalid signature format");
            return false;
        }
    };

    mac.verify_slice(&expected_bytes).is_ok()
}

/// POST /webhooks/live-coverage
///
/// Lock every feed whose last article just went live. Marks are never
/// cleared, so `live: false` is accepted and ignored.
pub async fn live_coverage_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<LiveCoverageResponse>, AppError> {
    let signature = headers
        .get("X-Live-Signature")
        .and_then(|h| h.to_str().ok());

    if !verify_signature(&body, signature, &state.config.live_webhook_secret) {
        tracing::warn!("Live webhook signature verification failed");
        return Err(AppError::Unauthorized);
    }

    let payload: LiveCoveragePayload = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "Failed to parse live webhook payload");
        AppError::BadRequest(format!("Invalid JSON: {}", e))
    })?;
    let slug = Slug::parse(&payload.slug)?;

    let notified = if payload.live {
        state.feed_sessions.mark_live(slug.clone()).await
    } else {
        tracing::debug!(slug = %slug, "Ignoring end of live coverage");
        0
    };

    Ok(Json(LiveCoverageResponse {
        slug: slug.to_string(),
        live: payload.live,
        notified,
    }))
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
