use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::state::AppState;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Rejects requests whose `X-Webhook-Secret` does not match the configured
/// secret. A no-op when no secret is configured.
pub async fn require_webhook_secret(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = state.webhook_secret.as_deref() {
        let provided = req
            .headers()
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());
        if !secret_matches(expected, provided) {
            tracing::warn!(path = %req.uri().path(), "Rejected request with bad webhook secret");
            return Err(AppError::Unauthorized);
        }
    }
    Ok(next.run(req).await)
}

/// Compares SHA-256 digests so the comparison length never depends on the input.
fn secret_matches(expected: &str, provided: Option<&str>) -> bool {
    let Some(provided) = provided else {
        return false;
    };
    let expected = hex::encode(Sha256::digest(expected.as_bytes()));
    let provided = hex::encode(Sha256::digest(provided.as_bytes()));
    expected
        .bytes()
        .zip(provided.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_secret_passes() {
        assert!(secret_matches("hook-secret", Some("hook-secret")));
    }

    #[test]
    fn wrong_or_missing_secret_fails() {
        assert!(!secret_matches("hook-secret", Some("hook-secreT")));
        assert!(!secret_matches("hook-secret", Some("")));
        assert!(!secret_matches("hook-secret", None));
    }
}
