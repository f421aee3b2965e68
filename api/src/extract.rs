//! JSON extractor that answers malformed bodies with an `ApiError` instead of
//! axum's plain-text rejection.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use crate::error::AppError;

pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(rejection_to_validation(&rejection.body_text())),
        }
    }
}

fn rejection_to_validation(body_text: &str) -> AppError {
    AppError::Validation {
        message: format!("Invalid request body: {body_text}"),
        field: Some(field_from_serde_message(body_text).unwrap_or_else(|| "body".to_string())),
        docs_hint: Some(
            "Chatra webhooks carry eventName, messages and client; see /api-doc/openapi.json."
                .to_string(),
        ),
    }
}

/// Field named in serde's "missing field `x`" / "unknown field `x`" messages.
fn field_from_serde_message(msg: &str) -> Option<String> {
    ["missing field `", "unknown field `"]
        .iter()
        .find_map(|marker| {
            let rest = &msg[msg.find(marker)? + marker.len()..];
            rest.find('`').map(|end| rest[..end].to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_field_from_missing_field_message() {
        let msg = "Failed to deserialize the JSON body into the target type: missing field `client` at line 1 column 40";
        assert_eq!(field_from_serde_message(msg), Some("client".to_string()));
    }

    #[test]
    fn picks_field_from_unknown_field_message() {
        let msg = "unknown field `chat`, expected one of `eventName`, `messages`, `client`";
        assert_eq!(field_from_serde_message(msg), Some("chat".to_string()));
    }

    #[test]
    fn generic_errors_fall_back_to_body() {
        let err = rejection_to_validation("invalid type: string, expected a sequence");
        assert!(matches!(
            err,
            AppError::Validation { field: Some(ref f), .. } if f == "body"
        ));
    }
}
