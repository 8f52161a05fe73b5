//! Mapping of every failure to an HTTP response.
//!
//! Client mistakes (bad input, missing token, unknown flow) come back with a
//! specific message. Model and storage failures are logged in full and the
//! caller only sees a generic message.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cyberguardian::error::{AccountError, FlowError, StoreError};
use serde::Serialize;
use tracing::{error, warn};

use crate::auth::AuthError;

pub const UPSTREAM_MESSAGE: &str =
    "The analysis service could not complete this request. Please try again.";
pub const STORAGE_MESSAGE: &str = "Your account data could not be saved or loaded. Please try again.";

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(AuthError),
    Validation { field: String, message: String },
    /// The body is JSON but not the shape the flow takes.
    InvalidInput { message: String, field: Option<String> },
    BadRequest(String),
    NotFound(String),
    Upstream(FlowError),
    Storage(StoreError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Validation { .. } | ApiError::InvalidInput { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Unauthorized(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<FlowError> for ApiError {
    fn from(e: FlowError) -> Self {
        match e {
            FlowError::Validation { field, message } => ApiError::Validation { field, message },
            FlowError::InvalidInput(message) => ApiError::InvalidInput {
                field: serde_field(&message),
                message,
            },
            FlowError::UnknownFlow(name) => ApiError::NotFound(format!("unknown flow '{name}'")),
            other => ApiError::Upstream(other),
        }
    }
}

/// The field a serde error names, e.g. `body` in "unknown field `body`".
fn serde_field(message: &str) -> Option<String> {
    let (_, rest) = message.split_once('`')?;
    let (field, _) = rest.split_once('`')?;
    Some(field.to_string())
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::Validation { field, message } => ApiError::Validation {
                field: field.to_string(),
                message,
            },
            AccountError::NotFound(_) => {
                ApiError::NotFound("no profile yet: start a session first".to_string())
            }
            AccountError::Store(StoreError::InvalidKey(key)) => {
                ApiError::BadRequest(format!("user id '{key}' is not supported"))
            }
            AccountError::Store(e) => ApiError::Storage(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, field) = match &self {
            ApiError::Unauthorized(e) => {
                warn!("Rejected request: {e}");
                ("authentication required".to_string(), None)
            }
            ApiError::Validation { field, message } => {
                warn!("Validation failed on '{field}': {message}");
                (format!("{field} {message}"), Some(field.as_str()))
            }
            ApiError::InvalidInput { message, field } => {
                warn!("Unreadable flow input: {message}");
                (message.clone(), field.as_deref())
            }
            ApiError::BadRequest(msg) => {
                warn!("Bad request: {msg}");
                (msg.clone(), None)
            }
            ApiError::NotFound(msg) => (msg.clone(), None),
            ApiError::Upstream(e) => {
                error!("Flow failed: {e}");
                (UPSTREAM_MESSAGE.to_string(), None)
            }
            ApiError::Storage(e) => {
                error!("Store failed: {e}");
                (STORAGE_MESSAGE.to_string(), None)
            }
        };

        let body = ErrorBody {
            error: &message,
            field,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyberguardian::error::ModelError;

    #[test]
    fn flow_errors_map_to_statuses() {
        let cases = [
            (
                FlowError::validation("content", "is required"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                FlowError::InvalidInput("missing field `content`".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (FlowError::UnknownFlow("x".into()), StatusCode::NOT_FOUND),
            (FlowError::EmptyResponse, StatusCode::BAD_GATEWAY),
            (
                FlowError::Model(ModelError::Api("overloaded".into())),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn account_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(AccountError::NotFound("u".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(AccountError::Store(StoreError::InvalidKey("a/b".into()))).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AccountError::Validation {
                field: "displayName",
                message: "is required".into(),
            })
            .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn undeserializable_input_names_the_field() {
        match ApiError::from(FlowError::InvalidInput(
            "unknown field `body`, expected one of `content`, `sender`, `subject`".into(),
        )) {
            ApiError::InvalidInput { field, .. } => assert_eq!(field.as_deref(), Some("body")),
            other => panic!("expected invalid input, got {other:?}"),
        }
        assert_eq!(serde_field("invalid type: integer, expected a string"), None);
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn upstream_details_are_not_exposed() {
        let err = ApiError::from(FlowError::Model(ModelError::Http {
            status: 401,
            body: "invalid api key sk-secret".into(),
        }));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = body_text(response).await;
        assert!(!body.contains("sk-secret"), "{body}");
        assert!(body.contains(UPSTREAM_MESSAGE));
    }

    #[tokio::test]
    async fn store_details_are_not_exposed() {
        let err = ApiError::from(AccountError::Store(StoreError::Io {
            path: "/var/lib/cyberguardian/users/u1.json".into(),
            source: std::io::Error::other("disk full"),
        }));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_text(response).await;
        assert!(!body.contains("/var/lib"), "{body}");
        assert!(body.contains(STORAGE_MESSAGE));
    }
}
