//! Error answers in the remote API's `{code, message}` shape

use apiprobe_common::ApiMessage;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StubError {
    #[error("bad request ({code}): {message}")]
    BadRequest { code: &'static str, message: String },

    #[error("unauthorized ({code}): {message}")]
    Unauthorized { code: &'static str, message: String },

    #[error("not found ({code}): {message}")]
    NotFound { code: &'static str, message: String },

    #[error("not acceptable ({code}): {message}")]
    NotAcceptable { code: &'static str, message: String },

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("service unavailable")]
    Unavailable,
}

pub type StubResult<T> = std::result::Result<T, StubError>;

impl StubError {
    pub fn missing_credentials() -> Self {
        Self::BadRequest {
            code: "1200",
            message: "UserName and Password required.".to_string(),
        }
    }

    pub fn not_authorized() -> Self {
        Self::Unauthorized {
            code: "1200",
            message: "User not authorized!".to_string(),
        }
    }

    pub fn wrong_user_id() -> Self {
        Self::Unauthorized {
            code: "1207",
            message: "User Id not correct!".to_string(),
        }
    }

    pub fn unknown_isbn() -> Self {
        Self::BadRequest {
            code: "1205",
            message: "ISBN supplied is not available in Books Collection!".to_string(),
        }
    }

    pub fn isbn_not_in_collection() -> Self {
        Self::BadRequest {
            code: "1206",
            message: "ISBN supplied is not available in User's Collection!".to_string(),
        }
    }

    pub fn isbn_already_present() -> Self {
        Self::BadRequest {
            code: "1210",
            message: "ISBN already present in the User's Collection!".to_string(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for StubError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            StubError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            StubError::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, code, message)
            }
            StubError::NotFound { code, message } => (StatusCode::NOT_FOUND, code, message),
            StubError::NotAcceptable { code, message } => {
                (StatusCode::NOT_ACCEPTABLE, code, message)
            }
            StubError::UnsupportedMediaType(message) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "0", message)
            }
            StubError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "0",
                "Service temporarily unavailable".to_string(),
            ),
        };

        tracing::debug!(status = %status.as_u16(), code, "stub error answer");

        (status, Json(ApiMessage::new(code, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            StubError::not_authorized().into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            StubError::isbn_already_present().into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            StubError::Unavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
