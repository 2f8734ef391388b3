pub mod challenge_questions;
pub mod health;
pub mod security_question;

// common functions for the handlers
use crate::recovery::{ErrorCode, RecoveryError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const SERVER_ERROR_MESSAGE: &str = "Server Error";

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Client errors carry their message; server errors only their code.
#[must_use]
pub fn error_response(err: &RecoveryError) -> Response {
    if err.is_client() {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                code: err.code().to_string(),
                message: err.message().to_string(),
            }),
        )
            .into_response()
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                code: err.code().to_string(),
                message: SERVER_ERROR_MESSAGE.to_string(),
            }),
        )
            .into_response()
    }
}

#[must_use]
pub fn invalid_request(message: impl Into<String>) -> Response {
    error_response(&RecoveryError::new(ErrorCode::InvalidRequest, message))
}

/// `en_US` style locale, case-insensitive.
#[must_use]
pub fn valid_locale(locale: &str) -> bool {
    Regex::new(r"^[a-zA-Z]{2}_[a-zA-Z]{2}$").is_ok_and(|re| re.is_match(locale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locales() {
        assert!(valid_locale("en_US"));
        assert!(valid_locale("fr_fr"));
        assert!(!valid_locale("en-US"));
        assert!(!valid_locale("english"));
        assert!(!valid_locale(""));
    }

    #[test]
    fn server_errors_hide_details() {
        let response = error_response(&RecoveryError::unexpected("db password is hunter2"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = error_response(&RecoveryError::user_not_found("alice"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
