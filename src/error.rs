use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Rejections produced while extracting and verifying the bearer token.
/// Each maps to 401 with its own stable wire code.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication token not provided")]
    MissingAuthHeader,
    #[error("Invalid token format. Use: Bearer <token>")]
    InvalidTokenFormat,
    #[error("Token not provided")]
    MissingToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Malformed token")]
    MalformedToken,
    #[error("Token does not carry the required identity")]
    InvalidTokenContent,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "MISSING_AUTH_HEADER",
            AuthError::InvalidTokenFormat => "INVALID_TOKEN_FORMAT",
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::MalformedToken => "MALFORMED_TOKEN",
            AuthError::InvalidTokenContent => "INVALID_TOKEN_CONTENT",
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid image URL")]
    InvalidImageUrl,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    NotFound(String),
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidImageUrl => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::InvalidImageUrl => "INVALID_IMAGE_URL",
            ApiError::Auth(e) => e.code(),
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::DuplicateEmail => "DUPLICATE_EMAIL",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(e) = &self {
            // The real cause stays in the logs; the client gets a generic message.
            error!(error = ?e, "internal error");
        }
        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
            "code": self.code(),
        }));
        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_unauthorized_with_distinct_codes() {
        let all = [
            AuthError::MissingAuthHeader,
            AuthError::InvalidTokenFormat,
            AuthError::MissingToken,
            AuthError::TokenExpired,
            AuthError::MalformedToken,
            AuthError::InvalidTokenContent,
        ];
        let mut codes: Vec<&str> = all.iter().map(|e| e.code()).collect();
        for e in all {
            assert_eq!(ApiError::from(e).status_code(), StatusCode::UNAUTHORIZED);
        }
        codes.dedup();
        assert_eq!(codes.len(), 6);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::validation("title is required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::InvalidImageUrl.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::DuplicateEmail.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_error_hides_detail() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "Internal server error");
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }
}
