/// Error handling for the API server
///
/// [`ApiError`] wraps the shared [`DomainError`] taxonomy and is the single
/// place status codes are chosen. Handlers return `ApiResult<T>`; the `?`
/// operator lifts both `DomainError` and `sqlx::Error` into it.
///
/// Every error body has the same shape on the wire:
///
/// ```json
/// { "detail": "Authentication was unsuccessful." }
/// ```
///
/// Status mapping:
///
/// - `Validation` → 422
/// - `Authentication`, `NotActive` → 401
/// - `Forbidden` → 403
/// - `NotFound` → 404
/// - `Conflict` → 400, detail naming the violated field
/// - `Internal` → 500, detail withheld and logged server-side

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use taskdeck_shared::error::DomainError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Newtype over the domain taxonomy carrying the HTTP mapping
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub DomainError);

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError(DomainError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DomainError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::Authentication | DomainError::NotActive => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden => StatusCode::FORBIDDEN,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Conflict(_) => StatusCode::BAD_REQUEST,
            DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let detail = match &self.0 {
            DomainError::Internal(err) => {
                tracing::error!("internal error: {:#}", err);
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: DomainError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(DomainError::validation("title", "too long")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(DomainError::Authentication),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_of(DomainError::NotActive), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(DomainError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(DomainError::NotFound("task".to_string())),
            StatusCode::NOT_FOUND
        );
        // Uniqueness conflicts are reported as 400, not 409
        assert_eq!(
            status_of(DomainError::Conflict("username".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::Internal(anyhow::anyhow!("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
