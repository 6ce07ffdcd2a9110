use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use repolens_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to bind {0}: {1}")]
    Bind(String, std::io::Error),
    #[error("server error: {0}")]
    Server(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Repository not found")]
    RepositoryNotFound,
    #[error("Missing or invalid bearer token")]
    Unauthorized,
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error(transparent)]
    Core(CoreError),
}

impl From<CoreError> for GatewayError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::RepositoryNotFound(_) => Self::RepositoryNotFound,
            CoreError::EmptyUpload => Self::BadRequest("No files could be read from the upload".into()),
            other => Self::Core(other),
        }
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RepositoryNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Bind(..) | Self::Server(_) | Self::Core(_) => {
                tracing::error!("request failed: {self}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_shape_errors_map_to_4xx() {
        let not_found: GatewayError = CoreError::RepositoryNotFound("x".into()).into();
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let empty: GatewayError = CoreError::EmptyUpload.into();
        assert_eq!(empty.into_response().status(), StatusCode::BAD_REQUEST);

        assert_eq!(
            GatewayError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::RateLimited.into_response().status(),
            StatusCode::TOO_MANY_REQUESTS
        );

        let timeout: GatewayError = CoreError::Timeout(30).into();
        assert_eq!(
            timeout.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
