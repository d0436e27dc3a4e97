use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::services::category::CategoryError;
use crate::services::dictionary::WordError;
use crate::services::quiz::QuizError;

pub const INTERNAL_ERROR: &str = "Internal server error";

/// Error rendered as a plain-text body. Non-operational errors never leak
/// their message to the client.
#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            is_operational: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn operational(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            is_operational: true,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            INTERNAL_ERROR.to_string()
        };

        (
            self.status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}

/// How a missing entity is reported; some endpoints answer 400, others 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    BadRequest,
    NotFound,
}

impl Missing {
    fn render(self, message: &str) -> AppError {
        match self {
            Self::BadRequest => AppError::bad_request(message),
            Self::NotFound => AppError::not_found(message),
        }
    }
}

pub fn category_error(err: CategoryError, missing: Missing) -> AppError {
    match err {
        CategoryError::Validation(msg) | CategoryError::Conflict(msg) => AppError::bad_request(msg),
        CategoryError::NotFound(msg) => missing.render(msg),
        CategoryError::Store(err) => {
            tracing::warn!(error = %err, "category store call failed");
            AppError::internal(err.to_string())
        }
        CategoryError::Media(err) => {
            tracing::warn!(error = %err, "category media call failed");
            AppError::internal(err.to_string())
        }
    }
}

pub fn word_error(err: WordError, missing: Missing) -> AppError {
    match err {
        WordError::Validation(msg) | WordError::Conflict(msg) => AppError::bad_request(msg),
        WordError::NotFound(msg) => missing.render(msg),
        WordError::Contention => AppError::conflict(err.to_string()),
        WordError::Store(_) | WordError::Media(_) | WordError::Speech(_) => {
            tracing::warn!(error = %err, "word upstream call failed");
            AppError::internal(err.to_string())
        }
    }
}

pub fn quiz_error(err: QuizError) -> AppError {
    match err {
        QuizError::Validation(msg) => AppError::bad_request(msg),
        QuizError::Words(err) => word_error(err, Missing::BadRequest),
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;
    use crate::services::media::MediaError;

    async fn body_text(err: AppError) -> (StatusCode, String) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn operational_errors_keep_their_message() {
        let (status, body) = body_text(AppError::bad_request("Category already exists")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Category already exists");
    }

    #[tokio::test]
    async fn upstream_errors_are_masked() {
        let err = category_error(
            CategoryError::Media(MediaError::Unavailable("bucket offline".into())),
            Missing::NotFound,
        );
        let (status, body) = body_text(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, INTERNAL_ERROR);
    }

    #[test]
    fn missing_entities_follow_endpoint_convention() {
        let as_400 = word_error(WordError::NotFound("gone"), Missing::BadRequest);
        let as_404 = word_error(WordError::NotFound("gone"), Missing::NotFound);
        assert_eq!(as_400.status(), StatusCode::BAD_REQUEST);
        assert_eq!(as_404.status(), StatusCode::NOT_FOUND);
        let contention = word_error(WordError::Contention, Missing::NotFound);
        assert_eq!(contention.status(), StatusCode::CONFLICT);
    }
}
