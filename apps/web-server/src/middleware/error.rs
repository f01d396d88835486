//! Error handling - maps handler failures to pages and redirects.

use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header};

use yatube_core::error::RepoError;
use yatube_core::ports::{AuthError, CacheError, MediaError};

use crate::config::LOGIN_URL;

const NOT_FOUND_PAGE: &str = include_str!("../../templates/errors/404.html");
const SERVER_ERROR_PAGE: &str = include_str!("../../templates/errors/500.html");

/// Application-level error type.
///
/// Validation failures and the silent edit denial are not errors: handlers
/// answer those with a normal render or redirect.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Protected route hit without a valid session.
    #[error("Login required for {next}")]
    LoginRequired { next: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    /// `/auth/login/?next=<path>`, with slashes left readable.
    pub fn login_url(next: &str) -> String {
        let encoded = urlencoding::encode(next).replace("%2F", "/");
        format!("{LOGIN_URL}?next={encoded}")
    }
}

fn html(status: StatusCode, body: &'static str) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(body)
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::LoginRequired { .. } => StatusCode::FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::NotFound(what) => {
                tracing::debug!(what = %what, "Not found");
                html(StatusCode::NOT_FOUND, NOT_FOUND_PAGE)
            }
            AppError::LoginRequired { next } => HttpResponse::Found()
                .insert_header((header::LOCATION, Self::login_url(next)))
                .finish(),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                html(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_PAGE)
            }
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound("Resource not found".to_string()),
            RepoError::Constraint(msg) => {
                tracing::error!("Database constraint violation: {}", msg);
                AppError::Internal("Database error".to_string())
            }
            RepoError::Connection(msg) => {
                tracing::error!("Database connection error: {}", msg);
                AppError::Internal("Database error".to_string())
            }
            RepoError::Query(msg) => {
                tracing::error!("Database query error: {}", msg);
                AppError::Internal("Database error".to_string())
            }
        }
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        AppError::Internal(format!("Media storage: {err}"))
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        AppError::Internal(format!("Cache: {err}"))
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Internal(format!("Auth: {err}"))
    }
}

impl From<tera::Error> for AppError {
    fn from(err: tera::Error) -> Self {
        // The top-level message omits which template or variable failed.
        let mut detail = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        AppError::Internal(format!("Template rendering failed: {detail}"))
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
