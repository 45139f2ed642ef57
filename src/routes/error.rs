use std::fmt::Debug;

use actix_web::http::header;
use actix_web::http::header::ContentType;
use actix_web::http::Method;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use actix_web::ResponseError;

use crate::authentication::AuthError;

/// Every way a request can fail. Messages of the first three variants are
/// safe to show to the caller; the rest are logged with their cause chain
/// and answered with a generic message.
#[derive(thiserror::Error)]
pub enum ApiError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Access denied")]
    Unauthorized,
    #[error("Server misconfiguration")]
    Misconfigured(#[source] anyhow::Error),
    #[error("Internal Server Error")]
    StorageFailure(#[from] sqlx::Error),
    #[error("Internal Server Error")]
    Unexpected(#[source] anyhow::Error),
}

impl Debug for ApiError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidToken => Self::Unauthorized,
            AuthError::Misconfigured => Self::Misconfigured(e.into()),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::Misconfigured(_) | Self::StorageFailure(_) | Self::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(
                error.cause_chain = ?self,
                error.message = %self,
                "request failed"
            );
        }

        let mut resp = HttpResponse::build(status);
        resp.content_type(ContentType::plaintext());
        if let Self::MethodNotAllowed = self {
            resp.insert_header(header::Allow(vec![Method::POST]));
        }
        // `Display` never includes the source, so 5xx bodies stay generic
        resp.body(self.to_string())
    }
}

/// Write `e` followed by each of its sources, one per line
pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{e}\n")?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{cause}")?;
        current = cause.source();
    }
    Ok(())
}

/// Fallback for `/unsubscribe`, which only accepts `POST`
pub async fn method_not_allowed() -> Result<HttpResponse, ApiError> {
    Err(ApiError::MethodNotAllowed)
}
