use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Body of every error response: `{ "error": "..." }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Rejected before any network call.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The external API answered with a failure, or could not be reached.
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    /// A credential or setting the request needs is absent.
    #[error("{0}")]
    Config(&'static str),

    /// Store failure; `context` is the user-facing description.
    #[error("{context}: {source}")]
    Database {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn db(context: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| {
            error!(error=%source, "{context}");
            AppError::Database { context, source }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream { status, .. } => *status,
            AppError::Config(_) | AppError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Store errors only expose their context.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database { context, .. } => context.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error=%self, status=%status, "request failed");
        }
        (status, Json(ErrorBody::new(self.public_message()))).into_response()
    }
}
