use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

/// Tool-call error envelope: `{"status":"error","message":...}` (spec §7),
/// carried over an HTTP status the way the teacher's `RouteErrorResponse`
/// pairs a status code with a JSON body (`web::common::RouteErrorResponse`).
#[derive(Debug, Serialize)]
pub struct ToolError {
    #[serde(skip)]
    status_code: StatusCode,
    status: &'static str,
    message: String,
}

impl ToolError {
    fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self { status_code, status: "error", message: message.into() }
    }
}

impl From<model::MetroError> for ToolError {
    fn from(err: model::MetroError) -> Self {
        let status = match err {
            model::MetroError::UnknownStation(_) | model::MetroError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            model::MetroError::MetroClosed | model::MetroError::NoRoute => StatusCode::UNPROCESSABLE_ENTITY,
            model::MetroError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            model::MetroError::ExpiredCallback => StatusCode::GONE,
        };
        Self::new(status, err.to_string())
    }
}

impl From<store::StoreError> for ToolError {
    fn from(err: store::StoreError) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
    }
}

impl IntoResponse for ToolError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code, Json(self)).into_response()
    }
}

pub type ToolResult<T> = Result<T, ToolError>;
