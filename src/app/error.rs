use crate::utils::error::BenchError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

impl BenchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BenchError::InvalidInputError { .. } => StatusCode::BAD_REQUEST,
            e if e.is_upstream() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BenchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
