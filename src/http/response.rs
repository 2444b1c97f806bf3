//! JSON response envelope and HTTP-boundary error type.
//!
//! Matches the teacher's `proxy::api::ApiError` / `proxy::error::ProxyError`
//! shape: an enum of variants holding a message, matched to a status code,
//! logged before conversion to a response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// `{success, code, data}` envelope wrapping every successful response body.
#[derive(Debug, Serialize)]
pub struct CacheResponse<T: Serialize> {
    pub success: bool,
    pub code: i32,
    pub data: T,
}

impl<T: Serialize> CacheResponse<T> {
    pub fn ok(data: T) -> Json<CacheResponse<T>> {
        Json(CacheResponse {
            success: true,
            code: 0,
            data,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

/// Errors surfaced to HTTP clients. The Cache Map and Write Queue are never
/// touched while building one of these — client errors short-circuit
/// before any state mutation.
#[derive(Debug)]
pub enum CacheApiError {
    BadRequest(String),
    NotFound,
    Internal(String),
}

impl CacheApiError {
    fn status(&self) -> StatusCode {
        match self {
            CacheApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CacheApiError::NotFound => StatusCode::NOT_FOUND,
            CacheApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> i32 {
        match self {
            CacheApiError::BadRequest(_) => 400,
            CacheApiError::NotFound => 404,
            CacheApiError::Internal(_) => 500,
        }
    }

    fn message(&self) -> String {
        match self {
            CacheApiError::BadRequest(msg) => msg.clone(),
            CacheApiError::NotFound => "not found".to_string(),
            CacheApiError::Internal(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for CacheApiError {
    fn into_response(self) -> Response {
        if matches!(self, CacheApiError::Internal(_)) {
            tracing::error!(error = %self.message(), "request failed");
        }
        let body = CacheResponse {
            success: false,
            code: self.code(),
            data: Message {
                message: self.message(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}
