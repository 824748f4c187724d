//! JSON response helpers shared by the pipeline and backends.
//!
//! Every body is newline-terminated JSON with `content-type: application/json`.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use serde::Serialize;
use serde_json::json;
use std::fmt::Display;
use tracing::error;

pub const APPLICATION_JSON: &str = "application/json";

/// Serialises `value` as the response body with the given status.
///
/// Falls back to a generic 500 if serialisation fails.
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => raw_json(status, body),
        Err(e) => {
            error!("Failed to serialise response body: {}", e);
            internal_server_error(&e, false)
        }
    }
}

/// 404 with a `null` body.
pub fn not_found() -> Response {
    raw_json(StatusCode::NOT_FOUND, b"null".to_vec())
}

/// 403 with a fixed error body.
pub fn not_authorised() -> Response {
    error_body(StatusCode::FORBIDDEN, "not authorised")
}

/// 500 carrying either a generic message or, when `detailed`, the error text.
pub fn internal_server_error(err: &dyn Display, detailed: bool) -> Response {
    if detailed {
        error_body(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
    } else {
        error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    raw_json(status, json!({ "error": message }).to_string().into_bytes())
}

fn raw_json(status: StatusCode, mut body: Vec<u8>) -> Response {
    body.push(b'\n');
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(APPLICATION_JSON),
    );
    response
}
