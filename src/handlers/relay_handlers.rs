use crate::services::email_relay::{EmailRelay, RelayError, RelayReceipt};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct RelayState {
    pub relay: Arc<EmailRelay>,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidJson
            | RelayError::MissingFields(_)
            | RelayError::InvalidEmail
            | RelayError::InvalidFieldTypes => StatusCode::BAD_REQUEST,
            RelayError::Authentication(_) => StatusCode::UNAUTHORIZED,
            RelayError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Configuration | RelayError::Smtp(_) | RelayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing body. Server-side detail only leaves the process for
    /// `Internal` errors, and only when `expose_details` is set.
    pub fn body(&self, expose_details: bool) -> Value {
        match self {
            RelayError::InvalidJson => json!({
                "error": "Invalid JSON format",
                "message": "Request body must be valid JSON",
            }),
            RelayError::MissingFields(received) => json!({
                "error": "Missing or empty required fields",
                "message": "receiver_email, subject, and body_text are required and cannot be empty",
                "received": received,
            }),
            RelayError::InvalidEmail => json!({
                "error": "Invalid email format",
                "message": "receiver_email must be a valid email address",
            }),
            RelayError::InvalidFieldTypes => json!({
                "error": "Invalid field types",
                "message": "subject and body_text must be strings",
            }),
            RelayError::Configuration => json!({
                "error": "Server configuration error",
                "message": "Email service is not properly configured",
            }),
            RelayError::Authentication(_) => json!({
                "error": "Authentication failed",
                "message": "Invalid email credentials. Please check EMAIL_USER and EMAIL_PASS.",
            }),
            RelayError::Connection(_) => json!({
                "error": "Service unavailable",
                "message": "Could not connect to email server. Please try again later.",
            }),
            RelayError::Smtp(_) => json!({
                "error": "SMTP error",
                "message": "Failed to send email via SMTP",
            }),
            RelayError::Internal(detail) => internal_error_body(expose_details.then_some(detail)),
        }
    }
}

pub fn internal_error_body(details: Option<&str>) -> Value {
    json!({
        "error": "Internal server error",
        "message": "Failed to send email",
        "details": details,
    })
}

fn success_body(receipt: &RelayReceipt) -> Value {
    json!({
        "success": true,
        "message": "Email sent successfully",
        "data": {
            "receiver": receipt.receiver,
            "subject": receipt.subject,
            "timestamp": receipt.timestamp,
        },
    })
}

/// Adds the headers every relay response carries, including errors.
pub fn with_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    response
}

pub fn relay_response(status: StatusCode, body: Value) -> Response {
    with_cors_headers((status, Json(body)).into_response())
}

/// POST /send-email
pub async fn send_email_handler(
    State(state): State<RelayState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::debug!("Unreadable email request body: {}", rejection);
            return relay_response(
                rejection.status(),
                json!({
                    "error": "Invalid request body",
                    "message": rejection.body_text(),
                }),
            );
        }
    };

    match state.relay.relay(&body).await {
        Ok(receipt) => relay_response(StatusCode::OK, success_body(&receipt)),
        Err(err) => {
            if err.status() == StatusCode::BAD_REQUEST {
                tracing::debug!("Rejected email request: {}", err);
            }
            relay_response(err.status(), err.body(state.relay.expose_error_details()))
        }
    }
}

/// OPTIONS /send-email
pub async fn send_email_options_handler() -> Response {
    with_cors_headers(StatusCode::NO_CONTENT.into_response())
}

/// Any other method on /send-email
pub async fn method_not_allowed_handler() -> Response {
    relay_response(
        StatusCode::METHOD_NOT_ALLOWED,
        json!({
            "error": "Method not allowed",
            "message": "Use POST to send an email",
        }),
    )
}

pub async fn not_found_handler() -> Response {
    relay_response(
        StatusCode::NOT_FOUND,
        json!({
            "error": "Not found",
            "message": "The only endpoint is /send-email",
        }),
    )
}
