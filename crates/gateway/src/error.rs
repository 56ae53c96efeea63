//! The error taxonomy of spec §7 as one `thiserror`-derived enum, converted
//! to the domain-shaped JSON error body on the way out through axum.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::types::messages::{MessagesError, MessagesErrorResponse};

#[derive(Debug, Error)]
pub enum GatewayError {
	#[error("invalid request: {0}")]
	InvalidRequest(String),

	#[error("routing error: {0}")]
	Routing(String),

	#[error("authentication error: {0}")]
	Authentication(String),

	#[error("provider error ({status}): {message}")]
	Provider { status: u16, message: String },

	#[error("timeout: {0}")]
	Timeout(String),

	#[error("rate limited: {0}")]
	RateLimited(String),

	#[error("internal error: {0}")]
	Internal(String),

	#[error("upstream api error ({status}): {message}")]
	Api { status: u16, message: String },
}

impl GatewayError {
	pub fn status(&self) -> StatusCode {
		match self {
			GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
			GatewayError::Routing(_) => StatusCode::INTERNAL_SERVER_ERROR,
			GatewayError::Authentication(_) => StatusCode::UNAUTHORIZED,
			GatewayError::Provider { status, .. } => {
				StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
			},
			GatewayError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
			GatewayError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
			GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
			GatewayError::Api { status, .. } => {
				StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
			},
		}
	}

	/// The `error.type` string carried in the Messages-format error body.
	pub fn error_type(&self) -> &'static str {
		match self {
			GatewayError::InvalidRequest(_) => "invalid_request",
			GatewayError::Routing(_) => "routing_error",
			GatewayError::Authentication(_) => "authentication_error",
			GatewayError::Provider { .. } => "provider_error",
			GatewayError::Timeout(_) => "timeout_error",
			GatewayError::RateLimited(_) => "rate_limited",
			GatewayError::Internal(_) => "internal_error",
			GatewayError::Api { .. } => "api_error",
		}
	}

	/// Render as a Messages-format `error` SSE event payload (§7 propagation
	/// rule for mid-stream failures).
	pub fn to_messages_error(&self) -> MessagesError {
		MessagesError {
			kind: self.error_type().to_string(),
			message: self.to_string(),
		}
	}
}

impl IntoResponse for GatewayError {
	fn into_response(self) -> Response {
		let status = self.status();
		let body = MessagesErrorResponse {
			kind: "error".to_string(),
			error: self.to_messages_error(),
		};
		(status, Json(body)).into_response()
	}
}
