//! Debug/observability hook (§4 expansion): a seam for recording what the
//! dispatcher does per request without hard-wiring any particular sink,
//! mirrored on the teacher's `telemetry::log::AsyncLog` pattern — here kept
//! to a plain trait since nothing downstream needs async batching yet.

use crate::error::GatewayError;

/// Observes one request's lifecycle. The default implementation just emits
/// `tracing` events; a test harness can swap in something that records
/// calls for assertions.
pub trait DebugSink: Send + Sync {
	fn request_started(&self, request_id: &str, model: &str, provider: &str) {
		let _ = (request_id, model, provider);
	}

	fn request_completed(&self, request_id: &str, status: u16, input_tokens: u64, output_tokens: u64) {
		let _ = (request_id, status, input_tokens, output_tokens);
	}

	fn request_error(&self, request_id: &str, error: &GatewayError) {
		let _ = (request_id, error);
	}

	fn sse_event(&self, request_id: &str, event_name: &str) {
		let _ = (request_id, event_name);
	}
}

/// Records every request lifecycle event via `tracing`, at a level
/// proportionate to its severity.
pub struct TracingDebugSink;

impl DebugSink for TracingDebugSink {
	fn request_started(&self, request_id: &str, model: &str, provider: &str) {
		tracing::info!(request_id, model, provider, "request started");
	}

	fn request_completed(&self, request_id: &str, status: u16, input_tokens: u64, output_tokens: u64) {
		tracing::info!(request_id, status, input_tokens, output_tokens, "request completed");
	}

	fn request_error(&self, request_id: &str, error: &GatewayError) {
		tracing::warn!(request_id, error = %error, "request failed");
	}

	fn sse_event(&self, request_id: &str, event_name: &str) {
		tracing::debug!(request_id, event_name, "sse event");
	}
}
