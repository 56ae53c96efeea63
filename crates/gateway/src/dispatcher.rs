//! Request Dispatcher (§4.I): end-to-end per-request orchestration —
//! route selection, token estimation, the failover chain, and per-attempt
//! retry with backoff — tying together routing, the registry, and the
//! failover policy.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::debug::DebugSink;
use crate::error::GatewayError;
use crate::failover::FailoverPolicy;
use crate::provider::ByteStream;
use crate::registry::ProviderRegistry;
use crate::routing::RoutingTable;
use crate::token_estimator::estimate_input_tokens;
use crate::types::messages::{MessagesRequest, MessagesResponse};

/// A dispatched body plus the bookkeeping the HTTP layer attaches as
/// response headers (§6: `X-Request-Id`, `X-Provider` on every reply).
pub struct Dispatched<T> {
	pub request_id: String,
	pub provider: String,
	pub body: T,
}

pub struct Dispatcher {
	pub registry: Arc<ProviderRegistry>,
	pub routing: Arc<RoutingTable>,
	pub failover: FailoverPolicy,
	pub debug: Arc<dyn DebugSink>,
}

impl Dispatcher {
	pub fn new(registry: Arc<ProviderRegistry>, routing: Arc<RoutingTable>, failover: FailoverPolicy, debug: Arc<dyn DebugSink>) -> Self {
		Dispatcher {
			registry,
			routing,
			failover,
			debug,
		}
	}

	/// Build the ordered chain of providers to attempt for this request:
	/// the routing engine picks the primary and an optional explicit
	/// fallback, and the failover policy orders them against every other
	/// currently-registered provider.
	fn failover_chain(&self, request: &MessagesRequest, agent_type: Option<&str>) -> (Vec<String>, String) {
		let payload = serde_json::to_value(request).unwrap_or(serde_json::Value::Null);
		let context_tokens = estimate_input_tokens(&payload);
		let ruleset = self.routing.load();
		let primary = ruleset.select_provider(request, agent_type, context_tokens).to_string();
		let fallback = ruleset.matching_fallback(request, agent_type, context_tokens).map(str::to_string);
		let available = self.registry.list_names();
		let chain = self.failover.build_failover_chain(&primary, fallback.as_deref(), &available);
		(chain, primary)
	}

	pub async fn dispatch(&self, request: &MessagesRequest, agent_type: Option<&str>) -> Result<Dispatched<MessagesResponse>, GatewayError> {
		let request_id = format!("req_{}", Uuid::new_v4().simple());
		let (chain, primary) = self.failover_chain(request, agent_type);
		if chain.is_empty() {
			return Err(GatewayError::Routing(format!("no providers available, wanted '{primary}'")));
		}

		let mut last_err = None;
		for provider_name in &chain {
			let Some(record) = self.registry.get(provider_name) else { continue };
			if self.failover.should_failover(&record.health()) {
				continue;
			}

			self.debug.request_started(&request_id, &request.model, provider_name);
			match self.attempt_with_retries(&record.provider, request).await {
				Ok(response) => {
					self.debug.request_completed(&request_id, 200, response.usage.input_tokens, response.usage.output_tokens);
					return Ok(Dispatched {
						request_id,
						provider: provider_name.clone(),
						body: response,
					});
				},
				Err(err) => {
					self.debug.request_error(&request_id, &err);
					last_err = Some(err);
				},
			}
		}

		Err(last_err.unwrap_or_else(|| GatewayError::Routing("all providers in the failover chain failed".to_string())))
	}

	async fn attempt_with_retries(&self, provider: &Arc<dyn crate::provider::Provider>, request: &MessagesRequest) -> Result<MessagesResponse, GatewayError> {
		let mut attempt = 1;
		loop {
			match provider.send(request).await {
				Ok(resp) => return Ok(resp),
				Err(err) => {
					let retryable = matches!(&err, GatewayError::Provider { status, .. } if self.failover.should_retry(*status));
					if !retryable || attempt >= self.failover.max_retries {
						return Err(err);
					}
					tokio::time::sleep(self.failover.retry_delay_for(attempt)).await;
					attempt += 1;
				},
			}
		}
	}

	/// Streaming path: selects the first healthy provider in the failover
	/// chain and hands its translated byte stream straight back — the
	/// stream itself is mid-flight once opened, so failover can't happen
	/// after the first byte without re-sending `message_start` (left as a
	/// gap the caller should surface as a stream-level `error` event
	/// instead of retrying transparently).
	pub async fn dispatch_stream(&self, request: &MessagesRequest, agent_type: Option<&str>) -> Result<Dispatched<ByteStream>, GatewayError> {
		let request_id = format!("req_{}", Uuid::new_v4().simple());
		let (chain, primary) = self.failover_chain(request, agent_type);
		if chain.is_empty() {
			return Err(GatewayError::Routing(format!("no providers available, wanted '{primary}'")));
		}

		let mut last_err = None;
		for provider_name in &chain {
			let Some(record) = self.registry.get(provider_name) else { continue };
			if self.failover.should_failover(&record.health()) {
				continue;
			}
			self.debug.request_started(&request_id, &request.model, provider_name);
			match record.provider.stream(request).await {
				Ok(stream) => {
					return Ok(Dispatched {
						request_id,
						provider: provider_name.clone(),
						body: stream,
					});
				},
				Err(err) => {
					self.debug.request_error(&request_id, &err);
					last_err = Some(err);
				},
			}
		}

		Err(last_err.unwrap_or_else(|| GatewayError::Routing("all providers in the failover chain failed".to_string())))
	}
}

#[allow(dead_code)]
fn jittered(delay: Duration) -> Duration {
	delay
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::debug::TracingDebugSink;
	use crate::provider::{ApiFormat, Provider};
	use crate::routing::{Ruleset, RoutingTable};
	use crate::types::messages::{Message, MessageContent, Role};
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct FlakyProvider {
		name: &'static str,
		fail_times: AtomicUsize,
	}

	#[async_trait]
	impl Provider for FlakyProvider {
		fn name(&self) -> &str {
			self.name
		}
		fn api_format(&self) -> ApiFormat {
			ApiFormat::Generative
		}
		async fn health_check(&self) -> Result<(), GatewayError> {
			Ok(())
		}
		async fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse, GatewayError> {
			if self.fail_times.fetch_sub(1, Ordering::SeqCst) > 0 {
				return Err(GatewayError::Provider { status: 503, message: "overloaded".to_string() });
			}
			Ok(MessagesResponse {
				id: "msg_1".to_string(),
				kind: "message".to_string(),
				role: Role::Assistant,
				model: request.model.clone(),
				content: vec![],
				stop_reason: None,
				stop_sequence: None,
				usage: Default::default(),
			})
		}
		async fn stream(&self, _request: &MessagesRequest) -> Result<ByteStream, GatewayError> {
			unimplemented!()
		}
	}

	fn request() -> MessagesRequest {
		MessagesRequest {
			model: "claude-sonnet-4-5".to_string(),
			messages: vec![Message {
				role: Role::User,
				content: MessageContent::Text("hi".to_string()),
			}],
			system: None,
			tools: None,
			tool_choice: None,
			thinking: None,
			max_tokens: Some(100),
			temperature: None,
			top_p: None,
			top_k: None,
			stop_sequences: None,
			stream: false,
			metadata: None,
		}
	}

	#[tokio::test]
	async fn retries_transient_errors_before_succeeding() {
		let registry = Arc::new(ProviderRegistry::new());
		registry
			.register(Arc::new(FlakyProvider {
				name: "anthropic",
				fail_times: AtomicUsize::new(2),
			}))
			.unwrap();
		let routing = Arc::new(RoutingTable::new(Ruleset::new("anthropic".to_string(), vec![])));
		let dispatcher = Dispatcher::new(registry, routing, FailoverPolicy::default(), Arc::new(TracingDebugSink));

		let dispatched = dispatcher.dispatch(&request(), None).await.unwrap();
		assert_eq!(dispatched.body.model, "claude-sonnet-4-5");
		assert_eq!(dispatched.provider, "anthropic");
	}

	#[tokio::test]
	async fn no_registered_providers_errors_cleanly() {
		let registry = Arc::new(ProviderRegistry::new());
		let routing = Arc::new(RoutingTable::new(Ruleset::new("anthropic".to_string(), vec![])));
		let dispatcher = Dispatcher::new(registry, routing, FailoverPolicy::default(), Arc::new(TracingDebugSink));

		let err = dispatcher.dispatch(&request(), None).await.unwrap_err();
		assert!(matches!(err, GatewayError::Routing(_)));
	}
}
