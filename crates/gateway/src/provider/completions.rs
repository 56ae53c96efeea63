//! Chat-Completions (OpenAI-style) provider, grounded in
//! `original_source/src/a2c/providers/openai.py`: `POST /v1/chat/completions`
//! with a bearer token, `data:`-framed SSE for streaming.

use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::provider::{ApiFormat, ByteStream, Provider, ProviderConfig};
use crate::sse::SseDecoder;
use crate::streaming::completions::CompletionsStreamTranslator;
use crate::translate::completions::{translate_request, translate_response};
use crate::types::completions::{ErrorResponse, Response, StreamResponse};
use crate::types::messages::{MessagesRequest, MessagesResponse};

pub struct CompletionsProvider {
	config: ProviderConfig,
	client: Client,
}

impl CompletionsProvider {
	pub fn new(config: ProviderConfig) -> Result<Self, GatewayError> {
		let client = Client::builder()
			.timeout(std::time::Duration::from_secs(config.timeout_secs))
			.build()
			.map_err(|e| GatewayError::Internal(format!("failed to build http client: {e}")))?;
		Ok(CompletionsProvider { config, client })
	}

	fn endpoint(&self) -> String {
		format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/'))
	}

	fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
		match &self.config.api_key {
			Some(key) if !key.is_empty() => builder.bearer_auth(key),
			_ => builder,
		}
	}
}

#[async_trait]
impl Provider for CompletionsProvider {
	fn name(&self) -> &str {
		&self.config.name
	}

	fn api_format(&self) -> ApiFormat {
		ApiFormat::Completions
	}

	async fn health_check(&self) -> Result<(), GatewayError> {
		if self.config.api_key.as_deref().unwrap_or("").is_empty() {
			return Err(GatewayError::Authentication("api key not configured".to_string()));
		}
		let body = serde_json::json!({
			"model": self.config.default_model,
			"messages": [{"role": "user", "content": "hi"}],
			"max_tokens": 1,
		});
		let resp = self.authed(self.client.post(self.endpoint()).json(&body)).send().await.map_err(http_error)?;
		if resp.status().is_success() {
			Ok(())
		} else {
			Err(GatewayError::Provider {
				status: resp.status().as_u16(),
				message: format!("health probe failed with status {}", resp.status()),
			})
		}
	}

	async fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse, GatewayError> {
		let payload = translate_request(request, &self.config.default_model);
		let resp = self.authed(self.client.post(self.endpoint()).json(&payload)).send().await.map_err(http_error)?;

		let status = resp.status();
		let body_bytes = resp.bytes().await.map_err(http_error)?;
		if !status.is_success() {
			let message = serde_json::from_slice::<ErrorResponse>(&body_bytes)
				.map(|e| e.error.message)
				.unwrap_or_else(|_| String::from_utf8_lossy(&body_bytes).to_string());
			return Err(GatewayError::Provider { status: status.as_u16(), message });
		}

		let completions_response: Response =
			serde_json::from_slice(&body_bytes).map_err(|e| GatewayError::InvalidRequest(format!("malformed upstream response: {e}")))?;
		Ok(translate_response(&completions_response, &request.model))
	}

	async fn stream(&self, request: &MessagesRequest) -> Result<ByteStream, GatewayError> {
		let mut payload = translate_request(request, &self.config.default_model);
		payload.stream = true;
		let message_id = format!("msg_{}", Uuid::new_v4().simple());
		let request_model = request.model.clone();
		let estimated_input_tokens =
			crate::token_estimator::estimate_input_tokens(&serde_json::to_value(request).unwrap_or(serde_json::Value::Null));

		let resp = self.authed(self.client.post(self.endpoint()).json(&payload)).send().await.map_err(http_error)?;
		let status = resp.status();
		if !status.is_success() {
			let body_bytes = resp.bytes().await.unwrap_or_default();
			return Err(GatewayError::Provider {
				status: status.as_u16(),
				message: String::from_utf8_lossy(&body_bytes).to_string(),
			});
		}

		let stream = try_stream! {
			let mut upstream = resp.bytes_stream();
			let mut decoder = SseDecoder::new();
			let mut translator = CompletionsStreamTranslator::new(message_id, request_model, estimated_input_tokens);

			let mut failed = false;
			while let Some(chunk) = upstream.next().await {
				let chunk = match chunk {
					Ok(c) => c,
					Err(e) => {
						for event in translator.handle_error(&http_error(e)) {
							yield event.to_sse_bytes();
						}
						failed = true;
						break;
					},
				};
				for payload in decoder.feed(chunk) {
					let parsed: StreamResponse = match serde_json::from_str(&payload) {
						Ok(p) => p,
						Err(_) => continue,
					};
					for event in translator.handle_chunk(parsed) {
						yield event.to_sse_bytes();
					}
				}
			}
			if !failed {
				for event in translator.finish() {
					yield event.to_sse_bytes();
				}
			}
		};

		Ok(Box::pin(stream))
	}
}

fn http_error(e: reqwest::Error) -> GatewayError {
	if e.is_timeout() {
		GatewayError::Timeout(e.to_string())
	} else {
		GatewayError::Internal(e.to_string())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn endpoint_targets_chat_completions() {
		let provider = CompletionsProvider::new(ProviderConfig {
			name: "openai".to_string(),
			kind: ApiFormat::Completions,
			base_url: "https://api.openai.com".to_string(),
			api_key: Some("k".to_string()),
			default_model: "claude-sonnet-4-5".to_string(),
			timeout_secs: 120,
		})
		.unwrap();
		assert_eq!(provider.endpoint(), "https://api.openai.com/v1/chat/completions");
	}
}
