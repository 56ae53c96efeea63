//! Messages-format passthrough provider, grounded in
//! `original_source/src/a2c/providers/anthropic.py`: this upstream already
//! speaks the canonical wire format, so requests and responses pass through
//! close to verbatim rather than through the translate/streaming machinery
//! the foreign-format providers need.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::Client;

use crate::error::GatewayError;
use crate::provider::{ApiFormat, ByteStream, Provider, ProviderConfig};
use crate::types::messages::{MessagesErrorResponse, MessagesRequest, MessagesResponse};

pub struct MessagesPassthroughProvider {
	config: ProviderConfig,
	client: Client,
}

impl MessagesPassthroughProvider {
	pub fn new(config: ProviderConfig) -> Result<Self, GatewayError> {
		let client = Client::builder()
			.timeout(std::time::Duration::from_secs(config.timeout_secs))
			.build()
			.map_err(|e| GatewayError::Internal(format!("failed to build http client: {e}")))?;
		Ok(MessagesPassthroughProvider { config, client })
	}

	fn endpoint(&self) -> String {
		format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
	}

	fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
		match &self.config.api_key {
			Some(key) if !key.is_empty() => builder.header("x-api-key", key).header("anthropic-version", "2023-06-01"),
			_ => builder,
		}
	}
}

#[async_trait]
impl Provider for MessagesPassthroughProvider {
	fn name(&self) -> &str {
		&self.config.name
	}

	fn api_format(&self) -> ApiFormat {
		ApiFormat::Messages
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
		let mut forwarded = request.clone();
		if forwarded.model.trim().is_empty() {
			forwarded.model = self.config.default_model.clone();
		}
		forwarded.stream = false;

		let resp = self.authed(self.client.post(self.endpoint()).json(&forwarded)).send().await.map_err(http_error)?;
		let status = resp.status();
		let body_bytes = resp.bytes().await.map_err(http_error)?;
		if !status.is_success() {
			let message = serde_json::from_slice::<MessagesErrorResponse>(&body_bytes)
				.map(|e| e.error.message)
				.unwrap_or_else(|_| String::from_utf8_lossy(&body_bytes).to_string());
			return Err(GatewayError::Provider { status: status.as_u16(), message });
		}

		serde_json::from_slice(&body_bytes).map_err(|e| GatewayError::InvalidRequest(format!("malformed upstream response: {e}")))
	}

	async fn stream(&self, request: &MessagesRequest) -> Result<ByteStream, GatewayError> {
		let mut forwarded = request.clone();
		if forwarded.model.trim().is_empty() {
			forwarded.model = self.config.default_model.clone();
		}
		forwarded.stream = true;

		let resp = self.authed(self.client.post(self.endpoint()).json(&forwarded)).send().await.map_err(http_error)?;
		let status = resp.status();
		if !status.is_success() {
			let body_bytes = resp.bytes().await.unwrap_or_default();
			return Err(GatewayError::Provider {
				status: status.as_u16(),
				message: String::from_utf8_lossy(&body_bytes).to_string(),
			});
		}

		// Already in the Messages SSE grammar: forward bytes untranslated.
		let stream = resp.bytes_stream().map_err(http_error);
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
	fn endpoint_targets_v1_messages() {
		let provider = MessagesPassthroughProvider::new(ProviderConfig {
			name: "anthropic".to_string(),
			kind: ApiFormat::Messages,
			base_url: "https://api.anthropic.com".to_string(),
			api_key: Some("k".to_string()),
			default_model: "claude-sonnet-4-5".to_string(),
			timeout_secs: 120,
		})
		.unwrap();
		assert_eq!(provider.endpoint(), "https://api.anthropic.com/v1/messages");
	}
}
