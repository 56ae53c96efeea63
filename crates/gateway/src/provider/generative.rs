//! Generative-Content (Gemini-style) provider, grounded in
//! `original_source/src/a2c/providers/gemini.py`: `generateContent` /
//! `streamGenerateContent` over `reqwest`, API key as a query parameter.

use async_stream::try_stream;
use async_trait::async_trait;
use reqwest::Client;

use crate::error::GatewayError;
use crate::provider::{ApiFormat, ByteStream, Provider, ProviderConfig};
use crate::sse::SseDecoder;
use crate::streaming::generative::GenerativeStreamTranslator;
use crate::translate::request::translate_request;
use crate::translate::response::translate_response;
use crate::types::generative::{Content, GenerationConfig, GenerativeRequest, GenerativeResponse, GenerativeStreamChunk, Part};
use crate::types::messages::{MessagesRequest, MessagesResponse};

pub struct GenerativeProvider {
	config: ProviderConfig,
	client: Client,
}

impl GenerativeProvider {
	pub fn new(config: ProviderConfig) -> Result<Self, GatewayError> {
		let client = Client::builder()
			.timeout(std::time::Duration::from_secs(config.timeout_secs))
			.build()
			.map_err(|e| GatewayError::Internal(format!("failed to build http client: {e}")))?;
		Ok(GenerativeProvider { config, client })
	}

	fn endpoint(&self, model: &str, stream: bool) -> String {
		let base = self.config.base_url.trim_end_matches('/');
		let key = self.config.api_key.as_deref().unwrap_or("");
		if stream {
			format!("{base}/v1beta/models/{model}:streamGenerateContent?key={key}&alt=sse")
		} else {
			format!("{base}/v1beta/models/{model}:generateContent?key={key}")
		}
	}
}

#[async_trait]
impl Provider for GenerativeProvider {
	fn name(&self) -> &str {
		&self.config.name
	}

	fn api_format(&self) -> ApiFormat {
		ApiFormat::Generative
	}

	async fn health_check(&self) -> Result<(), GatewayError> {
		if self.config.api_key.as_deref().unwrap_or("").is_empty() {
			return Err(GatewayError::Authentication("api key not configured".to_string()));
		}
		let url = self.endpoint("gemini-2.5-flash-lite", false);
		let probe = GenerativeRequest {
			model: "gemini-2.5-flash-lite".to_string(),
			contents: vec![Content {
				role: crate::types::generative::ContentRole::User,
				parts: vec![Part::text("hi")],
			}],
			system_instruction: None,
			tools: None,
			generation_config: GenerationConfig {
				top_p: 1.0,
				top_k: 40,
				candidate_count: 1,
				stop_sequences: vec![],
				temperature: 0.0,
				max_output_tokens: Some(1),
				thinking_config: None,
			},
		};
		let resp = self.client.post(url).json(&probe).send().await.map_err(http_error)?;
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
		let translated = translate_request(request, &self.config.default_model);
		let url = self.endpoint(&translated.request.model, false);
		let resp = self
			.client
			.post(url)
			.json(&translated.request)
			.send()
			.await
			.map_err(http_error)?;

		let status = resp.status();
		let body_bytes = resp.bytes().await.map_err(http_error)?;
		if !status.is_success() {
			return Err(GatewayError::Provider {
				status: status.as_u16(),
				message: String::from_utf8_lossy(&body_bytes).to_string(),
			});
		}

		let generative_response: GenerativeResponse =
			serde_json::from_slice(&body_bytes).map_err(|e| GatewayError::InvalidRequest(format!("malformed upstream response: {e}")))?;
		Ok(translate_response(&generative_response, &request.model))
	}

	async fn stream(&self, request: &MessagesRequest) -> Result<ByteStream, GatewayError> {
		let translated = translate_request(request, &self.config.default_model);
		let url = self.endpoint(&translated.request.model, true);
		let request_model = request.model.clone();
		let include_thinking = translated.include_thinking;
		let estimated_input_tokens =
			crate::token_estimator::estimate_input_tokens(&serde_json::to_value(request).unwrap_or(serde_json::Value::Null));
		let body = translated.request;
		let client = self.client.clone();

		let resp = client.post(url).json(&body).send().await.map_err(http_error)?;
		let status = resp.status();
		if !status.is_success() {
			let body_bytes = resp.bytes().await.unwrap_or_default();
			return Err(GatewayError::Provider {
				status: status.as_u16(),
				message: String::from_utf8_lossy(&body_bytes).to_string(),
			});
		}

		// §7 propagation: a transport failure mid-stream is surfaced as an
		// `error` SSE event (synthesizing `message_start` first if needed)
		// rather than severing the byte stream outright.
		let stream = try_stream! {
			let mut upstream = resp.bytes_stream();
			let mut decoder = SseDecoder::new();
			let mut translator = GenerativeStreamTranslator::new(request_model, include_thinking, estimated_input_tokens);

			use futures_util::StreamExt;
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
					let parsed: GenerativeStreamChunk = match serde_json::from_str(&payload) {
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
