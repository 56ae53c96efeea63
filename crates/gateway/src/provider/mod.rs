//! Provider abstraction (§4.G "provider" half, §3 foreign formats): one
//! implementation per upstream wire format, registered into a
//! [`crate::registry::ProviderRegistry`] and selected by the routing engine.

pub mod completions;
pub mod generative;
pub mod messages;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::types::messages::{MessagesRequest, MessagesResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiFormat {
	/// The canonical Messages format itself — a near-passthrough provider.
	Messages,
	/// OpenAI-style Chat-Completions.
	Completions,
	/// Google-style Generative-Content (Gemini).
	Generative,
}

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, GatewayError>> + Send>>;

/// Everything the dispatcher needs from a concrete upstream integration.
/// Non-streaming and streaming paths are separate methods because the
/// translation shape differs (a single `MessagesResponse` vs. an ongoing
/// SSE transducer), not because the HTTP plumbing differs.
#[async_trait]
pub trait Provider: Send + Sync {
	fn name(&self) -> &str;

	fn api_format(&self) -> ApiFormat;

	async fn health_check(&self) -> Result<(), GatewayError>;

	async fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse, GatewayError>;

	async fn stream(&self, request: &MessagesRequest) -> Result<ByteStream, GatewayError>;
}

/// Shared provider configuration, grounded in the shape of
/// `original_source/src/a2c/providers/base.py::BaseProvider.__init__` and
/// `ProviderInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
	pub name: String,
	pub kind: ApiFormat,
	pub base_url: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub api_key: Option<String>,
	#[serde(default = "default_model")]
	pub default_model: String,
	#[serde(default = "default_timeout_secs")]
	pub timeout_secs: u64,
}

fn default_model() -> String {
	crate::translate::request::DEFAULT_MODEL_FALLBACK.to_string()
}

fn default_timeout_secs() -> u64 {
	120
}
