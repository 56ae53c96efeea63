//! The canonical "Messages" wire format: what clients send to `/v1/messages`
//! and what every outbound translator eventually produces or consumes.
//!
//! Mirrors the shape of the Anthropic Messages API. Unknown content-block
//! variants deserialize into [`ContentBlock::Unknown`] rather than failing —
//! the gateway forwards anything it doesn't recognize as opaque JSON.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn is_false(b: &bool) -> bool {
	!*b
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	User,
	Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
	Text(String),
	Blocks(Vec<ContentBlock>),
}

impl MessageContent {
	pub fn as_blocks(&self) -> Vec<ContentBlock> {
		match self {
			MessageContent::Text(t) => vec![ContentBlock::Text(ContentTextBlock {
				text: t.clone(),
			})],
			MessageContent::Blocks(b) => b.clone(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
	pub role: Role,
	pub content: MessageContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentTextBlock {
	pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSource {
	#[serde(rename = "type")]
	pub kind: String,
	pub media_type: String,
	pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentImageBlock {
	pub source: ImageSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingBlock {
	pub thinking: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub signature: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactedThinkingBlock {
	pub data: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub signature: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUseBlock {
	pub id: String,
	pub name: String,
	pub input: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
	Text(String),
	Blocks(Vec<ContentTextBlock>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultBlock {
	pub tool_use_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	pub content: ToolResultContent,
}

/// A single block of assistant or user content. Tagged on `type`; anything
/// this gateway doesn't recognize survives as [`ContentBlock::Unknown`]
/// rather than failing deserialization — serde's built-in internally-tagged
/// enum support has no catch-all, so tag dispatch is done by hand here.
#[derive(Debug, Clone)]
pub enum ContentBlock {
	Text(ContentTextBlock),
	Image(ContentImageBlock),
	Thinking(ThinkingBlock),
	RedactedThinking(RedactedThinkingBlock),
	ToolUse(ToolUseBlock),
	ToolResult(ToolResultBlock),
	Unknown(Value),
}

impl Serialize for ContentBlock {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		use serde::ser::Error;
		let value = match self {
			ContentBlock::Text(b) => tagged_value("text", b),
			ContentBlock::Image(b) => tagged_value("image", b),
			ContentBlock::Thinking(b) => tagged_value("thinking", b),
			ContentBlock::RedactedThinking(b) => tagged_value("redacted_thinking", b),
			ContentBlock::ToolUse(b) => tagged_value("tool_use", b),
			ContentBlock::ToolResult(b) => tagged_value("tool_result", b),
			ContentBlock::Unknown(v) => Ok(v.clone()),
		}
		.map_err(S::Error::custom)?;
		value.serialize(serializer)
	}
}

fn tagged_value<T: Serialize>(tag: &str, body: &T) -> Result<Value, serde_json::Error> {
	let mut value = serde_json::to_value(body)?;
	if let Value::Object(map) = &mut value {
		map.insert("type".to_string(), Value::String(tag.to_string()));
	}
	Ok(value)
}

impl<'de> Deserialize<'de> for ContentBlock {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		use serde::de::Error;
		let value = Value::deserialize(deserializer)?;
		let tag = value.get("type").and_then(Value::as_str).unwrap_or("");
		match tag {
			"text" => serde_json::from_value(value).map(ContentBlock::Text).map_err(D::Error::custom),
			"image" => serde_json::from_value(value).map(ContentBlock::Image).map_err(D::Error::custom),
			"thinking" => serde_json::from_value(value).map(ContentBlock::Thinking).map_err(D::Error::custom),
			"redacted_thinking" => serde_json::from_value(value)
				.map(ContentBlock::RedactedThinking)
				.map_err(D::Error::custom),
			"tool_use" => serde_json::from_value(value).map(ContentBlock::ToolUse).map_err(D::Error::custom),
			"tool_result" => serde_json::from_value(value)
				.map(ContentBlock::ToolResult)
				.map_err(D::Error::custom),
			_ => Ok(ContentBlock::Unknown(value)),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
	pub name: String,
	#[serde(default)]
	pub description: String,
	pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolChoice {
	Auto,
	Any,
	None,
	Tool { name: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Thinking {
	Bool(bool),
	Config {
		#[serde(rename = "type")]
		kind: ThinkingType,
		#[serde(skip_serializing_if = "Option::is_none")]
		budget_tokens: Option<u32>,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThinkingType {
	Enabled,
	Disabled,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
	#[serde(flatten)]
	pub fields: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemPrompt {
	Text(String),
	Blocks(Vec<ContentTextBlock>),
}

/// A request to `POST /v1/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
	pub model: String,
	pub messages: Vec<Message>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub system: Option<SystemPrompt>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tools: Option<Vec<Tool>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tool_choice: Option<ToolChoice>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub thinking: Option<Thinking>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_tokens: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub temperature: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub top_p: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub top_k: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stop_sequences: Option<Vec<String>>,
	#[serde(default, skip_serializing_if = "is_false")]
	pub stream: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Metadata>,
}

impl MessagesRequest {
	/// Whether `thinking` resolves to an enabled reasoning mode, per §4.B.
	pub fn thinking_requested(&self) -> bool {
		match &self.thinking {
			None => false,
			Some(Thinking::Bool(b)) => *b,
			Some(Thinking::Config { kind, .. }) => *kind == ThinkingType::Enabled,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
	EndTurn,
	MaxTokens,
	StopSequence,
	ToolUse,
	Refusal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct Usage {
	pub input_tokens: u64,
	pub output_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
	pub id: String,
	#[serde(rename = "type")]
	pub kind: String,
	pub role: Role,
	pub model: String,
	pub content: Vec<ContentBlock>,
	pub stop_reason: Option<StopReason>,
	pub stop_sequence: Option<String>,
	pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesError {
	#[serde(rename = "type")]
	pub kind: String,
	pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesErrorResponse {
	#[serde(rename = "type")]
	pub kind: String,
	pub error: MessagesError,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageStartPayload {
	pub id: String,
	#[serde(rename = "type")]
	pub kind: &'static str,
	pub role: &'static str,
	pub model: String,
	pub content: Vec<ContentBlock>,
	pub stop_reason: Option<StopReason>,
	pub stop_sequence: Option<String>,
	pub usage: Usage,
}

/// One SSE event in the Messages streaming grammar (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagesStreamEvent {
	MessageStart {
		message: MessageStartPayload,
	},
	ContentBlockStart {
		index: usize,
		content_block: ContentBlock,
	},
	ContentBlockDelta {
		index: usize,
		delta: ContentBlockDelta,
	},
	ContentBlockStop {
		index: usize,
	},
	MessageDelta {
		delta: MessageDeltaFields,
		usage: Usage,
	},
	MessageStop,
	Ping,
	Error {
		error: MessagesError,
	},
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlockDelta {
	TextDelta { text: String },
	ThinkingDelta { thinking: String },
	SignatureDelta { signature: String },
	InputJsonDelta { partial_json: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeltaFields {
	pub stop_reason: Option<StopReason>,
	pub stop_sequence: Option<String>,
}

impl MessagesStreamEvent {
	/// The SSE `event:` line name for this variant.
	pub fn event_name(&self) -> &'static str {
		match self {
			MessagesStreamEvent::MessageStart { .. } => "message_start",
			MessagesStreamEvent::ContentBlockStart { .. } => "content_block_start",
			MessagesStreamEvent::ContentBlockDelta { .. } => "content_block_delta",
			MessagesStreamEvent::ContentBlockStop { .. } => "content_block_stop",
			MessagesStreamEvent::MessageDelta { .. } => "message_delta",
			MessagesStreamEvent::MessageStop => "message_stop",
			MessagesStreamEvent::Ping => "ping",
			MessagesStreamEvent::Error { .. } => "error",
		}
	}

	/// Render as `event: <name>\ndata: <json>\n\n`, matching the teacher's
	/// `_sse_event` helper (compact JSON, no whitespace).
	pub fn to_sse_bytes(&self) -> bytes::Bytes {
		let data = serde_json::to_vec(self).unwrap_or_default();
		let mut out = Vec::with_capacity(data.len() + 32);
		out.extend_from_slice(b"event: ");
		out.extend_from_slice(self.event_name().as_bytes());
		out.extend_from_slice(b"\ndata: ");
		out.extend_from_slice(&data);
		out.extend_from_slice(b"\n\n");
		bytes::Bytes::from(out)
	}
}
