//! The "Generative-Content" foreign wire format (roles `user`/`model`,
//! `Content`/`Part`), matching spec §3's Generative-Content request shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
	User,
	Model,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineData {
	#[serde(rename = "mimeType")]
	pub mime_type: String,
	pub data: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionCall {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	pub name: String,
	#[serde(default)]
	pub args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionResponseBody {
	pub output: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionResponse {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(default)]
	pub name: String,
	pub response: FunctionResponseBody,
}

/// A fragment of `Content`. Plain `text`, a thought-marked `text` (extended
/// thinking), inline binary data, or a function call/response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub text: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub thought: Option<bool>,
	#[serde(rename = "thoughtSignature", skip_serializing_if = "Option::is_none")]
	pub thought_signature: Option<String>,
	#[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
	pub inline_data: Option<InlineData>,
	#[serde(rename = "functionCall", skip_serializing_if = "Option::is_none")]
	pub function_call: Option<FunctionCall>,
	#[serde(rename = "functionResponse", skip_serializing_if = "Option::is_none")]
	pub function_response: Option<FunctionResponse>,
	#[serde(rename = "usageMetadata", skip_serializing_if = "Option::is_none")]
	pub usage_metadata: Option<UsageMetadata>,
}

impl Part {
	pub fn text(text: impl Into<String>) -> Self {
		Part {
			text: Some(text.into()),
			thought: None,
			thought_signature: None,
			inline_data: None,
			function_call: None,
			function_response: None,
			usage_metadata: None,
		}
	}

	pub fn thought(text: impl Into<String>, signature: String) -> Self {
		Part {
			text: Some(text.into()),
			thought: Some(true),
			thought_signature: Some(signature),
			inline_data: None,
			function_call: None,
			function_response: None,
			usage_metadata: None,
		}
	}

	pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
		Part {
			text: None,
			thought: None,
			thought_signature: None,
			inline_data: Some(InlineData {
				mime_type: mime_type.into(),
				data: data.into(),
			}),
			function_call: None,
			function_response: None,
			usage_metadata: None,
		}
	}

	pub fn function_call(id: Option<String>, name: impl Into<String>, args: Value) -> Self {
		Part {
			text: None,
			thought: None,
			thought_signature: None,
			inline_data: None,
			function_call: Some(FunctionCall {
				id,
				name: name.into(),
				args,
			}),
			function_response: None,
			usage_metadata: None,
		}
	}

	pub fn function_response(id: Option<String>, name: impl Into<String>, output: String) -> Self {
		Part {
			text: None,
			thought: None,
			thought_signature: None,
			inline_data: None,
			function_call: None,
			function_response: Some(FunctionResponse {
				id,
				name: name.into(),
				response: FunctionResponseBody { output },
			}),
			usage_metadata: None,
		}
	}

	pub fn is_whitespace_only_text(&self) -> bool {
		matches!(&self.text, Some(t) if t.trim().is_empty()) && self.function_call.is_none()
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
	pub role: ContentRole,
	pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub prompt_token_count: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub candidates_token_count: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub total_token_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingConfig {
	#[serde(rename = "includeThoughts")]
	pub include_thoughts: bool,
	#[serde(rename = "thinkingBudget", skip_serializing_if = "Option::is_none")]
	pub thinking_budget: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
	#[serde(rename = "topP")]
	pub top_p: f64,
	#[serde(rename = "topK")]
	pub top_k: u32,
	#[serde(rename = "candidateCount")]
	pub candidate_count: u32,
	#[serde(rename = "stopSequences")]
	pub stop_sequences: Vec<String>,
	pub temperature: f64,
	#[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
	pub max_output_tokens: Option<u32>,
	#[serde(rename = "thinkingConfig", skip_serializing_if = "Option::is_none")]
	pub thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDeclaration {
	pub name: String,
	#[serde(default)]
	pub description: String,
	pub parameters: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDeclaration {
	#[serde(rename = "functionDeclarations")]
	pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeRequest {
	pub model: String,
	pub contents: Vec<Content>,
	#[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
	pub system_instruction: Option<Content>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tools: Option<Vec<ToolDeclaration>>,
	#[serde(rename = "generationConfig")]
	pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
	#[serde(default)]
	pub content: Option<CandidateContent>,
	#[serde(rename = "finishReason", default)]
	pub finish_reason: Option<String>,
	#[serde(rename = "usageMetadata", default)]
	pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateContent {
	#[serde(default)]
	pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerativeResponse {
	#[serde(default)]
	pub candidates: Vec<Candidate>,
	#[serde(rename = "usageMetadata", default)]
	pub usage_metadata: Option<UsageMetadata>,
}

/// Envelope the upstream actually emits per SSE line: `{"response": {...}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerativeStreamChunk {
	#[serde(default)]
	pub response: GenerativeResponse,
}
