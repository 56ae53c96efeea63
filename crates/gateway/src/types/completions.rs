//! The "Chat-Completions" foreign wire format, used by the supplemental
//! OpenAI-style provider (§4 expansion: grounded in
//! `original_source/src/a2c/providers/openai.py`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	System,
	User,
	Assistant,
	Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
	pub name: String,
	pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
	pub id: String,
	#[serde(rename = "type")]
	pub kind: String,
	pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
	pub role: Role,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tool_calls: Option<Vec<ToolCall>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub parameters: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
	#[serde(rename = "type")]
	pub kind: String,
	pub function: Function,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
	pub model: String,
	pub messages: Vec<Message>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tools: Option<Vec<Tool>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_tokens: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub temperature: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub top_p: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stop: Option<Vec<String>>,
	#[serde(default)]
	pub stream: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
	pub prompt_tokens: u64,
	pub completion_tokens: u64,
	pub total_tokens: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
	pub index: u32,
	pub message: Message,
	pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Response {
	pub id: String,
	pub model: String,
	pub choices: Vec<Choice>,
	#[serde(default)]
	pub usage: Usage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeltaToolCall {
	pub index: u32,
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default)]
	pub function: Option<DeltaFunctionCall>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeltaFunctionCall {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub arguments: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
	#[serde(default)]
	pub content: Option<String>,
	#[serde(default)]
	pub tool_calls: Option<Vec<DeltaToolCall>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamChoice {
	pub index: u32,
	pub delta: Delta,
	pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamResponse {
	pub id: String,
	pub model: String,
	pub choices: Vec<StreamChoice>,
	#[serde(default)]
	pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
	pub message: String,
	#[serde(rename = "type", default)]
	pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
	pub error: ErrorDetail,
}
