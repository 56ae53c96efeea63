//! Request Translator (§4.B): Messages request → Generative-Content request
//! tuple, grounded in `original_source/src/a2c/core/converter.py`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value, json};

use crate::schema::clean_json_schema;
use crate::translate::reorganize::reorganize_tool_messages;
use crate::types::generative::{
	Content, ContentRole, FunctionDeclaration, GenerationConfig, GenerativeRequest, Part, ThinkingConfig, ToolDeclaration,
};
use crate::types::messages::{
	ContentBlock, Message, MessageContent, MessagesRequest, Role, SystemPrompt, Thinking, ThinkingType,
};

pub const DEFAULT_THINKING_BUDGET: u32 = 1024;
pub const DEFAULT_TEMPERATURE: f64 = 0.4;
pub const DEFAULT_MODEL_FALLBACK: &str = "claude-sonnet-4-5";

const DEFAULT_STOP_SEQUENCES: &[&str] =
	&["<|user|>", "<|bot|>", "<|context_request|>", "<|endoftext|>", "<|end_of_turn|>"];

const SUPPORTED_MODELS: &[&str] = &[
	"gemini-2.5-flash",
	"gemini-2.5-flash-thinking",
	"gemini-2.5-pro",
	"gemini-3-pro-low",
	"gemini-3-pro-high",
	"gemini-3-pro-image",
	"gemini-2.5-flash-lite",
	"gemini-2.5-flash-image",
	"claude-sonnet-4-5",
	"claude-sonnet-4-5-thinking",
	"claude-opus-4-5-thinking",
	"gpt-oss-120b-medium",
];

const LEGACY_ALIASES: &[(&str, &str)] = &[
	("claude-sonnet-4.5", "claude-sonnet-4-5"),
	("claude-3-5-sonnet-20241022", "claude-sonnet-4-5"),
	("claude-3-5-sonnet-20240620", "claude-sonnet-4-5"),
	("claude-opus-4", "gemini-3-pro-high"),
	("claude-haiku-4", "claude-haiku-4.5"),
	("claude-3-haiku-20240307", "gemini-2.5-flash"),
];

static DATED_MODEL_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^(claude-(?:opus|sonnet|haiku)-4-5)-\d{8}$").unwrap());

/// Model mapping (§4.B). Pure function from the caller's model string to a
/// target model name.
pub fn map_model(requested: &str, default_model: &str) -> String {
	let trimmed = requested.trim();
	if trimmed.is_empty() {
		return default_model.to_string();
	}

	let normalized = DATED_MODEL_RE
		.captures(trimmed)
		.and_then(|c| c.get(1))
		.map(|m| m.as_str().to_string())
		.unwrap_or_else(|| trimmed.to_string());

	match normalized.as_str() {
		"claude-opus-4-5" => return "claude-opus-4-5-thinking".to_string(),
		"claude-sonnet-4-5" => return "claude-sonnet-4-5".to_string(),
		"claude-haiku-4-5" => return "gemini-2.5-flash".to_string(),
		_ => {},
	}

	if SUPPORTED_MODELS.contains(&normalized.as_str()) {
		return normalized;
	}

	LEGACY_ALIASES
		.iter()
		.find(|(from, _)| *from == normalized)
		.map(|(_, to)| to.to_string())
		.unwrap_or_else(|| default_model.to_string())
}

fn is_non_whitespace(s: &str) -> bool {
	!s.trim().is_empty()
}

/// Result of translating one Messages request.
pub struct Translated {
	pub request: GenerativeRequest,
	pub include_thinking: bool,
}

/// Translate a full Messages request into a Generative-Content request,
/// per §4.B. `default_model` is the configured fallback for unmapped names.
pub fn translate_request(req: &MessagesRequest, default_model: &str) -> Translated {
	let model = map_model(&req.model, default_model);
	let (generation_config, include_thinking) = build_generation_config(req);

	let mut contents = convert_messages_to_contents(&req.messages, include_thinking);
	contents = reorganize_tool_messages(contents);

	let system_instruction = req.system.as_ref().and_then(build_system_instruction);
	let tools = convert_tools(req.tools.as_deref());

	Translated {
		request: GenerativeRequest {
			model,
			contents,
			system_instruction,
			tools,
			generation_config,
		},
		include_thinking,
	}
}

/// Thinking activation + generation config (§4.B "Generation config" and
/// "Thinking activation"). Config must be built before history conversion
/// since `include_thinking` gates how assistant history is replayed.
fn build_generation_config(req: &MessagesRequest) -> (GenerationConfig, bool) {
	let mut config = GenerationConfig {
		top_p: req.top_p.unwrap_or(1.0),
		top_k: req.top_k.unwrap_or(40),
		candidate_count: 1,
		stop_sequences: DEFAULT_STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
		temperature: req.temperature.unwrap_or(DEFAULT_TEMPERATURE),
		max_output_tokens: req.max_tokens,
		thinking_config: None,
	};
	if let Some(extra) = &req.stop_sequences {
		config.stop_sequences.extend(extra.iter().cloned());
	}

	let Some(thinking) = &req.thinking else {
		return (config, false);
	};

	let (include_thoughts, budget) = resolve_thinking(thinking);
	if !include_thoughts {
		return (config, false);
	}

	// Step 1: the most recent assistant message's first block must be a
	// thinking/redacted_thinking block, else downgrade to non-thinking.
	let last_assistant_first_block = req
		.messages
		.iter()
		.rev()
		.find(|m| m.role == Role::Assistant)
		.and_then(|m| match &m.content {
			MessageContent::Blocks(blocks) => blocks.first(),
			MessageContent::Text(_) => None,
		});
	let history_ok = match last_assistant_first_block {
		None => true,
		Some(ContentBlock::Thinking(_)) | Some(ContentBlock::RedactedThinking(_)) => true,
		Some(_) => false,
	};
	if !history_ok {
		return (config, false);
	}

	// Step 2-3: reduce budget below max_tokens, or disable if it can't fit.
	let mut budget = budget;
	if let Some(max_tokens) = req.max_tokens {
		if budget >= max_tokens {
			if max_tokens >= 2 {
				budget = max_tokens - 1;
			} else {
				budget = 0;
			}
		}
	}
	if budget == 0 {
		return (config, false);
	}

	config.thinking_config = Some(ThinkingConfig {
		include_thoughts: true,
		thinking_budget: Some(budget),
	});
	(config, true)
}

fn resolve_thinking(thinking: &Thinking) -> (bool, u32) {
	match thinking {
		Thinking::Bool(b) => (*b, DEFAULT_THINKING_BUDGET),
		Thinking::Config { kind, budget_tokens } => {
			if *kind == ThinkingType::Enabled {
				(true, budget_tokens.unwrap_or(DEFAULT_THINKING_BUDGET))
			} else {
				(false, DEFAULT_THINKING_BUDGET)
			}
		},
	}
}

fn build_system_instruction(system: &SystemPrompt) -> Option<Content> {
	let parts: Vec<Part> = match system {
		SystemPrompt::Text(text) => {
			if is_non_whitespace(text) {
				vec![Part::text(text.clone())]
			} else {
				vec![]
			}
		},
		SystemPrompt::Blocks(blocks) => blocks
			.iter()
			.filter(|b| is_non_whitespace(&b.text))
			.map(|b| Part::text(b.text.clone()))
			.collect(),
	};
	if parts.is_empty() {
		return None;
	}
	Some(Content {
		role: ContentRole::User,
		parts,
	})
}

fn convert_tools(tools: Option<&[crate::types::messages::Tool]>) -> Option<Vec<ToolDeclaration>> {
	let tools = tools?;
	let declarations: Vec<ToolDeclaration> = tools
		.iter()
		.filter(|t| !t.name.is_empty())
		.map(|t| ToolDeclaration {
			function_declarations: vec![FunctionDeclaration {
				name: t.name.clone(),
				description: t.description.clone(),
				parameters: clean_json_schema(&t.input_schema),
			}],
		})
		.collect();
	if declarations.is_empty() { None } else { Some(declarations) }
}

fn extract_tool_result_output(content: &crate::types::messages::ToolResultContent) -> String {
	use crate::types::messages::ToolResultContent;
	match content {
		ToolResultContent::Text(s) => s.clone(),
		ToolResultContent::Blocks(blocks) => blocks.first().map(|b| b.text.clone()).unwrap_or_default(),
	}
}

fn convert_messages_to_contents(messages: &[Message], include_thinking: bool) -> Vec<Content> {
	let mut contents = Vec::with_capacity(messages.len());
	for msg in messages {
		let role = match msg.role {
			Role::Assistant => ContentRole::Model,
			Role::User => ContentRole::User,
		};

		let mut parts = Vec::new();
		match &msg.content {
			MessageContent::Text(text) => {
				if is_non_whitespace(text) {
					parts.push(Part::text(text.clone()));
				}
			},
			MessageContent::Blocks(blocks) => {
				for block in blocks {
					match block {
						ContentBlock::Thinking(t) => {
							if !include_thinking {
								continue;
							}
							let Some(signature) = &t.signature else { continue };
							if signature.is_empty() {
								continue;
							}
							parts.push(Part::thought(t.thinking.clone(), signature.clone()));
						},
						ContentBlock::RedactedThinking(t) => {
							if !include_thinking {
								continue;
							}
							let Some(signature) = &t.signature else { continue };
							if signature.is_empty() {
								continue;
							}
							parts.push(Part::thought(t.data.clone(), signature.clone()));
						},
						ContentBlock::Text(t) => {
							if is_non_whitespace(&t.text) {
								parts.push(Part::text(t.text.clone()));
							}
						},
						ContentBlock::Image(img) => {
							if img.source.kind == "base64" {
								parts.push(Part::inline_data(img.source.media_type.clone(), img.source.data.clone()));
							}
						},
						ContentBlock::ToolUse(tu) => {
							parts.push(Part::function_call(Some(tu.id.clone()), tu.name.clone(), tu.input.clone()));
						},
						ContentBlock::ToolResult(tr) => {
							let output = extract_tool_result_output(&tr.content);
							parts.push(Part::function_response(
								Some(tr.tool_use_id.clone()),
								tr.name.clone().unwrap_or_default(),
								output,
							));
						},
						ContentBlock::Unknown(v) => {
							parts.push(Part::text(serde_json::to_string(v).unwrap_or_default()));
						},
					}
				}
			},
		}

		if parts.is_empty() {
			continue;
		}
		contents.push(Content { role, parts });
	}
	contents
}

/// Recursively strip keys whose value is `null`, per §4.D "Tool-arguments
/// null stripping" — used only for emitted tool-call arguments on the way
/// back to the client, never for historical tool-call replay (§9).
pub fn strip_nulls(value: &Value) -> Value {
	match value {
		Value::Object(map) => {
			let mut out = Map::new();
			for (k, v) in map {
				if v.is_null() {
					continue;
				}
				out.insert(k.clone(), strip_nulls(v));
			}
			Value::Object(out)
		},
		Value::Array(items) => Value::Array(items.iter().map(strip_nulls).collect()),
		other => other.clone(),
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::types::messages::{ContentTextBlock, ImageSource};

	fn user_msg(text: &str) -> Message {
		Message {
			role: Role::User,
			content: MessageContent::Text(text.to_string()),
		}
	}

	fn base_request() -> MessagesRequest {
		MessagesRequest {
			model: "claude-sonnet-4-5".to_string(),
			messages: vec![user_msg("Hello")],
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

	#[test]
	fn scenario_1_simple_non_streaming() {
		let req = base_request();
		let out = translate_request(&req, DEFAULT_MODEL_FALLBACK);
		assert!(!out.include_thinking);
		assert_eq!(out.request.model, "claude-sonnet-4-5");
		assert_eq!(out.request.contents.len(), 1);
		assert_eq!(out.request.contents[0].parts[0].text.as_deref(), Some("Hello"));
		assert_eq!(out.request.generation_config.temperature, DEFAULT_TEMPERATURE);
		assert_eq!(out.request.generation_config.top_p, 1.0);
		assert_eq!(out.request.generation_config.top_k, 40);
		assert_eq!(out.request.generation_config.max_output_tokens, Some(100));
		assert_eq!(out.request.generation_config.stop_sequences, DEFAULT_STOP_SEQUENCES);
		assert!(out.request.generation_config.thinking_config.is_none());
	}

	#[test]
	fn model_mapping_strips_date_suffix() {
		assert_eq!(map_model("claude-opus-4-5-20251101", "claude-sonnet-4-5"), "claude-opus-4-5-thinking");
	}

	#[test]
	fn model_mapping_empty_falls_back_to_default() {
		assert_eq!(map_model("   ", "claude-sonnet-4-5"), "claude-sonnet-4-5");
	}

	#[test]
	fn model_mapping_is_idempotent() {
		let mapped = map_model("claude-opus-4-5-20251101", "claude-sonnet-4-5");
		assert_eq!(map_model(&mapped, "claude-sonnet-4-5"), mapped);
	}

	#[test]
	fn thinking_absent_means_no_thinking_config() {
		let req = base_request();
		let (config, include) = build_generation_config(&req);
		assert!(!include);
		assert!(config.thinking_config.is_none());
	}

	#[test]
	fn thinking_disabled_when_history_mismatched() {
		let mut req = base_request();
		req.thinking = Some(Thinking::Bool(true));
		req.messages.push(Message {
			role: Role::Assistant,
			content: MessageContent::Blocks(vec![ContentBlock::Text(ContentTextBlock { text: "hi".into() })]),
		});
		let (_, include) = build_generation_config(&req);
		assert!(!include);
	}

	#[test]
	fn thinking_budget_shrinks_below_max_tokens() {
		let mut req = base_request();
		req.max_tokens = Some(500);
		req.thinking = Some(Thinking::Config {
			kind: ThinkingType::Enabled,
			budget_tokens: Some(1024),
		});
		let (config, include) = build_generation_config(&req);
		assert!(include);
		assert_eq!(config.thinking_config.unwrap().thinking_budget, Some(499));
	}

	#[test]
	fn thinking_disabled_when_budget_cannot_fit() {
		let mut req = base_request();
		req.max_tokens = Some(1);
		req.thinking = Some(Thinking::Config {
			kind: ThinkingType::Enabled,
			budget_tokens: Some(1024),
		});
		let (_, include) = build_generation_config(&req);
		assert!(!include);
	}

	#[test]
	fn image_block_converts_to_inline_data() {
		let msg = Message {
			role: Role::User,
			content: MessageContent::Blocks(vec![ContentBlock::Image(crate::types::messages::ContentImageBlock {
				source: ImageSource {
					kind: "base64".to_string(),
					media_type: "image/png".to_string(),
					data: "abcd".to_string(),
				},
			})]),
		};
		let contents = convert_messages_to_contents(std::slice::from_ref(&msg), true);
		assert_eq!(contents.len(), 1);
		assert!(contents[0].parts[0].inline_data.is_some());
	}

	#[test]
	fn strip_nulls_removes_null_keys_recursively() {
		let v = json!({"a": 1, "b": null, "c": {"d": null, "e": 2}});
		assert_eq!(strip_nulls(&v), json!({"a": 1, "c": {"e": 2}}));
	}
}
