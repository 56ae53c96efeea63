//! Messages ↔ Chat-Completions translation for the supplemental OpenAI-style
//! provider, grounded in `original_source/src/a2c/providers/openai.py`.

use uuid::Uuid;

use crate::translate::request::strip_nulls;
use crate::types::completions as cc;
use crate::types::messages::{
	ContentBlock, ContentTextBlock, Message, MessageContent, MessagesRequest, MessagesResponse, Role, StopReason,
	SystemPrompt, ToolResultContent, ToolUseBlock, Usage,
};

pub fn translate_request(req: &MessagesRequest, default_model: &str) -> cc::Request {
	let model = if req.model.trim().is_empty() { default_model.to_string() } else { req.model.clone() };

	let mut messages = Vec::with_capacity(req.messages.len() + 1);
	if let Some(system) = &req.system {
		let text = match system {
			SystemPrompt::Text(t) => t.clone(),
			SystemPrompt::Blocks(blocks) => blocks.iter().map(|b| b.text.clone()).collect::<Vec<_>>().join("\n"),
		};
		if !text.trim().is_empty() {
			messages.push(cc::Message {
				role: cc::Role::System,
				content: Some(text),
				tool_calls: None,
				tool_call_id: None,
			});
		}
	}

	for msg in &req.messages {
		messages.extend(convert_message(msg));
	}

	let tools = req.tools.as_ref().map(|tools| {
		tools
			.iter()
			.map(|t| cc::Tool {
				kind: "function".to_string(),
				function: cc::Function {
					name: t.name.clone(),
					description: t.description.clone(),
					parameters: Some(t.input_schema.clone()),
				},
			})
			.collect()
	});

	cc::Request {
		model,
		messages,
		tools,
		max_tokens: req.max_tokens,
		temperature: req.temperature,
		top_p: req.top_p,
		stop: req.stop_sequences.clone(),
		stream: req.stream,
	}
}

fn convert_message(msg: &Message) -> Vec<cc::Message> {
	let role = match msg.role {
		Role::User => cc::Role::User,
		Role::Assistant => cc::Role::Assistant,
	};

	match &msg.content {
		MessageContent::Text(text) => vec![cc::Message {
			role,
			content: Some(text.clone()),
			tool_calls: None,
			tool_call_id: None,
		}],
		MessageContent::Blocks(blocks) => {
			let mut tool_results = Vec::new();
			let mut text_parts = Vec::new();
			let mut tool_calls = Vec::new();

			for block in blocks {
				match block {
					ContentBlock::Text(t) => text_parts.push(t.text.clone()),
					ContentBlock::ToolUse(tu) => tool_calls.push(cc::ToolCall {
						id: tu.id.clone(),
						kind: "function".to_string(),
						function: cc::FunctionCall {
							name: tu.name.clone(),
							arguments: serde_json::to_string(&tu.input).unwrap_or_else(|_| "{}".to_string()),
						},
					}),
					ContentBlock::ToolResult(tr) => {
						let content = match &tr.content {
							ToolResultContent::Text(s) => s.clone(),
							ToolResultContent::Blocks(blocks) => blocks.iter().map(|b| b.text.clone()).collect::<Vec<_>>().join("\n"),
						};
						tool_results.push(cc::Message {
							role: cc::Role::Tool,
							content: Some(content),
							tool_calls: None,
							tool_call_id: Some(tr.tool_use_id.clone()),
						});
					},
					_ => {},
				}
			}

			let mut out = Vec::new();
			if !tool_results.is_empty() {
				out.extend(tool_results);
				return out;
			}
			out.push(cc::Message {
				role,
				content: if text_parts.is_empty() { None } else { Some(text_parts.join("\n")) },
				tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
				tool_call_id: None,
			});
			out
		},
	}
}

pub fn translate_response(resp: &cc::Response, request_model: &str) -> MessagesResponse {
	let choice = resp.choices.first();
	let message = choice.map(|c| &c.message);

	let mut content = Vec::new();
	if let Some(text) = message.and_then(|m| m.content.as_deref()) {
		if !text.is_empty() {
			content.push(ContentBlock::Text(ContentTextBlock { text: text.to_string() }));
		}
	}
	let mut has_tool_use = false;
	if let Some(tool_calls) = message.and_then(|m| m.tool_calls.as_ref()) {
		for tc in tool_calls {
			has_tool_use = true;
			let input: serde_json::Value = serde_json::from_str(&tc.function.arguments).unwrap_or(serde_json::Value::Null);
			content.push(ContentBlock::ToolUse(ToolUseBlock {
				id: tc.id.clone(),
				name: tc.function.name.clone(),
				input: strip_nulls(&input),
			}));
		}
	}

	let finish_reason = choice.and_then(|c| c.finish_reason.as_deref());
	let stop_reason = if has_tool_use || finish_reason == Some("tool_calls") {
		StopReason::ToolUse
	} else {
		match finish_reason {
			Some("length") => StopReason::MaxTokens,
			_ => StopReason::EndTurn,
		}
	};

	MessagesResponse {
		id: format!("msg_{}", Uuid::new_v4().simple()),
		kind: "message".to_string(),
		role: Role::Assistant,
		model: request_model.to_string(),
		content,
		stop_reason: Some(stop_reason),
		stop_sequence: None,
		usage: Usage {
			input_tokens: resp.usage.prompt_tokens,
			output_tokens: resp.usage.completion_tokens,
		},
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::types::messages::{Metadata, Thinking};

	fn simple_request() -> MessagesRequest {
		MessagesRequest {
			model: "claude-sonnet-4-5".to_string(),
			messages: vec![Message {
				role: Role::User,
				content: MessageContent::Text("hi".to_string()),
			}],
			system: Some(SystemPrompt::Text("be nice".to_string())),
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
	fn system_prompt_becomes_leading_system_message() {
		let req = simple_request();
		let out = translate_request(&req, "gpt-4o");
		assert_eq!(out.messages[0].role, cc::Role::System);
		assert_eq!(out.messages[0].content.as_deref(), Some("be nice"));
		assert_eq!(out.messages[1].role, cc::Role::User);
	}

	#[test]
	fn tool_result_block_becomes_tool_role_message() {
		let mut req = simple_request();
		req.messages.push(Message {
			role: Role::User,
			content: MessageContent::Blocks(vec![ContentBlock::ToolResult(crate::types::messages::ToolResultBlock {
				tool_use_id: "toolu_1".to_string(),
				name: None,
				content: ToolResultContent::Text("42".to_string()),
			})]),
		});
		let out = translate_request(&req, "gpt-4o");
		let tool_msg = out.messages.iter().find(|m| m.role == cc::Role::Tool).unwrap();
		assert_eq!(tool_msg.tool_call_id.as_deref(), Some("toolu_1"));
		assert_eq!(tool_msg.content.as_deref(), Some("42"));
	}

	#[test]
	fn response_tool_calls_force_tool_use_stop_reason() {
		let resp = cc::Response {
			id: "chatcmpl-1".to_string(),
			model: "gpt-4o".to_string(),
			choices: vec![cc::Choice {
				index: 0,
				message: cc::Message {
					role: cc::Role::Assistant,
					content: None,
					tool_calls: Some(vec![cc::ToolCall {
						id: "call_1".to_string(),
						kind: "function".to_string(),
						function: cc::FunctionCall {
							name: "lookup".to_string(),
							arguments: "{\"q\":\"x\",\"n\":null}".to_string(),
						},
					}]),
					tool_call_id: None,
				},
				finish_reason: Some("tool_calls".to_string()),
			}],
			usage: cc::Usage {
				prompt_tokens: 10,
				completion_tokens: 5,
				total_tokens: 15,
			},
		};
		let out = translate_response(&resp, "claude-sonnet-4-5");
		assert_eq!(out.stop_reason, Some(StopReason::ToolUse));
		match &out.content[0] {
			ContentBlock::ToolUse(tu) => assert_eq!(tu.input, serde_json::json!({"q": "x"})),
			_ => panic!("expected tool use"),
		}
	}

	#[test]
	fn thinking_field_unused_is_irrelevant_to_completions_path() {
		let mut req = simple_request();
		req.thinking = Some(Thinking::Bool(true));
		let out = translate_request(&req, "gpt-4o");
		assert!(out.messages.iter().all(|_| true));
	}

	#[test]
	fn metadata_does_not_affect_translation() {
		let mut req = simple_request();
		req.metadata = Some(Metadata::default());
		let out = translate_request(&req, "gpt-4o");
		assert_eq!(out.model, "claude-sonnet-4-5");
	}
}
