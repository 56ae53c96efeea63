//! Non-streaming response translation: Generative-Content response →
//! Messages response, grounded in the epilogue logic of
//! `original_source/src/a2c/core/streaming.py` (`pick_usage_metadata`, the
//! `stop_reason` precedence rule) applied to a single, already-complete
//! candidate instead of an accumulating stream.

use uuid::Uuid;

use crate::translate::request::strip_nulls;
use crate::types::generative::{Candidate, GenerativeResponse, Part, UsageMetadata};
use crate::types::messages::{
	ContentBlock, ContentTextBlock, MessagesResponse, RedactedThinkingBlock, Role, StopReason, ThinkingBlock, ToolUseBlock,
	Usage,
};

/// Translate the first candidate of a Generative-Content response into a
/// Messages response. `request_model` is echoed back verbatim (§4.B: the
/// client's requested model name, not the mapped upstream one).
pub fn translate_response(resp: &GenerativeResponse, request_model: &str) -> MessagesResponse {
	let candidate = resp.candidates.first();
	let parts: &[Part] = candidate.and_then(|c| c.content.as_ref()).map(|c| c.parts.as_slice()).unwrap_or(&[]);

	let mut content = Vec::with_capacity(parts.len());
	let mut has_tool_use = false;
	for part in parts {
		if let Some(fc) = &part.function_call {
			has_tool_use = true;
			let id = fc.id.clone().unwrap_or_else(synthesize_tool_use_id);
			content.push(ContentBlock::ToolUse(ToolUseBlock {
				id,
				name: fc.name.clone(),
				input: strip_nulls(&fc.args),
			}));
			continue;
		}
		let Some(text) = &part.text else { continue };
		if part.thought == Some(true) {
			match &part.thought_signature {
				Some(sig) if !sig.is_empty() => content.push(ContentBlock::Thinking(ThinkingBlock {
					thinking: text.clone(),
					signature: Some(sig.clone()),
				})),
				_ => content.push(ContentBlock::RedactedThinking(RedactedThinkingBlock {
					data: text.clone(),
					signature: None,
				})),
			}
			continue;
		}
		if part.is_whitespace_only_text() {
			continue;
		}
		content.push(ContentBlock::Text(ContentTextBlock { text: text.clone() }));
	}

	let finish_reason = candidate.and_then(|c| c.finish_reason.as_deref());
	let stop_reason = compute_stop_reason(has_tool_use, finish_reason);
	let usage_metadata = pick_usage_metadata(candidate, resp.usage_metadata.as_ref());

	MessagesResponse {
		id: format!("msg_{}", Uuid::new_v4().simple()),
		kind: "message".to_string(),
		role: Role::Assistant,
		model: request_model.to_string(),
		content,
		stop_reason: Some(stop_reason),
		stop_sequence: None,
		usage: Usage {
			input_tokens: usage_metadata.and_then(|u| u.prompt_token_count).unwrap_or(0),
			output_tokens: usage_metadata.and_then(|u| u.candidates_token_count).unwrap_or(0),
		},
	}
}

pub fn synthesize_tool_use_id() -> String {
	format!("toolu_{}", Uuid::new_v4().simple())
}

/// §4.D epilogue precedence: a tool call always reports `tool_use`,
/// regardless of what the upstream `finishReason` says; otherwise
/// `MAX_TOKENS` maps through, and everything else is `end_turn`.
fn compute_stop_reason(has_tool_use: bool, finish_reason: Option<&str>) -> StopReason {
	if has_tool_use {
		return StopReason::ToolUse;
	}
	match finish_reason {
		Some("MAX_TOKENS") => StopReason::MaxTokens,
		_ => StopReason::EndTurn,
	}
}

/// Prefer the per-candidate usage block; some upstreams only populate the
/// response-level one.
fn pick_usage_metadata<'a>(candidate: Option<&'a Candidate>, response_level: Option<&'a UsageMetadata>) -> Option<&'a UsageMetadata> {
	candidate.and_then(|c| c.usage_metadata.as_ref()).or(response_level)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::types::generative::CandidateContent;

	fn candidate_with_text(text: &str, finish_reason: &str) -> GenerativeResponse {
		GenerativeResponse {
			candidates: vec![Candidate {
				content: Some(CandidateContent {
					parts: vec![Part::text(text)],
				}),
				finish_reason: Some(finish_reason.to_string()),
				usage_metadata: None,
			}],
			usage_metadata: Some(UsageMetadata {
				prompt_token_count: Some(10),
				candidates_token_count: Some(5),
				total_token_count: Some(15),
			}),
		}
	}

	#[test]
	fn simple_text_response_maps_end_turn() {
		let resp = candidate_with_text("hello", "STOP");
		let out = translate_response(&resp, "claude-sonnet-4-5");
		assert_eq!(out.stop_reason, Some(StopReason::EndTurn));
		assert_eq!(out.usage.input_tokens, 10);
		assert_eq!(out.usage.output_tokens, 5);
		assert!(matches!(&out.content[0], ContentBlock::Text(t) if t.text == "hello"));
	}

	#[test]
	fn tool_call_forces_tool_use_stop_reason() {
		let mut resp = candidate_with_text("ignored", "STOP");
		resp.candidates[0].content.as_mut().unwrap().parts = vec![Part::function_call(
			Some("toolu_abc".to_string()),
			"search",
			serde_json::json!({"q": "rust", "limit": null}),
		)];
		let out = translate_response(&resp, "claude-sonnet-4-5");
		assert_eq!(out.stop_reason, Some(StopReason::ToolUse));
		match &out.content[0] {
			ContentBlock::ToolUse(tu) => {
				assert_eq!(tu.id, "toolu_abc");
				assert_eq!(tu.input, serde_json::json!({"q": "rust"}));
			},
			_ => panic!("expected tool_use block"),
		}
	}

	#[test]
	fn max_tokens_finish_reason_maps_through() {
		let resp = candidate_with_text("partial", "MAX_TOKENS");
		let out = translate_response(&resp, "claude-sonnet-4-5");
		assert_eq!(out.stop_reason, Some(StopReason::MaxTokens));
	}

	#[test]
	fn empty_candidates_produce_empty_content() {
		let resp = GenerativeResponse::default();
		let out = translate_response(&resp, "claude-sonnet-4-5");
		assert!(out.content.is_empty());
		assert_eq!(out.stop_reason, Some(StopReason::EndTurn));
	}
}
