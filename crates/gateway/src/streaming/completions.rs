//! Sibling streaming state machine for the supplemental Chat-Completions
//! provider: `delta.content` text chunks and `delta.tool_calls` fragments
//! translated into the same Messages SSE grammar as
//! [`super::generative::GenerativeStreamTranslator`].

use std::collections::BTreeMap;

use crate::error::GatewayError;
use crate::types::completions::StreamResponse;
use crate::types::messages::{
	ContentBlock, ContentBlockDelta, ContentTextBlock, MessageDeltaFields, MessageStartPayload, MessagesStreamEvent,
	StopReason, ToolUseBlock, Usage,
};

#[derive(Default)]
struct ToolCallAccumulator {
	id: String,
	name: String,
	arguments: String,
	index_in_stream: usize,
}

pub struct CompletionsStreamTranslator {
	message_id: String,
	model: String,
	started: bool,
	/// Chat-Completions streams typically report `usage` only on the final
	/// chunk (and only with `stream_options.include_usage`), so unlike the
	/// Generative-Content translator there is nothing to buffer for —
	/// `message_start` always carries the pre-flight estimate, captured
	/// once so `message_delta`'s usage can echo the same value (§8).
	estimated_input_tokens: u64,
	next_index: usize,
	text_block_index: Option<usize>,
	tool_calls: BTreeMap<u32, ToolCallAccumulator>,
	finish_reason: Option<String>,
	input_tokens: u64,
	output_tokens: u64,
}

impl CompletionsStreamTranslator {
	pub fn new(message_id: String, model: String, estimated_input_tokens: u64) -> Self {
		Self {
			message_id,
			model,
			started: false,
			estimated_input_tokens,
			next_index: 0,
			text_block_index: None,
			tool_calls: BTreeMap::new(),
			finish_reason: None,
			input_tokens: estimated_input_tokens,
			output_tokens: 0,
		}
	}

	fn ensure_started(&mut self, events: &mut Vec<MessagesStreamEvent>) {
		if self.started {
			return;
		}
		self.started = true;
		events.push(MessagesStreamEvent::MessageStart {
			message: MessageStartPayload {
				id: self.message_id.clone(),
				kind: "message",
				role: "assistant",
				model: self.model.clone(),
				content: vec![],
				stop_reason: None,
				stop_sequence: None,
				usage: Usage {
					input_tokens: self.estimated_input_tokens,
					output_tokens: 0,
				},
			},
		});
	}

	pub fn handle_chunk(&mut self, chunk: StreamResponse) -> Vec<MessagesStreamEvent> {
		let mut events = Vec::new();
		self.ensure_started(&mut events);

		if let Some(usage) = chunk.usage {
			// `input_tokens` stays pinned to the estimate already committed
			// in `message_start`; only `output_tokens` is refined here.
			self.output_tokens = usage.completion_tokens;
		}

		let Some(choice) = chunk.choices.into_iter().next() else {
			return events;
		};
		if let Some(reason) = choice.finish_reason {
			self.finish_reason = Some(reason);
		}

		if let Some(text) = choice.delta.content {
			if !text.is_empty() {
				let index = *self.text_block_index.get_or_insert_with(|| {
					let index = self.next_index;
					self.next_index += 1;
					events.push(MessagesStreamEvent::ContentBlockStart {
						index,
						content_block: ContentBlock::Text(ContentTextBlock { text: String::new() }),
					});
					index
				});
				events.push(MessagesStreamEvent::ContentBlockDelta {
					index,
					delta: ContentBlockDelta::TextDelta { text },
				});
			}
		}

		if let Some(tool_calls) = choice.delta.tool_calls {
			for delta in tool_calls {
				let is_new = !self.tool_calls.contains_key(&delta.index);
				let entry = self.tool_calls.entry(delta.index).or_insert_with(ToolCallAccumulator::default);
				if let Some(id) = &delta.id {
					entry.id = id.clone();
				}
				if let Some(function) = &delta.function {
					if let Some(name) = &function.name {
						entry.name = name.clone();
					}
					if let Some(args) = &function.arguments {
						entry.arguments.push_str(args);
					}
				}
				if is_new {
					let index = self.next_index;
					self.next_index += 1;
					entry.index_in_stream = index;
					events.push(MessagesStreamEvent::ContentBlockStart {
						index,
						content_block: ContentBlock::ToolUse(ToolUseBlock {
							id: entry.id.clone(),
							name: entry.name.clone(),
							input: serde_json::Value::Object(Default::default()),
						}),
					});
				}
			}
		}

		events
	}

	pub fn finish(mut self) -> Vec<MessagesStreamEvent> {
		let mut events = Vec::new();
		self.ensure_started(&mut events);

		for (_, acc) in std::mem::take(&mut self.tool_calls) {
			if !acc.arguments.is_empty() {
				events.push(MessagesStreamEvent::ContentBlockDelta {
					index: acc.index_in_stream,
					delta: ContentBlockDelta::InputJsonDelta { partial_json: acc.arguments },
				});
			}
			events.push(MessagesStreamEvent::ContentBlockStop { index: acc.index_in_stream });
		}
		if let Some(index) = self.text_block_index.take() {
			events.push(MessagesStreamEvent::ContentBlockStop { index });
		}

		let has_tool_use = self.finish_reason.as_deref() == Some("tool_calls");
		let stop_reason = if has_tool_use {
			StopReason::ToolUse
		} else {
			match self.finish_reason.as_deref() {
				Some("length") => StopReason::MaxTokens,
				Some("stop") | None => StopReason::EndTurn,
				_ => StopReason::EndTurn,
			}
		};

		events.push(MessagesStreamEvent::MessageDelta {
			delta: MessageDeltaFields {
				stop_reason: Some(stop_reason),
				stop_sequence: None,
			},
			usage: Usage {
				input_tokens: self.input_tokens,
				output_tokens: self.output_tokens,
			},
		});
		events.push(MessagesStreamEvent::MessageStop);
		events
	}

	pub fn handle_error(&mut self, err: &GatewayError) -> Vec<MessagesStreamEvent> {
		let mut events = Vec::new();
		self.ensure_started(&mut events);
		events.push(MessagesStreamEvent::Error {
			error: err.to_messages_error(),
		});
		events
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::types::completions::{Delta, DeltaFunctionCall, DeltaToolCall, StreamChoice};

	fn text_chunk(text: &str, finish_reason: Option<&str>) -> StreamResponse {
		StreamResponse {
			id: "chatcmpl-1".to_string(),
			model: "gpt-4o".to_string(),
			choices: vec![StreamChoice {
				index: 0,
				delta: Delta {
					content: Some(text.to_string()),
					tool_calls: None,
				},
				finish_reason: finish_reason.map(str::to_string),
			}],
			usage: None,
		}
	}

	#[test]
	fn text_only_stream_opens_one_block_and_closes_end_turn() {
		let mut t = CompletionsStreamTranslator::new("msg_1".to_string(), "claude-sonnet-4-5".to_string(), 9);
		let mut events = t.handle_chunk(text_chunk("Hello", None));
		events.extend(t.handle_chunk(text_chunk(" there", Some("stop"))));
		events.extend(t.finish());

		assert!(matches!(events[0], MessagesStreamEvent::MessageStart { .. }));
		assert!(matches!(events[1], MessagesStreamEvent::ContentBlockStart { index: 0, .. }));
		let stop_reason = events.iter().find_map(|e| match e {
			MessagesStreamEvent::MessageDelta { delta, .. } => Some(delta.stop_reason),
			_ => None,
		});
		assert_eq!(stop_reason, Some(Some(StopReason::EndTurn)));
	}

	#[test]
	fn tool_call_deltas_accumulate_arguments_across_chunks() {
		let mut t = CompletionsStreamTranslator::new("msg_1".to_string(), "claude-sonnet-4-5".to_string(), 9);
		let mut events = t.handle_chunk(StreamResponse {
			id: "chatcmpl-2".to_string(),
			model: "gpt-4o".to_string(),
			choices: vec![StreamChoice {
				index: 0,
				delta: Delta {
					content: None,
					tool_calls: Some(vec![DeltaToolCall {
						index: 0,
						id: Some("call_1".to_string()),
						function: Some(DeltaFunctionCall {
							name: Some("lookup".to_string()),
							arguments: Some("{\"q\":".to_string()),
						}),
					}]),
				},
				finish_reason: None,
			}],
			usage: None,
		});
		events.extend(t.handle_chunk(StreamResponse {
			id: "chatcmpl-2".to_string(),
			model: "gpt-4o".to_string(),
			choices: vec![StreamChoice {
				index: 0,
				delta: Delta {
					content: None,
					tool_calls: Some(vec![DeltaToolCall {
						index: 0,
						id: None,
						function: Some(DeltaFunctionCall {
							name: None,
							arguments: Some("\"x\"}".to_string()),
						}),
					}]),
				},
				finish_reason: Some("tool_calls".to_string()),
			}],
			usage: None,
		}));
		events.extend(t.finish());

		let partial_json = events.iter().find_map(|e| match e {
			MessagesStreamEvent::ContentBlockDelta {
				delta: ContentBlockDelta::InputJsonDelta { partial_json },
				..
			} => Some(partial_json.clone()),
			_ => None,
		});
		assert_eq!(partial_json.as_deref(), Some("{\"q\":\"x\"}"));
		let stop_reason = events.iter().find_map(|e| match e {
			MessagesStreamEvent::MessageDelta { delta, .. } => Some(delta.stop_reason),
			_ => None,
		});
		assert_eq!(stop_reason, Some(Some(StopReason::ToolUse)));
	}
}
