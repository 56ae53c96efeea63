//! Streaming Translator (§4.D): a stateful SSE-to-SSE transducer from
//! Generative-Content stream chunks to the Messages streaming grammar,
//! grounded in `original_source/src/a2c/core/streaming.py::_StreamingState`.
//!
//! One [`GenerativeStreamTranslator`] is created per request and fed chunks
//! in arrival order; it owns all block-open/close bookkeeping so the caller
//! never has to reason about the Messages block grammar directly.

use uuid::Uuid;

use crate::error::GatewayError;
use crate::translate::request::strip_nulls;
use crate::translate::response::synthesize_tool_use_id;
use crate::types::generative::{GenerativeStreamChunk, Part};
use crate::types::messages::{
	ContentBlock, ContentBlockDelta, ContentImageBlock, ContentTextBlock, ImageSource, MessageDeltaFields,
	MessageStartPayload, MessagesStreamEvent, Role, StopReason, ThinkingBlock, ToolUseBlock, Usage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
	Text,
	Thinking,
	ToolUse,
}

/// Per-request streaming state. `include_thinking` mirrors the translated
/// request's thinking activation decision (§4.B) and gates whether thought
/// parts are forwarded as `thinking` blocks or folded into visible text.
pub struct GenerativeStreamTranslator {
	message_id: String,
	model: String,
	include_thinking: bool,
	estimated_input_tokens: u64,
	message_start_sent: bool,
	pending: Vec<MessagesStreamEvent>,
	next_index: usize,
	open_block: Option<(BlockKind, usize)>,
	current_thinking_signature: Option<String>,
	thinking_fallback_buffer: String,
	has_tool_use: bool,
	finish_reason: Option<String>,
	input_tokens: Option<u64>,
	output_tokens: u64,
}

impl GenerativeStreamTranslator {
	/// `estimated_input_tokens` is the pre-flight estimate (§4.E), used only
	/// if the stream ends without upstream ever reporting real usage.
	pub fn new(model: String, include_thinking: bool, estimated_input_tokens: u64) -> Self {
		Self {
			message_id: format!("msg_{}", Uuid::new_v4().simple()),
			model,
			include_thinking,
			estimated_input_tokens,
			message_start_sent: false,
			pending: Vec::new(),
			next_index: 0,
			open_block: None,
			current_thinking_signature: None,
			thinking_fallback_buffer: String::new(),
			has_tool_use: false,
			finish_reason: None,
			input_tokens: None,
			output_tokens: 0,
		}
	}

	fn message_start_event(&self, input_tokens: u64) -> MessagesStreamEvent {
		MessagesStreamEvent::MessageStart {
			message: MessageStartPayload {
				id: self.message_id.clone(),
				kind: "message",
				role: "assistant",
				model: self.model.clone(),
				content: vec![],
				stop_reason: None,
				stop_sequence: None,
				usage: Usage {
					input_tokens,
					output_tokens: 0,
				},
			},
		}
	}

	/// §4.D "`message_start` ordering rule": events produced before
	/// `input_tokens` is known are buffered, not emitted. Once real usage
	/// metadata arrives, `message_start` goes out first, then the buffer is
	/// flushed, then this chunk's own events follow.
	fn flush_or_buffer(&mut self, new_events: Vec<MessagesStreamEvent>) -> Vec<MessagesStreamEvent> {
		if self.message_start_sent {
			return new_events;
		}
		let Some(input_tokens) = self.input_tokens else {
			self.pending.extend(new_events);
			return Vec::new();
		};
		self.message_start_sent = true;
		let mut out = Vec::with_capacity(self.pending.len() + new_events.len() + 1);
		out.push(self.message_start_event(input_tokens));
		out.append(&mut self.pending);
		out.extend(new_events);
		out
	}

	/// Called at end-of-stream/error when `message_start` never went out:
	/// synthesize one from the pre-flight estimate, then flush the buffer.
	fn synthesize_start_if_needed(&mut self, events: &mut Vec<MessagesStreamEvent>) {
		if self.message_start_sent {
			return;
		}
		self.message_start_sent = true;
		let input_tokens = self.input_tokens.unwrap_or(self.estimated_input_tokens);
		events.push(self.message_start_event(input_tokens));
		events.append(&mut self.pending);
	}

	fn close_open_block(&mut self, events: &mut Vec<MessagesStreamEvent>) {
		if let Some((_, index)) = self.open_block.take() {
			events.push(MessagesStreamEvent::ContentBlockStop { index });
		}
	}

	fn open_block(&mut self, kind: BlockKind, content_block: ContentBlock, events: &mut Vec<MessagesStreamEvent>) -> usize {
		if self.open_block.map(|(k, _)| k) != Some(kind) {
			self.close_open_block(events);
		}
		if let Some((_, index)) = self.open_block {
			return index;
		}
		let index = self.next_index;
		self.next_index += 1;
		self.open_block = Some((kind, index));
		events.push(MessagesStreamEvent::ContentBlockStart { index, content_block });
		index
	}

	fn flush_thinking_fallback(&mut self, events: &mut Vec<MessagesStreamEvent>) {
		if self.thinking_fallback_buffer.is_empty() {
			return;
		}
		let wrapped = format!("<assistant_thinking>\n{}</assistant_thinking>\n\n", self.thinking_fallback_buffer);
		self.thinking_fallback_buffer.clear();
		let index = self.open_block(BlockKind::Text, ContentBlock::Text(ContentTextBlock { text: String::new() }), events);
		events.push(MessagesStreamEvent::ContentBlockDelta {
			index,
			delta: ContentBlockDelta::TextDelta { text: wrapped },
		});
	}

	/// §4.D thinking rows. A signature present when the block is first
	/// opened is carried on `content_block_start` itself; a signature that
	/// arrives later, while a thinking block is already open without one,
	/// is forwarded as a `signature_delta` instead — only the first
	/// signature observed for a block is ever emitted either way (§9 open
	/// question (a)).
	fn handle_thought_part(&mut self, text: &str, signature: Option<&str>, events: &mut Vec<MessagesStreamEvent>) {
		if !self.include_thinking {
			self.thinking_fallback_buffer.push_str(text);
			return;
		}

		let sig = signature.filter(|s| !s.is_empty());
		let was_thinking = self.open_block.map(|(k, _)| k) == Some(BlockKind::Thinking);

		let index = if was_thinking {
			self.open_block.expect("was_thinking implies a block is open").1
		} else {
			self.current_thinking_signature = sig.map(str::to_string);
			self.open_block(
				BlockKind::Thinking,
				ContentBlock::Thinking(ThinkingBlock {
					thinking: String::new(),
					signature: sig.map(str::to_string),
				}),
				events,
			)
		};

		if was_thinking {
			if let Some(sig) = sig {
				if self.current_thinking_signature.is_none() {
					self.current_thinking_signature = Some(sig.to_string());
					events.push(MessagesStreamEvent::ContentBlockDelta {
						index,
						delta: ContentBlockDelta::SignatureDelta { signature: sig.to_string() },
					});
				}
			}
		}

		if !text.is_empty() {
			events.push(MessagesStreamEvent::ContentBlockDelta {
				index,
				delta: ContentBlockDelta::ThinkingDelta { thinking: text.to_string() },
			});
		}
	}

	/// §4.D "whitespace-only: Skip" — dropped unconditionally, without
	/// touching block state, per `streaming.py`'s `if not text.strip(): continue`.
	fn handle_text_part(&mut self, text: &str, events: &mut Vec<MessagesStreamEvent>) {
		if text.trim().is_empty() {
			return;
		}
		self.flush_thinking_fallback(events);
		let index = self.open_block(BlockKind::Text, ContentBlock::Text(ContentTextBlock { text: String::new() }), events);
		events.push(MessagesStreamEvent::ContentBlockDelta {
			index,
			delta: ContentBlockDelta::TextDelta { text: text.to_string() },
		});
	}

	/// §4.D "Part with `inlineData`": close the current block and emit a
	/// complete image block — start and stop at the same index.
	fn handle_inline_data_part(&mut self, part: &Part, events: &mut Vec<MessagesStreamEvent>) {
		self.flush_thinking_fallback(events);
		self.close_open_block(events);
		let Some(img) = &part.inline_data else { return };

		let index = self.next_index;
		self.next_index += 1;
		events.push(MessagesStreamEvent::ContentBlockStart {
			index,
			content_block: ContentBlock::Image(ContentImageBlock {
				source: ImageSource {
					kind: "base64".to_string(),
					media_type: img.mime_type.clone(),
					data: img.data.clone(),
				},
			}),
		});
		events.push(MessagesStreamEvent::ContentBlockStop { index });
	}

	fn handle_function_call_part(&mut self, part: &Part, events: &mut Vec<MessagesStreamEvent>) {
		self.flush_thinking_fallback(events);
		self.close_open_block(events);
		self.has_tool_use = true;
		let fc = part.function_call.as_ref().expect("function_call part");
		let id = fc.id.clone().unwrap_or_else(synthesize_tool_use_id);
		let args = strip_nulls(&fc.args);

		let index = self.next_index;
		self.next_index += 1;
		events.push(MessagesStreamEvent::ContentBlockStart {
			index,
			content_block: ContentBlock::ToolUse(ToolUseBlock {
				id,
				name: fc.name.clone(),
				input: serde_json::Value::Object(Default::default()),
			}),
		});
		events.push(MessagesStreamEvent::ContentBlockDelta {
			index,
			delta: ContentBlockDelta::InputJsonDelta {
				partial_json: serde_json::to_string(&args).unwrap_or_else(|_| "{}".to_string()),
			},
		});
		events.push(MessagesStreamEvent::ContentBlockStop { index });
	}

	/// Feed the next upstream SSE chunk; returns zero or more Messages SSE
	/// events to forward to the client, in order (buffered until
	/// `message_start` can be sent, per §4.D).
	pub fn handle_chunk(&mut self, chunk: GenerativeStreamChunk) -> Vec<MessagesStreamEvent> {
		// Prefer the candidate-level usage metadata over the response-level
		// one when it reports strictly more populated fields (expansion
		// note, `pick_usage_metadata`); response-level is the fallback.
		self.accumulate_usage(chunk.response.usage_metadata.as_ref());

		let mut events = Vec::new();
		let Some(candidate) = chunk.response.candidates.into_iter().next() else {
			return self.flush_or_buffer(events);
		};

		if let Some(reason) = candidate.finish_reason {
			self.finish_reason = Some(reason);
		}
		self.accumulate_usage(candidate.usage_metadata.as_ref());

		if let Some(content) = candidate.content {
			for part in &content.parts {
				if part.function_call.is_some() {
					self.handle_function_call_part(part, &mut events);
					continue;
				}
				if part.inline_data.is_some() {
					self.handle_inline_data_part(part, &mut events);
					continue;
				}
				let Some(text) = &part.text else { continue };
				if part.thought == Some(true) {
					self.handle_thought_part(text, part.thought_signature.as_deref(), &mut events);
				} else {
					self.handle_text_part(text, &mut events);
				}
			}
		}

		self.flush_or_buffer(events)
	}

	fn accumulate_usage(&mut self, usage: Option<&crate::types::generative::UsageMetadata>) {
		if let Some(u) = usage {
			if let Some(p) = u.prompt_token_count {
				self.input_tokens = Some(p);
			}
			if let Some(c) = u.candidates_token_count {
				self.output_tokens = c;
			}
		}
	}

	/// Called once the upstream response body is exhausted: flushes any
	/// buffered fallback text, closes the trailing block, and emits the
	/// `message_delta`/`message_stop` epilogue (§4.D).
	pub fn finish(mut self) -> Vec<MessagesStreamEvent> {
		let mut events = Vec::new();
		self.synthesize_start_if_needed(&mut events);
		self.flush_thinking_fallback(&mut events);
		self.close_open_block(&mut events);

		let stop_reason = if self.has_tool_use {
			StopReason::ToolUse
		} else {
			match self.finish_reason.as_deref() {
				Some("MAX_TOKENS") => StopReason::MaxTokens,
				_ => StopReason::EndTurn,
			}
		};

		events.push(MessagesStreamEvent::MessageDelta {
			delta: MessageDeltaFields {
				stop_reason: Some(stop_reason),
				stop_sequence: None,
			},
			usage: Usage {
				input_tokens: self.input_tokens.unwrap_or(self.estimated_input_tokens),
				output_tokens: self.output_tokens,
			},
		});
		events.push(MessagesStreamEvent::MessageStop);
		events
	}

	/// Upstream transport/provider failure mid-stream: synthesize
	/// `message_start` if one hasn't gone out yet, then emit an `error`
	/// event so the client sees a well-formed (if truncated) stream.
	pub fn handle_error(&mut self, err: &GatewayError) -> Vec<MessagesStreamEvent> {
		let mut events = Vec::new();
		self.synthesize_start_if_needed(&mut events);
		events.push(MessagesStreamEvent::Error {
			error: err.to_messages_error(),
		});
		events
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::types::generative::{Candidate, CandidateContent, GenerativeResponse, UsageMetadata};

	fn chunk(parts: Vec<Part>, finish_reason: Option<&str>) -> GenerativeStreamChunk {
		GenerativeStreamChunk {
			response: GenerativeResponse {
				candidates: vec![Candidate {
					content: Some(CandidateContent { parts }),
					finish_reason: finish_reason.map(str::to_string),
					usage_metadata: Some(UsageMetadata {
						prompt_token_count: Some(12),
						candidates_token_count: Some(3),
						total_token_count: Some(15),
					}),
				}],
				usage_metadata: None,
			},
		}
	}

	#[test]
	fn scenario_2_streaming_text_no_thinking() {
		let mut t = GenerativeStreamTranslator::new("claude-sonnet-4-5".into(), false, 12);
		let mut events = t.handle_chunk(chunk(vec![Part::text("Hello")], None));
		events.extend(t.handle_chunk(chunk(vec![Part::text(", world")], Some("STOP"))));
		events.extend(t.finish());

		assert!(matches!(events[0], MessagesStreamEvent::MessageStart { .. }));
		assert!(matches!(events[1], MessagesStreamEvent::ContentBlockStart { index: 0, .. }));
		assert!(matches!(&events[2], MessagesStreamEvent::ContentBlockDelta { index: 0, delta: ContentBlockDelta::TextDelta { text } } if text == "Hello"));
		assert!(matches!(&events[3], MessagesStreamEvent::ContentBlockDelta { index: 0, delta: ContentBlockDelta::TextDelta { text } } if text == ", world"));
		assert!(matches!(events[4], MessagesStreamEvent::ContentBlockStop { index: 0 }));
		assert!(matches!(events[5], MessagesStreamEvent::MessageDelta { .. }));
		assert!(matches!(events[6], MessagesStreamEvent::MessageStop));

		let MessagesStreamEvent::MessageStart { message } = &events[0] else { unreachable!() };
		assert_eq!(message.usage.input_tokens, 12);
		let MessagesStreamEvent::MessageDelta { usage, .. } = &events[5] else { unreachable!() };
		assert_eq!(usage.input_tokens, message.usage.input_tokens);
	}

	#[test]
	fn message_start_is_buffered_until_usage_metadata_arrives() {
		// First chunk carries no usage metadata at all; the translator must
		// not emit anything until it does, then must flush the buffered
		// block-open event first.
		let mut t = GenerativeStreamTranslator::new("claude-sonnet-4-5".into(), false, 7);
		let no_usage_chunk = GenerativeStreamChunk {
			response: GenerativeResponse {
				candidates: vec![Candidate {
					content: Some(CandidateContent {
						parts: vec![Part::text("partial")],
					}),
					finish_reason: None,
					usage_metadata: None,
				}],
				usage_metadata: None,
			},
		};
		let first = t.handle_chunk(no_usage_chunk);
		assert!(first.is_empty(), "nothing should be emitted before input_tokens is known");

		let second = t.handle_chunk(chunk(vec![Part::text(" more")], Some("STOP")));
		assert!(matches!(second[0], MessagesStreamEvent::MessageStart { .. }));
		assert!(matches!(second[1], MessagesStreamEvent::ContentBlockStart { index: 0, .. }));
		assert!(matches!(&second[2], MessagesStreamEvent::ContentBlockDelta { index: 0, delta: ContentBlockDelta::TextDelta { text } } if text == "partial"));
		assert!(matches!(&second[3], MessagesStreamEvent::ContentBlockDelta { index: 0, delta: ContentBlockDelta::TextDelta { text } } if text == " more"));
	}

	#[test]
	fn synthesizes_message_start_from_estimate_when_usage_never_arrives() {
		let t = GenerativeStreamTranslator::new("claude-sonnet-4-5".into(), false, 42);
		let events = t.finish();
		let MessagesStreamEvent::MessageStart { message } = &events[0] else { unreachable!() };
		assert_eq!(message.usage.input_tokens, 42);
		let MessagesStreamEvent::MessageDelta { usage, .. } = events.iter().find(|e| matches!(e, MessagesStreamEvent::MessageDelta { .. })).unwrap() else {
			unreachable!()
		};
		assert_eq!(usage.input_tokens, 42);
	}

	#[test]
	fn scenario_3_streaming_thinking_carries_signature_on_block_open() {
		// §8 scenario 3: the first thought part already carries a signature,
		// so it rides on `content_block_start` itself — no `signature_delta`
		// is emitted at all for this stream.
		let mut t = GenerativeStreamTranslator::new("claude-opus-4-5-thinking".into(), true, 12);
		let mut events = t.handle_chunk(chunk(vec![Part::thought("pondering", "SIG1".to_string())], None));
		events.extend(t.handle_chunk(chunk(vec![Part::text("answer")], Some("STOP"))));
		events.extend(t.finish());

		assert!(matches!(events[0], MessagesStreamEvent::MessageStart { .. }));
		assert!(matches!(
			&events[1],
			MessagesStreamEvent::ContentBlockStart { index: 0, content_block: ContentBlock::Thinking(b) }
			if b.signature.as_deref() == Some("SIG1")
		));
		assert!(matches!(
			&events[2],
			MessagesStreamEvent::ContentBlockDelta { index: 0, delta: ContentBlockDelta::ThinkingDelta { thinking } }
			if thinking == "pondering"
		));
		assert!(matches!(events[3], MessagesStreamEvent::ContentBlockStop { index: 0 }));
		assert!(matches!(events[4], MessagesStreamEvent::ContentBlockStart { index: 1, .. }));
		assert!(matches!(
			&events[5],
			MessagesStreamEvent::ContentBlockDelta { index: 1, delta: ContentBlockDelta::TextDelta { text } } if text == "answer"
		));
		assert!(matches!(events[6], MessagesStreamEvent::ContentBlockStop { index: 1 }));
		assert!(matches!(events[7], MessagesStreamEvent::MessageDelta { .. }));
		assert!(matches!(events[8], MessagesStreamEvent::MessageStop));

		assert!(
			!events
				.iter()
				.any(|e| matches!(e, MessagesStreamEvent::ContentBlockDelta { delta: ContentBlockDelta::SignatureDelta { .. }, .. })),
			"signature carried on open must not also be re-emitted as a delta"
		);
	}

	#[test]
	fn signature_arriving_after_block_already_open_emits_signature_delta() {
		// When the first thought part in a block carries no signature, a
		// later signature for the same still-open block is forwarded as a
		// `signature_delta`, ordered before that chunk's `thinking_delta`.
		fn thought_part(text: &str, signature: Option<&str>) -> Part {
			Part {
				text: Some(text.to_string()),
				thought: Some(true),
				thought_signature: signature.map(str::to_string),
				inline_data: None,
				function_call: None,
				function_response: None,
				usage_metadata: None,
			}
		}

		let mut t = GenerativeStreamTranslator::new("claude-opus-4-5-thinking".into(), true, 12);
		let mut events = t.handle_chunk(chunk(vec![thought_part("first", None)], None));
		events.extend(t.handle_chunk(chunk(vec![thought_part(" second", Some("SIG2"))], None)));
		events.extend(t.finish());

		assert!(matches!(
			&events[1],
			MessagesStreamEvent::ContentBlockStart { content_block: ContentBlock::Thinking(b), .. } if b.signature.is_none()
		));

		let sig_index = events
			.iter()
			.position(|e| matches!(e, MessagesStreamEvent::ContentBlockDelta { delta: ContentBlockDelta::SignatureDelta { signature }, .. } if signature == "SIG2"))
			.expect("signature_delta should be emitted once the signature arrives");
		let second_delta_index = events
			.iter()
			.position(|e| matches!(e, MessagesStreamEvent::ContentBlockDelta { delta: ContentBlockDelta::ThinkingDelta { thinking }, .. } if thinking == " second"))
			.unwrap();
		assert!(sig_index < second_delta_index, "signature_delta must precede that chunk's thinking_delta");

		let signature_deltas = events
			.iter()
			.filter(|e| matches!(e, MessagesStreamEvent::ContentBlockDelta { delta: ContentBlockDelta::SignatureDelta { .. }, .. }))
			.count();
		assert_eq!(signature_deltas, 1, "only the first signature for the block is forwarded");
	}

	#[test]
	fn whitespace_only_text_part_is_skipped() {
		// The whitespace-only part must produce no block and consume no
		// index — "hello" still lands at index 0, not index 1.
		let mut t = GenerativeStreamTranslator::new("claude-sonnet-4-5".into(), false, 12);
		let mut events = t.handle_chunk(chunk(vec![Part::text("   ")], None));
		events.extend(t.handle_chunk(chunk(vec![Part::text("hello")], Some("STOP"))));
		events.extend(t.finish());

		let block_starts: Vec<_> = events
			.iter()
			.filter(|e| matches!(e, MessagesStreamEvent::ContentBlockStart { .. }))
			.collect();
		assert_eq!(block_starts.len(), 1, "only \"hello\" should open a block");
		assert!(matches!(block_starts[0], MessagesStreamEvent::ContentBlockStart { index: 0, .. }));

		let text_deltas: Vec<_> = events
			.iter()
			.filter_map(|e| match e {
				MessagesStreamEvent::ContentBlockDelta { delta: ContentBlockDelta::TextDelta { text }, .. } => Some(text.as_str()),
				_ => None,
			})
			.collect();
		assert_eq!(text_deltas, vec!["hello"]);
	}

	#[test]
	fn inline_data_part_emits_complete_image_block() {
		let mut t = GenerativeStreamTranslator::new("claude-sonnet-4-5".into(), false, 12);
		let mut events = t.handle_chunk(chunk(vec![Part::text("before")], None));
		events.extend(t.handle_chunk(chunk(vec![Part::inline_data("image/png", "aGVsbG8=")], None)));
		events.extend(t.finish());

		let text_stop = events.iter().position(|e| matches!(e, MessagesStreamEvent::ContentBlockStop { index: 0 })).unwrap();
		let image_start = events
			.iter()
			.position(|e| matches!(e, MessagesStreamEvent::ContentBlockStart { index: 1, content_block: ContentBlock::Image(_) }))
			.expect("image block should be opened");
		let image_stop = events.iter().position(|e| matches!(e, MessagesStreamEvent::ContentBlockStop { index: 1 })).unwrap();
		assert!(text_stop < image_start, "the text block must be closed before the image block opens");
		assert_eq!(image_stop, image_start + 1, "image block start and stop are emitted back to back");

		let MessagesStreamEvent::ContentBlockStart {
			content_block: ContentBlock::Image(img),
			..
		} = &events[image_start]
		else {
			unreachable!()
		};
		assert_eq!(img.source.kind, "base64");
		assert_eq!(img.source.media_type, "image/png");
		assert_eq!(img.source.data, "aGVsbG8=");
	}

	#[test]
	fn scenario_4_tool_call_mid_stream_closes_text_block_first() {
		let mut t = GenerativeStreamTranslator::new("claude-sonnet-4-5".into(), false, 12);
		let mut events = t.handle_chunk(chunk(vec![Part::text("Let me check that. ")], None));
		events.extend(t.handle_chunk(chunk(
			vec![Part::function_call(None, "get_weather", serde_json::json!({"city": "nyc", "unit": null}))],
			None,
		)));
		events.extend(t.finish());

		let stops: Vec<usize> = events
			.iter()
			.filter_map(|e| match e {
				MessagesStreamEvent::ContentBlockStop { index } => Some(*index),
				_ => None,
			})
			.collect();
		assert_eq!(stops, vec![0, 1]);
		let tool_start = events
			.iter()
			.find_map(|e| match e {
				MessagesStreamEvent::ContentBlockStart {
					content_block: ContentBlock::ToolUse(tu),
					..
				} => Some(tu),
				_ => None,
			})
			.unwrap();
		assert!(tool_start.id.starts_with("toolu_"));
		let delta_found = events.iter().any(|e| match e {
			MessagesStreamEvent::ContentBlockDelta {
				delta: ContentBlockDelta::InputJsonDelta { partial_json },
				..
			} => partial_json.contains("nyc") && !partial_json.contains("unit"),
			_ => false,
		});
		assert!(delta_found);

		let message_delta = events
			.iter()
			.find_map(|e| match e {
				MessagesStreamEvent::MessageDelta { delta, .. } => Some(delta.stop_reason),
				_ => None,
			})
			.unwrap();
		assert_eq!(message_delta, Some(StopReason::ToolUse));
	}

	#[test]
	fn thinking_requested_false_wraps_thought_as_visible_text() {
		let mut t = GenerativeStreamTranslator::new("claude-sonnet-4-5".into(), false, 12);
		let mut events = t.handle_chunk(chunk(vec![Part::thought("secret reasoning", "sig".to_string())], None));
		events.extend(t.handle_chunk(chunk(vec![Part::text("visible answer")], Some("STOP"))));
		events.extend(t.finish());

		let wrapped = events.iter().any(|e| match e {
			MessagesStreamEvent::ContentBlockDelta {
				delta: ContentBlockDelta::TextDelta { text },
				..
			} => text.contains("<assistant_thinking>") && text.contains("secret reasoning"),
			_ => false,
		});
		assert!(wrapped);
		assert!(!events.iter().any(|e| matches!(
			e,
			MessagesStreamEvent::ContentBlockDelta { delta: ContentBlockDelta::ThinkingDelta { .. }, .. }
		)));
	}

	#[test]
	fn empty_stream_still_emits_start_and_stop() {
		let t = GenerativeStreamTranslator::new("claude-sonnet-4-5".into(), false, 12);
		let events = t.finish();
		assert!(matches!(events[0], MessagesStreamEvent::MessageStart { .. }));
		assert!(matches!(events.last().unwrap(), MessagesStreamEvent::MessageStop));
	}
}
