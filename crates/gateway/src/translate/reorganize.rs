//! Tool-Message Reorganizer (§4.C): ensures every `functionCall` is
//! immediately followed by its matching `functionResponse` (by id),
//! regardless of how the caller interleaved them, grounded in
//! `original_source/src/a2c/core/converter.py::reorganize_tool_messages`.
//!
//! Algorithm: (1) index all `functionResponse` parts by id; (2) flatten every
//! multi-part `Content` into one-part `Content`s, preserving order; (3) walk
//! the flat list, dropping orphan responses — for each call, emit
//! `{role:model, parts:[call]}` and, if a response exists for its id,
//! immediately emit `{role:user, parts:[response]}`; leave other parts
//! untouched.

use std::collections::HashMap;

use crate::types::generative::{Content, ContentRole, Part};

pub fn reorganize_tool_messages(contents: Vec<Content>) -> Vec<Content> {
	let flat: Vec<(ContentRole, Part)> = contents
		.into_iter()
		.flat_map(|c| {
			let role = c.role;
			c.parts.into_iter().map(move |p| (role, p))
		})
		.collect();

	let mut responses: HashMap<String, Part> = HashMap::new();
	for (_, part) in &flat {
		if let Some(response) = &part.function_response {
			if let Some(id) = &response.id {
				responses.insert(id.clone(), part.clone());
			}
		}
	}

	let mut out = Vec::with_capacity(flat.len());
	for (role, part) in flat {
		if part.function_response.is_some() {
			// Emitted adjacent to its matching call below (or dropped as an
			// orphan if no call ever claims it).
			continue;
		}

		if let Some(call) = &part.function_call {
			let id = call.id.clone();
			out.push(Content {
				role: ContentRole::Model,
				parts: vec![part],
			});
			if let Some(response) = id.and_then(|id| responses.remove(&id)) {
				out.push(Content {
					role: ContentRole::User,
					parts: vec![response],
				});
			}
			continue;
		}

		out.push(Content { role, parts: vec![part] });
	}
	out
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::types::generative::{ContentRole, Part};

	fn content(role: ContentRole, text: &str) -> Content {
		Content {
			role,
			parts: vec![Part::text(text)],
		}
	}

	#[test]
	fn flattens_multi_part_content_into_one_part_entries() {
		let contents = vec![Content {
			role: ContentRole::User,
			parts: vec![Part::text("a"), Part::text("b")],
		}];
		let out = reorganize_tool_messages(contents);
		assert_eq!(out.len(), 2);
		assert_eq!(out[0].parts.len(), 1);
		assert_eq!(out[1].parts.len(), 1);
	}

	#[test]
	fn pairs_call_with_its_response_by_id_even_when_separated() {
		let contents = vec![
			Content {
				role: ContentRole::Model,
				parts: vec![Part::function_call(Some("call_1".to_string()), "lookup", serde_json::json!({}))],
			},
			content(ContentRole::User, "unrelated aside"),
			Content {
				role: ContentRole::User,
				parts: vec![Part::function_response(Some("call_1".to_string()), "lookup", "42".to_string())],
			},
		];
		let out = reorganize_tool_messages(contents);
		// call immediately followed by its response, "unrelated aside" kept afterward.
		assert_eq!(out.len(), 3);
		assert!(out[0].parts[0].function_call.is_some());
		assert_eq!(out[0].role, ContentRole::Model);
		assert!(out[1].parts[0].function_response.is_some());
		assert_eq!(out[1].role, ContentRole::User);
		assert_eq!(out[2].parts[0].text.as_deref(), Some("unrelated aside"));
	}

	#[test]
	fn orphan_response_with_no_matching_call_is_dropped() {
		let contents = vec![Content {
			role: ContentRole::User,
			parts: vec![Part::function_response(Some("no_such_call".to_string()), "lookup", "42".to_string())],
		}];
		let out = reorganize_tool_messages(contents);
		assert!(out.is_empty());
	}

	#[test]
	fn response_arriving_before_its_call_is_still_reordered_adjacent() {
		let contents = vec![
			Content {
				role: ContentRole::User,
				parts: vec![Part::function_response(Some("call_1".to_string()), "lookup", "42".to_string())],
			},
			Content {
				role: ContentRole::Model,
				parts: vec![Part::function_call(Some("call_1".to_string()), "lookup", serde_json::json!({}))],
			},
		];
		let out = reorganize_tool_messages(contents);
		assert_eq!(out.len(), 2);
		assert!(out[0].parts[0].function_call.is_some());
		assert!(out[1].parts[0].function_response.is_some());
	}

	#[test]
	fn already_alternating_is_unchanged() {
		let contents = vec![content(ContentRole::User, "hi"), content(ContentRole::Model, "hello")];
		let out = reorganize_tool_messages(contents.clone());
		assert_eq!(out.len(), contents.len());
	}

	#[test]
	fn empty_input_is_empty_output() {
		assert!(reorganize_tool_messages(vec![]).is_empty());
	}
}
