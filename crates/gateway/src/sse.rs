//! Minimal SSE line decoder for upstream provider streams, grounded in the
//! wire shape `original_source/src/a2c/core/streaming.py`'s `_sse_event`
//! produces (and its Gemini/OpenAI upstream counterparts consume): frames
//! separated by a blank line, each carrying one or more `field: value`
//! lines.
//!
//! Resolves the "`[DONE]` vs absent terminator" ambiguity (open question):
//! completion is driven by the upstream body stream ending, not by any
//! particular payload. A literal `data: [DONE]` frame (the OpenAI-style
//! convention) is recognized and treated as a no-op rather than data to
//! parse — if the transport also closes right after, that's consistent,
//! not a conflict.

use bytes::{Bytes, BytesMut};

#[derive(Default)]
pub struct SseDecoder {
	buffer: BytesMut,
}

impl SseDecoder {
	pub fn new() -> Self {
		SseDecoder::default()
	}

	/// Feed the next chunk of upstream body bytes; returns zero or more
	/// complete `data:` payloads extracted from whole frames now available.
	/// Incomplete trailing frames stay buffered for the next call.
	pub fn feed(&mut self, chunk: Bytes) -> Vec<String> {
		self.buffer.extend_from_slice(&chunk);
		let mut payloads = Vec::new();

		loop {
			let Some(pos) = find_double_newline(&self.buffer) else {
				break;
			};
			let frame = self.buffer.split_to(pos);
			// drop the blank-line separator itself (either \n\n or \r\n\r\n)
			let sep_len = if self.buffer.starts_with(b"\r\n") { 2 } else { 1 };
			let _ = self.buffer.split_to(sep_len);

			if let Some(payload) = extract_data(&frame) {
				if payload != "[DONE]" {
					payloads.push(payload);
				}
			}
		}

		payloads
	}
}

fn find_double_newline(buf: &BytesMut) -> Option<usize> {
	buf.windows(2).position(|w| w == b"\n\n").map(|p| p + 2).or_else(|| {
		buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
	})
}

fn extract_data(frame: &[u8]) -> Option<String> {
	let text = String::from_utf8_lossy(frame);
	let mut data_lines = Vec::new();
	for line in text.lines() {
		if let Some(rest) = line.strip_prefix("data:") {
			data_lines.push(rest.trim_start().to_string());
		}
	}
	if data_lines.is_empty() { None } else { Some(data_lines.join("\n")) }
}
