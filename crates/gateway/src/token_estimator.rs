//! Token Estimator (§4.E): a cheap pre-flight input-token estimate, grounded
//! in `original_source/src/a2c/core/token_estimator.py::estimate_input_tokens`.

use serde_json::Value;

/// `max(1, total_chars/4 + image_count*300)` over every string and
/// image-shaped object in the payload.
pub fn estimate_input_tokens(payload: &Value) -> u64 {
	let mut total_chars: u64 = 0;
	let mut image_count: u64 = 0;
	count(payload, &mut total_chars, &mut image_count);
	(total_chars / 4 + image_count * 300).max(1)
}

fn count(value: &Value, total_chars: &mut u64, image_count: &mut u64) {
	match value {
		Value::String(s) => *total_chars += s.chars().count() as u64,
		Value::Object(map) => {
			let is_image = map.get("type").and_then(Value::as_str) == Some("image") || map.contains_key("inlineData");
			if is_image {
				*image_count += 1;
			}
			for v in map.values() {
				count(v, total_chars, image_count);
			}
		},
		Value::Array(items) => {
			for item in items {
				count(item, total_chars, image_count);
			}
		},
		_ => {},
	}
}
