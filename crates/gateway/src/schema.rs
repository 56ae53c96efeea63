//! Schema Sanitizer (§4.A): recursively rewrites a JSON-schema fragment to
//! drop constructs the Generative-Content format rejects, grounded in
//! `original_source/src/a2c/core/converter.py::clean_json_schema`.

use serde_json::{Map, Value};

const DROP_KEYS: &[&str] = &[
	"$schema",
	"$id",
	"$ref",
	"$defs",
	"definitions",
	"title",
	"example",
	"examples",
	"readOnly",
	"writeOnly",
	"default",
	"exclusiveMinimum",
	"exclusiveMaximum",
	"oneOf",
	"anyOf",
	"allOf",
	"const",
	"additionalItems",
	"additionalProperties",
	"contains",
	"patternProperties",
	"dependencies",
	"propertyNames",
	"if",
	"then",
	"else",
	"contentEncoding",
	"contentMediaType",
];

const VALIDATION_KEYS: &[(&str, &str)] = &[
	("minLength", "minLength"),
	("maxLength", "maxLength"),
	("minimum", "minimum"),
	("maximum", "maximum"),
	("minItems", "minItems"),
	("maxItems", "maxItems"),
];

/// Clean a JSON-schema fragment. Non-object inputs pass through unchanged.
pub fn clean_json_schema(schema: &Value) -> Value {
	let Value::Object(obj) = schema else {
		return schema.clone();
	};

	let mut validations = Vec::new();
	for (key, label) in VALIDATION_KEYS {
		if let Some(v) = obj.get(*key) {
			validations.push(format!("{label}: {}", display_value(v)));
		}
	}

	let mut cleaned = Map::new();
	for (key, value) in obj {
		if DROP_KEYS.contains(&key.as_str()) || VALIDATION_KEYS.iter().any(|(k, _)| k == key) {
			continue;
		}

		if key == "type" {
			if let Value::Array(types) = value {
				let has_null = types
					.iter()
					.any(|t| t.as_str().is_some_and(|s| s.trim().eq_ignore_ascii_case("null")));
				let non_null: Vec<&str> = types
					.iter()
					.filter_map(|t| t.as_str())
					.map(str::trim)
					.filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
					.collect();
				cleaned.insert(
					"type".to_string(),
					Value::String(non_null.first().unwrap_or(&"string").to_string()),
				);
				if has_null {
					cleaned.insert("nullable".to_string(), Value::Bool(true));
				}
				continue;
			}
		}

		if key == "description" && !validations.is_empty() {
			let base = value.as_str().map(str::to_string).unwrap_or_else(|| display_value(value));
			cleaned.insert(key.clone(), Value::String(format!("{base} ({})", validations.join(", "))));
			continue;
		}

		match value {
			Value::Object(_) => {
				cleaned.insert(key.clone(), clean_json_schema(value));
			},
			Value::Array(items) => {
				let cleaned_items = items
					.iter()
					.map(|item| if item.is_object() { clean_json_schema(item) } else { item.clone() })
					.collect();
				cleaned.insert(key.clone(), Value::Array(cleaned_items));
			},
			_ => {
				cleaned.insert(key.clone(), value.clone());
			},
		}
	}

	if !validations.is_empty() && !cleaned.contains_key("description") {
		cleaned.insert("description".to_string(), Value::String(format!("Validation: {}", validations.join(", "))));
	}

	if cleaned.contains_key("properties") && !cleaned.contains_key("type") {
		cleaned.insert("type".to_string(), Value::String("object".to_string()));
	}

	Value::Object(cleaned)
}

fn display_value(v: &Value) -> String {
	match v {
		Value::String(s) => s.clone(),
		_ => v.to_string(),
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use serde_json::json;

	#[test]
	fn drops_forbidden_keys_and_flattens_type_array() {
		let input = json!({
			"type": ["string", "null"],
			"minLength": 1,
			"description": "name",
			"$ref": "#/x",
		});
		let cleaned = clean_json_schema(&input);
		assert_eq!(
			cleaned,
			json!({"type": "string", "nullable": true, "description": "name (minLength: 1)"})
		);
	}

	#[test]
	fn scenario_5_schema_sanitation() {
		let input = json!({
			"type": "object",
			"properties": {
				"n": {"type": ["string", "null"], "minLength": 1, "description": "name"}
			},
			"additionalProperties": false,
			"$ref": "#/x",
		});
		let cleaned = clean_json_schema(&input);
		assert_eq!(
			cleaned,
			json!({
				"type": "object",
				"properties": {
					"n": {"type": "string", "nullable": true, "description": "name (minLength: 1)"}
				}
			})
		);
	}

	#[test]
	fn infers_object_type_from_properties() {
		let input = json!({"properties": {"a": {"type": "string"}}});
		let cleaned = clean_json_schema(&input);
		assert_eq!(cleaned["type"], json!("object"));
	}

	#[test]
	fn is_idempotent() {
		let input = json!({
			"type": ["integer", "null"],
			"minimum": 0,
			"maximum": 10,
			"oneOf": [{"type": "integer"}],
		});
		let once = clean_json_schema(&input);
		let twice = clean_json_schema(&once);
		assert_eq!(once, twice);
	}

	#[test]
	fn non_object_passes_through() {
		let input = json!("just a string");
		assert_eq!(clean_json_schema(&input), input);
	}

	#[test]
	fn only_null_type_defaults_to_string() {
		let input = json!({"type": ["null"]});
		let cleaned = clean_json_schema(&input);
		assert_eq!(cleaned, json!({"type": "string", "nullable": true}));
	}
}
