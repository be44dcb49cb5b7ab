//! Normalized endpoint list derived from an OpenAPI document.

// self
use crate::{_prelude::*, cache::SpecDocument};

/// Method tokens recognized as operations inside a path item. Matching is case-insensitive.
pub const HTTP_METHODS: [&str; 8] =
	["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "TRACE"];

/// One operation of an OpenAPI document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointInfo {
	/// Uppercase HTTP method.
	pub method: String,
	/// Path template as written in the document.
	pub path: String,
	/// Operation summary, empty when absent.
	pub summary: String,
	/// Operation description, empty when absent.
	pub description: String,
	/// Operation tags.
	pub tags: Vec<String>,
	/// Raw parameter objects.
	pub parameters: Vec<JsonValue>,
	/// Raw request body object, if declared.
	pub request_body: Option<JsonValue>,
	/// Raw responses map.
	pub responses: JsonMap<String, JsonValue>,
	/// Operation identifier, empty when absent.
	pub operation_id: String,
}

/// Lists every operation of `document` in document order: paths first, then methods.
///
/// Path-item keys that are not method tokens (`parameters`, `summary`, `servers`, ...) are
/// skipped, as are non-object operations. A missing or non-object `paths` yields an empty
/// list. Optional fields of the wrong JSON type fall back to their defaults.
pub fn parse_endpoints(document: &SpecDocument) -> Vec<EndpointInfo> {
	let Some(paths) = document.get("paths").and_then(JsonValue::as_object) else {
		return Vec::new();
	};

	paths
		.iter()
		.filter_map(|(path, item)| item.as_object().map(|item| (path, item)))
		.flat_map(|(path, item)| {
			item.iter().filter_map(move |(method, operation)| {
				let method = method_token(method)?;
				let operation = operation.as_object()?;

				Some(endpoint(method, path, operation))
			})
		})
		.collect()
}

fn method_token(key: &str) -> Option<&'static str> {
	HTTP_METHODS.iter().copied().find(|token| token.eq_ignore_ascii_case(key))
}

fn endpoint(method: &str, path: &str, operation: &JsonMap<String, JsonValue>) -> EndpointInfo {
	let text = |key: &str| operation.get(key).and_then(JsonValue::as_str).unwrap_or_default();

	EndpointInfo {
		method: method.to_owned(),
		path: path.to_owned(),
		summary: text("summary").to_owned(),
		description: text("description").to_owned(),
		tags: operation
			.get("tags")
			.and_then(JsonValue::as_array)
			.map(|tags| tags.iter().filter_map(JsonValue::as_str).map(str::to_owned).collect())
			.unwrap_or_default(),
		parameters: operation
			.get("parameters")
			.and_then(JsonValue::as_array)
			.cloned()
			.unwrap_or_default(),
		request_body: operation.get("requestBody").filter(|body| !body.is_null()).cloned(),
		responses: operation
			.get("responses")
			.and_then(JsonValue::as_object)
			.cloned()
			.unwrap_or_default(),
		operation_id: text("operationId").to_owned(),
	}
}
