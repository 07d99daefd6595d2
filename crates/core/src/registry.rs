//! Exact-match MIME type to decoder registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

/// Decode function: response text in, structured value or refusal message out.
pub type DecodeFn = Arc<dyn Fn(&str) -> std::result::Result<Value, String> + Send + Sync>;

/// Registry mapping exact MIME-type strings to decode functions.
///
/// Lookup is exact — no wildcard or fuzzy matching — and a miss surfaces as
/// [`Error::UnsupportedContentType`](crate::Error::UnsupportedContentType)
/// at the call site, never as a silent raw-text pass-through. New formats
/// register at runtime without touching pipeline logic.
#[derive(Default)]
pub struct DecoderRegistry {
	decoders: RwLock<HashMap<String, DecodeFn>>,
}

impl DecoderRegistry {
	/// Empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registry holding the stock `application/json` decoder.
	pub fn with_defaults() -> Self {
		let registry = Self::new();
		registry.register("application/json", |text| {
			serde_json::from_str(text).map_err(|e| e.to_string())
		});
		registry
	}

	/// Register (or replace) the decoder for an exact MIME type.
	pub fn register<F>(&self, mime: &str, decode: F)
	where
		F: Fn(&str) -> std::result::Result<Value, String> + Send + Sync + 'static,
	{
		self.decoders.write().insert(mime.to_string(), Arc::new(decode));
	}

	/// Exact-match lookup.
	pub fn get(&self, mime: &str) -> Option<DecodeFn> {
		self.decoders.read().get(mime).cloned()
	}

	pub fn contains(&self, mime: &str) -> bool {
		self.decoders.read().contains_key(mime)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn defaults_decode_json() {
		let registry = DecoderRegistry::with_defaults();
		let decode = registry.get("application/json").unwrap();
		assert_eq!(decode(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
	}

	#[test]
	fn lookup_is_exact_not_fuzzy() {
		let registry = DecoderRegistry::with_defaults();
		assert!(registry.contains("application/json"));
		assert!(!registry.contains("application/json; charset=utf-8"));
		assert!(!registry.contains("application/JSON"));
		assert!(registry.get("text/csv").is_none());
	}

	#[test]
	fn runtime_registration_extends_the_table() {
		let registry = DecoderRegistry::with_defaults();
		registry.register("text/plain", |text| Ok(Value::String(text.to_string())));
		let decode = registry.get("text/plain").unwrap();
		assert_eq!(decode("hello").unwrap(), json!("hello"));
	}

	#[test]
	fn decoder_refusals_surface_as_messages() {
		let registry = DecoderRegistry::with_defaults();
		let decode = registry.get("application/json").unwrap();
		assert!(decode("{not json").is_err());
	}
}
