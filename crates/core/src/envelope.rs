//! Metadata-envelope validation and content extraction.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::pipeline::{Next, Processed, Transform};
use crate::registry::DecoderRegistry;
use crate::stages::Serialized;
use crate::transport::{Request, Response};

/// Unwrap "metadata plus data" response conventions.
///
/// Verifies the successful nature of a response by looking for a path that
/// must resolve truthy to indicate success, or one that resolves truthy to
/// indicate failure, or both. Several styles are accommodated. Explicit
/// success:
///
/// ```json
/// {"success": true, ...}
/// ```
///
/// Explicit failure, optionally with a message:
///
/// ```json
/// {"state": {"failure": true, "message": "Goofed."}}
/// ```
///
/// Explicit failure where the presence of the message is the indicator:
///
/// ```json
/// {"error": "Something went wrong.", ...}
/// ```
///
/// Paths are dotted (`"state.message"`) and each is independently optional;
/// navigating a path absent from the structure never fails — an absent
/// success or failure path reads as falsy, an absent message as none. With
/// no content path configured the whole deserialized structure passes
/// through and this transformer only validates.
///
/// The transformer carries its own deserialization capability, so it works
/// standalone or alongside [`Serialized`] in either order; when the two
/// should share decoders, construct it via [`Envelope::with_registry`].
pub struct Envelope {
	decoder: Serialized,
	success: Option<String>,
	failure: Option<String>,
	message: Option<String>,
	content: Option<String>,
}

impl Envelope {
	/// Envelope over the stock decoders.
	pub fn new() -> Self {
		Self::with_registry(Arc::new(DecoderRegistry::with_defaults()))
	}

	/// Envelope deserializing through the given registry.
	pub fn with_registry(registry: Arc<DecoderRegistry>) -> Self {
		Self {
			decoder: Serialized::new(registry),
			success: None,
			failure: None,
			message: None,
			content: None,
		}
	}

	/// Path that must resolve truthy for the exchange to count as a success.
	pub fn success(mut self, path: &str) -> Self {
		self.success = Some(path.to_string());
		self
	}

	/// Path that, when truthy, marks the exchange as failed.
	pub fn failure(mut self, path: &str) -> Self {
		self.failure = Some(path.to_string());
		self
	}

	/// Path to a human-readable summary of the transaction.
	pub fn message(mut self, path: &str) -> Self {
		self.message = Some(path.to_string());
		self
	}

	/// Path to the actual content to extract.
	pub fn content(mut self, path: &str) -> Self {
		self.content = Some(path.to_string());
		self
	}
}

impl Default for Envelope {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Transform for Envelope {
	async fn process(&self, request: &Request, response: &Response, next: Next<'_>) -> Result<Processed> {
		let delegated = next.run(request, response).await?;
		let Processed::Structured(structure) = self.decoder.decode(response, delegated)? else {
			return Err(Error::Configuration(
				"envelope processing requires a deserialized response".to_string(),
			));
		};

		let success_denied = self
			.success
			.as_deref()
			.is_some_and(|path| !truthy(traverse(&structure, path)));
		let failure_signaled = self
			.failure
			.as_deref()
			.is_some_and(|path| truthy(traverse(&structure, path)));

		if success_denied || failure_signaled {
			let message = self
				.message
				.as_deref()
				.and_then(|path| traverse(&structure, path))
				.map(render_message);
			return Err(Error::Envelope { message });
		}

		match self.content.as_deref() {
			Some(path) => match traverse(&structure, path) {
				Some(content) => Ok(Processed::Structured(content.clone())),
				None => Err(Error::Configuration(format!(
					"envelope content path '{path}' not present in response"
				))),
			},
			None => Ok(Processed::Structured(structure)),
		}
	}
}

/// Tolerant dotted-path navigation; absent segments yield `None`, never an
/// error. Array segments are navigated by numeric index.
pub fn traverse<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
	let mut current = value;
	for segment in path.split('.') {
		current = match current {
			Value::Object(map) => map.get(segment)?,
			Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
			_ => return None,
		};
	}
	Some(current)
}

/// Truthiness of a resolved (or absent) value: null, zero, and empty
/// strings, arrays and objects are falsy.
fn truthy(value: Option<&Value>) -> bool {
	match value {
		None | Some(Value::Null) => false,
		Some(Value::Bool(flag)) => *flag,
		Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
		Some(Value::String(text)) => !text.is_empty(),
		Some(Value::Array(items)) => !items.is_empty(),
		Some(Value::Object(map)) => !map.is_empty(),
	}
}

fn render_message(value: &Value) -> String {
	match value {
		Value::String(text) => text.clone(),
		other => other.to_string(),
	}
}
