//! Standard transformers: status validation, payload extraction and
//! content-type-dispatched deserialization.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::pipeline::{Next, Processed, Transform};
use crate::registry::DecoderRegistry;
use crate::transport::{Request, Response};

/// Fail fast on client and server error statuses.
///
/// Runs on entry, before anything downstream decodes: an error response is
/// surfaced with its raw body intact and the rest of the chain never runs.
#[derive(Debug, Default)]
pub struct Validated;

#[async_trait]
impl Transform for Validated {
	async fn process(&self, request: &Request, response: &Response, next: Next<'_>) -> Result<Processed> {
		if response.status.is_client_error() || response.status.is_server_error() {
			return Err(Error::Status {
				status: response.status,
				body: response.body.clone(),
			});
		}
		next.run(request, response).await
	}
}

/// Replace whatever the inner chain produced with the raw binary payload.
#[derive(Debug, Default)]
pub struct Body;

#[async_trait]
impl Transform for Body {
	async fn process(&self, request: &Request, response: &Response, next: Next<'_>) -> Result<Processed> {
		next.run(request, response).await?;
		Ok(Processed::Binary(response.body.clone()))
	}
}

/// Replace whatever the inner chain produced with the decoded text payload.
#[derive(Debug, Default)]
pub struct Text;

#[async_trait]
impl Transform for Text {
	async fn process(&self, request: &Request, response: &Response, next: Next<'_>) -> Result<Processed> {
		next.run(request, response).await?;
		Ok(Processed::Text(response.text()))
	}
}

/// Deserialize the textual payload by exact content-type dispatch.
///
/// The delegated value is used when an inner stage already produced text or
/// a structure; otherwise the response body is decoded here. An empty
/// payload is handed back unchanged without consulting the registry.
pub struct Serialized {
	registry: Arc<DecoderRegistry>,
}

impl Serialized {
	/// Dispatch against the given registry.
	pub fn new(registry: Arc<DecoderRegistry>) -> Self {
		Self { registry }
	}

	/// Dispatch against a fresh registry holding the stock decoders.
	pub fn with_defaults() -> Self {
		Self::new(Arc::new(DecoderRegistry::with_defaults()))
	}

	pub fn registry(&self) -> &Arc<DecoderRegistry> {
		&self.registry
	}

	/// Deserialization core, shared with the envelope transformer.
	///
	/// A value an inner stage already deserialized passes through untouched;
	/// text (inherited or decoded from the response) goes through the
	/// registry.
	pub(crate) fn decode(&self, response: &Response, inherited: Processed) -> Result<Processed> {
		let text = match inherited {
			Processed::Structured(value) => return Ok(Processed::Structured(value)),
			Processed::Text(text) => text,
			Processed::Raw(_) | Processed::Binary(_) => response.text(),
		};

		if text.is_empty() {
			return Ok(Processed::Text(text));
		}

		let Some(content_type) = response.content_type().map(str::to_owned) else {
			return Err(Error::UnsupportedContentType("(missing content-type)".to_string()));
		};
		let Some(decode) = self.registry.get(&content_type) else {
			return Err(Error::UnsupportedContentType(content_type));
		};

		debug!(target = "apitree.pipeline", content_type = %content_type, "deserializing response");
		decode(&text)
			.map(Processed::Structured)
			.map_err(|message| Error::Decode { content_type, message })
	}
}

#[async_trait]
impl Transform for Serialized {
	async fn process(&self, request: &Request, response: &Response, next: Next<'_>) -> Result<Processed> {
		let inherited = next.run(request, response).await?;
		self.decode(response, inherited)
	}
}
