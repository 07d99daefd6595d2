//! Ordered response-transformer chain.
//!
//! Transformers are declared outermost-first and each wraps the remainder of
//! the chain: the first-declared transformer's entry logic runs first (it
//! sees the rawest response) and its post-delegation logic runs last (it
//! sees the most processed value). Declaration order is part of the
//! contract — the same transformers in a different order behave differently.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::transport::{Request, Response};

/// Value threaded back up the chain as each stage applies its transform.
#[derive(Debug, Clone)]
pub enum Processed {
	/// The untouched response, as produced by the terminal stage.
	Raw(Response),
	/// Raw binary payload.
	Binary(Bytes),
	/// Decoded textual payload.
	Text(String),
	/// Deserialized structure.
	Structured(Value),
}

impl Processed {
	pub fn into_value(self) -> Option<Value> {
		match self {
			Processed::Structured(value) => Some(value),
			_ => None,
		}
	}

	pub fn as_value(&self) -> Option<&Value> {
		match self {
			Processed::Structured(value) => Some(value),
			_ => None,
		}
	}

	pub fn into_text(self) -> Option<String> {
		match self {
			Processed::Text(text) => Some(text),
			_ => None,
		}
	}

	pub fn into_bytes(self) -> Option<Bytes> {
		match self {
			Processed::Binary(bytes) => Some(bytes),
			_ => None,
		}
	}

	pub fn into_response(self) -> Option<Response> {
		match self {
			Processed::Raw(response) => Some(response),
			_ => None,
		}
	}
}

/// One link in the processing chain.
///
/// Entry work happens before `next.run(..)`, post work on its return value.
/// Implementations hold an explicit handle to the rest of the chain rather
/// than relying on any inheritance order.
#[async_trait]
pub trait Transform: Send + Sync {
	/// Augment or validate the outbound request before the base preparer's
	/// product is sent. Default: identity.
	fn prepare(&self, request: Request) -> Result<Request> {
		Ok(request)
	}

	/// Transform the response, delegating to the rest of the chain.
	async fn process(&self, request: &Request, response: &Response, next: Next<'_>) -> Result<Processed>;
}

/// Handle to the rest of the chain, ending at the implicit terminal stage.
pub struct Next<'a> {
	rest: &'a [Arc<dyn Transform>],
	strict: bool,
}

impl Next<'_> {
	/// Delegate to the remaining transformers.
	///
	/// Past the last declared transformer sits the terminal stage: it
	/// enforces status validation when the pipeline is strict, and otherwise
	/// hands back the response itself.
	pub async fn run(self, request: &Request, response: &Response) -> Result<Processed> {
		match self.rest.split_first() {
			Some((stage, rest)) => {
				stage
					.process(request, response, Next { rest, strict: self.strict })
					.await
			}
			None => {
				if self.strict && (response.status.is_client_error() || response.status.is_server_error()) {
					return Err(Error::Status {
						status: response.status,
						body: response.body.clone(),
					});
				}
				Ok(Processed::Raw(response.clone()))
			}
		}
	}
}

/// Ordered transformer chain plus the implicit terminal stage.
pub struct Pipeline {
	stages: Vec<Arc<dyn Transform>>,
	strict: bool,
}

impl Pipeline {
	pub fn new() -> Self {
		Self {
			stages: Vec::new(),
			strict: false,
		}
	}

	/// Append a transformer; the first appended is outermost.
	pub fn stage(mut self, transform: impl Transform + 'static) -> Self {
		self.stages.push(Arc::new(transform));
		self
	}

	/// Make the terminal stage enforce status validation.
	pub fn strict(mut self, strict: bool) -> Self {
		self.strict = strict;
		self
	}

	pub fn is_empty(&self) -> bool {
		self.stages.is_empty()
	}

	/// Fold the transformers' prepare hooks over a request, outermost first.
	pub fn prepare(&self, mut request: Request) -> Result<Request> {
		for stage in &self.stages {
			request = stage.prepare(request)?;
		}
		Ok(request)
	}

	/// Run the chain over a completed exchange.
	pub async fn run(&self, request: &Request, response: &Response) -> Result<Processed> {
		Next {
			rest: &self.stages,
			strict: self.strict,
		}
		.run(request, response)
		.await
	}
}

impl Default for Pipeline {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;
	use reqwest::{Method, StatusCode};
	use reqwest::header::HeaderMap;
	use url::Url;

	use super::*;

	struct Recording {
		label: &'static str,
		log: Arc<Mutex<Vec<String>>>,
	}

	#[async_trait]
	impl Transform for Recording {
		async fn process(&self, request: &Request, response: &Response, next: Next<'_>) -> Result<Processed> {
			self.log.lock().push(format!("{}:entry", self.label));
			let delegated = next.run(request, response).await?;
			self.log.lock().push(format!("{}:post", self.label));
			Ok(delegated)
		}
	}

	fn exchange(status: u16) -> (Request, Response) {
		let request = Request::new(Method::GET, Url::parse("https://example.com").unwrap());
		let response = Response::new(
			StatusCode::from_u16(status).unwrap(),
			HeaderMap::new(),
			Bytes::from_static(b"payload"),
		);
		(request, response)
	}

	#[tokio::test]
	async fn first_declared_runs_first_on_entry_and_last_on_return() {
		let log = Arc::new(Mutex::new(Vec::new()));
		let pipeline = Pipeline::new()
			.stage(Recording { label: "outer", log: Arc::clone(&log) })
			.stage(Recording { label: "inner", log: Arc::clone(&log) });

		let (request, response) = exchange(200);
		let processed = pipeline.run(&request, &response).await.unwrap();

		assert!(matches!(processed, Processed::Raw(_)));
		assert_eq!(
			*log.lock(),
			vec!["outer:entry", "inner:entry", "inner:post", "outer:post"]
		);
	}

	#[tokio::test]
	async fn empty_pipeline_returns_the_response_itself() {
		let (request, response) = exchange(200);
		let processed = Pipeline::new().run(&request, &response).await.unwrap();
		let returned = processed.into_response().unwrap();
		assert_eq!(returned.body, response.body);
	}

	#[tokio::test]
	async fn strict_terminal_enforces_status_validation() {
		let (request, response) = exchange(503);
		let error = Pipeline::new().strict(true).run(&request, &response).await.unwrap_err();
		assert_eq!(error.status(), Some(StatusCode::SERVICE_UNAVAILABLE));

		let lenient = Pipeline::new().run(&request, &response).await.unwrap();
		assert!(matches!(lenient, Processed::Raw(_)));
	}
}
