//! Scripted in-memory transport for exercising the client without a network.
//!
//! Provides canned responses in FIFO order and records every request it is
//! handed, so tests can assert on the exact traffic a reference tree
//! produces.
//!
//! # Example
//!
//! ```ignore
//! let (transport, controller) = FakeTransportBuilder::new()
//!     .respond_with(200, "application/json", r#"{"ok": true}"#)
//!     .build();
//! let session = Arc::new(SessionHandle::with_transport(Arc::new(transport)));
//! // ... issue requests ...
//! let sent = controller.take_sent();
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};

use crate::error::{Error, Result};
use crate::transport::{Request, Response, Transport};

/// Builder collecting the canned responses the fake will serve, in order.
#[derive(Default)]
pub struct FakeTransportBuilder {
	queue: VecDeque<Response>,
}

impl FakeTransportBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queue an arbitrary canned response.
	pub fn respond(mut self, response: Response) -> Self {
		self.queue.push_back(response);
		self
	}

	/// Queue a canned response from status, content type and body text.
	/// An empty content type omits the header entirely.
	pub fn respond_with(self, status: u16, content_type: &str, body: &str) -> Self {
		self.respond(canned(status, content_type, body))
	}

	/// Build the transport plus a controller for inspecting traffic.
	pub fn build(self) -> (FakeTransport, FakeTransportController) {
		let queue = Arc::new(Mutex::new(self.queue));
		let sent = Arc::new(Mutex::new(Vec::new()));
		let transport = FakeTransport {
			queue: Arc::clone(&queue),
			sent: Arc::clone(&sent),
		};
		(transport, FakeTransportController { queue, sent })
	}
}

/// Canned-response transport; serves one scripted response per send.
pub struct FakeTransport {
	queue: Arc<Mutex<VecDeque<Response>>>,
	sent: Arc<Mutex<Vec<Request>>>,
}

#[async_trait]
impl Transport for FakeTransport {
	async fn send(&self, request: &Request) -> Result<Response> {
		self.sent.lock().push(request.clone());
		self.queue
			.lock()
			.pop_front()
			.ok_or_else(|| Error::Configuration("fake transport exhausted its scripted responses".to_string()))
	}
}

/// Inspection half: recorded requests and unserved responses.
pub struct FakeTransportController {
	queue: Arc<Mutex<VecDeque<Response>>>,
	sent: Arc<Mutex<Vec<Request>>>,
}

impl FakeTransportController {
	/// Take all recorded requests, clearing the buffer.
	pub fn take_sent(&self) -> Vec<Request> {
		std::mem::take(&mut *self.sent.lock())
	}

	/// Number of scripted responses not yet served.
	pub fn remaining(&self) -> usize {
		self.queue.lock().len()
	}
}

/// Build a canned [`Response`].
pub fn canned(status: u16, content_type: &str, body: &str) -> Response {
	let mut headers = HeaderMap::new();
	if !content_type.is_empty() {
		headers.insert(
			CONTENT_TYPE,
			HeaderValue::from_str(content_type).expect("canned content type is a valid header value"),
		);
	}
	Response::new(
		StatusCode::from_u16(status).expect("canned status code is in range"),
		headers,
		Bytes::copy_from_slice(body.as_bytes()),
	)
}

#[cfg(test)]
mod tests {
	use reqwest::Method;
	use url::Url;

	use super::*;

	#[tokio::test]
	async fn serves_scripted_responses_in_order_and_records_requests() {
		let (transport, controller) = FakeTransportBuilder::new()
			.respond_with(200, "application/json", r#"{"first": 1}"#)
			.respond_with(204, "", "")
			.build();

		let request = Request::new(Method::GET, Url::parse("https://example.com/a").unwrap());
		let first = transport.send(&request).await.unwrap();
		let second = transport.send(&request).await.unwrap();

		assert_eq!(first.status.as_u16(), 200);
		assert_eq!(second.status.as_u16(), 204);
		assert_eq!(controller.remaining(), 0);
		assert_eq!(controller.take_sent().len(), 2);
		assert!(controller.take_sent().is_empty());
	}

	#[tokio::test]
	async fn exhausted_script_is_an_error() {
		let (transport, _controller) = FakeTransportBuilder::new().build();
		let request = Request::new(Method::GET, Url::parse("https://example.com").unwrap());
		let error = transport.send(&request).await.unwrap_err();
		assert!(matches!(error, Error::Configuration(_)));
	}
}
