//! Shared session handle: transport ownership and session-wide header state.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::header::HeaderMap;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::transport::{self, HttpTransport, Request, Response, SessionConfig, Transport};

/// The one object every resource reference in a tree shares by `Arc`.
///
/// Holds the transport and a mutable header map that an authenticate hook
/// (or any caller) may inject into; those headers apply to every request
/// issued through the handle, whichever reference issues it.
///
/// Exactly one caller — whoever constructed the handle or the session scope
/// bracketing it — may [`release`](Self::release) it. Release is terminal:
/// every reference sharing the handle becomes permanently unusable for new
/// requests, by design rather than by accident.
pub struct SessionHandle {
	transport: RwLock<Option<Arc<dyn Transport>>>,
	headers: RwLock<HeaderMap>,
}

impl SessionHandle {
	/// Production handle over a reqwest-backed transport.
	pub fn new(config: &SessionConfig) -> Result<Self> {
		Ok(Self::with_transport(Arc::new(HttpTransport::new(config)?)))
	}

	/// Handle over any transport implementation.
	pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
		Self {
			transport: RwLock::new(Some(transport)),
			headers: RwLock::new(HeaderMap::new()),
		}
	}

	/// Insert or replace a session-wide header, visible to every reference
	/// in the tree on its next request.
	pub fn insert_header(&self, name: &str, value: &str) -> Result<()> {
		let name = transport::parse_header_name(name)?;
		let value = transport::parse_header_value(name.as_str(), value)?;
		self.headers.write().insert(name, value);
		Ok(())
	}

	/// Remove a session-wide header. Returns whether it was present.
	pub fn remove_header(&self, name: &str) -> bool {
		match transport::parse_header_name(name) {
			Ok(name) => self.headers.write().remove(name).is_some(),
			Err(_) => false,
		}
	}

	/// Snapshot of the current session-wide headers.
	pub fn headers(&self) -> HeaderMap {
		self.headers.read().clone()
	}

	/// Submit a request through the shared transport. Session-wide headers
	/// apply first; per-request headers override on collision.
	pub async fn send(&self, request: &Request) -> Result<Response> {
		let transport = self.transport.read().clone().ok_or(Error::SessionReleased)?;

		let mut merged = self.headers.read().clone();
		for (name, value) in request.headers.iter() {
			merged.insert(name.clone(), value.clone());
		}
		let outbound = Request {
			headers: merged,
			..request.clone()
		};

		debug!(target = "apitree.session", method = %outbound.method, uri = %outbound.uri, "sending request");
		let response = transport.send(&outbound).await?;
		debug!(target = "apitree.session", status = %response.status, "response received");
		Ok(response)
	}

	/// Release the underlying transport. All outstanding references become
	/// unusable for new requests; there is no way back.
	pub fn release(&self) {
		if self.transport.write().take().is_some() {
			debug!(target = "apitree.session", "session handle released");
		} else {
			warn!(target = "apitree.session", "session handle released twice");
		}
	}

	pub fn is_released(&self) -> bool {
		self.transport.read().is_none()
	}
}

impl std::fmt::Debug for SessionHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionHandle")
			.field("released", &self.is_released())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use reqwest::Method;
	use url::Url;

	use super::*;
	use crate::fake_transport::FakeTransportBuilder;

	fn request() -> Request {
		Request::new(Method::GET, Url::parse("https://example.com/thing").unwrap())
	}

	#[tokio::test]
	async fn session_headers_apply_and_per_request_headers_override() {
		let (transport, controller) = FakeTransportBuilder::new()
			.respond_with(200, "", "")
			.respond_with(200, "", "")
			.build();
		let session = SessionHandle::with_transport(Arc::new(transport));
		session.insert_header("x-tenant", "alpha").unwrap();

		session.send(&request()).await.unwrap();

		let mut overriding = request();
		overriding.headers.insert("x-tenant", "beta".parse().unwrap());
		session.send(&overriding).await.unwrap();

		let sent = controller.take_sent();
		assert_eq!(sent[0].headers.get("x-tenant").unwrap(), "alpha");
		assert_eq!(sent[1].headers.get("x-tenant").unwrap(), "beta");
	}

	#[tokio::test]
	async fn released_handle_refuses_new_requests() {
		let (transport, _controller) = FakeTransportBuilder::new().respond_with(200, "", "").build();
		let session = SessionHandle::with_transport(Arc::new(transport));

		session.send(&request()).await.unwrap();
		assert!(!session.is_released());

		session.release();
		assert!(session.is_released());
		let error = session.send(&request()).await.unwrap_err();
		assert!(matches!(error, Error::SessionReleased));
	}

	#[test]
	fn remove_header_reports_presence() {
		let (transport, _controller) = FakeTransportBuilder::new().build();
		let session = SessionHandle::with_transport(Arc::new(transport));
		session.insert_header("cookie", "tok=42").unwrap();
		assert!(session.remove_header("cookie"));
		assert!(!session.remove_header("cookie"));
	}
}
