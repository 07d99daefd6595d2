//! Wire model and the transport seam.
//!
//! [`Transport`] is the boundary to whatever actually moves bytes. The
//! production implementation is [`HttpTransport`] over a pooled reqwest
//! client; tests script the seam with
//! [`FakeTransport`](crate::fake_transport::FakeTransport). Connection
//! pooling, TLS and timeouts live behind this boundary — this layer adds no
//! retry or backoff of its own.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::error::{Error, Result};

/// Body attached to an outbound request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
	#[default]
	Empty,
	/// URL-encoded form pairs.
	Form(Vec<(String, String)>),
	/// JSON document.
	Json(Value),
}

/// One outbound request, assembled per invocation and consumed by send.
#[derive(Debug, Clone)]
pub struct Request {
	pub method: Method,
	pub uri: Url,
	pub headers: HeaderMap,
	pub query: Vec<(String, String)>,
	pub body: RequestBody,
}

impl Request {
	pub fn new(method: Method, uri: Url) -> Self {
		Self {
			method,
			uri,
			headers: HeaderMap::new(),
			query: Vec::new(),
			body: RequestBody::Empty,
		}
	}
}

/// One inbound response as captured from the transport.
#[derive(Debug, Clone)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Response {
	pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
		Self { status, headers, body }
	}

	/// MIME type from the `Content-Type` header with any parameters stripped.
	pub fn content_type(&self) -> Option<&str> {
		let value = self.headers.get(CONTENT_TYPE)?.to_str().ok()?;
		Some(value.split(';').next().unwrap_or(value).trim())
	}

	/// Lowercased `charset` parameter of the `Content-Type` header.
	pub fn charset(&self) -> Option<String> {
		let value = self.headers.get(CONTENT_TYPE)?.to_str().ok()?;
		value.split(';').skip(1).find_map(|parameter| {
			let (name, value) = parameter.split_once('=')?;
			name.trim()
				.eq_ignore_ascii_case("charset")
				.then(|| value.trim().trim_matches('"').to_ascii_lowercase())
		})
	}

	/// Textual payload decoded per the declared character encoding.
	///
	/// UTF-8 (and its ASCII subset) decodes strictly; anything else falls
	/// back to lossy UTF-8 with a warning rather than failing the pipeline.
	pub fn text(&self) -> String {
		match self.charset().as_deref() {
			None | Some("utf-8" | "utf8" | "us-ascii" | "ascii") => match std::str::from_utf8(&self.body) {
				Ok(text) => text.to_string(),
				Err(_) => {
					warn!(target = "apitree.pipeline", "response body is not valid UTF-8; decoding lossily");
					String::from_utf8_lossy(&self.body).into_owned()
				}
			},
			Some(charset) => {
				warn!(target = "apitree.pipeline", charset = charset, "unsupported charset; decoding lossily as UTF-8");
				String::from_utf8_lossy(&self.body).into_owned()
			}
		}
	}
}

/// Boundary to the network collaborator.
#[async_trait]
pub trait Transport: Send + Sync {
	async fn send(&self, request: &Request) -> Result<Response>;
}

/// Configuration forwarded to reqwest client construction.
#[derive(Debug, Clone)]
pub struct SessionConfig {
	pub user_agent: Option<String>,
	pub timeout: Option<Duration>,
	/// Keep a cookie jar on the client so session cookies persist across
	/// requests issued through one handle.
	pub cookie_store: bool,
	/// Extra headers attached to every request at the client level.
	pub default_headers: Vec<(String, String)>,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			user_agent: None,
			timeout: None,
			cookie_store: true,
			default_headers: Vec::new(),
		}
	}
}

/// Production transport over a pooled reqwest client.
pub struct HttpTransport {
	client: reqwest::Client,
}

impl HttpTransport {
	pub fn new(config: &SessionConfig) -> Result<Self> {
		let mut builder = reqwest::Client::builder();
		if let Some(user_agent) = &config.user_agent {
			builder = builder.user_agent(user_agent);
		}
		if let Some(timeout) = config.timeout {
			builder = builder.timeout(timeout);
		}
		builder = builder.cookie_store(config.cookie_store);
		if !config.default_headers.is_empty() {
			let mut headers = HeaderMap::new();
			for (name, value) in &config.default_headers {
				headers.insert(parse_header_name(name)?, parse_header_value(name, value)?);
			}
			builder = builder.default_headers(headers);
		}
		Ok(Self { client: builder.build()? })
	}
}

#[async_trait]
impl Transport for HttpTransport {
	async fn send(&self, request: &Request) -> Result<Response> {
		let mut outbound = self
			.client
			.request(request.method.clone(), request.uri.clone())
			.headers(request.headers.clone());
		if !request.query.is_empty() {
			outbound = outbound.query(&request.query);
		}
		outbound = match &request.body {
			RequestBody::Empty => outbound,
			RequestBody::Form(pairs) => outbound.form(pairs),
			RequestBody::Json(value) => outbound.json(value),
		};

		let response = outbound.send().await?;
		let status = response.status();
		let headers = response.headers().clone();
		let body = response.bytes().await?;
		Ok(Response::new(status, headers, body))
	}
}

pub(crate) fn parse_header_name(name: &str) -> Result<HeaderName> {
	HeaderName::from_bytes(name.as_bytes())
		.map_err(|e| Error::Configuration(format!("invalid header name '{name}': {e}")))
}

pub(crate) fn parse_header_value(name: &str, value: &str) -> Result<HeaderValue> {
	HeaderValue::from_str(value)
		.map_err(|e| Error::Configuration(format!("invalid value for header '{name}': {e}")))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn response_with_content_type(content_type: &str) -> Response {
		let mut headers = HeaderMap::new();
		headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
		Response::new(StatusCode::OK, headers, Bytes::new())
	}

	#[test]
	fn content_type_strips_parameters() {
		let response = response_with_content_type("application/json; charset=utf-8");
		assert_eq!(response.content_type(), Some("application/json"));
		assert_eq!(response.charset().as_deref(), Some("utf-8"));
	}

	#[test]
	fn content_type_absent_without_header() {
		let response = Response::new(StatusCode::OK, HeaderMap::new(), Bytes::new());
		assert_eq!(response.content_type(), None);
		assert_eq!(response.charset(), None);
	}

	#[test]
	fn charset_unquotes_and_lowercases() {
		let response = response_with_content_type("text/html; charset=\"ISO-8859-1\"");
		assert_eq!(response.charset().as_deref(), Some("iso-8859-1"));
	}

	#[test]
	fn text_decodes_utf8_strictly() {
		let mut response = response_with_content_type("text/plain; charset=utf-8");
		response.body = Bytes::from_static("grüß".as_bytes());
		assert_eq!(response.text(), "grüß");
	}

	#[test]
	fn text_falls_back_lossily_on_invalid_bytes() {
		let mut response = response_with_content_type("text/plain");
		response.body = Bytes::from_static(&[0x67, 0xff, 0x67]);
		assert_eq!(response.text(), "g\u{fffd}g");
	}

	#[test]
	fn header_name_validation_reports_configuration_error() {
		let error = parse_header_name("bad header").unwrap_err();
		assert!(matches!(error, Error::Configuration(_)));
	}
}
