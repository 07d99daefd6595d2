//! Error taxonomy for resource invocation and response processing.

use bytes::Bytes;
use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything a verb invocation can surface. Nothing is caught or retried
/// internally; the first failure encountered, in pipeline declaration order,
/// reaches the caller.
#[derive(Debug, Error)]
pub enum Error {
	/// Network or connection failure, passed through from the transport
	/// collaborator unmodified.
	#[error("transport error: {0}")]
	Transport(#[from] reqwest::Error),

	/// The shared session handle was released; every reference in its tree
	/// is permanently unusable for new requests.
	#[error("session handle has been released")]
	SessionReleased,

	/// A client or server error status, observed before any decoding.
	/// Carries the raw body so callers can act without re-fetching.
	#[error("HTTP status {status}")]
	Status { status: StatusCode, body: Bytes },

	/// No decoder registered for the observed MIME type.
	#[error("unsupported content type: {0}")]
	UnsupportedContentType(String),

	/// A registered decoder rejected the response text.
	#[error("failed to decode {content_type} payload: {message}")]
	Decode { content_type: String, message: String },

	/// Envelope metadata marked the response as unsuccessful.
	#[error("envelope failure: {}", message.as_deref().unwrap_or("request not successful"))]
	Envelope { message: Option<String> },

	/// Invalid descent segment, bad base URI, or malformed pipeline and
	/// envelope configuration.
	#[error("configuration error: {0}")]
	Configuration(String),
}

impl Error {
	/// Status code carried by a [`Error::Status`], if that is what this is.
	pub fn status(&self) -> Option<StatusCode> {
		match self {
			Error::Status { status, .. } => Some(*status),
			_ => None,
		}
	}

	pub fn is_status(&self) -> bool {
		matches!(self, Error::Status { .. })
	}

	pub fn is_envelope(&self) -> bool {
		matches!(self, Error::Envelope { .. })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_accessor_reports_carried_code() {
		let error = Error::Status {
			status: StatusCode::NOT_FOUND,
			body: Bytes::from_static(b"missing"),
		};
		assert!(error.is_status());
		assert_eq!(error.status(), Some(StatusCode::NOT_FOUND));
	}

	#[test]
	fn envelope_display_falls_back_without_message() {
		let with = Error::Envelope {
			message: Some("quota exceeded".to_string()),
		};
		let without = Error::Envelope { message: None };
		assert_eq!(with.to_string(), "envelope failure: quota exceeded");
		assert_eq!(without.to_string(), "envelope failure: request not successful");
		assert_eq!(without.status(), None);
	}
}
