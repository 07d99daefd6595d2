//! Hierarchical HTTP API interfaces with composable response processing.
//!
//! Construct a root [`Resource`] for a base endpoint, descend through child
//! paths to name a target, then invoke a verb. Descent is free of I/O and
//! every reference in a tree shares one session handle, so cookies, headers
//! and connection reuse apply across the whole interface:
//!
//! ```no_run
//! use apitree::{Params, Resource, Serialized, Validated};
//!
//! # async fn demo() -> apitree::Result<()> {
//! let api = Resource::builder("https://httpbin.org")
//!     .accept("application/json")
//!     .stage(Validated)
//!     .stage(Serialized::with_defaults())
//!     .build()?;
//!
//! // GET https://httpbin.org/json, validated and deserialized.
//! let slideshow = api.child("json")?.get(Params::new()).await?;
//!
//! // Variable path elements descend through `at`, numbers included.
//! let code = 304;
//! let result = api.at("status").at(code).get(Params::new()).await;
//! # Ok(())
//! # }
//! ```
//!
//! Responses flow through an ordered transformer pipeline — status
//! validation, payload extraction, content-type-dispatched
//! deserialization, envelope unwrapping — declared outermost-first at
//! construction. See [`Pipeline`] and the [`Envelope`] transformer for the
//! composition rules.

pub use apitree_core::{
	Args, Authenticator, Body, DecodeFn, DecoderRegistry, Envelope, Error, HttpTransport, Next,
	NoAuth, Params, Pipeline, Processed, Request, RequestBody, Resource, ResourceBuilder, Response,
	Result, Serialized, SessionConfig, SessionHandle, SessionScope, Text, Transform, Transport,
	Validated, traverse,
};

pub use apitree_core::fake_transport;
