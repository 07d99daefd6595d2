// apitree-core: implementation of hierarchical HTTP API interfaces.
//
// This crate is not part of the public API and should only be used through
// the `apitree` crate.

pub mod envelope;
pub mod error;
pub mod fake_transport;
pub mod pipeline;
pub mod registry;
pub mod resource;
pub mod scope;
pub mod session;
pub mod stages;
pub mod transport;

pub use envelope::{Envelope, traverse};
pub use error::{Error, Result};
pub use pipeline::{Next, Pipeline, Processed, Transform};
pub use registry::{DecodeFn, DecoderRegistry};
pub use resource::{Args, Params, Resource, ResourceBuilder};
pub use scope::{Authenticator, NoAuth, SessionScope};
pub use session::SessionHandle;
pub use stages::{Body, Serialized, Text, Validated};
pub use transport::{HttpTransport, Request, RequestBody, Response, SessionConfig, Transport};
