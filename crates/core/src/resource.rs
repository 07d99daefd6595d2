//! Resource references: lazily-built URIs over one shared session.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::pipeline::{Pipeline, Processed, Transform};
use crate::scope::{Authenticator, NoAuth, SessionScope};
use crate::session::SessionHandle;
use crate::transport::{Request, RequestBody, Response, SessionConfig};

/// Ordered string pairs for query strings and form bodies.
#[derive(Debug, Clone, Default)]
pub struct Params {
	pairs: Vec<(String, String)>,
}

impl Params {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append one pair; the value is anything displayable.
	pub fn set(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.pairs.push((key.into(), value.to_string()));
		self
	}

	pub fn is_empty(&self) -> bool {
		self.pairs.is_empty()
	}

	pub(crate) fn into_pairs(self) -> Vec<(String, String)> {
		self.pairs
	}
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Params {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(pairs: I) -> Self {
		Self {
			pairs: pairs
				.into_iter()
				.map(|(key, value)| (key.into(), value.to_string()))
				.collect(),
		}
	}
}

/// Uninterpreted request arguments, passed through by `put` without any
/// reshaping: body data must be supplied under its explicit field.
#[derive(Debug, Clone, Default)]
pub struct Args {
	/// Query-string parameters.
	pub params: Params,
	/// URL-encoded form body.
	pub data: Params,
	/// JSON body. Mutually exclusive with `data`.
	pub json: Option<Value>,
}

impl Args {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn params(mut self, params: Params) -> Self {
		self.params = params;
		self
	}

	pub fn data(mut self, data: Params) -> Self {
		self.data = data;
		self
	}

	pub fn json(mut self, json: Value) -> Self {
		self.json = Some(json);
		self
	}
}

/// A lazily-materialized handle to one URI.
///
/// Cheap to clone and to descend from: every descendant shares the session
/// handle, pipeline and authenticator of its root by reference, never by
/// reconstruction. No I/O happens until a verb is invoked.
///
/// ```no_run
/// # use apitree_core::{Params, Resource, Serialized, Validated};
/// # async fn demo() -> apitree_core::Result<()> {
/// let api = Resource::builder("https://httpbin.org")
///     .accept("application/json")
///     .stage(Validated)
///     .stage(Serialized::with_defaults())
///     .build()?;
///
/// // GET https://httpbin.org/status/304
/// let code = 304;
/// let response = api.child("status")?.at(code).get(Params::new()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Resource {
	uri: Url,
	session: Arc<SessionHandle>,
	pipeline: Arc<Pipeline>,
	auth: Arc<dyn Authenticator>,
}

impl Resource {
	/// Start building a root reference for the given base endpoint.
	pub fn builder(uri: &str) -> ResourceBuilder {
		ResourceBuilder::new(uri)
	}

	/// The URI this reference targets. No side effects.
	pub fn uri(&self) -> &Url {
		&self.uri
	}

	/// Session handle shared across this reference's whole tree.
	pub fn session(&self) -> &Arc<SessionHandle> {
		&self.session
	}

	/// Index-style descent: child reference for any displayable segment,
	/// numeric path elements included.
	pub fn at(&self, segment: impl fmt::Display) -> Resource {
		let segment = segment.to_string();
		let mut uri = self.uri.clone();
		{
			// Validated at construction: the base is never cannot-be-a-base,
			// and descendants of a valid base stay valid.
			let mut path = uri.path_segments_mut().expect("base URI carries path segments");
			path.pop_if_empty().push(&segment);
		}
		Resource {
			uri,
			session: Arc::clone(&self.session),
			pipeline: Arc::clone(&self.pipeline),
			auth: Arc::clone(&self.auth),
		}
	}

	/// Attribute-style descent. Names starting with an underscore denote
	/// internal state and fail to resolve as path segments; reach such
	/// paths through [`at`](Self::at) instead.
	pub fn child(&self, name: &str) -> Result<Resource> {
		if name.starts_with('_') {
			return Err(Error::Configuration(format!(
				"no such segment '{name}': names with a leading underscore are reserved"
			)));
		}
		Ok(self.at(name))
	}

	/// Retrieve the raw response of an HTTP OPTIONS request to this URI.
	pub async fn options(&self) -> Result<Response> {
		self.invoke_raw(Method::OPTIONS, Args::new()).await
	}

	/// Issue a raw HTTP HEAD request, parameters on the query string.
	pub async fn head(&self, params: Params) -> Result<Response> {
		self.invoke_raw(Method::HEAD, Args::new().params(params)).await
	}

	/// Issue an HTTP GET request through the processing pipeline,
	/// parameters on the query string.
	pub async fn get(&self, params: Params) -> Result<Processed> {
		self.invoke(Method::GET, Args::new().params(params)).await
	}

	/// Issue an HTTP POST request through the pipeline, parameters as
	/// URL-encoded form data.
	pub async fn post(&self, data: Params) -> Result<Processed> {
		self.invoke(Method::POST, Args::new().data(data)).await
	}

	/// Issue an HTTP PUT request through the pipeline. Arguments pass
	/// through uninterpreted: form data goes under [`Args::data`], query
	/// parameters under [`Args::params`].
	pub async fn put(&self, args: Args) -> Result<Processed> {
		self.invoke(Method::PUT, args).await
	}

	/// Issue an HTTP PATCH request through the pipeline, parameters as
	/// URL-encoded form data.
	pub async fn patch(&self, data: Params) -> Result<Processed> {
		self.invoke(Method::PATCH, Args::new().data(data)).await
	}

	/// Issue a raw HTTP DELETE request, parameters on the query string.
	pub async fn delete(&self, params: Params) -> Result<Response> {
		self.invoke_raw(Method::DELETE, Args::new().params(params)).await
	}

	/// Invoke this endpoint: authenticate, prepare, send, process.
	pub async fn invoke(&self, method: Method, args: Args) -> Result<Processed> {
		let (request, response) = self.exchange(method, args).await?;
		self.pipeline.run(&request, &response).await
	}

	/// Invoke this endpoint but skip the processing pipeline and hand back
	/// the response unmodified.
	pub async fn invoke_raw(&self, method: Method, args: Args) -> Result<Response> {
		let (_request, response) = self.exchange(method, args).await?;
		Ok(response)
	}

	async fn exchange(&self, method: Method, args: Args) -> Result<(Request, Response)> {
		self.auth.authenticate(&self.session).await?;
		let request = self.pipeline.prepare(self.prepare(method, args)?)?;
		debug!(target = "apitree.resource", method = %request.method, uri = %request.uri, "invoking endpoint");
		let response = self.session.send(&request).await?;
		Ok((request, response))
	}

	/// Base preparer: assemble the request from URI, method and arguments.
	fn prepare(&self, method: Method, args: Args) -> Result<Request> {
		let mut request = Request::new(method, self.uri.clone());
		request.query = args.params.into_pairs();
		request.body = match (args.data.is_empty(), args.json) {
			(true, None) => RequestBody::Empty,
			(false, None) => RequestBody::Form(args.data.into_pairs()),
			(true, Some(json)) => RequestBody::Json(json),
			(false, Some(_)) => {
				return Err(Error::Configuration(
					"a request cannot carry both form data and a JSON body".to_string(),
				));
			}
		};
		Ok(request)
	}

	/// Enter a session scope: runs the authenticate hook once and returns a
	/// guard whose `close()` deauthenticates and releases the shared handle.
	pub async fn begin_session(&self) -> Result<SessionScope> {
		SessionScope::enter(Arc::clone(&self.session), Arc::clone(&self.auth)).await
	}

	/// Bracket a block of calls with one authenticate/deauthenticate cycle,
	/// releasing the shared session handle on success and error exits alike.
	pub async fn with_session<F, Fut, T>(&self, block: F) -> Result<T>
	where
		F: FnOnce(Resource) -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		self.auth.authenticate(&self.session).await?;
		let outcome = block(self.clone()).await;
		let teardown = self.auth.deauthenticate(&self.session).await;
		self.session.release();
		match (outcome, teardown) {
			(Ok(value), Ok(())) => Ok(value),
			(Ok(_), Err(error)) => Err(error),
			(Err(error), _) => Err(error),
		}
	}
}

impl fmt::Display for Resource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.uri, f)
	}
}

impl fmt::Debug for Resource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Resource").field("uri", &self.uri.as_str()).finish()
	}
}

/// Builder for a root [`Resource`].
pub struct ResourceBuilder {
	uri: String,
	accept: Option<String>,
	language: Option<String>,
	session: Option<Arc<SessionHandle>>,
	config: SessionConfig,
	pipeline: Pipeline,
	auth: Arc<dyn Authenticator>,
}

impl ResourceBuilder {
	fn new(uri: &str) -> Self {
		Self {
			uri: uri.to_string(),
			accept: None,
			language: None,
			session: None,
			config: SessionConfig::default(),
			pipeline: Pipeline::new(),
			auth: Arc::new(NoAuth),
		}
	}

	/// `Accept` header installed on the shared session.
	pub fn accept(mut self, accept: &str) -> Self {
		self.accept = Some(accept.to_string());
		self
	}

	/// `Accept-Language` header installed on the shared session.
	pub fn accept_language(mut self, language: &str) -> Self {
		self.language = Some(language.to_string());
		self
	}

	/// Reuse a pre-built session handle instead of constructing one. The
	/// handle is shared, not owned: releasing it remains its constructor's
	/// (or a session scope's) business.
	pub fn session(mut self, session: Arc<SessionHandle>) -> Self {
		self.session = Some(session);
		self
	}

	/// Configuration forwarded to transport construction. Ignored when a
	/// pre-built session is supplied.
	pub fn config(mut self, config: SessionConfig) -> Self {
		self.config = config;
		self
	}

	/// Append a response transformer; the first appended is outermost.
	pub fn stage(mut self, transform: impl Transform + 'static) -> Self {
		self.pipeline = self.pipeline.stage(transform);
		self
	}

	/// Replace the pipeline wholesale with one built elsewhere. Discards any
	/// transformers appended so far.
	pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
		self.pipeline = pipeline;
		self
	}

	/// Make the pipeline's terminal stage enforce status validation.
	pub fn strict(mut self, strict: bool) -> Self {
		self.pipeline = self.pipeline.strict(strict);
		self
	}

	/// Authentication hooks shared by the whole reference tree.
	pub fn authenticator(mut self, auth: impl Authenticator + 'static) -> Self {
		self.auth = Arc::new(auth);
		self
	}

	pub fn build(self) -> Result<Resource> {
		let uri = Url::parse(&self.uri)
			.map_err(|e| Error::Configuration(format!("invalid base URI '{}': {e}", self.uri)))?;
		if uri.cannot_be_a_base() {
			return Err(Error::Configuration(format!(
				"base URI '{uri}' cannot carry path segments"
			)));
		}

		let session = match self.session {
			Some(session) => session,
			None => Arc::new(SessionHandle::new(&self.config)?),
		};
		if let Some(accept) = &self.accept {
			session.insert_header("accept", accept)?;
		}
		if let Some(language) = &self.language {
			session.insert_header("accept-language", language)?;
		}

		Ok(Resource {
			uri,
			session,
			pipeline: Arc::new(self.pipeline),
			auth: self.auth,
		})
	}
}
