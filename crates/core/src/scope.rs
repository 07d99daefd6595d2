//! Session-scoped authentication bracketing and resource release.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;
use crate::session::SessionHandle;

/// Hooks bracketing a session's lifetime.
///
/// `authenticate` runs at scope entry and again ahead of every request
/// issued through a resource reference, so implementations must be
/// idempotent or cheaply no-op on repeat. Any requests a hook issues MUST go
/// straight through the [`SessionHandle`] — going back through a resource
/// verb recurses into authentication.
#[async_trait]
pub trait Authenticator: Send + Sync {
	/// Establish session-level state, e.g. inject a cookie or header into
	/// the shared session handle. Default: no-op.
	async fn authenticate(&self, _session: &SessionHandle) -> Result<()> {
		Ok(())
	}

	/// Tear session-level state back down. Default: no-op.
	async fn deauthenticate(&self, _session: &SessionHandle) -> Result<()> {
		Ok(())
	}
}

/// Default hooks: nothing happens on either edge.
#[derive(Debug, Default)]
pub struct NoAuth;

#[async_trait]
impl Authenticator for NoAuth {}

/// Guard bracketing a sequence of calls with one
/// authenticate/deauthenticate cycle and exactly one session release.
///
/// Obtain via [`Resource::begin_session`](crate::Resource::begin_session)
/// and finish with [`close`](Self::close). After close, every resource
/// reference sharing the handle is permanently unusable for new requests.
/// Dropping the guard unclosed still releases the handle, but the
/// deauthenticate hook cannot run from `Drop`.
#[must_use = "close() the scope to run the deauthenticate hook"]
pub struct SessionScope {
	session: Arc<SessionHandle>,
	auth: Arc<dyn Authenticator>,
	closed: bool,
}

impl SessionScope {
	pub(crate) async fn enter(session: Arc<SessionHandle>, auth: Arc<dyn Authenticator>) -> Result<Self> {
		auth.authenticate(&session).await?;
		debug!(target = "apitree.session", "session scope entered");
		Ok(Self {
			session,
			auth,
			closed: false,
		})
	}

	/// Run the deauthenticate hook, then release the session handle.
	///
	/// The handle is released even when the hook fails; the hook's error is
	/// reported after the release has happened.
	pub async fn close(mut self) -> Result<()> {
		self.closed = true;
		let outcome = self.auth.deauthenticate(&self.session).await;
		self.session.release();
		debug!(target = "apitree.session", "session scope closed");
		outcome
	}

	/// Session handle this scope brackets.
	pub fn session(&self) -> &Arc<SessionHandle> {
		&self.session
	}
}

impl Drop for SessionScope {
	fn drop(&mut self) {
		if !self.closed {
			warn!(
				target = "apitree.session",
				"session scope dropped without close(); releasing without deauthentication"
			);
			self.session.release();
		}
	}
}
