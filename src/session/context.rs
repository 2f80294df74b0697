//! Per-request context threaded through every gateway and adapter call
//!
//! There is no ambient "current user": handlers receive a [`RequestContext`]
//! and ask its [`IdentityContext`] who is calling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::model::Identity;
use crate::session::store::{short, SessionStore};

/// Session key holding the raw identity bytes
pub const CURRENT_IDENTITY_KEY: &str = "user_uuid";

/// Cooperative cancellation shared between the transport and in-flight calls.
///
/// The transport cancels; adapters race their RPC against `cancelled()`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Cancel this token when the returned guard is dropped
    pub fn drop_guard(&self) -> CancelOnDrop {
        CancelOnDrop {
            token: Some(self.clone()),
        }
    }
}

/// Cancels its token on drop unless disarmed
pub struct CancelOnDrop {
    token: Option<CancelToken>,
}

impl CancelOnDrop {
    /// The request finished normally; do not cancel
    pub fn disarm(mut self) {
        self.token = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}

/// The caller's identity, backed by their session
#[derive(Clone)]
pub struct IdentityContext {
    store: Arc<SessionStore>,
    session_id: Option<String>,
}

impl IdentityContext {
    pub fn new(store: Arc<SessionStore>, session_id: impl Into<String>) -> Self {
        Self {
            store,
            session_id: Some(session_id.into()),
        }
    }

    /// A context with no session at all; `get` is always absent
    pub fn detached(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            session_id: None,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Who is asking, if anyone
    pub fn get(&self) -> Option<Identity> {
        let session_id = self.session_id.as_deref()?;
        let bytes = self.store.get_value(session_id, CURRENT_IDENTITY_KEY)?;
        match Identity::from_bytes(&bytes) {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!(session = %short(session_id), error = %e, "Discarding malformed session identity");
                None
            }
        }
    }

    /// Attach an identity to the session, or clear it with `None` (logout)
    pub fn set(&self, identity: Option<Identity>) {
        let Some(session_id) = self.session_id.as_deref() else {
            warn!("No session to store identity in");
            return;
        };

        let stored = match identity {
            Some(identity) => {
                self.store
                    .set_value(session_id, CURRENT_IDENTITY_KEY, identity.to_vec())
            }
            None => self.store.remove_value(session_id, CURRENT_IDENTITY_KEY),
        };

        if stored {
            debug!(session = %short(session_id), signed_in = identity.is_some(), "Session identity updated");
        } else {
            warn!(session = %short(session_id), "Session vanished before identity could be stored");
        }
    }
}

/// Everything a gateway operation needs to know about the request it serves
#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub identity: IdentityContext,
    pub cancel: CancelToken,
}

impl RequestContext {
    pub fn new(identity: IdentityContext) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            identity,
            cancel: CancelToken::new(),
        }
    }

    /// Convenience for the common "who is asking" lookup
    pub fn current_identity(&self) -> Option<Identity> {
        self.identity.get()
    }
}
