//! Session lifecycle: token + instance-URL state machine.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, instrument, warn};

use crate::credentials::ImpersonationParams;
use crate::error::Result;
use crate::oauth::OAuthClient;

/// The authenticated state handed to the transport layer.
#[derive(Clone)]
pub struct AuthState {
    /// Current access token.
    pub access_token: String,
    /// Base URL of the org instance.
    pub instance_url: String,
    /// Issued-at timestamp from the token response, if present.
    pub issued_at: Option<String>,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("access_token", &"[REDACTED]")
            .field("instance_url", &self.instance_url)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Observable session phase.
///
/// `Authenticating` is transient (held only while a grant is in flight) and
/// surfaces when another task inspects the session mid-grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Expired,
}

struct SessionStore {
    phase: SessionPhase,
    auth: Option<Arc<AuthState>>,
}

/// Session bound to one set of credentials.
///
/// Authenticates lazily on first use and re-authenticates exactly once per
/// authorization failure reported by the transport. Concurrent callers that
/// hit an expired token at the same time share a single re-authentication:
/// the grant runs under an internal lock and losers of the race reuse the
/// fresh token instead of issuing another grant.
pub struct Session {
    oauth: OAuthClient,
    params: ImpersonationParams,
    store: RwLock<SessionStore>,
    // Serializes credential grants; never held across caller code.
    grant_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("params", &self.params)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a new, unauthenticated session.
    pub fn new(params: ImpersonationParams) -> Self {
        Self {
            oauth: OAuthClient::new(),
            params,
            store: RwLock::new(SessionStore {
                phase: SessionPhase::Unauthenticated,
                auth: None,
            }),
            grant_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Current phase of the session state machine.
    pub fn phase(&self) -> SessionPhase {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .phase
    }

    /// The credentials this session authenticates with.
    pub fn params(&self) -> &ImpersonationParams {
        &self.params
    }

    /// Get the current authenticated state, performing the credential grant
    /// if the session is not yet authenticated.
    #[instrument(skip(self))]
    pub async fn current(&self) -> Result<Arc<AuthState>> {
        if let Some(auth) = self.cached() {
            return Ok(auth);
        }

        let _guard = self.grant_lock.lock().await;
        // Another task may have completed the grant while we waited.
        if let Some(auth) = self.cached() {
            return Ok(auth);
        }

        self.authenticate().await
    }

    /// React to an authorization failure for `stale_token`.
    ///
    /// Re-authenticates at most once: if the session already holds a token
    /// different from the rejected one (someone else refreshed first), that
    /// token is returned without another grant.
    #[instrument(skip(self, stale_token))]
    pub async fn handle_unauthorized(&self, stale_token: &str) -> Result<Arc<AuthState>> {
        let _guard = self.grant_lock.lock().await;

        if let Some(auth) = self.cached() {
            if auth.access_token != stale_token {
                debug!("token already refreshed by a concurrent caller");
                return Ok(auth);
            }
        }

        warn!("access token rejected, re-authenticating");
        self.set_phase(SessionPhase::Expired);
        self.authenticate().await
    }

    /// Drop the current token; the next call re-authenticates.
    pub fn invalidate(&self) {
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        store.phase = SessionPhase::Unauthenticated;
        store.auth = None;
    }

    fn cached(&self) -> Option<Arc<AuthState>> {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        match store.phase {
            SessionPhase::Authenticated => store.auth.clone(),
            _ => None,
        }
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .phase = phase;
    }

    /// Run the credential grant. Caller must hold `grant_lock`.
    async fn authenticate(&self) -> Result<Arc<AuthState>> {
        self.set_phase(SessionPhase::Authenticating);

        match self.oauth.password_grant(&self.params).await {
            Ok(token) => {
                let auth = Arc::new(AuthState {
                    access_token: token.access_token,
                    instance_url: token.instance_url.trim_end_matches('/').to_string(),
                    issued_at: token.issued_at,
                });
                let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
                store.phase = SessionPhase::Authenticated;
                store.auth = Some(auth.clone());
                debug!(instance_url = %auth.instance_url, "session authenticated");
                Ok(auth)
            }
            Err(err) => {
                let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
                store.phase = SessionPhase::Unauthenticated;
                store.auth = None;
                Err(err)
            }
        }
    }
}
