use std::sync::{Arc, RwLock};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{AuthPayload, Registration, User, UserPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    Authenticated,
    /// The server rejected the stored token. The user must log in again.
    Expired,
}

/// Published whenever the session changes hands, so a front end can redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    LoggedOut,
    Expired,
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub user: Option<User>,
    pub status: SessionStatus,
}

/// In-memory view of who is signed in, kept in step with the stored token.
///
/// Creating a `Session` registers its unauthorized handler on the client, so
/// any 401/403 seen by any request drops the user and publishes
/// [`SessionEvent::Expired`].
pub struct Session {
    api: ApiClient,
    state: Arc<RwLock<SessionState>>,
    events: Arc<watch::Sender<Option<SessionEvent>>>,
}

impl Session {
    pub fn new(api: ApiClient) -> Self {
        let (events, _) = watch::channel(None);
        let session = Self {
            api,
            state: Arc::new(RwLock::new(SessionState::default())),
            events: Arc::new(events),
        };
        session.attach();
        session
    }

    /// (Re-)register the forced-logout handler on the client.
    pub fn attach(&self) {
        let state = self.state.clone();
        let events = self.events.clone();
        self.api.set_unauthorized_handler(move || {
            let was_authenticated = {
                let mut state = state.write().unwrap_or_else(|e| e.into_inner());
                let was = state.status == SessionStatus::Authenticated;
                state.user = None;
                if was {
                    state.status = SessionStatus::Expired;
                }
                was
            };
            if was_authenticated {
                warn!("Session expired");
                events.send_replace(Some(SessionEvent::Expired));
            }
        });
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionEvent>> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.read().status
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set(&self, user: Option<User>, status: SessionStatus) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.user = user;
        state.status = status;
    }

    fn establish(&self, auth: AuthPayload) -> Result<User, ApiError> {
        self.api.store_token(&auth.token)?;
        self.set(Some(auth.user.clone()), SessionStatus::Authenticated);
        self.events.send_replace(Some(SessionEvent::LoggedIn));
        info!(user_id = auth.user.id, "Logged in");
        Ok(auth.user)
    }

    pub async fn login(&self, identifier: &str, password: &str) -> Result<User, ApiError> {
        let auth = self.api.login(identifier, password).await?;
        self.establish(auth)
    }

    pub async fn register(&self, registration: &Registration) -> Result<User, ApiError> {
        let auth = self.api.register(registration).await?;
        self.establish(auth)
    }

    /// End the session. The server call is best effort; local state is
    /// always cleared. Safe to call when already logged out.
    pub async fn logout(&self) {
        if self.api.is_authenticated() {
            if let Err(e) = self.api.logout().await {
                debug!(error = %e, "Server-side logout failed, ignoring");
            }
        }
        if let Err(e) = self.api.clear_token() {
            warn!(error = %e, "Failed to delete stored token");
        }
        self.set(None, SessionStatus::Unauthenticated);
        self.events.send_replace(Some(SessionEvent::LoggedOut));
        info!("Logged out");
    }

    /// Refresh the signed-in user's profile from the server.
    pub async fn load_user(&self) -> Result<User, ApiError> {
        let user = self.api.fetch_profile().await?;
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.user = Some(user.clone());
        Ok(user)
    }

    /// Pick up a session persisted by an earlier run.
    ///
    /// Returns whether the user ends up signed in. A rejected token leaves
    /// the session signed out; a server that cannot be reached leaves it
    /// signed in without a profile.
    pub async fn restore(&self) -> Result<bool, ApiError> {
        if self.api.token()?.is_none() {
            self.set(None, SessionStatus::Unauthenticated);
            return Ok(false);
        }

        // Status stays Unauthenticated until the profile answers, so a
        // rejected token signs out quietly instead of reporting an expiry.
        match self.api.fetch_profile().await {
            Ok(user) => {
                info!(user_id = user.id, "Restored session");
                self.set(Some(user), SessionStatus::Authenticated);
                Ok(true)
            }
            Err(e) if e.is_unauthorized() => {
                debug!("Stored token rejected during restore");
                self.set(None, SessionStatus::Unauthenticated);
                Ok(false)
            }
            Err(e) if e.is_connectivity() => {
                warn!(error = %e, "Could not load profile, keeping stored session");
                self.set(None, SessionStatus::Authenticated);
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    /// Merge a partial profile into the in-memory user. No-op when signed out.
    pub fn update_user(&self, patch: &UserPatch) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if let Some(ref mut user) = state.user {
            user.apply(patch);
        }
    }

    /// Send a profile edit to the server and keep the answer.
    pub async fn save_profile(&self, patch: &UserPatch) -> Result<User, ApiError> {
        let user = self.api.update_profile(patch).await?;
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.user = Some(user.clone());
        Ok(user)
    }
}
