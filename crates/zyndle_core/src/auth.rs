//! crates/zyndle_core/src/auth.rs
//!
//! `AuthGate` owns the bearer token and the identity it belongs to. It is the
//! only code path that attaches credentials to outgoing calls, and the only
//! writer of the persisted token/user pair.

use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::{decode_body, error_for_status};
use crate::domain::{AuthSession, User};
use crate::ports::{ApiRequest, ApiResponse, CredentialStore, HttpTransport, PortError, PortResult};

/// Credential store key holding the raw bearer token.
pub const TOKEN_KEY: &str = "auth_token";
/// Credential store key holding the serialized `User`.
pub const USER_KEY: &str = "user";

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Deserialize)]
struct TokenPayload {
    access_token: String,
    user_id: i64,
    email: String,
    full_name: String,
}

#[derive(Deserialize)]
struct UserPayload {
    id: i64,
    email: String,
    full_name: String,
}

//=========================================================================================
// AuthGate
//=========================================================================================

pub struct AuthGate {
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn CredentialStore>,
    session: RwLock<Option<AuthSession>>,
}

impl AuthGate {
    /// Creates the gate, restoring a previously persisted session if both keys are present.
    pub fn new(transport: Arc<dyn HttpTransport>, store: Arc<dyn CredentialStore>) -> Self {
        let restored = restore_session(store.as_ref());
        if let Some(session) = &restored {
            info!(user_id = session.user.id, "Restored persisted session.");
        }
        Self {
            transport,
            store,
            session: RwLock::new(restored),
        }
    }

    /// Creates an account and signs in as it.
    pub async fn register(
        &self,
        email: &str,
        full_name: &str,
        password: &str,
    ) -> PortResult<AuthSession> {
        let request = ApiRequest::post(
            "/auth/register",
            json!({ "email": email, "full_name": full_name, "password": password }),
        );
        self.sign_in_with(request).await
    }

    /// Verifies credentials and signs in.
    pub async fn login(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let request = ApiRequest::post(
            "/auth/login",
            json!({ "email": email, "password": password }),
        );
        self.sign_in_with(request).await
    }

    /// Asks the backend who the held token belongs to.
    ///
    /// Any failure, transient or not, invalidates the local session and yields `None`.
    pub async fn current_user(&self) -> Option<User> {
        let token = self.token()?;
        let result = async {
            let response = self.authenticated_request(ApiRequest::get("/auth/me")).await?;
            let payload: UserPayload = decode_body(&response)?;
            Ok::<_, PortError>(User {
                id: payload.id,
                email: payload.email,
                full_name: payload.full_name,
            })
        }
        .await;

        match result {
            Ok(user) => {
                self.refresh_user(&token, user.clone());
                Some(user)
            }
            Err(e) => {
                warn!(error = %e, "Identity check failed; clearing session.");
                self.clear_if_current(&token);
                None
            }
        }
    }

    /// Sends `request` with the bearer token attached.
    ///
    /// A 401 clears the session and fails with `SessionExpired`. Other statuses are
    /// returned to the caller untouched.
    pub async fn authenticated_request(&self, mut request: ApiRequest) -> PortResult<ApiResponse> {
        let token = self.token().ok_or(PortError::NoSession)?;
        request.bearer = Some(token.clone());
        let path = request.path.clone();

        let response = self.transport.execute(request).await?;
        if response.status == 401 {
            warn!(path = %path, "Backend rejected the bearer token; clearing session.");
            self.clear_if_current(&token);
            return Err(PortError::SessionExpired);
        }
        Ok(response)
    }

    /// Forgets the session. Safe to call repeatedly.
    ///
    /// The backend is told about it on a best-effort basis after local state is gone.
    pub async fn logout(&self) {
        let previous = self.clear();
        let Some(session) = previous else {
            debug!("Logout with no active session.");
            return;
        };
        info!(user_id = session.user.id, "Signed out.");

        let mut request = ApiRequest::post("/auth/logout", json!({}));
        request.bearer = Some(session.token);
        if let Err(e) = self.transport.execute(request).await {
            debug!(error = %e, "Logout notification failed.");
        }
    }

    pub fn session(&self) -> Option<AuthSession> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn user(&self) -> Option<User> {
        self.session().map(|s| s.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn token(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.token.clone())
    }

    async fn sign_in_with(&self, request: ApiRequest) -> PortResult<AuthSession> {
        let path = request.path.clone();
        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            // A 401 here means bad credentials, not an expired session.
            let err = error_for_status(&response);
            warn!(path = %path, status = response.status, "Sign-in rejected.");
            return Err(err);
        }

        let payload: TokenPayload = decode_body(&response)?;
        let session = AuthSession {
            token: payload.access_token,
            user: User {
                id: payload.user_id,
                email: payload.email,
                full_name: payload.full_name,
            },
        };
        self.establish(session.clone())?;
        info!(user_id = session.user.id, "Signed in.");
        Ok(session)
    }

    fn establish(&self, session: AuthSession) -> PortResult<()> {
        let user_json = serde_json::to_string(&session.user)
            .map_err(|e| PortError::Storage(e.to_string()))?;

        let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.persist(&session.token, &user_json) {
            warn!(error = %e, "Failed to persist session; rolling back stored credentials.");
            self.roll_back(guard.as_ref());
            return Err(e);
        }
        *guard = Some(session);
        Ok(())
    }

    /// Writes the pair user-first, so a token on disk never sits next to a user it
    /// was not issued for unless the second write fails (see `roll_back`).
    fn persist(&self, token: &str, user_json: &str) -> PortResult<()> {
        self.store.set(USER_KEY, user_json)?;
        self.store.set(TOKEN_KEY, token)
    }

    /// Puts back the pair still held in memory, or wipes both keys if that fails too.
    fn roll_back(&self, current: Option<&AuthSession>) {
        let restored = current.is_some_and(|session| {
            serde_json::to_string(&session.user)
                .map_err(|e| PortError::Storage(e.to_string()))
                .and_then(|json| self.persist(&session.token, &json))
                .is_ok()
        });
        if !restored {
            self.wipe_store();
        }
    }

    fn refresh_user(&self, token: &str, user: User) {
        let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
        let Some(session) = guard.as_mut().filter(|s| s.token == token) else {
            return;
        };
        if session.user == user {
            return;
        }
        session.user = user;
        match serde_json::to_string(&session.user) {
            Ok(json) => {
                if let Err(e) = self.store.set(USER_KEY, &json) {
                    warn!(error = %e, "Failed to persist refreshed user.");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize refreshed user."),
        }
    }

    /// Clears the session only if it still holds `token`, so a late 401 for an old
    /// token cannot sign out a newer session.
    fn clear_if_current(&self, token: &str) {
        let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
        if guard.as_ref().is_some_and(|s| s.token == token) {
            *guard = None;
            self.wipe_store();
        }
    }

    fn clear(&self) -> Option<AuthSession> {
        let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
        let previous = guard.take();
        self.wipe_store();
        previous
    }

    fn wipe_store(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "Failed to remove persisted credential.");
            }
        }
    }
}

fn restore_session(store: &dyn CredentialStore) -> Option<AuthSession> {
    let token = match store.get(TOKEN_KEY) {
        Ok(Some(token)) if !token.is_empty() => token,
        Ok(_) => return None,
        Err(e) => {
            warn!(error = %e, "Failed to read persisted token.");
            return None;
        }
    };
    let user = match store.get(USER_KEY) {
        Ok(Some(json)) => serde_json::from_str::<User>(&json).ok(),
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "Failed to read persisted user.");
            None
        }
    };
    match user {
        Some(user) => Some(AuthSession { token, user }),
        None => {
            warn!("Persisted token has no readable user; ignoring it.");
            None
        }
    }
}
