//! Session state and role-based capability gating.
//!
//! The session lives in a persisted key-value store (the browser's
//! `localStorage` layout is kept so existing sessions carry over). The
//! user's role is cached there and refreshed lazily from the backend.
//!
//! Capabilities derived here only decide what the client offers; the
//! backend enforces permissions independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::error::CoreError;
use crate::roles::Role;
use crate::sources::RoleSource;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Storage keys
// ---------------------------------------------------------------------------

pub const KEY_ACCESS_TOKEN: &str = "cognito_access_token";
pub const KEY_ID_TOKEN: &str = "cognito_id_token";
pub const KEY_REFRESH_TOKEN: &str = "cognito_refresh_token";
pub const KEY_TOKEN_TYPE: &str = "cognito_token_type";
/// Token lifetime in seconds.
pub const KEY_EXPIRES_IN: &str = "cognito_expires_in";
/// Milliseconds since the Unix epoch at which the tokens were stored.
pub const KEY_TIMESTAMP: &str = "cognito_timestamp";
pub const KEY_USER_EMAIL: &str = "user_email";
pub const KEY_USER_ROLE: &str = "user_role";

/// Every key cleared on logout.
pub const SESSION_KEYS: &[&str] = &[
    KEY_ACCESS_TOKEN,
    KEY_ID_TOKEN,
    KEY_REFRESH_TOKEN,
    KEY_TOKEN_TYPE,
    KEY_EXPIRES_IN,
    KEY_TIMESTAMP,
    KEY_USER_EMAIL,
    KEY_USER_ROLE,
];

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Persisted string key-value store.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;
    fn remove(&self, key: &str) -> Result<(), CoreError>;
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        (**self).remove(key)
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, CoreError> {
        self.entries
            .lock()
            .map_err(|_| CoreError::Internal("session store lock poisoned".into()))
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// What the current user may do. Defaults to nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub can_create_pool: bool,
    pub can_join_pool: bool,
    pub can_view_analytics: bool,
    pub can_view_requests: bool,
}

impl Capabilities {
    pub fn for_role(role: Option<&Role>) -> Self {
        match role {
            Some(Role::Company) => Self {
                can_create_pool: true,
                can_view_analytics: true,
                ..Self::default()
            },
            Some(Role::Client) => Self {
                can_join_pool: true,
                can_view_requests: true,
                ..Self::default()
            },
            Some(Role::Other(_)) | None => Self::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Role resolution
// ---------------------------------------------------------------------------

/// Resolve the user's role, preferring the cached value.
///
/// Calls `source` at most once, and only when nothing is cached and the
/// session is authenticated. Failures are not cached, so the next call
/// retries.
pub async fn resolve_role<C, R>(cache: &C, is_logged_in: bool, source: &R) -> Option<Role>
where
    C: SessionStore + ?Sized,
    R: RoleSource + ?Sized,
{
    if let Some(cached) = cache.get(KEY_USER_ROLE).filter(|r| !r.is_empty()) {
        return Some(Role::from_str_value(&cached));
    }

    if !is_logged_in {
        return None;
    }

    match source.user_role().await {
        Ok(Some(raw)) if !raw.is_empty() => {
            if let Err(e) = cache.set(KEY_USER_ROLE, &raw) {
                tracing::warn!(error = %e, "Failed to cache user role");
            }
            tracing::debug!(role = %raw, "Fetched user role");
            Some(Role::from_str_value(&raw))
        }
        Ok(_) => {
            tracing::info!("No role assigned to user yet");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch user role");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Tokens handed over by the auth collaborator after a successful login.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: String,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

/// Typed view over a [`SessionStore`].
#[derive(Debug, Clone)]
pub struct Session<S> {
    store: S,
}

impl<S: SessionStore> Session<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.get(KEY_ACCESS_TOKEN).filter(|t| !t.is_empty())
    }

    pub fn user_email(&self) -> Option<String> {
        self.store.get(KEY_USER_EMAIL).filter(|e| !e.is_empty())
    }

    pub fn cached_role(&self) -> Option<Role> {
        self.store
            .get(KEY_USER_ROLE)
            .filter(|r| !r.is_empty())
            .map(|r| Role::from_str_value(&r))
    }

    /// When the stored token stops being valid, if the session is complete.
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.access_token()?;
        let stored_ms: i64 = self.store.get(KEY_TIMESTAMP)?.trim().parse().ok()?;
        let lifetime_secs: i64 = self.store.get(KEY_EXPIRES_IN)?.trim().parse().ok()?;
        let expiry_ms = stored_ms.checked_add(lifetime_secs.checked_mul(1000)?)?;
        chrono::DateTime::from_timestamp_millis(expiry_ms)
    }

    /// Token present, well formed, and not expired at `now`.
    pub fn is_logged_in(&self, now: Timestamp) -> bool {
        self.expires_at().is_some_and(|expiry| now < expiry)
    }

    /// Persist freshly issued tokens, replacing everything stored for the
    /// previous session.
    pub fn save_tokens(
        &self,
        tokens: &TokenSet,
        email: Option<&str>,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        self.clear()?;
        self.store.set(KEY_ACCESS_TOKEN, &tokens.access_token)?;
        if let Some(id_token) = &tokens.id_token {
            self.store.set(KEY_ID_TOKEN, id_token)?;
        }
        if let Some(refresh) = &tokens.refresh_token {
            self.store.set(KEY_REFRESH_TOKEN, refresh)?;
        }
        if let Some(token_type) = &tokens.token_type {
            self.store.set(KEY_TOKEN_TYPE, token_type)?;
        }
        self.store.set(KEY_EXPIRES_IN, &tokens.expires_in.to_string())?;
        self.store.set(KEY_TIMESTAMP, &now.timestamp_millis().to_string())?;
        if let Some(email) = email {
            self.store.set(KEY_USER_EMAIL, email)?;
        }
        Ok(())
    }

    /// Role for this session, fetching it from `source` if not cached.
    pub async fn resolve_role<R: RoleSource + ?Sized>(
        &self,
        now: Timestamp,
        source: &R,
    ) -> Option<Role> {
        resolve_role(&self.store, self.is_logged_in(now), source).await
    }

    /// Remove every session key, including the cached role.
    pub fn logout(&self) -> Result<(), CoreError> {
        self.clear()?;
        tracing::info!("Session cleared");
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        for key in SESSION_KEYS {
            self.store.remove(key)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
