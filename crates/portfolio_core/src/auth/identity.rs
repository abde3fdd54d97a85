//! Identity provider contracts.
//!
//! # Responsibility
//! - Describe the signed-in principal and the provider's auth state stream.
//! - Provide a scripted in-process provider for demo runs and tests.
//!
//! # Invariants
//! - `sign_out` is idempotent.
//! - Watchers receive the current state on subscribe, then every change.

use crate::store::watch::lock_or_recover;
use crate::store::Subscription;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::{Arc, Mutex, Weak};

/// Authenticated principal reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl SessionIdentity {
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            display_name: None,
            photo_url: None,
        }
    }
}

/// Provider-reported authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// The provider has not reported yet.
    Unknown,
    SignedOut,
    SignedIn(SessionIdentity),
}

impl AuthState {
    pub fn identity(&self) -> Option<&SessionIdentity> {
        match self {
            Self::SignedIn(identity) => Some(identity),
            Self::Unknown | Self::SignedOut => None,
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No identity provider is configured.
    Unavailable,
    SignInFailed(String),
    SignOutFailed(String),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "identity provider is not configured"),
            Self::SignInFailed(message) => write!(f, "sign-in failed: {message}"),
            Self::SignOutFailed(message) => write!(f, "sign-out failed: {message}"),
        }
    }
}

impl Error for AuthError {}

pub type AuthListener = Box<dyn FnMut(&AuthState) + Send>;

/// External identity provider.
pub trait IdentityProvider: Send + Sync {
    /// Interactive sign-in; resolves with the signed-in principal.
    fn sign_in(&self) -> AuthResult<SessionIdentity>;

    fn sign_out(&self) -> AuthResult<()>;

    fn current_state(&self) -> AuthState;

    fn watch(&self, listener: AuthListener) -> Subscription;
}

/// Capability-checked access to the configured identity provider.
#[derive(Clone)]
pub enum IdentityHandle {
    Unavailable,
    Connected(Arc<dyn IdentityProvider>),
}

impl IdentityHandle {
    pub fn connected(provider: Arc<dyn IdentityProvider>) -> Self {
        Self::Connected(provider)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    pub fn provider(&self) -> AuthResult<&Arc<dyn IdentityProvider>> {
        match self {
            Self::Connected(provider) => Ok(provider),
            Self::Unavailable => Err(AuthError::Unavailable),
        }
    }

    /// Current state; `SignedOut` when no provider is configured.
    pub fn current_state(&self) -> AuthState {
        match self {
            Self::Connected(provider) => provider.current_state(),
            Self::Unavailable => AuthState::SignedOut,
        }
    }
}

impl Debug for IdentityHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "IdentityHandle::Unavailable"),
            Self::Connected(_) => write!(f, "IdentityHandle::Connected"),
        }
    }
}

type SharedListener = Arc<Mutex<AuthListener>>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, SharedListener>,
}

struct ProviderState {
    current: AuthState,
    next_sign_in: Option<Result<SessionIdentity, String>>,
    sign_in_calls: usize,
    sign_out_calls: usize,
}

/// Scripted identity provider.
pub struct MemoryIdentityProvider {
    state: Mutex<ProviderState>,
    listeners: Arc<Mutex<Listeners>>,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityProvider {
    /// Provider that has not reported a state yet.
    pub fn new() -> Self {
        Self::with_state(AuthState::Unknown)
    }

    pub fn signed_in(identity: SessionIdentity) -> Self {
        Self::with_state(AuthState::SignedIn(identity))
    }

    pub fn signed_out() -> Self {
        Self::with_state(AuthState::SignedOut)
    }

    fn with_state(current: AuthState) -> Self {
        Self {
            state: Mutex::new(ProviderState {
                current,
                next_sign_in: None,
                sign_in_calls: 0,
                sign_out_calls: 0,
            }),
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    /// Principal returned by the next `sign_in`.
    pub fn script_sign_in(&self, identity: SessionIdentity) {
        lock_or_recover(&self.state).next_sign_in = Some(Ok(identity));
    }

    /// Failure returned by the next `sign_in` (popup closed, network).
    pub fn script_sign_in_failure(&self, message: impl Into<String>) {
        lock_or_recover(&self.state).next_sign_in = Some(Err(message.into()));
    }

    /// Reports a new state, e.g. when a pending session resolves.
    pub fn resolve(&self, state: AuthState) {
        lock_or_recover(&self.state).current = state.clone();
        self.notify(&state);
    }

    pub fn sign_in_calls(&self) -> usize {
        lock_or_recover(&self.state).sign_in_calls
    }

    pub fn sign_out_calls(&self) -> usize {
        lock_or_recover(&self.state).sign_out_calls
    }

    fn notify(&self, state: &AuthState) {
        let listeners: Vec<SharedListener> = lock_or_recover(&self.listeners)
            .entries
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            let mut listener = lock_or_recover(&listener);
            listener(state);
        }
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    fn sign_in(&self) -> AuthResult<SessionIdentity> {
        let outcome = {
            let mut state = lock_or_recover(&self.state);
            state.sign_in_calls += 1;
            state
                .next_sign_in
                .take()
                .unwrap_or_else(|| Err("no principal available".to_string()))
        };

        match outcome {
            Ok(identity) => {
                info!("event=sign_in module=auth status=ok");
                self.resolve(AuthState::SignedIn(identity.clone()));
                Ok(identity)
            }
            Err(message) => {
                warn!("event=sign_in module=auth status=error error={message}");
                Err(AuthError::SignInFailed(message))
            }
        }
    }

    fn sign_out(&self) -> AuthResult<()> {
        lock_or_recover(&self.state).sign_out_calls += 1;
        info!("event=sign_out module=auth status=ok");
        self.resolve(AuthState::SignedOut);
        Ok(())
    }

    fn current_state(&self) -> AuthState {
        lock_or_recover(&self.state).current.clone()
    }

    fn watch(&self, listener: AuthListener) -> Subscription {
        let shared: SharedListener = Arc::new(Mutex::new(listener));
        let id = {
            let mut listeners = lock_or_recover(&self.listeners);
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.insert(id, Arc::clone(&shared));
            id
        };

        let current = self.current_state();
        (lock_or_recover(&shared))(&current);

        let weak: Weak<Mutex<Listeners>> = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                lock_or_recover(&listeners).entries.remove(&id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthError, AuthState, IdentityHandle, IdentityProvider, MemoryIdentityProvider, SessionIdentity};
    use std::sync::{Arc, Mutex};

    #[test]
    fn watch_reports_current_then_changes_until_unsubscribed() {
        let provider = MemoryIdentityProvider::new();
        let seen: Arc<Mutex<Vec<AuthState>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = provider.watch(Box::new(move |state| {
            sink.lock().unwrap().push(state.clone());
        }));

        provider.script_sign_in(SessionIdentity::with_email("a@x.com"));
        provider.sign_in().unwrap();
        subscription.unsubscribe();
        provider.sign_out().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], AuthState::Unknown);
        assert!(matches!(seen[1], AuthState::SignedIn(_)));
    }

    #[test]
    fn sign_in_without_script_fails_and_sign_out_is_idempotent() {
        let provider = MemoryIdentityProvider::signed_out();
        assert!(matches!(provider.sign_in(), Err(AuthError::SignInFailed(_))));
        provider.sign_out().unwrap();
        provider.sign_out().unwrap();
        assert_eq!(provider.sign_out_calls(), 2);
        assert_eq!(provider.current_state(), AuthState::SignedOut);
    }

    #[test]
    fn unavailable_handle_reports_signed_out() {
        let handle = IdentityHandle::Unavailable;
        assert!(!handle.is_available());
        assert_eq!(handle.current_state(), AuthState::SignedOut);
        assert!(matches!(handle.provider(), Err(AuthError::Unavailable)));
    }
}
