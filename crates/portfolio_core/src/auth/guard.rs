//! Session guard for the admin route.
//!
//! # Responsibility
//! - Map provider auth reports to a guard state and a render decision.
//! - Enforce the allow-list by signing unauthorized principals out.
//!
//! # Invariants
//! - An unauthorized principal never reaches `RenderAdmin`.
//! - Each unauthorized session triggers exactly one `sign_out` call and one
//!   redirect to `/login`.
//! - Without an identity provider the dashboard renders in demo mode.
//!
//! # See also
//! - `auth::gate` for the allow-list rules.

use crate::auth::device::DeviceFlags;
use crate::auth::gate::AdminGate;
use crate::auth::identity::{AuthState, IdentityHandle, SessionIdentity};
use crate::routes::Route;
use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Unknown,
    Anonymous,
    AuthenticatedAuthorized,
    AuthenticatedUnauthorized,
}

/// What the admin route should show after an auth report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    ShowLoading,
    Redirect(Route),
    RenderAdmin(SessionIdentity),
    /// Identity provider not configured: read-only demo dashboard.
    RenderDemo,
}

/// Render decision for an arbitrary request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Public(Route),
    Guarded(GuardOutcome),
    /// Unknown path; the navigator was sent home.
    NotFound,
}

/// Receives navigation requests.
pub trait Navigator {
    fn navigate(&mut self, route: Route);
}

/// Navigator that records every request in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingNavigator {
    pub visited: Vec<Route>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<Route> {
        self.visited.last().copied()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&mut self, route: Route) {
        self.visited.push(route);
    }
}

/// Guard for `/admin`.
///
/// Drive it with every auth report, e.g. from an `IdentityProvider::watch`
/// listener that queues states for the UI thread. `observe` calls
/// `sign_out` synchronously, so it must not run inside a provider callback.
#[derive(Debug)]
pub struct SessionGuard {
    gate: AdminGate,
    identity: IdentityHandle,
    device: DeviceFlags,
    state: GuardState,
}

impl SessionGuard {
    pub fn new(gate: AdminGate, identity: IdentityHandle, device: DeviceFlags) -> Self {
        Self {
            gate,
            identity,
            device,
            state: GuardState::Unknown,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn device_flags(&self) -> &DeviceFlags {
        &self.device
    }

    /// Applies one auth report and returns the render decision.
    pub fn observe(&mut self, auth: &AuthState, navigator: &mut dyn Navigator) -> GuardOutcome {
        if !self.identity.is_available() {
            return GuardOutcome::RenderDemo;
        }

        match auth {
            AuthState::Unknown => {
                self.state = GuardState::Unknown;
                GuardOutcome::ShowLoading
            }
            AuthState::SignedOut => {
                let previous = self.transition(GuardState::Anonymous);
                // The unauthorized branch already redirected this session.
                if previous != GuardState::Anonymous
                    && previous != GuardState::AuthenticatedUnauthorized
                {
                    navigator.navigate(Route::Login);
                }
                GuardOutcome::Redirect(Route::Login)
            }
            AuthState::SignedIn(identity) => {
                if self.gate.is_authorized_admin(identity.email.as_deref()) {
                    self.transition(GuardState::AuthenticatedAuthorized);
                    self.device.mark_admin_device(true);
                    return GuardOutcome::RenderAdmin(identity.clone());
                }

                let previous = self.transition(GuardState::AuthenticatedUnauthorized);
                if previous != GuardState::AuthenticatedUnauthorized {
                    warn!("event=guard_reject module=auth status=unauthorized");
                    self.sign_out_provider();
                    navigator.navigate(Route::Login);
                }
                GuardOutcome::Redirect(Route::Login)
            }
        }
    }

    /// Routes a request path. Only protected routes consult the auth state.
    pub fn open_path(
        &mut self,
        path: &str,
        auth: &AuthState,
        navigator: &mut dyn Navigator,
    ) -> PageOutcome {
        match Route::parse(path) {
            Some(route) if route.is_protected() => {
                PageOutcome::Guarded(self.observe(auth, navigator))
            }
            Some(route) => PageOutcome::Public(route),
            None => {
                info!("event=route_open module=auth status=not_found");
                navigator.navigate(Route::Home);
                PageOutcome::NotFound
            }
        }
    }

    /// Explicit sign-out from the dashboard; returns to the home page.
    pub fn sign_out(&mut self, navigator: &mut dyn Navigator) {
        self.sign_out_provider();
        self.transition(GuardState::Anonymous);
        navigator.navigate(Route::Home);
    }

    fn transition(&mut self, next: GuardState) -> GuardState {
        let previous = std::mem::replace(&mut self.state, next);
        if previous != next {
            info!("event=guard_transition module=auth status=ok from={previous:?} to={next:?}");
        }
        previous
    }

    fn sign_out_provider(&self) {
        let result = self
            .identity
            .provider()
            .and_then(|provider| provider.sign_out());
        if let Err(err) = result {
            warn!("event=sign_out module=auth status=error error={err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{GuardOutcome, GuardState, RecordingNavigator, SessionGuard};
    use crate::auth::device::DeviceFlags;
    use crate::auth::gate::AdminGate;
    use crate::auth::identity::{AuthState, IdentityHandle};

    #[test]
    fn unconfigured_identity_renders_demo() {
        let mut guard = SessionGuard::new(
            AdminGate::new(["a@x.com"]),
            IdentityHandle::Unavailable,
            DeviceFlags::in_memory(),
        );
        let mut navigator = RecordingNavigator::new();
        assert_eq!(
            guard.observe(&AuthState::SignedOut, &mut navigator),
            GuardOutcome::RenderDemo
        );
        assert!(navigator.visited.is_empty());
        assert_eq!(guard.state(), GuardState::Unknown);
    }
}
