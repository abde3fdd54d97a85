//! Email allow-list gate for the admin area.
//!
//! # Invariants
//! - Stored emails are trimmed and lower-cased; blanks are dropped.
//! - An empty allow-list authorizes every non-empty email (development
//!   mode). Deployers must configure the list before exposing `/admin`.

use log::warn;

/// Fixed allow-list consulted by the session guard and visitor counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminGate {
    allowed: Vec<String>,
}

impl AdminGate {
    /// Builds a gate from raw configured emails.
    ///
    /// Logs a security warning when the resulting list is empty.
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed: Vec<String> = Vec::new();
        for email in emails {
            let normalized = normalize_email(email.as_ref());
            if !normalized.is_empty() && !allowed.contains(&normalized) {
                allowed.push(normalized);
            }
        }

        if allowed.is_empty() {
            warn!(
                "event=admin_gate_init module=auth status=open allowed_count=0 \
                 message=\"SECURITY WARNING: no admin emails configured, anyone can access the admin panel\""
            );
        }
        Self { allowed }
    }

    /// Returns whether `email` may act as administrator.
    pub fn is_authorized_admin(&self, email: Option<&str>) -> bool {
        let Some(email) = email.map(normalize_email).filter(|email| !email.is_empty()) else {
            return false;
        };

        if self.allowed.is_empty() {
            warn!("event=admin_gate_check module=auth status=open allowed_count=0");
            return true;
        }
        self.allowed.contains(&email)
    }

    /// Normalized allow-list, for display.
    pub fn allowed_emails(&self) -> &[String] {
        &self.allowed
    }

    /// True when every caller is authorized.
    pub fn is_open(&self) -> bool {
        self.allowed.is_empty()
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
