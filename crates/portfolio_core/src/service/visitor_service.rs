//! Visitor counter.
//!
//! # Responsibility
//! - Count one visit per page load unless the visitor is an administrator.
//! - Report the current stats for display.
//!
//! # Invariants
//! - Increments go through `DocumentStore::increment`, so concurrent visits
//!   are never lost.
//! - Administrators never increase the count.
//! - Failures are logged and yield the last known stats, never an error.

use crate::auth::gate::AdminGate;
use crate::auth::identity::AuthState;
use crate::model::content::VisitorStats;
use crate::store::watch::lock_or_recover;
use crate::store::{to_fields, DocPath, Fields, StoreHandle, StoreResult};
use crate::sync::content::{SETTINGS_COLLECTION, VISITORS_DOC};
use chrono::Utc;
use log::{debug, error};
use std::sync::Mutex;

const TOTAL_VISITORS_FIELD: &str = "totalVisitors";
const LAST_VISIT_FIELD: &str = "lastVisit";

/// Result of one tracked page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitOutcome {
    pub stats: VisitorStats,
    /// Whether this visit increased the count.
    pub counted: bool,
}

pub struct VisitorService {
    store: StoreHandle,
    gate: AdminGate,
    last_known: Mutex<VisitorStats>,
}

impl VisitorService {
    pub fn new(store: StoreHandle, gate: AdminGate) -> Self {
        Self {
            store,
            gate,
            last_known: Mutex::new(VisitorStats::default()),
        }
    }

    /// Location of the shared counter document.
    pub fn stats_path() -> DocPath {
        DocPath::new(SETTINGS_COLLECTION, VISITORS_DOC)
    }

    /// Tracks one page load.
    ///
    /// A visitor whose identity is still `Unknown` counts as a regular
    /// visitor.
    pub fn track_visit(&self, auth: &AuthState) -> VisitOutcome {
        let email = auth.identity().and_then(|identity| identity.email.as_deref());
        let is_admin = email.is_some() && self.gate.is_authorized_admin(email);

        match self.try_track(is_admin) {
            Ok(outcome) => {
                *lock_or_recover(&self.last_known) = outcome.stats.clone();
                debug!(
                    "event=visit_track module=service status=ok counted={} total={}",
                    outcome.counted, outcome.stats.total_visitors
                );
                outcome
            }
            Err(err) => {
                error!("event=visit_track module=service status=error error={err}");
                VisitOutcome {
                    stats: self.last_known(),
                    counted: false,
                }
            }
        }
    }

    /// Stats from the last successful visit, or zeroed stats.
    pub fn last_known(&self) -> VisitorStats {
        lock_or_recover(&self.last_known).clone()
    }

    fn try_track(&self, is_admin: bool) -> StoreResult<VisitOutcome> {
        let store = self.store.store()?;
        let path = Self::stats_path();
        let now = Utc::now();

        let counted = if store.get(&path)?.is_none() {
            let initial = VisitorStats {
                total_visitors: u64::from(!is_admin),
                last_visit: Some(now),
            };
            let created = store.create_if_absent(&path, to_fields(&initial)?)?;
            if created {
                !is_admin
            } else if is_admin {
                false
            } else {
                // Another visitor created the document first.
                store.increment(&path, TOTAL_VISITORS_FIELD, 1, last_visit_fields(now)?)?;
                true
            }
        } else if is_admin {
            false
        } else {
            store.increment(&path, TOTAL_VISITORS_FIELD, 1, last_visit_fields(now)?)?;
            true
        };

        let stats = store
            .get(&path)?
            .map(|document| document.decode_body::<VisitorStats>())
            .transpose()?
            .unwrap_or_default();
        Ok(VisitOutcome { stats, counted })
    }
}

fn last_visit_fields(now: chrono::DateTime<Utc>) -> StoreResult<Fields> {
    let mut fields = Fields::new();
    fields.insert(LAST_VISIT_FIELD.to_string(), serde_json::to_value(now)?);
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::VisitorService;
    use crate::auth::gate::AdminGate;
    use crate::auth::identity::{AuthState, SessionIdentity};
    use crate::store::{MemoryDocumentStore, StoreHandle};
    use std::sync::Arc;

    #[test]
    fn first_admin_visit_creates_zeroed_counter() {
        let store = Arc::new(MemoryDocumentStore::new());
        let service = VisitorService::new(
            StoreHandle::connected(store),
            AdminGate::new(["owner@site.dev"]),
        );
        let outcome = service.track_visit(&AuthState::SignedIn(SessionIdentity::with_email(
            "Owner@Site.dev",
        )));
        assert!(!outcome.counted);
        assert_eq!(outcome.stats.total_visitors, 0);
        assert!(outcome.stats.last_visit.is_some());
    }

    #[test]
    fn unknown_identity_counts_as_visitor() {
        let store = Arc::new(MemoryDocumentStore::new());
        let service =
            VisitorService::new(StoreHandle::connected(store), AdminGate::new(["a@x.com"]));
        let outcome = service.track_visit(&AuthState::Unknown);
        assert!(outcome.counted);
        assert_eq!(outcome.stats.total_visitors, 1);
    }
}
