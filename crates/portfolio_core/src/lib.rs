//! Core logic for the portfolio site.
//! Content sync, admin authorization, and visitor counting live here; the
//! presentation layer only renders what this crate hands out.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod routes;
pub mod service;
pub mod store;
pub mod sync;

pub use auth::device::{DeviceFlags, FileFlagStore, MemoryFlagStore, Theme};
pub use auth::gate::AdminGate;
pub use auth::guard::{
    GuardOutcome, GuardState, Navigator, PageOutcome, RecordingNavigator, SessionGuard,
};
pub use auth::identity::{
    AuthError, AuthState, IdentityHandle, IdentityProvider, MemoryIdentityProvider,
    SessionIdentity,
};
pub use config::{ConfigError, SiteConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::content::{
    BentoCategory, BentoItem, ContentId, EducationItem, Profile, Project, Resume, Skill,
    VisitorStats,
};
pub use routes::Route;
pub use service::content_service::{ContentEditor, ContentKind, EditorError, EditorErrorKind};
pub use service::upload_service::{
    BlobStorage, MemoryBlobStorage, ResumeUploader, UploadError, UploadEvent, UploadTask,
};
pub use service::visitor_service::{VisitOutcome, VisitorService};
pub use store::{
    DocPath, Document, DocumentStore, MemoryDocumentStore, SqliteDocumentStore, StoreError,
    StoreHandle, StoreResult, Subscription,
};
pub use sync::live::{watch_collection, watch_singleton, LiveContent, SyncState};
pub use sync::site::{HomeSnapshot, SiteContent};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
