//! Environment-driven site configuration.
//!
//! # Responsibility
//! - Read deployment settings from the environment.
//! - Build the store handle, admin gate, and device flags they describe.
//!
//! # Invariants
//! - Missing configuration never fails; it degrades to demo mode.
//! - A configured store that cannot be opened is an error, not demo mode.

use crate::auth::device::{DeviceFlags, FileFlagStore, MemoryFlagStore};
use crate::auth::gate::AdminGate;
use crate::logging;
use crate::store::{SqliteDocumentStore, StoreError, StoreHandle};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

pub const STORE_PATH_VAR: &str = "PORTFOLIO_STORE_PATH";
pub const ADMIN_EMAILS_VAR: &str = "PORTFOLIO_ADMIN_EMAILS";
pub const LEGACY_ADMIN_EMAIL_VAR: &str = "PORTFOLIO_ADMIN_EMAIL";
pub const LOG_LEVEL_VAR: &str = "PORTFOLIO_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "PORTFOLIO_LOG_DIR";
pub const DEVICE_FLAGS_VAR: &str = "PORTFOLIO_DEVICE_FLAGS";

const DEMO_STORE_VALUE: &str = "demo";

#[derive(Debug)]
pub enum ConfigError {
    Store { path: PathBuf, source: StoreError },
    Logging(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store { path, source } => {
                write!(f, "failed to open store `{}`: {source}", path.display())
            }
            Self::Logging(message) => write!(f, "failed to initialize logging: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store { source, .. } => Some(source),
            Self::Logging(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteConfig {
    /// SQLite document store; `None` means demo mode.
    pub store_path: Option<PathBuf>,
    pub admin_emails: Vec<String>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub device_flags_path: Option<PathBuf>,
}

impl SiteConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, which returns a variable's value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let store_path = non_blank(STORE_PATH_VAR)
            .filter(|value| !value.eq_ignore_ascii_case(DEMO_STORE_VALUE))
            .map(PathBuf::from);
        let admin_emails = non_blank(ADMIN_EMAILS_VAR)
            .or_else(|| non_blank(LEGACY_ADMIN_EMAIL_VAR))
            .map(|raw| parse_email_list(&raw))
            .unwrap_or_default();

        Self {
            store_path,
            admin_emails,
            log_level: non_blank(LOG_LEVEL_VAR),
            log_dir: non_blank(LOG_DIR_VAR).map(PathBuf::from),
            device_flags_path: non_blank(DEVICE_FLAGS_VAR).map(PathBuf::from),
        }
    }

    pub fn is_demo(&self) -> bool {
        self.store_path.is_none()
    }

    pub fn admin_gate(&self) -> AdminGate {
        AdminGate::new(&self.admin_emails)
    }

    /// Opens the configured store, or an unavailable handle in demo mode.
    pub fn open_store(&self) -> Result<StoreHandle, ConfigError> {
        let Some(path) = &self.store_path else {
            info!("event=store_connect module=config status=fallback reason=demo_mode");
            return Ok(StoreHandle::Unavailable);
        };
        let store = SqliteDocumentStore::open(path).map_err(|source| ConfigError::Store {
            path: path.clone(),
            source,
        })?;
        info!("event=store_connect module=config status=ok backend=sqlite");
        Ok(StoreHandle::connected(Arc::new(store)))
    }

    /// Like `open_store`, but an unopenable store degrades to the
    /// unavailable handle so read paths render fallback content.
    pub fn open_store_or_fallback(&self) -> StoreHandle {
        self.open_store().unwrap_or_else(|err| {
            error!("event=store_connect module=config status=fallback error={err}");
            StoreHandle::Unavailable
        })
    }

    /// Device flags from the configured file, or in memory.
    pub fn device_flags(&self) -> DeviceFlags {
        match &self.device_flags_path {
            Some(path) => DeviceFlags::load(Box::new(FileFlagStore::new(path.clone()))),
            None => DeviceFlags::load(Box::new(MemoryFlagStore::new())),
        }
    }

    /// Configured log level, or the build default.
    pub fn log_level(&self) -> &str {
        self.log_level
            .as_deref()
            .unwrap_or_else(|| logging::default_log_level())
    }

    /// Starts file logging when a log directory is configured.
    ///
    /// Returns whether logging was started.
    pub fn init_logging(&self) -> Result<bool, ConfigError> {
        let Some(log_dir) = &self.log_dir else {
            return Ok(false);
        };
        logging::init_logging(self.log_level(), &log_dir.to_string_lossy())
            .map_err(ConfigError::Logging)?;
        Ok(true)
    }
}

/// Splits a comma-separated list; entries are trimmed, lower-cased, and
/// blanks are dropped.
pub fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|entry| entry.trim().to_lowercase())
        .filter(|entry| !entry.is_empty())
        .collect()
}
