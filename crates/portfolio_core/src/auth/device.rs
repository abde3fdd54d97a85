//! Device-local flags.
//!
//! # Responsibility
//! - Hold the theme preference and the admin-device marker for this device.
//! - Persist them through a pluggable `DeviceFlagStore`.
//!
//! # Invariants
//! - The theme is always dark.
//! - Load failures fall back to defaults; write failures are logged only.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::store::watch::lock_or_recover;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Persisted flag values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceFlagValues {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub admin_device: bool,
}

#[derive(Debug)]
pub enum DeviceFlagError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl Display for DeviceFlagError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "device flag io error: {err}"),
            Self::Parse(err) => write!(f, "device flag parse error: {err}"),
        }
    }
}

impl Error for DeviceFlagError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for DeviceFlagError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for DeviceFlagError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Storage for device flags.
pub trait DeviceFlagStore: Send {
    /// Returns `None` when nothing has been stored yet.
    fn load(&self) -> Result<Option<DeviceFlagValues>, DeviceFlagError>;

    fn save(&self, values: &DeviceFlagValues) -> Result<(), DeviceFlagError>;
}

#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    values: Mutex<Option<DeviceFlagValues>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: DeviceFlagValues) -> Self {
        Self {
            values: Mutex::new(Some(values)),
        }
    }

    /// Last saved values.
    pub fn stored(&self) -> Option<DeviceFlagValues> {
        lock_or_recover(&self.values).clone()
    }
}

impl DeviceFlagStore for MemoryFlagStore {
    fn load(&self) -> Result<Option<DeviceFlagValues>, DeviceFlagError> {
        Ok(self.stored())
    }

    fn save(&self, values: &DeviceFlagValues) -> Result<(), DeviceFlagError> {
        *lock_or_recover(&self.values) = Some(values.clone());
        Ok(())
    }
}

/// JSON file in a local directory.
#[derive(Debug, Clone)]
pub struct FileFlagStore {
    path: PathBuf,
}

impl FileFlagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DeviceFlagStore for FileFlagStore {
    fn load(&self) -> Result<Option<DeviceFlagValues>, DeviceFlagError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, values: &DeviceFlagValues) -> Result<(), DeviceFlagError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(values)?)?;
        Ok(())
    }
}

/// Flags for the current device.
pub struct DeviceFlags {
    store: Box<dyn DeviceFlagStore>,
    values: DeviceFlagValues,
}

impl DeviceFlags {
    /// Loads stored flags and forces the dark theme.
    pub fn load(store: Box<dyn DeviceFlagStore>) -> Self {
        let mut values = match store.load() {
            Ok(values) => values.unwrap_or_default(),
            Err(err) => {
                warn!("event=device_flags_load module=auth status=fallback error={err}");
                DeviceFlagValues::default()
            }
        };
        let needs_write = values.theme != Theme::Dark;
        values.theme = Theme::Dark;
        let flags = Self { store, values };
        if needs_write {
            flags.persist();
        }
        flags
    }

    /// Flags kept only in memory.
    pub fn in_memory() -> Self {
        Self::load(Box::new(MemoryFlagStore::new()))
    }

    pub fn theme(&self) -> Theme {
        self.values.theme
    }

    pub fn is_admin_device(&self) -> bool {
        self.values.admin_device
    }

    pub fn values(&self) -> &DeviceFlagValues {
        &self.values
    }

    pub fn mark_admin_device(&mut self, admin: bool) {
        if self.values.admin_device == admin {
            return;
        }
        self.values.admin_device = admin;
        self.persist();
    }

    fn persist(&self) {
        match self.store.save(&self.values) {
            Ok(()) => debug!(
                "event=device_flags_save module=auth status=ok admin_device={}",
                self.values.admin_device
            ),
            Err(err) => warn!("event=device_flags_save module=auth status=error error={err}"),
        }
    }
}

impl std::fmt::Debug for DeviceFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceFlags")
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DeviceFlagError, DeviceFlagStore, DeviceFlagValues, DeviceFlags, MemoryFlagStore, Theme,
    };

    struct BrokenStore;

    impl DeviceFlagStore for BrokenStore {
        fn load(&self) -> Result<Option<DeviceFlagValues>, DeviceFlagError> {
            Err(std::io::Error::other("disk gone").into())
        }

        fn save(&self, _values: &DeviceFlagValues) -> Result<(), DeviceFlagError> {
            Err(std::io::Error::other("disk gone").into())
        }
    }

    #[test]
    fn broken_store_falls_back_and_ignores_writes() {
        let mut flags = DeviceFlags::load(Box::new(BrokenStore));
        assert_eq!(flags.theme(), Theme::Dark);
        assert!(!flags.is_admin_device());
        flags.mark_admin_device(true);
        assert!(flags.is_admin_device());
    }

    #[test]
    fn stored_light_theme_is_forced_to_dark() {
        let store = MemoryFlagStore::with_values(DeviceFlagValues {
            theme: Theme::Light,
            admin_device: true,
        });
        let flags = DeviceFlags::load(Box::new(store));
        assert_eq!(flags.theme(), Theme::Dark);
        assert!(flags.is_admin_device());
    }
}
