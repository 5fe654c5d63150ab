// src/core/app_types.rs
//! Common types and traits for installed apps and package changes

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize, Serializer};

/// `ApplicationInfo.FLAG_SYSTEM`
pub const FLAG_SYSTEM: u32 = 1 << 0;

/// Label used when the platform cannot resolve a display name
pub const UNKNOWN_LABEL: &str = "unknown";

/// Application metadata attached to an installed package.
///
/// The display label is not part of it: labels are resolved through
/// `PackageHost::load_label` only for packages that survive filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationInfo {
    #[serde(default)]
    pub flags: u32,
}

impl ApplicationInfo {
    pub fn is_system(&self) -> bool {
        self.flags & FLAG_SYSTEM != 0
    }
}

/// One entry of the platform's installed package list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageEntry {
    pub package_name: String,
    #[serde(default)]
    pub application: Option<ApplicationInfo>,
}

impl PackageEntry {
    pub fn new(package_name: impl Into<String>, application: Option<ApplicationInfo>) -> Self {
        Self {
            package_name: package_name.into(),
            application,
        }
    }
}

/// Installed application record handed to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledApp {
    pub package_name: String,
    pub app_name: String,
    /// Sent as the string `"true"` / `"false"`
    #[serde(serialize_with = "bool_as_string")]
    pub is_system_app: bool,
}

fn bool_as_string<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "true" } else { "false" })
}

impl InstalledApp {
    pub fn new(package_name: String, app_name: String, is_system_app: bool) -> Self {
        Self {
            package_name,
            app_name,
            is_system_app,
        }
    }
}

impl fmt::Display for InstalledApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.app_name, self.package_name)?;
        if self.is_system_app {
            write!(f, " [system]")?;
        }
        Ok(())
    }
}

/// Kind of package change broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppChangeKind {
    /// Package was installed (or re-installed during an update)
    Added,
    /// Package was removed (or replaced during an update)
    Removed,
}

/// A package change as received from the platform
#[derive(Debug, Clone, Serialize)]
pub struct AppChangeEvent {
    pub kind: AppChangeKind,
    /// Affected package; `None` when the broadcast carried no data
    pub package_name: Option<String>,
    pub received_at: DateTime<Local>,
}

impl AppChangeEvent {
    pub fn new(kind: AppChangeKind, package_name: Option<String>) -> Self {
        Self {
            kind,
            package_name,
            received_at: Local::now(),
        }
    }
}

impl fmt::Display for AppChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {}",
            self.kind,
            self.package_name.as_deref().unwrap_or("<none>")
        )
    }
}

/// Trait for package change listeners
pub trait AppChangeListener: Send + Sync {
    /// Called once per received package broadcast
    fn on_app_changed(&mut self, event: &AppChangeEvent);

    /// Called when the receiver becomes registered
    fn on_registered(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn record_serializes_flag_as_string() {
        let app = InstalledApp::new("com.android.chrome".into(), "Chrome".into(), true);
        let value = serde_json::to_value(&app).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "packageName": "com.android.chrome",
                "appName": "Chrome",
                "isSystemApp": "true"
            })
        );
    }

    #[test]
    fn system_flag_reads_bit_zero() {
        let info = ApplicationInfo { flags: 0x0000_0081 };
        assert!(info.is_system());
        let info = ApplicationInfo { flags: 0x0000_0080 };
        assert!(!info.is_system());
    }
}
