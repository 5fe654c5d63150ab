// src/platform/simulated.rs
//! In-memory platform backend
//!
//! Holds a package list (optionally loaded from a JSON snapshot), records the
//! activities it was asked to start and delivers broadcasts to registered
//! receivers. Used by the CLI and by the test suites.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::core::app_types::{ApplicationInfo, PackageEntry};
use crate::core::intent::{
    package_uri, Intent, IntentFilter, ACTION_PACKAGE_ADDED, ACTION_PACKAGE_REMOVED,
};
use crate::core::platform::{BroadcastReceiver, MethodInvoker, PackageHost};
use crate::error::{BridgeError, PlatformError};

fn default_true() -> bool {
    true
}

/// Application metadata of a simulated package, label included
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedApplication {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub flags: u32,
}

impl SimulatedApplication {
    fn info(&self) -> ApplicationInfo {
        ApplicationInfo { flags: self.flags }
    }
}

/// A package as the simulated platform knows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedPackage {
    pub package_name: String,
    #[serde(default)]
    pub application: Option<SimulatedApplication>,
    /// Whether the package declares a launcher activity
    #[serde(default = "default_true")]
    pub launchable: bool,
}

impl SimulatedPackage {
    pub fn launchable(package_name: &str, label: &str, flags: u32) -> Self {
        Self {
            package_name: package_name.to_string(),
            application: Some(SimulatedApplication {
                label: Some(label.to_string()),
                flags,
            }),
            launchable: true,
        }
    }

    /// A package without a launcher activity (services, providers, ...)
    pub fn headless(package_name: &str, label: &str, flags: u32) -> Self {
        Self {
            launchable: false,
            ..Self::launchable(package_name, label, flags)
        }
    }
}

/// On-disk description of a device's package state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformSnapshot {
    #[serde(default)]
    pub packages: Vec<SimulatedPackage>,
}

#[derive(Debug, Default)]
struct FailureInjection {
    package_query: Option<String>,
    start_activity: Option<String>,
    receiver: Option<String>,
    /// (package, message)
    label_load: Option<(String, String)>,
}

type Registration = (Arc<dyn BroadcastReceiver>, IntentFilter);

/// In-memory [`PackageHost`]
#[derive(Default)]
pub struct SimulatedPlatform {
    packages: Mutex<Vec<SimulatedPackage>>,
    started: Mutex<Vec<Intent>>,
    receivers: Mutex<Vec<Registration>>,
    failures: Mutex<FailureInjection>,
    launch_queries: AtomicUsize,
    label_loads: Mutex<Vec<String>>,
}

impl SimulatedPlatform {
    pub fn new(packages: Vec<SimulatedPackage>) -> Self {
        Self {
            packages: Mutex::new(packages),
            ..Self::default()
        }
    }

    pub fn from_snapshot(snapshot: PlatformSnapshot) -> Self {
        Self::new(snapshot.packages)
    }

    pub fn from_snapshot_file(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let snapshot: PlatformSnapshot = serde_json::from_str(&raw)?;
        info!(
            "📂 Loaded {} packages from {}",
            snapshot.packages.len(),
            path.as_ref().display()
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Install a package and broadcast `PACKAGE_ADDED`
    pub fn install(&self, package: SimulatedPackage) -> usize {
        let uri = package_uri(&package.package_name);
        if let Ok(mut packages) = self.packages.lock() {
            packages.retain(|p| p.package_name != package.package_name);
            packages.push(package);
        }
        self.broadcast(&Intent::new(ACTION_PACKAGE_ADDED).with_data(uri))
    }

    /// Remove a package and broadcast `PACKAGE_REMOVED`
    pub fn uninstall(&self, package_name: &str) -> usize {
        if let Ok(mut packages) = self.packages.lock() {
            packages.retain(|p| p.package_name != package_name);
        }
        self.broadcast(&Intent::new(ACTION_PACKAGE_REMOVED).with_data(package_uri(package_name)))
    }

    /// Deliver a broadcast to every matching receiver; returns the delivery count
    pub fn broadcast(&self, intent: &Intent) -> usize {
        let targets: Vec<Arc<dyn BroadcastReceiver>> = match self.receivers.lock() {
            Ok(receivers) => receivers
                .iter()
                .filter(|(_, filter)| filter.matches(intent))
                .map(|(r, _)| Arc::clone(r))
                .collect(),
            Err(_) => Vec::new(),
        };
        debug!("📣 broadcast {} -> {} receivers", intent, targets.len());
        for receiver in &targets {
            receiver.on_receive(intent);
        }
        targets.len()
    }

    pub fn started_activities(&self) -> Vec<Intent> {
        self.started.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn receiver_count(&self) -> usize {
        self.receivers.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// How many times a launch intent was resolved
    pub fn launch_queries(&self) -> usize {
        self.launch_queries.load(Ordering::SeqCst)
    }

    /// Packages whose label was loaded, in load order
    pub fn labelled_packages(&self) -> Vec<String> {
        self.label_loads.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn fail_package_query(&self, message: &str) {
        if let Ok(mut f) = self.failures.lock() {
            f.package_query = Some(message.to_string());
        }
    }

    pub fn fail_start_activity(&self, message: &str) {
        if let Ok(mut f) = self.failures.lock() {
            f.start_activity = Some(message.to_string());
        }
    }

    pub fn fail_receiver_registration(&self, message: &str) {
        if let Ok(mut f) = self.failures.lock() {
            f.receiver = Some(message.to_string());
        }
    }

    pub fn fail_label_load(&self, package_name: &str, message: &str) {
        if let Ok(mut f) = self.failures.lock() {
            f.label_load = Some((package_name.to_string(), message.to_string()));
        }
    }

    fn injected<F>(&self, pick: F) -> Option<String>
    where
        F: FnOnce(&FailureInjection) -> Option<String>,
    {
        self.failures.lock().ok().and_then(|f| pick(&*f))
    }

    fn is_installed(&self, package_name: &str) -> bool {
        self.packages
            .lock()
            .map(|p| p.iter().any(|x| x.package_name == package_name))
            .unwrap_or(false)
    }
}

impl PackageHost for SimulatedPlatform {
    fn installed_packages(&self) -> Result<Vec<PackageEntry>, PlatformError> {
        if let Some(message) = self.injected(|f| f.package_query.clone()) {
            return Err(PlatformError::PackageQuery(message));
        }
        let packages = self
            .packages
            .lock()
            .map_err(|_| PlatformError::PackageQuery("package list poisoned".into()))?;
        Ok(packages
            .iter()
            .map(|p| {
                PackageEntry::new(
                    p.package_name.clone(),
                    p.application.as_ref().map(SimulatedApplication::info),
                )
            })
            .collect())
    }

    fn load_label(&self, entry: &PackageEntry) -> Result<Option<String>, PlatformError> {
        if let Ok(mut loads) = self.label_loads.lock() {
            loads.push(entry.package_name.clone());
        }
        let failure = self.injected(|f| {
            f.label_load
                .as_ref()
                .filter(|(package, _)| *package == entry.package_name)
                .map(|(_, message)| message.clone())
        });
        if let Some(message) = failure {
            return Err(PlatformError::PackageQuery(message));
        }
        let packages = self
            .packages
            .lock()
            .map_err(|_| PlatformError::PackageQuery("package list poisoned".into()))?;
        Ok(packages
            .iter()
            .find(|p| p.package_name == entry.package_name)
            .and_then(|p| p.application.as_ref())
            .and_then(|a| a.label.clone()))
    }

    fn launch_intent_for_package(&self, package: &str) -> Result<Option<Intent>, PlatformError> {
        self.launch_queries.fetch_add(1, Ordering::SeqCst);
        let packages = self
            .packages
            .lock()
            .map_err(|_| PlatformError::PackageQuery("package list poisoned".into()))?;
        Ok(packages
            .iter()
            .find(|p| p.package_name == package && p.launchable)
            .map(|p| Intent::launcher_for(p.package_name.clone())))
    }

    fn start_activity(&self, intent: &Intent) -> Result<(), PlatformError> {
        if let Some(message) = self.injected(|f| f.start_activity.clone()) {
            return Err(PlatformError::ActivityStart(message));
        }
        if let Some(target) = &intent.package {
            if !self.is_installed(target) {
                return Err(PlatformError::ActivityStart(format!(
                    "No Activity found to handle {}",
                    intent
                )));
            }
        }
        info!("🚀 startActivity {}", intent);
        if let Ok(mut started) = self.started.lock() {
            started.push(intent.clone());
        }
        Ok(())
    }

    fn register_receiver(
        &self,
        receiver: Arc<dyn BroadcastReceiver>,
        filter: IntentFilter,
    ) -> Result<(), PlatformError> {
        if let Some(message) = self.injected(|f| f.receiver.clone()) {
            return Err(PlatformError::Receiver(message));
        }
        self.receivers
            .lock()
            .map_err(|_| PlatformError::Receiver("receiver table poisoned".into()))?
            .push((receiver, filter));
        Ok(())
    }
}

/// A method invoked towards the UI
#[derive(Debug, Clone, PartialEq)]
pub struct InvokedMethod {
    pub channel: String,
    pub method: String,
    pub arguments: Value,
}

/// [`MethodInvoker`] that keeps every call
#[derive(Debug, Default)]
pub struct RecordingInvoker {
    calls: Mutex<Vec<InvokedMethod>>,
}

impl RecordingInvoker {
    pub fn calls(&self) -> Vec<InvokedMethod> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl MethodInvoker for RecordingInvoker {
    fn invoke_method(&self, channel: &str, method: &str, arguments: Value) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(InvokedMethod {
                channel: channel.to_string(),
                method: method.to_string(),
                arguments,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_snapshot_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"packages": [
                {{"packageName": "com.android.settings", "application": {{"label": "Settings", "flags": 1}}}},
                {{"packageName": "org.example.sync", "application": {{"label": "Sync"}}, "launchable": false}}
            ]}}"#
        )
        .unwrap();

        let platform = SimulatedPlatform::from_snapshot_file(file.path()).unwrap();
        let packages = platform.installed_packages().unwrap();
        assert_eq!(packages.len(), 2);
        assert!(packages[0].application.as_ref().unwrap().is_system());
        assert!(platform
            .launch_intent_for_package("org.example.sync")
            .unwrap()
            .is_none());
        assert!(platform
            .launch_intent_for_package("com.android.settings")
            .unwrap()
            .is_some());
    }

    #[test]
    fn demo_snapshot_enumerates() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/device_snapshot.json");
        let platform = SimulatedPlatform::from_snapshot_file(path).unwrap();
        let apps = crate::core::app_registry::list_installed_apps(
            &platform,
            crate::config::DEFAULT_OWN_PACKAGE,
        )
        .unwrap();
        let names: Vec<_> = apps.iter().map(|a| a.app_name.as_str()).collect();
        assert_eq!(names, vec!["Settings", "Phone", "Firefox", "unknown"]);
    }

    #[test]
    fn starting_uninstalled_package_fails() {
        let platform = SimulatedPlatform::new(Vec::new());
        let err = platform
            .start_activity(&Intent::launcher_for("gone.app"))
            .unwrap_err();
        assert!(matches!(err, PlatformError::ActivityStart(_)));
    }

    #[test]
    fn install_and_uninstall_update_package_list() {
        let platform = SimulatedPlatform::new(Vec::new());
        platform.install(SimulatedPackage::launchable("a.b", "AB", 0));
        assert_eq!(platform.installed_packages().unwrap().len(), 1);
        platform.uninstall("a.b");
        assert!(platform.installed_packages().unwrap().is_empty());
    }
}
