// src/core/app_registry.rs
//! Installed application enumeration
//!
//! One linear pass over the platform package list. A package is kept when it
//! is not the launcher itself, has application metadata and resolves a launch
//! intent. Labels are loaded only for kept packages. Platform order is
//! preserved.

use tracing::{debug, trace};

use crate::core::app_types::{InstalledApp, PackageEntry, UNKNOWN_LABEL};
use crate::core::platform::PackageHost;
use crate::error::PlatformError;

/// Enumerate launchable apps, excluding `own_package`.
///
/// Platform errors are returned as-is; enumeration has no fallback.
pub fn list_installed_apps<H>(host: &H, own_package: &str) -> Result<Vec<InstalledApp>, PlatformError>
where
    H: PackageHost + ?Sized,
{
    let packages = host.installed_packages()?;
    let total = packages.len();
    let mut apps = Vec::with_capacity(total);

    for entry in packages {
        if let Some(app) = to_installed_app(host, own_package, entry)? {
            apps.push(app);
        }
    }

    debug!("📦 Enumerated {} launchable apps out of {} packages", apps.len(), total);
    Ok(apps)
}

fn to_installed_app<H>(
    host: &H,
    own_package: &str,
    entry: PackageEntry,
) -> Result<Option<InstalledApp>, PlatformError>
where
    H: PackageHost + ?Sized,
{
    if entry.package_name == own_package {
        return Ok(None);
    }

    let launch_intent = host.launch_intent_for_package(&entry.package_name)?;
    let is_system_app = match (launch_intent, &entry.application) {
        (Some(_), Some(info)) => info.is_system(),
        _ => {
            trace!("skipping {}: not launchable", entry.package_name);
            return Ok(None);
        }
    };

    let app_name = host
        .load_label(&entry)?
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
    Ok(Some(InstalledApp::new(entry.package_name, app_name, is_system_app)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::app_types::FLAG_SYSTEM;
    use crate::platform::simulated::{SimulatedApplication, SimulatedPackage, SimulatedPlatform};
    use pretty_assertions::assert_eq;

    const OWN: &str = "com.cloudcatcher.mars_launcher";

    fn scenario() -> SimulatedPlatform {
        SimulatedPlatform::new(vec![
            SimulatedPackage::launchable(OWN, "Mars Launcher", 0),
            SimulatedPackage::launchable("com.android.settings", "Settings", FLAG_SYSTEM),
            SimulatedPackage::launchable("org.example.notes", "Notes", 0),
            SimulatedPackage::headless("org.example.sync", "Sync Service", 0),
        ])
    }

    #[test]
    fn filters_self_and_non_launchable() {
        let apps = list_installed_apps(&scenario(), OWN).unwrap();
        assert_eq!(
            apps,
            vec![
                InstalledApp::new("com.android.settings".into(), "Settings".into(), true),
                InstalledApp::new("org.example.notes".into(), "Notes".into(), false),
            ]
        );
    }

    #[test]
    fn keeps_platform_order() {
        let platform = SimulatedPlatform::new(vec![
            SimulatedPackage::launchable("z.last", "Z", 0),
            SimulatedPackage::launchable("a.first", "A", 0),
        ]);
        let names: Vec<_> = list_installed_apps(&platform, OWN)
            .unwrap()
            .into_iter()
            .map(|a| a.package_name)
            .collect();
        assert_eq!(names, vec!["z.last", "a.first"]);
    }

    #[test]
    fn missing_label_falls_back_to_unknown() {
        let mut pkg = SimulatedPackage::launchable("org.example.nolabel", "", 0);
        pkg.application = Some(SimulatedApplication { label: None, flags: 0 });
        let apps = list_installed_apps(&SimulatedPlatform::new(vec![pkg]), OWN).unwrap();
        assert_eq!(apps[0].app_name, "unknown");
    }

    #[test]
    fn missing_application_info_is_skipped() {
        let mut pkg = SimulatedPackage::launchable("org.example.ghost", "Ghost", 0);
        pkg.application = None;
        let apps = list_installed_apps(&SimulatedPlatform::new(vec![pkg]), OWN).unwrap();
        assert!(apps.is_empty());
    }

    #[test]
    fn empty_platform_yields_empty_list() {
        let apps = list_installed_apps(&SimulatedPlatform::new(Vec::new()), OWN).unwrap();
        assert!(apps.is_empty());
    }

    #[test]
    fn labels_loaded_only_for_kept_packages() {
        let platform = scenario();
        list_installed_apps(&platform, OWN).unwrap();
        assert_eq!(
            platform.labelled_packages(),
            vec!["com.android.settings", "org.example.notes"]
        );
    }

    #[test]
    fn label_failure_on_filtered_package_is_never_hit() {
        let platform = scenario();
        platform.fail_label_load("org.example.sync", "NameNotFoundException");
        let apps = list_installed_apps(&platform, OWN).unwrap();
        assert_eq!(apps.len(), 2);

        platform.fail_label_load("org.example.notes", "NameNotFoundException");
        assert!(matches!(
            list_installed_apps(&platform, OWN),
            Err(PlatformError::PackageQuery(_))
        ));
    }

    #[test]
    fn enumeration_failure_propagates() {
        let platform = scenario();
        platform.fail_package_query("binder died");
        let err = list_installed_apps(&platform, OWN).unwrap_err();
        assert_eq!(err, PlatformError::PackageQuery("binder died".into()));
    }
}
