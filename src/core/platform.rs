// src/core/platform.rs
//! Seams to the operating system and to the UI isolate
//!
//! Everything the bridge needs from Android goes through [`PackageHost`];
//! everything it sends to Flutter unsolicited goes through [`MethodInvoker`].
//! Backends live in `crate::platform`.

use std::sync::Arc;

use serde_json::Value;

use crate::core::app_types::PackageEntry;
use crate::core::intent::{Intent, IntentFilter};
use crate::error::PlatformError;

/// Receives broadcasts delivered by the platform
pub trait BroadcastReceiver: Send + Sync {
    /// Called on the platform's broadcast thread
    fn on_receive(&self, intent: &Intent);
}

/// Package inspection, activity start and broadcast subscription
pub trait PackageHost: Send + Sync {
    /// Full installed package list, system packages included, in platform order
    fn installed_packages(&self) -> Result<Vec<PackageEntry>, PlatformError>;

    /// Display label of an enumerated package, `None` when it cannot be resolved
    fn load_label(&self, entry: &PackageEntry) -> Result<Option<String>, PlatformError>;

    /// Launch (main/launcher) intent for a package, `None` when it has none
    fn launch_intent_for_package(&self, package: &str) -> Result<Option<Intent>, PlatformError>;

    /// Start an activity from the hosting activity
    fn start_activity(&self, intent: &Intent) -> Result<(), PlatformError>;

    /// Register a receiver for the lifetime of the process
    fn register_receiver(
        &self,
        receiver: Arc<dyn BroadcastReceiver>,
        filter: IntentFilter,
    ) -> Result<(), PlatformError>;
}

/// Native -> UI direction of a method channel
pub trait MethodInvoker: Send + Sync {
    /// Fire-and-forget call of `method` on `channel`
    fn invoke_method(&self, channel: &str, method: &str, arguments: Value);
}
