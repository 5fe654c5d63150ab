//! Mars Launcher Bridge Library
//!
//! Native side of the launcher's method channels: installed app
//! enumeration, app launch, settings screens and package change
//! notifications, behind a platform seam so the same dispatcher runs on a
//! device (JNI) or against a simulated package list.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod api;
pub mod codec;
pub mod config;
pub mod core;
pub mod error;
pub mod listeners;
pub mod platform;

pub use api::{BridgeRequest, FailurePolicy, LauncherBridge, Operation};
pub use codec::{MethodCall, MethodResponse};
pub use config::BridgeConfig;
pub use crate::core::app_types::{AppChangeEvent, AppChangeKind, AppChangeListener, InstalledApp};
pub use error::{BridgeError, PlatformError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::*;
    pub use crate::codec::{MethodCall, MethodResponse};
    pub use crate::config::BridgeConfig;
    pub use crate::core::app_types::{
        AppChangeEvent, AppChangeKind, AppChangeListener, InstalledApp,
    };
    pub use crate::core::platform::{BroadcastReceiver, MethodInvoker, PackageHost};
    pub use crate::error::{BridgeError, PlatformError};
}
