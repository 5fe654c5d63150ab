// src/platform/mod.rs
//! Platform backends for [`crate::core::platform::PackageHost`]

pub mod simulated;

#[cfg(target_os = "android")]
pub mod android;

pub use simulated::{
    PlatformSnapshot, RecordingInvoker, SimulatedApplication, SimulatedPackage, SimulatedPlatform,
};
