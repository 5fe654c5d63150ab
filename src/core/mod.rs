// src/core/mod.rs
//! Platform-facing core: app records, intents, enumeration and the
//! package change listener

pub mod app_change_receiver;
pub mod app_registry;
pub mod app_types;
pub mod intent;
pub mod platform;
