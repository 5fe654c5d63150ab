// src/api.rs
//! Method channel API exposed to the Flutter launcher UI
//!
//! Five channels, one method each. Incoming calls are resolved to an
//! [`Operation`], validated into a typed [`BridgeRequest`] and dispatched to
//! the platform. How a platform failure surfaces is decided per operation by
//! [`Operation::failure_policy`]:
//!
//! | operation | on platform failure |
//! |---|---|
//! | `getInstalledApps` | propagated as a generic `error` reply |
//! | `launchApp` | `false` |
//! | `openAppSettings` | `false` |
//! | `openLauncherSettings` | ignored, replies `null` |
//! | `registerAppChangeReceiver` | propagated, receiver stays unregistered |

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::codec::{self, MethodCall, MethodResponse};
use crate::config::BridgeConfig;
use crate::core::app_change_receiver::AppChangeNotifier;
use crate::core::app_registry::list_installed_apps;
use crate::core::app_types::InstalledApp;
use crate::core::intent::Intent;
use crate::core::platform::{MethodInvoker, PackageHost};
use crate::error::{BridgeError, BridgeResult, PlatformError};

/// Short channel names (prefixed with the configured namespace on the wire)
pub mod channels {
    pub const INSTALLED_APPS: &str = "installed_apps";
    pub const LAUNCH_APP: &str = "launch_app";
    pub const OPEN_APP_SETTINGS: &str = "open_app_settings";
    pub const OPEN_DEFAULT_LAUNCHER_SETTINGS: &str = "open_default_launcher_settings";
    pub const NOTIFY_APP_CHANGES: &str = "notify_app_changes";
}

/// Method names accepted on each channel
pub mod methods {
    pub const GET_INSTALLED_APPS: &str = "getInstalledApps";
    pub const LAUNCH_APP: &str = "launchApp";
    pub const OPEN_APP_SETTINGS: &str = "openAppSettings";
    pub const OPEN_LAUNCHER_SETTINGS: &str = "openLauncherSettings";
    pub const REGISTER_APP_CHANGE_RECEIVER: &str = "registerAppChangeReceiver";
}

const PACKAGE_NAME_ARG: &str = "packageName";

/// What a platform failure turns into for a given operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Return the error to the caller
    Propagate,
    /// Swallow the error and reply `false`
    CollapseToFalse,
    /// Swallow the error and reply `null`
    Ignore,
}

/// The operations exposed over the channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetInstalledApps,
    LaunchApp,
    OpenAppSettings,
    OpenLauncherSettings,
    RegisterAppChangeReceiver,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::GetInstalledApps,
        Operation::LaunchApp,
        Operation::OpenAppSettings,
        Operation::OpenLauncherSettings,
        Operation::RegisterAppChangeReceiver,
    ];

    pub fn channel(self) -> &'static str {
        match self {
            Operation::GetInstalledApps => channels::INSTALLED_APPS,
            Operation::LaunchApp => channels::LAUNCH_APP,
            Operation::OpenAppSettings => channels::OPEN_APP_SETTINGS,
            Operation::OpenLauncherSettings => channels::OPEN_DEFAULT_LAUNCHER_SETTINGS,
            Operation::RegisterAppChangeReceiver => channels::NOTIFY_APP_CHANGES,
        }
    }

    pub fn method(self) -> &'static str {
        match self {
            Operation::GetInstalledApps => methods::GET_INSTALLED_APPS,
            Operation::LaunchApp => methods::LAUNCH_APP,
            Operation::OpenAppSettings => methods::OPEN_APP_SETTINGS,
            Operation::OpenLauncherSettings => methods::OPEN_LAUNCHER_SETTINGS,
            Operation::RegisterAppChangeReceiver => methods::REGISTER_APP_CHANGE_RECEIVER,
        }
    }

    /// Operation for a (short channel, method) pair
    pub fn resolve(channel: &str, method: &str) -> Option<Operation> {
        Operation::ALL
            .into_iter()
            .find(|op| op.channel() == channel && op.method() == method)
    }

    pub fn failure_policy(self) -> FailurePolicy {
        match self {
            Operation::GetInstalledApps => FailurePolicy::Propagate,
            Operation::LaunchApp => FailurePolicy::CollapseToFalse,
            Operation::OpenAppSettings => FailurePolicy::CollapseToFalse,
            Operation::OpenLauncherSettings => FailurePolicy::Ignore,
            Operation::RegisterAppChangeReceiver => FailurePolicy::Propagate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchAppRequest {
    pub package_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAppSettingsRequest {
    pub package_name: String,
}

/// A validated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeRequest {
    GetInstalledApps,
    LaunchApp(LaunchAppRequest),
    OpenAppSettings(OpenAppSettingsRequest),
    OpenLauncherSettings,
    RegisterAppChangeReceiver,
}

impl BridgeRequest {
    /// Validate the loosely typed call arguments for `op`
    pub fn parse(op: Operation, call: &MethodCall) -> BridgeResult<Self> {
        let package_name = || {
            call.string_argument(PACKAGE_NAME_ARG)
                .map(str::to_string)
                .ok_or_else(BridgeError::missing_package_name)
        };

        Ok(match op {
            Operation::GetInstalledApps => BridgeRequest::GetInstalledApps,
            Operation::LaunchApp => BridgeRequest::LaunchApp(LaunchAppRequest {
                package_name: package_name()?,
            }),
            Operation::OpenAppSettings => BridgeRequest::OpenAppSettings(OpenAppSettingsRequest {
                package_name: package_name()?,
            }),
            Operation::OpenLauncherSettings => BridgeRequest::OpenLauncherSettings,
            Operation::RegisterAppChangeReceiver => BridgeRequest::RegisterAppChangeReceiver,
        })
    }

    pub fn operation(&self) -> Operation {
        match self {
            BridgeRequest::GetInstalledApps => Operation::GetInstalledApps,
            BridgeRequest::LaunchApp(_) => Operation::LaunchApp,
            BridgeRequest::OpenAppSettings(_) => Operation::OpenAppSettings,
            BridgeRequest::OpenLauncherSettings => Operation::OpenLauncherSettings,
            BridgeRequest::RegisterAppChangeReceiver => Operation::RegisterAppChangeReceiver,
        }
    }
}

/// Typed result of a dispatched request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeReply {
    Apps(Vec<InstalledApp>),
    Bool(bool),
    Unit,
}

impl BridgeReply {
    pub fn into_response(self) -> BridgeResult<MethodResponse> {
        match self {
            BridgeReply::Apps(apps) => MethodResponse::success(apps),
            BridgeReply::Bool(flag) => MethodResponse::success(flag),
            BridgeReply::Unit => Ok(MethodResponse::Success(serde_json::Value::Null)),
        }
    }
}

/// Native side of the launcher's method channels.
///
/// One instance per hosting activity. Holds the platform, the configuration
/// and the app change listener registration.
pub struct LauncherBridge {
    config: BridgeConfig,
    host: Arc<dyn PackageHost>,
    notifier: AppChangeNotifier,
}

impl LauncherBridge {
    pub fn new(config: BridgeConfig, host: Arc<dyn PackageHost>, invoker: Arc<dyn MethodInvoker>) -> Self {
        let notify_channel = config.channel_name(channels::NOTIFY_APP_CHANGES);
        info!("🌉 Launcher bridge ready on {}/*", config.namespace());
        Self {
            config,
            host,
            notifier: AppChangeNotifier::new(invoker, notify_channel),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn notifier(&self) -> &AppChangeNotifier {
        &self.notifier
    }

    /// Full names of every channel this bridge answers on
    pub fn channel_names(&self) -> Vec<String> {
        Operation::ALL
            .iter()
            .map(|op| self.config.channel_name(op.channel()))
            .collect()
    }

    /// Handle a decoded method call arriving on `channel`
    pub fn handle_method_call(&self, channel: &str, call: &MethodCall) -> MethodResponse {
        let op = match self
            .config
            .short_channel_name(channel)
            .and_then(|short| Operation::resolve(short, &call.method))
        {
            Some(op) => op,
            None => {
                debug!("not implemented: {} on {}", call.method, channel);
                return MethodResponse::NotImplemented;
            }
        };

        let request = match BridgeRequest::parse(op, call) {
            Ok(request) => request,
            Err(e) => {
                warn!("⚠️  {} rejected: {}", call.method, e);
                return MethodResponse::from_error(&e);
            }
        };

        match self.dispatch(request).and_then(BridgeReply::into_response) {
            Ok(response) => response,
            Err(e) => {
                error!("❌ {} failed: {}", call.method, e);
                MethodResponse::from_error(&e)
            }
        }
    }

    /// Handle an encoded message; `None` is the empty not-implemented reply
    pub fn handle_message(&self, channel: &str, message: &[u8]) -> Option<Vec<u8>> {
        let response = match codec::decode_method_call(message) {
            Ok(call) => self.handle_method_call(channel, &call),
            Err(e) => {
                error!("❌ undecodable message on {}: {}", channel, e);
                MethodResponse::from_error(&e)
            }
        };
        codec::encode_response(&response)
    }

    /// Run a validated request, applying the operation's failure policy
    pub fn dispatch(&self, request: BridgeRequest) -> BridgeResult<BridgeReply> {
        let op = request.operation();
        let outcome = match request {
            BridgeRequest::GetInstalledApps => self.get_installed_apps().map(BridgeReply::Apps),
            BridgeRequest::LaunchApp(req) => self.try_launch(&req.package_name).map(BridgeReply::Bool),
            BridgeRequest::OpenAppSettings(req) => self
                .host
                .start_activity(&Intent::app_details_settings(&req.package_name))
                .map(|()| BridgeReply::Bool(true)),
            BridgeRequest::OpenLauncherSettings => self
                .host
                .start_activity(&Intent::home_settings())
                .map(|()| BridgeReply::Unit),
            BridgeRequest::RegisterAppChangeReceiver => {
                self.notifier.register(&*self.host).map(|_| BridgeReply::Unit)
            }
        };

        match outcome {
            Ok(reply) => Ok(reply),
            Err(e) => match op.failure_policy() {
                FailurePolicy::Propagate => Err(e.into()),
                FailurePolicy::CollapseToFalse => {
                    debug!("{:?} collapsed to false: {}", op, e);
                    Ok(BridgeReply::Bool(false))
                }
                FailurePolicy::Ignore => {
                    debug!("{:?} failure ignored: {}", op, e);
                    Ok(BridgeReply::Unit)
                }
            },
        }
    }

    /// Launchable apps in platform order, the launcher itself excluded
    pub fn get_installed_apps(&self) -> Result<Vec<InstalledApp>, PlatformError> {
        list_installed_apps(&*self.host, &self.config.own_package)
    }

    pub fn launch_app(&self, package_name: &str) -> bool {
        self.dispatch_bool(BridgeRequest::LaunchApp(LaunchAppRequest {
            package_name: package_name.to_string(),
        }))
    }

    pub fn open_app_settings(&self, package_name: &str) -> bool {
        self.dispatch_bool(BridgeRequest::OpenAppSettings(OpenAppSettingsRequest {
            package_name: package_name.to_string(),
        }))
    }

    /// Fire-and-forget: a platform failure is traced, never reported
    pub fn open_launcher_settings(&self) {
        if let Err(e) = self.dispatch(BridgeRequest::OpenLauncherSettings) {
            warn!("⚠️  default launcher settings not opened: {}", e);
        }
    }

    /// Install the app change listener; later calls are no-ops
    pub fn register_app_change_receiver(&self) -> Result<(), PlatformError> {
        self.notifier.register(&*self.host).map(|_| ())
    }

    fn try_launch(&self, package_name: &str) -> Result<bool, PlatformError> {
        match self.host.launch_intent_for_package(package_name)? {
            Some(intent) => {
                self.host.start_activity(&intent)?;
                info!("🚀 Launched {}", package_name);
                Ok(true)
            }
            None => {
                debug!("no launch intent for {}", package_name);
                Ok(false)
            }
        }
    }

    fn dispatch_bool(&self, request: BridgeRequest) -> bool {
        matches!(self.dispatch(request), Ok(BridgeReply::Bool(true)))
    }
}
