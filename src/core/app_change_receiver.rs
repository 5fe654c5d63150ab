// src/core/app_change_receiver.rs
//! Install/uninstall listener
//!
//! Subscribes to `PACKAGE_ADDED` / `PACKAGE_REMOVED` broadcasts and forwards
//! each one to the UI as `onAppChanged(packageName)`. Registration is one-way:
//! once registered the receiver stays registered for the process lifetime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::app_types::{AppChangeEvent, AppChangeKind, AppChangeListener};
use crate::core::intent::{
    Intent, IntentFilter, ACTION_PACKAGE_ADDED, ACTION_PACKAGE_REMOVED, PACKAGE_SCHEME,
};
use crate::core::platform::{BroadcastReceiver, MethodInvoker, PackageHost};
use crate::error::PlatformError;

/// Method invoked on the UI side for every package change
pub const ON_APP_CHANGED: &str = "onAppChanged";

/// Filter the receiver is registered with
pub fn package_change_filter() -> IntentFilter {
    IntentFilter::new()
        .add_action(ACTION_PACKAGE_ADDED)
        .add_action(ACTION_PACKAGE_REMOVED)
        .add_data_scheme(PACKAGE_SCHEME)
}

/// Broadcast receiver forwarding package changes to the UI channel
pub struct AppChangeReceiver {
    invoker: Arc<dyn MethodInvoker>,
    channel: String,
    listeners: Arc<Mutex<Vec<Box<dyn AppChangeListener>>>>,
    forwarded: AtomicU64,
}

impl AppChangeReceiver {
    pub fn new(invoker: Arc<dyn MethodInvoker>, channel: impl Into<String>) -> Self {
        Self {
            invoker,
            channel: channel.into(),
            listeners: Arc::new(Mutex::new(Vec::new())),
            forwarded: AtomicU64::new(0),
        }
    }

    /// Add a local listener that sees every forwarded change
    pub fn add_listener<T: AppChangeListener + 'static>(&self, listener: T) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Box::new(listener));
        }
    }

    /// Number of notifications sent to the UI so far
    pub fn forwarded_count(&self) -> u64 {
        self.forwarded.load(Ordering::SeqCst)
    }

    fn notify_registered(&self) {
        if let Ok(mut listeners) = self.listeners.lock() {
            for l in listeners.iter_mut() {
                l.on_registered();
            }
        }
    }
}

impl BroadcastReceiver for AppChangeReceiver {
    fn on_receive(&self, intent: &Intent) {
        let kind = match intent.action() {
            Some(ACTION_PACKAGE_ADDED) => AppChangeKind::Added,
            Some(ACTION_PACKAGE_REMOVED) => AppChangeKind::Removed,
            other => {
                debug!("ignoring broadcast with action {:?}", other);
                return;
            }
        };

        let event = AppChangeEvent::new(kind, intent.data_scheme_specific_part().map(str::to_string));
        info!("🔄 Package change: {}", event);

        let argument = match &event.package_name {
            Some(name) => Value::String(name.clone()),
            None => Value::Null,
        };
        self.invoker.invoke_method(&self.channel, ON_APP_CHANGED, argument);
        self.forwarded.fetch_add(1, Ordering::SeqCst);

        match self.listeners.lock() {
            Ok(mut listeners) => {
                for l in listeners.iter_mut() {
                    l.on_app_changed(&event);
                }
            }
            Err(_) => warn!("⚠️  change listeners poisoned, skipping local fan-out"),
        }
    }
}

/// Registration state of the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Unregistered,
    Registered,
}

/// Owns the receiver and its one-time registration
pub struct AppChangeNotifier {
    receiver: Arc<AppChangeReceiver>,
    state: Mutex<ReceiverState>,
    registrations: AtomicU64,
}

impl AppChangeNotifier {
    pub fn new(invoker: Arc<dyn MethodInvoker>, channel: impl Into<String>) -> Self {
        Self {
            receiver: Arc::new(AppChangeReceiver::new(invoker, channel)),
            state: Mutex::new(ReceiverState::Unregistered),
            registrations: AtomicU64::new(0),
        }
    }

    pub fn receiver(&self) -> &Arc<AppChangeReceiver> {
        &self.receiver
    }

    pub fn state(&self) -> ReceiverState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(ReceiverState::Unregistered)
    }

    /// How many times the receiver was handed to the platform (0 or 1)
    pub fn registration_count(&self) -> u64 {
        self.registrations.load(Ordering::SeqCst)
    }

    /// Register with the platform unless already registered.
    ///
    /// Returns `true` when this call performed the registration. A failed
    /// platform registration leaves the state `Unregistered`.
    pub fn register<H>(&self, host: &H) -> Result<bool, PlatformError>
    where
        H: PackageHost + ?Sized,
    {
        let mut state = self
            .state
            .lock()
            .map_err(|_| PlatformError::Receiver("registration state poisoned".into()))?;

        if *state == ReceiverState::Registered {
            debug!("app change receiver already registered");
            return Ok(false);
        }

        let receiver: Arc<dyn BroadcastReceiver> = self.receiver.clone();
        host.register_receiver(receiver, package_change_filter())?;
        *state = ReceiverState::Registered;
        self.registrations.fetch_add(1, Ordering::SeqCst);
        drop(state);

        info!("👂 App change receiver registered");
        self.receiver.notify_registered();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::simulated::{RecordingInvoker, SimulatedPlatform};
    use pretty_assertions::assert_eq;

    const CHANNEL: &str = "com.cloudcatcher.mars_launcher/notify_app_changes";

    fn setup() -> (Arc<RecordingInvoker>, AppChangeNotifier, SimulatedPlatform) {
        let invoker = Arc::new(RecordingInvoker::default());
        let notifier = AppChangeNotifier::new(invoker.clone(), CHANNEL);
        (invoker, notifier, SimulatedPlatform::new(Vec::new()))
    }

    #[test]
    fn no_notification_before_registration() {
        let (invoker, _notifier, platform) = setup();
        let delivered = platform.broadcast(&Intent::new(ACTION_PACKAGE_ADDED).with_data("package:a.b"));
        assert_eq!(delivered, 0);
        assert!(invoker.calls().is_empty());
    }

    #[test]
    fn each_broadcast_forwards_exactly_once() {
        let (invoker, notifier, platform) = setup();
        assert!(notifier.register(&platform).unwrap());

        platform.broadcast(&Intent::new(ACTION_PACKAGE_ADDED).with_data("package:org.example.a"));
        platform.broadcast(&Intent::new(ACTION_PACKAGE_REMOVED).with_data("package:org.example.a"));
        platform.broadcast(&Intent::new(ACTION_PACKAGE_ADDED).with_data("package:org.example.a"));

        let calls = invoker.calls();
        assert_eq!(calls.len(), 3);
        for call in &calls {
            assert_eq!(call.channel, CHANNEL);
            assert_eq!(call.method, ON_APP_CHANGED);
            assert_eq!(call.arguments, Value::String("org.example.a".into()));
        }
        assert_eq!(notifier.receiver().forwarded_count(), 3);
    }

    #[test]
    fn broadcast_without_data_forwards_null() {
        let (invoker, notifier, platform) = setup();
        notifier.register(&platform).unwrap();

        notifier.receiver().on_receive(&Intent::new(ACTION_PACKAGE_REMOVED));

        let calls = invoker.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].arguments, Value::Null);
    }

    #[test]
    fn unrelated_actions_are_ignored() {
        let (invoker, notifier, _platform) = setup();
        notifier
            .receiver()
            .on_receive(&Intent::new("android.intent.action.PACKAGE_CHANGED").with_data("package:x"));
        assert!(invoker.calls().is_empty());
    }

    #[test]
    fn second_registration_is_a_no_op() {
        let (invoker, notifier, platform) = setup();
        assert!(notifier.register(&platform).unwrap());
        assert!(!notifier.register(&platform).unwrap());
        assert_eq!(notifier.registration_count(), 1);
        assert_eq!(platform.receiver_count(), 1);

        platform.broadcast(&Intent::new(ACTION_PACKAGE_ADDED).with_data("package:x.y"));
        assert_eq!(invoker.calls().len(), 1);
    }

    #[test]
    fn failed_registration_stays_unregistered() {
        let (_invoker, notifier, platform) = setup();
        platform.fail_receiver_registration("no context");
        assert!(notifier.register(&platform).is_err());
        assert_eq!(notifier.state(), ReceiverState::Unregistered);
        assert_eq!(notifier.registration_count(), 0);
    }

    #[test]
    fn local_listeners_see_kind() {
        struct Collect(Arc<Mutex<Vec<AppChangeKind>>>);
        impl AppChangeListener for Collect {
            fn on_app_changed(&mut self, event: &AppChangeEvent) {
                self.0.lock().unwrap().push(event.kind);
            }
        }

        let (_invoker, notifier, platform) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        notifier.receiver().add_listener(Collect(seen.clone()));
        notifier.register(&platform).unwrap();

        platform.broadcast(&Intent::new(ACTION_PACKAGE_REMOVED).with_data("package:x"));
        platform.broadcast(&Intent::new(ACTION_PACKAGE_ADDED).with_data("package:x"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![AppChangeKind::Removed, AppChangeKind::Added]
        );
    }
}
