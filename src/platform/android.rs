// src/platform/android.rs
//! JNI backend for a real device
//!
//! The Flutter activity loads this library, hands itself to
//! `NativeBridge.nativeInit` and then forwards every channel message to
//! `NativeBridge.nativeHandleMessage`. Package broadcasts come in
//! through `NativeAppChangeReceiver.nativeOnReceive`; the Kotlin shims only
//! relay arguments and own no logic.

use std::sync::{Arc, Mutex, OnceLock};

use jni::objects::{GlobalRef, JByteArray, JClass, JObject, JString, JValue};
use jni::{JNIEnv, JavaVM};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::api::LauncherBridge;
use crate::config::BridgeConfig;
use crate::core::app_types::{ApplicationInfo, PackageEntry};
use crate::core::intent::{Intent, IntentFilter, CATEGORY_LAUNCHER};
use crate::core::platform::{BroadcastReceiver, MethodInvoker, PackageHost};
use crate::error::PlatformError;

/// `PackageManager.GET_META_DATA`
const GET_META_DATA: i32 = 0x0000_0080;

const NATIVE_BRIDGE_CLASS: &str = "com.cloudcatcher.mars_launcher.NativeBridge";
const RECEIVER_CLASS: &str = "com.cloudcatcher.mars_launcher.NativeAppChangeReceiver";

type Registration = (Arc<dyn BroadcastReceiver>, IntentFilter);

static RECEIVERS: OnceLock<Mutex<Vec<Registration>>> = OnceLock::new();
static BRIDGE: OnceLock<LauncherBridge> = OnceLock::new();

fn receivers() -> &'static Mutex<Vec<Registration>> {
    RECEIVERS.get_or_init(|| Mutex::new(Vec::new()))
}

fn jni_error(e: jni::errors::Error) -> PlatformError {
    PlatformError::Jni(e.to_string())
}

/// Clear a pending Java exception and wrap the failure
fn take_exception(
    env: &mut JNIEnv<'_>,
    e: jni::errors::Error,
    wrap: fn(String) -> PlatformError,
) -> PlatformError {
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_clear();
    }
    wrap(e.to_string())
}

/// [`PackageHost`] backed by the hosting activity
///
/// The activity and its `PackageManager` are held as global references taken
/// once in `nativeInit`. Every JNI call runs inside a local frame so the
/// per-package references of a long enumeration are released as it goes.
pub struct AndroidHost {
    vm: JavaVM,
    activity: GlobalRef,
    package_manager: GlobalRef,
}

impl AndroidHost {
    pub fn new(env: &mut JNIEnv<'_>, activity: &JObject<'_>) -> jni::errors::Result<Self> {
        let vm = env.get_java_vm()?;
        let pm = env
            .call_method(
                activity,
                "getPackageManager",
                "()Landroid/content/pm/PackageManager;",
                &[],
            )?
            .l()?;
        let package_manager = env.new_global_ref(&pm)?;
        env.delete_local_ref(pm)?;
        Ok(Self {
            vm,
            activity: env.new_global_ref(activity)?,
            package_manager,
        })
    }

    fn query_packages(env: &mut JNIEnv<'_>, pm: &JObject<'_>) -> jni::errors::Result<Vec<PackageEntry>> {
        let list = env
            .call_method(pm, "getInstalledPackages", "(I)Ljava/util/List;", &[JValue::Int(GET_META_DATA)])?
            .l()?;
        let size = env.call_method(&list, "size", "()I", &[])?.i()?;

        let mut entries = Vec::with_capacity(size.max(0) as usize);
        for i in 0..size {
            let entry = env.with_local_frame(4, |env| -> jni::errors::Result<PackageEntry> {
                let info = env
                    .call_method(&list, "get", "(I)Ljava/lang/Object;", &[JValue::Int(i)])?
                    .l()?;
                let name = env.get_field(&info, "packageName", "Ljava/lang/String;")?.l()?;
                let package_name: String = env.get_string(&JString::from(name))?.into();

                let app_info = env
                    .get_field(&info, "applicationInfo", "Landroid/content/pm/ApplicationInfo;")?
                    .l()?;
                let application = if app_info.is_null() {
                    None
                } else {
                    let flags = env.get_field(&app_info, "flags", "I")?.i()?;
                    Some(ApplicationInfo { flags: flags as u32 })
                };
                Ok(PackageEntry::new(package_name, application))
            })?;
            entries.push(entry);
        }
        env.delete_local_ref(list)?;
        Ok(entries)
    }

    /// `None` when the package vanished or has no label
    fn query_label(env: &mut JNIEnv<'_>, pm: &JObject<'_>, package: &str) -> jni::errors::Result<Option<String>> {
        env.with_local_frame(6, |env| {
            let j_package = env.new_string(package)?;
            let app_info = match env.call_method(
                pm,
                "getApplicationInfo",
                "(Ljava/lang/String;I)Landroid/content/pm/ApplicationInfo;",
                &[JValue::Object(&j_package), JValue::Int(0)],
            ) {
                Ok(value) => value.l()?,
                Err(jni::errors::Error::JavaException) => {
                    // NameNotFoundException: uninstalled since enumeration
                    env.exception_clear()?;
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            let label = env
                .call_method(
                    &app_info,
                    "loadLabel",
                    "(Landroid/content/pm/PackageManager;)Ljava/lang/CharSequence;",
                    &[JValue::Object(pm)],
                )?
                .l()?;
            if label.is_null() {
                return Ok(None);
            }
            let text = env.call_method(&label, "toString", "()Ljava/lang/String;", &[])?.l()?;
            Ok(Some(env.get_string(&JString::from(text))?.into()))
        })
    }

    fn has_launch_intent(env: &mut JNIEnv<'_>, pm: &JObject<'_>, package: &str) -> jni::errors::Result<bool> {
        env.with_local_frame(4, |env| {
            let intent = Self::resolve_launch_intent(env, pm, package)?;
            Ok(!intent.is_null())
        })
    }

    fn resolve_launch_intent<'local>(
        env: &mut JNIEnv<'local>,
        pm: &JObject<'_>,
        package: &str,
    ) -> jni::errors::Result<JObject<'local>> {
        let j_package = env.new_string(package)?;
        env.call_method(
            pm,
            "getLaunchIntentForPackage",
            "(Ljava/lang/String;)Landroid/content/Intent;",
            &[JValue::Object(&j_package)],
        )?
        .l()
    }

    fn to_java_intent<'local>(
        env: &mut JNIEnv<'local>,
        pm: &JObject<'_>,
        intent: &Intent,
    ) -> jni::errors::Result<JObject<'local>> {
        if let Some(package) = &intent.package {
            if intent.categories.iter().any(|c| c == CATEGORY_LAUNCHER) {
                return Self::resolve_launch_intent(env, pm, package);
            }
        }

        let action = env.new_string(intent.action().unwrap_or_default())?;
        let j_intent = env.new_object(
            "android/content/Intent",
            "(Ljava/lang/String;)V",
            &[JValue::Object(&action)],
        )?;
        if let Some(data) = &intent.data {
            let raw = env.new_string(data)?;
            let uri = env
                .call_static_method(
                    "android/net/Uri",
                    "parse",
                    "(Ljava/lang/String;)Landroid/net/Uri;",
                    &[JValue::Object(&raw)],
                )?
                .l()?;
            env.call_method(
                &j_intent,
                "setData",
                "(Landroid/net/Uri;)Landroid/content/Intent;",
                &[JValue::Object(&uri)],
            )?;
        }
        Ok(j_intent)
    }

    /// Load an app class through the activity's class loader
    fn load_app_class<'local>(
        env: &mut JNIEnv<'local>,
        activity: &JObject<'_>,
        name: &str,
    ) -> jni::errors::Result<JClass<'local>> {
        let loader = env
            .call_method(activity, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])?
            .l()?;
        let j_name = env.new_string(name)?;
        let class = env
            .call_method(
                &loader,
                "loadClass",
                "(Ljava/lang/String;)Ljava/lang/Class;",
                &[JValue::Object(&j_name)],
            )?
            .l()?;
        Ok(JClass::from(class))
    }
}

impl PackageHost for AndroidHost {
    fn installed_packages(&self) -> Result<Vec<PackageEntry>, PlatformError> {
        let mut env = self.vm.attach_current_thread().map_err(jni_error)?;
        let result = Self::query_packages(&mut env, self.package_manager.as_obj());
        result.map_err(|e| take_exception(&mut env, e, PlatformError::PackageQuery))
    }

    fn load_label(&self, entry: &PackageEntry) -> Result<Option<String>, PlatformError> {
        let mut env = self.vm.attach_current_thread().map_err(jni_error)?;
        let result = Self::query_label(&mut env, self.package_manager.as_obj(), &entry.package_name);
        result.map_err(|e| take_exception(&mut env, e, PlatformError::PackageQuery))
    }

    fn launch_intent_for_package(&self, package: &str) -> Result<Option<Intent>, PlatformError> {
        let mut env = self.vm.attach_current_thread().map_err(jni_error)?;
        match Self::has_launch_intent(&mut env, self.package_manager.as_obj(), package) {
            Ok(false) => Ok(None),
            Ok(true) => Ok(Some(Intent::launcher_for(package))),
            Err(e) => Err(take_exception(&mut env, e, PlatformError::PackageQuery)),
        }
    }

    fn start_activity(&self, intent: &Intent) -> Result<(), PlatformError> {
        let mut env = self.vm.attach_current_thread().map_err(jni_error)?;
        let activity = self.activity.as_obj();
        let pm = self.package_manager.as_obj();
        let result = env.with_local_frame(8, |env| -> jni::errors::Result<()> {
            let j_intent = Self::to_java_intent(env, pm, intent)?;
            if j_intent.is_null() {
                return Err(jni::errors::Error::NullPtr("launch intent"));
            }
            env.call_method(
                activity,
                "startActivity",
                "(Landroid/content/Intent;)V",
                &[JValue::Object(&j_intent)],
            )?;
            Ok(())
        });
        result.map_err(|e| take_exception(&mut env, e, PlatformError::ActivityStart))
    }

    fn register_receiver(
        &self,
        receiver: Arc<dyn BroadcastReceiver>,
        filter: IntentFilter,
    ) -> Result<(), PlatformError> {
        let mut env = self.vm.attach_current_thread().map_err(jni_error)?;
        let activity = self.activity.as_obj();
        let scheme = filter.data_schemes.first().cloned().unwrap_or_default();

        let result = env.with_local_frame(8 + filter.actions.len() as i32, |env| -> jni::errors::Result<()> {
            let class = Self::load_app_class(env, activity, RECEIVER_CLASS)?;
            let string_class = env.find_class("java/lang/String")?;
            let actions = env.new_object_array(filter.actions.len() as i32, &string_class, JObject::null())?;
            for (i, action) in filter.actions.iter().enumerate() {
                let j_action = env.new_string(action)?;
                env.set_object_array_element(&actions, i as i32, j_action)?;
            }
            let j_scheme = env.new_string(&scheme)?;
            env.call_static_method(
                &class,
                "register",
                "(Landroid/content/Context;[Ljava/lang/String;Ljava/lang/String;)V",
                &[JValue::Object(activity), JValue::Object(&actions), JValue::Object(&j_scheme)],
            )?;
            Ok(())
        });
        result.map_err(|e| take_exception(&mut env, e, PlatformError::Receiver))?;

        receivers()
            .lock()
            .map_err(|_| PlatformError::Receiver("receiver table poisoned".into()))?
            .push((receiver, filter));
        Ok(())
    }
}

/// Sends `invokeMethod` calls through the Kotlin `NativeBridge` shim
pub struct AndroidMethodInvoker {
    vm: JavaVM,
    bridge_class: GlobalRef,
}

impl AndroidMethodInvoker {
    /// `bridge_class` is the `NativeBridge` class that called `nativeInit`
    pub fn new(env: &mut JNIEnv<'_>, bridge_class: &JClass<'_>) -> jni::errors::Result<Self> {
        Ok(Self {
            vm: env.get_java_vm()?,
            bridge_class: env.new_global_ref(bridge_class)?,
        })
    }
}

impl MethodInvoker for AndroidMethodInvoker {
    fn invoke_method(&self, channel: &str, method: &str, arguments: Value) {
        let mut env = match self.vm.attach_current_thread() {
            Ok(env) => env,
            Err(e) => {
                error!("❌ cannot attach to invoke {}: {}", method, e);
                return;
            }
        };
        let class: &JClass<'_> = self.bridge_class.as_obj().into();
        let result = env.with_local_frame(4, |env| -> jni::errors::Result<()> {
            let j_channel = env.new_string(channel)?;
            let j_method = env.new_string(method)?;
            let j_args = env.new_string(arguments.to_string())?;
            env.call_static_method(
                class,
                "invokeMethod",
                "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;)V",
                &[JValue::Object(&j_channel), JValue::Object(&j_method), JValue::Object(&j_args)],
            )?;
            Ok(())
        });
        if let Err(e) = result {
            let _ = env.exception_clear();
            warn!("⚠️  invokeMethod {} on {} failed: {}", method, channel, e);
        }
    }
}

fn bridge() -> Option<&'static LauncherBridge> {
    let bridge = BRIDGE.get();
    if bridge.is_none() {
        warn!("⚠️  channel message before NativeBridge.nativeInit, answering not implemented");
    }
    bridge
}

/// JNI: build the bridge around the hosting activity.
///
/// Called once from `configureFlutterEngine` before any channel is attached.
/// Later calls keep the first bridge.
#[no_mangle]
pub extern "system" fn Java_com_cloudcatcher_mars_1launcher_NativeBridge_nativeInit<'local>(
    mut env: JNIEnv<'local>,
    class: JClass<'local>,
    activity: JObject<'local>,
) {
    if BRIDGE.get().is_some() {
        debug!("bridge already initialized");
        return;
    }
    let built = AndroidHost::new(&mut env, &activity).and_then(|host| {
        let invoker = AndroidMethodInvoker::new(&mut env, &class)?;
        Ok((host, invoker))
    });
    match built {
        Ok((host, invoker)) => {
            let bridge = LauncherBridge::new(BridgeConfig::default(), Arc::new(host), Arc::new(invoker));
            match BRIDGE.set(bridge) {
                Ok(()) => info!("✅ launcher bridge initialized"),
                Err(_) => debug!("bridge initialized concurrently, keeping the first"),
            }
        }
        Err(e) => {
            let _ = env.exception_clear();
            error!("❌ cannot initialize launcher bridge: {}", e);
        }
    }
}

/// JNI: handle one JSON-codec message from a method channel
#[no_mangle]
pub extern "system" fn Java_com_cloudcatcher_mars_1launcher_NativeBridge_nativeHandleMessage<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    channel: JString<'local>,
    message: JByteArray<'local>,
) -> JByteArray<'local> {
    let null = || JByteArray::from(JObject::null());

    let channel: String = match env.get_string(&channel) {
        Ok(s) => s.into(),
        Err(_) => return null(),
    };
    let message = match env.convert_byte_array(&message) {
        Ok(bytes) => bytes,
        Err(_) => return null(),
    };
    let Some(bridge) = bridge() else {
        return null();
    };

    match bridge.handle_message(&channel, &message) {
        Some(reply) => env.byte_array_from_slice(&reply).unwrap_or_else(|_| null()),
        None => null(),
    }
}

/// JNI: a package broadcast reached the Kotlin receiver shim
#[no_mangle]
pub extern "system" fn Java_com_cloudcatcher_mars_1launcher_NativeAppChangeReceiver_nativeOnReceive<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    action: JString<'local>,
    data: JString<'local>,
) {
    let mut read = |s: &JString<'local>| -> Option<String> {
        if s.is_null() {
            return None;
        }
        env.get_string(s).ok().map(Into::into)
    };
    let intent = Intent {
        action: read(&action),
        data: read(&data),
        ..Intent::default()
    };

    let targets: Vec<Arc<dyn BroadcastReceiver>> = match receivers().lock() {
        Ok(list) => list
            .iter()
            .filter(|(_, filter)| filter.matches(&intent))
            .map(|(r, _)| Arc::clone(r))
            .collect(),
        Err(_) => return,
    };
    info!("📣 {} -> {} receivers", intent, targets.len());
    for receiver in targets {
        receiver.on_receive(&intent);
    }
}
