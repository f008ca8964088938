//! JNI glue for a thin Java launcher activity.
//!
//! The Java side (`com.xrgate.GateActivity`) forwards its lifecycle here:
//!
//! ```java
//! static { System.loadLibrary("xrgate_platform"); }
//! private native void nativeOnCreate(String launch);
//! private native void nativeOnRequestPermissionsResult(int code, String[] p, int[] g);
//! private native void nativeOnDestroy();
//! private native String nativeDump();
//! public void onNativeReady() {}
//! ```
//!
//! `launch` is either a variant name (`scene-model`) or a JSON launch
//! configuration. A separate native activity (`com.xrgate.GateNativeActivity`)
//! calls `nativeRegister` from its `onCreate` so native code can close it, and
//! `nativeUnregister` from its `onDestroy`.
//!
//! Destroy events are matched against the activity that owns the bootstrapper,
//! so a late `onDestroy` from a replaced instance leaves the new one running.

use std::sync::{Arc, Mutex, MutexGuard};

use jni::objects::{GlobalRef, JIntArray, JObject, JObjectArray, JString, JValue};
use jni::sys::{jint, jsize, jstring};
use jni::{JNIEnv, JavaVM};
use tracing::{debug, error, info, trace, warn};
use xrgate_common::LaunchConfig;
use xrgate_core::{
    clear_finish_handler, register_finish_handler, BootError, BootResult, Bootstrapper, LaunchManifest, LibraryLoader,
    NativeEntry, Permission, PermissionHost, PermissionResult, PermissionStatus, RequestCode,
    StepOutcome, Variant,
};

use crate::dylib::library_file_name;
use crate::slot::take_owned;
use crate::symbols;

// android.content.pm.PackageManager.PERMISSION_GRANTED
const PERMISSION_GRANTED: jint = 0;
// Build.VERSION_CODES.M; earlier releases grant at install time.
const RUNTIME_PERMISSIONS_SDK: jint = 23;

type AndroidGate = Bootstrapper<JniHost, JniLoader, JniEntry>;

static GATE: Mutex<Option<AndroidGate>> = Mutex::new(None);
static NDK_CONTEXT: Mutex<Option<GlobalRef>> = Mutex::new(None);

fn jni_err(err: jni::errors::Error) -> BootError {
    BootError::platform(format!("JNI: {err}"))
}

/// Describe and clear a pending Java exception. No other JNI call is legal on
/// this thread while one is pending.
fn clear_exception(env: &mut JNIEnv) {
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
    }
}

fn java_err(env: &mut JNIEnv, err: jni::errors::Error) -> BootError {
    clear_exception(env);
    jni_err(err)
}

fn lock_gate() -> MutexGuard<'static, Option<AndroidGate>> {
    match GATE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn lock_ndk_context() -> MutexGuard<'static, Option<GlobalRef>> {
    match NDK_CONTEXT.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn is_activity(env: &JNIEnv, activity: &JObject, held: &GlobalRef) -> bool {
    env.is_same_object(activity, held).unwrap_or(false)
}

pub struct JniHost {
    vm: Arc<JavaVM>,
    activity: GlobalRef,
    sdk_int: jint,
}

impl JniHost {
    pub fn new(env: &mut JNIEnv, activity: &JObject) -> BootResult<Self> {
        let vm = env.get_java_vm().map_err(|e| java_err(env, e))?;
        let activity = env.new_global_ref(activity).map_err(|e| java_err(env, e))?;
        let sdk_int = env
            .get_static_field("android/os/Build$VERSION", "SDK_INT", "I")
            .and_then(|v| v.i())
            .map_err(|e| java_err(env, e))?;
        Ok(Self {
            vm: Arc::new(vm),
            activity,
            sdk_int,
        })
    }
}

impl PermissionHost for JniHost {
    fn check_permission(&self, permission: &Permission) -> BootResult<PermissionStatus> {
        if self.sdk_int < RUNTIME_PERMISSIONS_SDK {
            return Ok(PermissionStatus::Granted);
        }
        let mut env = self.vm.attach_current_thread().map_err(jni_err)?;
        let id = env
            .new_string(permission.as_str())
            .map_err(|e| java_err(&mut env, e))?;
        let result = env
            .call_method(
                self.activity.as_obj(),
                "checkSelfPermission",
                "(Ljava/lang/String;)I",
                &[JValue::Object(&id)],
            )
            .and_then(|v| v.i())
            .map_err(|e| java_err(&mut env, e))?;
        Ok(if result == PERMISSION_GRANTED {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        })
    }

    fn request_permissions(
        &mut self,
        permissions: &[Permission],
        code: RequestCode,
    ) -> BootResult<()> {
        let mut env = self.vm.attach_current_thread().map_err(jni_err)?;
        let array = env
            .new_object_array(permissions.len() as jsize, "java/lang/String", JObject::null())
            .map_err(|e| java_err(&mut env, e))?;
        for (idx, permission) in permissions.iter().enumerate() {
            let id = env
                .new_string(permission.as_str())
                .map_err(|e| java_err(&mut env, e))?;
            env.set_object_array_element(&array, idx as jsize, &id)
                .map_err(|e| java_err(&mut env, e))?;
        }
        env.call_method(
            self.activity.as_obj(),
            "requestPermissions",
            "([Ljava/lang/String;I)V",
            &[JValue::Object(&array), JValue::Int(code.0)],
        )
        .map_err(|e| java_err(&mut env, e))?;
        Ok(())
    }

    fn finish(&mut self) {
        if let Err(err) = call_void(&self.vm, &self.activity, "finish") {
            error!("activity finish failed: {err}");
        }
    }
}

fn call_void(vm: &JavaVM, target: &GlobalRef, method: &str) -> BootResult<()> {
    let mut env = vm.attach_current_thread().map_err(jni_err)?;
    env.call_method(target.as_obj(), method, "()V", &[])
        .map_err(|e| java_err(&mut env, e))?;
    Ok(())
}

/// `System.loadLibrary`, so the Java runtime links JNI symbols as it would
/// for a static initializer.
pub struct JniLoader {
    vm: Arc<JavaVM>,
}

impl LibraryLoader for JniLoader {
    fn load(&mut self, name: &str) -> BootResult<()> {
        let mut env = self.vm.attach_current_thread().map_err(jni_err)?;
        let jname = env.new_string(name).map_err(|e| java_err(&mut env, e))?;
        let loaded = env.call_static_method(
            "java/lang/System",
            "loadLibrary",
            "(Ljava/lang/String;)V",
            &[JValue::Object(&jname)],
        );
        if let Err(err) = loaded {
            clear_exception(&mut env);
            return Err(BootError::library_load(name, err));
        }
        Ok(())
    }
}

/// Starts the configured native activity and finishes the launcher, or tells
/// the launcher that native code is ready to run in place.
pub struct JniEntry {
    vm: Arc<JavaVM>,
    activity: GlobalRef,
    native_activity: Option<String>,
    main_library: Option<String>,
}

impl JniEntry {
    fn start_native_activity(&self, class: &str) -> BootResult<()> {
        let mut env = self.vm.attach_current_thread().map_err(jni_err)?;
        let app = env
            .call_method(
                self.activity.as_obj(),
                "getApplicationContext",
                "()Landroid/content/Context;",
                &[],
            )
            .and_then(|v| v.l())
            .map_err(|e| java_err(&mut env, e))?;
        let target = env
            .find_class(class.replace('.', "/"))
            .map_err(|e| java_err(&mut env, e))?;
        let intent = env
            .new_object(
                "android/content/Intent",
                "(Landroid/content/Context;Ljava/lang/Class;)V",
                &[JValue::Object(&app), JValue::Object(&target)],
            )
            .map_err(|e| java_err(&mut env, e))?;
        env.call_method(
            self.activity.as_obj(),
            "startActivity",
            "(Landroid/content/Intent;)V",
            &[JValue::Object(&intent)],
        )
        .map_err(|e| java_err(&mut env, e))?;
        env.call_method(self.activity.as_obj(), "finish", "()V", &[])
            .map_err(|e| java_err(&mut env, e))?;
        Ok(())
    }
}

impl NativeEntry for JniEntry {
    fn launch(&mut self) -> BootResult<()> {
        match self.native_activity.as_deref() {
            Some(class) => {
                info!("starting native activity {class}");
                self.start_native_activity(class)
            }
            None => call_void(&self.vm, &self.activity, "onNativeReady"),
        }
    }

    fn dump_state(&self) -> Option<String> {
        let name = self.main_library.as_deref()?;
        // Resolves to the already-resident library.
        let library = unsafe { libloading::Library::new(library_file_name(name)) }.ok()?;
        symbols::read_dump(&library)
    }
}

fn resolve_manifest(launch: &str) -> BootResult<LaunchManifest> {
    if launch.trim_start().starts_with('{') {
        let config =
            LaunchConfig::from_json_str(launch).map_err(|e| BootError::Config(e.to_string()))?;
        LaunchManifest::from_config(&config)
    } else {
        launch.trim().parse::<Variant>().map(Variant::manifest)
    }
}

/// Publish the VM and activity through `ndk-context` for crates that look
/// them up there (the OpenXR Android loader among them).
fn publish_ndk_context(vm: &JavaVM, activity: GlobalRef) {
    let mut slot = lock_ndk_context();
    unsafe {
        if slot.is_some() {
            ndk_context::release_android_context();
        }
        ndk_context::initialize_android_context(
            vm.get_java_vm_pointer().cast(),
            activity.as_obj().as_raw().cast(),
        );
    }
    *slot = Some(activity);
}

fn register_activity_finish(vm: Arc<JavaVM>, activity: GlobalRef) {
    register_finish_handler(move || {
        if let Err(err) = call_void(&vm, &activity, "finishAndRemoveTask") {
            error!("finishAndRemoveTask failed: {err}");
        }
    });
}

/// Withdraw the `ndk-context` publication and the finish handler when they
/// belong to `activity`, releasing its global reference. Both are published
/// together, so the context slot identifies the owner of the handler too.
fn detach_activity(env: &JNIEnv, activity: &JObject) {
    let mut slot = lock_ndk_context();
    if take_owned(&mut *slot, |held| is_activity(env, activity, held)).is_some() {
        unsafe { ndk_context::release_android_context() };
        clear_finish_handler();
        debug!("activity context released");
    }
}

fn create(env: &mut JNIEnv, activity: &JObject, launch: &str) -> BootResult<StepOutcome> {
    let manifest = resolve_manifest(launch)?;
    let host = JniHost::new(env, activity)?;
    let vm = host.vm.clone();

    publish_ndk_context(&vm, host.activity.clone());
    if manifest.native_activity.is_none() {
        register_activity_finish(vm.clone(), host.activity.clone());
    }

    let loader = JniLoader { vm: vm.clone() };
    let entry = JniEntry {
        vm,
        activity: host.activity.clone(),
        native_activity: manifest.native_activity.clone(),
        main_library: manifest.libraries.names().last().cloned(),
    };

    let mut gate = lock_gate();
    if gate.is_some() {
        warn!("replacing bootstrapper from a previous activity instance");
    }
    let boot = gate.insert(Bootstrapper::new(manifest, host, loader, entry));
    boot.on_create()
}

fn report(step: &str, result: BootResult<StepOutcome>) {
    match result {
        Ok(outcome) => debug!("{step}: {outcome:?}"),
        Err(err @ BootError::LibraryLoad { .. }) => {
            // No fallback implementation exists; crash like the platform would.
            error!("{step}: {err}");
            std::process::abort();
        }
        Err(err) => error!("{step}: {err}"),
    }
}

#[no_mangle]
pub extern "system" fn Java_com_xrgate_GateActivity_nativeOnCreate<'local>(
    mut env: JNIEnv<'local>,
    activity: JObject<'local>,
    launch: JString<'local>,
) {
    xrgate_common::init_tracing();
    let launch: String = match env.get_string(&launch) {
        Ok(s) => s.into(),
        Err(err) => {
            clear_exception(&mut env);
            error!("nativeOnCreate: unreadable launch descriptor: {err}");
            return;
        }
    };
    report("nativeOnCreate", create(&mut env, &activity, &launch));
}

fn read_results(
    env: &mut JNIEnv,
    permissions: &JObjectArray,
    grants: &JIntArray,
) -> BootResult<Vec<PermissionResult>> {
    let len = env
        .get_array_length(permissions)
        .map_err(|e| java_err(env, e))?;
    let grant_len = env.get_array_length(grants).map_err(|e| java_err(env, e))?;
    let len = len.min(grant_len);

    let mut codes = vec![0 as jint; len as usize];
    env.get_int_array_region(grants, 0, &mut codes)
        .map_err(|e| java_err(env, e))?;

    let mut results = Vec::with_capacity(len as usize);
    for (idx, code) in codes.into_iter().enumerate() {
        let element = env
            .get_object_array_element(permissions, idx as jsize)
            .map_err(|e| java_err(env, e))?;
        let id: String = env
            .get_string(&JString::from(element))
            .map_err(|e| java_err(env, e))?
            .into();
        results.push(if code == PERMISSION_GRANTED {
            PermissionResult::granted(id)
        } else {
            PermissionResult::denied(id)
        });
    }
    Ok(results)
}

#[no_mangle]
pub extern "system" fn Java_com_xrgate_GateActivity_nativeOnRequestPermissionsResult<'local>(
    mut env: JNIEnv<'local>,
    _activity: JObject<'local>,
    code: jint,
    permissions: JObjectArray<'local>,
    grants: JIntArray<'local>,
) {
    let results = match read_results(&mut env, &permissions, &grants) {
        Ok(results) => results,
        Err(err) => {
            error!("nativeOnRequestPermissionsResult: {err}");
            return;
        }
    };

    let mut gate = lock_gate();
    let Some(boot) = gate.as_mut() else {
        trace!("permission result with no bootstrapper, dropping");
        return;
    };
    report(
        "nativeOnRequestPermissionsResult",
        boot.on_permission_result(RequestCode(code), &results),
    );
}

#[no_mangle]
pub extern "system" fn Java_com_xrgate_GateActivity_nativeOnDestroy<'local>(
    env: JNIEnv<'local>,
    activity: JObject<'local>,
) {
    debug!("onDestroy() called");
    let owned = take_owned(&mut *lock_gate(), |boot| {
        is_activity(&env, &activity, &boot.host().activity)
    });
    match owned {
        Some(mut boot) => boot.on_destroy(),
        None => debug!("onDestroy() from a replaced activity instance, ignoring"),
    }
    detach_activity(&env, &activity);
}

#[no_mangle]
pub extern "system" fn Java_com_xrgate_GateActivity_nativeDump<'local>(
    mut env: JNIEnv<'local>,
    _activity: JObject<'local>,
) -> jstring {
    let mut text = String::new();
    if let Some(boot) = lock_gate().as_ref() {
        if let Err(err) = boot.dump(&mut text) {
            error!("nativeDump: {err}");
        }
    }
    match env.new_string(text) {
        Ok(s) => s.into_raw(),
        Err(err) => {
            clear_exception(&mut env);
            error!("nativeDump: {err}");
            JObject::null().into_raw()
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_com_xrgate_GateNativeActivity_nativeRegister<'local>(
    env: JNIEnv<'local>,
    activity: JObject<'local>,
) {
    debug!("GateNativeActivity.onCreate() called");
    let registered = env.get_java_vm().and_then(|vm| {
        let activity = env.new_global_ref(&activity)?;
        Ok((vm, activity))
    });
    match registered {
        Ok((vm, activity)) => {
            publish_ndk_context(&vm, activity.clone());
            register_activity_finish(Arc::new(vm), activity);
        }
        Err(err) => error!("nativeRegister: {err}"),
    }
}

#[no_mangle]
pub extern "system" fn Java_com_xrgate_GateNativeActivity_nativeUnregister<'local>(
    env: JNIEnv<'local>,
    activity: JObject<'local>,
) {
    debug!("GateNativeActivity.onDestroy() called");
    detach_activity(&env, &activity);
}
