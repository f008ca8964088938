//! End-to-end launches against the scripted host.

use std::sync::Arc;

use xrgate_core::types::{EYE_TRACKING, FACE_TRACKING, RECORD_AUDIO, USE_SCENE};
use xrgate_core::{
    BootError, BootstrapState, Bootstrapper, LaunchManifest, LoadRegistry, Permission,
    StepOutcome, Variant,
};
use xrgate_platform::{run_scripted, RecordingEntry, RecordingLoader, ScriptedHost};

fn launch(
    manifest: LaunchManifest,
    host: ScriptedHost,
    loader: RecordingLoader,
) -> Bootstrapper<ScriptedHost, RecordingLoader, RecordingEntry> {
    Bootstrapper::with_registry(
        manifest,
        host,
        loader,
        RecordingEntry::new(),
        Arc::new(LoadRegistry::new()),
    )
}

fn ids(batch: &[Permission]) -> Vec<&str> {
    batch.iter().map(Permission::as_str).collect()
}

/// Tracking permissions already granted at check time
#[test]
fn test_pre_granted_tracking_launches_immediately() {
    let host = ScriptedHost::new()
        .grant(EYE_TRACKING)
        .grant(FACE_TRACKING)
        .grant(RECORD_AUDIO);
    let mut boot = launch(Variant::FaceTrackingFb.manifest(), host, RecordingLoader::new());

    assert_eq!(run_scripted(&mut boot).unwrap(), StepOutcome::Proceeded);
    assert!(boot.host().requests().is_empty());
    assert!(!boot.host().is_finished());
    assert_eq!(boot.loader().loaded(), ["openxr_loader", "xrfacetrackingfb"]);
    assert_eq!(boot.entry().launches(), 1);
}

/// Scene permission requested, then granted by the user
#[test]
fn test_scene_permission_granted_on_request() {
    let mut boot = launch(
        Variant::PassthroughOcclusion.manifest(),
        ScriptedHost::new(),
        RecordingLoader::new(),
    );

    assert_eq!(run_scripted(&mut boot).unwrap(), StepOutcome::Proceeded);
    assert_eq!(boot.host().requests().len(), 1);
    assert_eq!(ids(&boot.host().requests()[0]), vec![USE_SCENE]);
    assert_eq!(boot.state(), BootstrapState::Done);
    assert_eq!(
        boot.loader().loaded(),
        ["openxr_loader", "xrpassthroughocclusion"]
    );
    assert_eq!(boot.entry().launches(), 1);
}

/// Scene permission requested, then denied by the user
#[test]
fn test_scene_permission_denied_terminates() {
    let host = ScriptedHost::new().deny_on_request(USE_SCENE);
    let mut boot = launch(Variant::SceneModel.manifest(), host, RecordingLoader::new());

    assert_eq!(run_scripted(&mut boot).unwrap(), StepOutcome::Terminated);
    assert!(boot.host().is_finished());
    assert_eq!(boot.state(), BootstrapState::Terminated);
    assert!(boot.loader().loaded().is_empty());
    assert_eq!(boot.entry().launches(), 0);
}

/// Only the ungranted subset is requested, in declaration order
#[test]
fn test_partial_grants_request_missing_subset() {
    let host = ScriptedHost::new().grant(FACE_TRACKING);
    let mut boot = launch(
        Variant::BodyFaceEyeSocial.manifest(),
        host,
        RecordingLoader::new(),
    );

    assert_eq!(run_scripted(&mut boot).unwrap(), StepOutcome::Proceeded);
    assert_eq!(boot.host().requests().len(), 1);
    assert_eq!(
        ids(&boot.host().requests()[0]),
        vec![EYE_TRACKING, RECORD_AUDIO]
    );
}

/// A stale result for another request code changes nothing
#[test]
fn test_foreign_request_code_is_dropped() {
    let mut boot = launch(
        Variant::SceneModel.manifest(),
        ScriptedHost::new(),
        RecordingLoader::new(),
    );
    assert_eq!(boot.on_create().unwrap(), StepOutcome::Waiting);

    let (code, results) = boot.host_mut().take_answer().unwrap();
    let foreign = xrgate_core::RequestCode(code.0 + 1);
    assert_eq!(
        boot.on_permission_result(foreign, &results).unwrap(),
        StepOutcome::Ignored
    );
    assert_eq!(boot.pending().len(), 1);
    assert_eq!(boot.entry().launches(), 0);

    assert_eq!(
        boot.on_permission_result(code, &results).unwrap(),
        StepOutcome::Proceeded
    );
}

/// Library failure surfaces as a fatal load error before native entry
#[test]
fn test_library_failure_never_reaches_entry() {
    let mut boot = launch(
        Variant::ControllersEmulator.manifest(),
        ScriptedHost::new(),
        RecordingLoader::failing_on("xrcontrollers_emulator"),
    );

    let err = run_scripted(&mut boot).unwrap_err();
    assert!(matches!(err, BootError::LibraryLoad { ref name, .. } if name == "xrcontrollers_emulator"));
    assert_eq!(boot.loader().loaded(), ["openxr_loader"]);
    assert_eq!(boot.entry().launches(), 0);
    assert_eq!(boot.state(), BootstrapState::Terminated);
    assert!(boot.host().is_finished());
}

/// Manifest built from a JSON launch configuration
#[test]
fn test_launch_from_json_config() {
    let config = xrgate_common::LaunchConfig::from_json_str(
        r#"{
            "app_name": "CustomXr",
            "request_code": 9,
            "permissions": ["com.oculus.permission.HAND_TRACKING"],
            "native_libraries": ["openxr_loader", "customxr"],
            "dump_title": "CUSTOM"
        }"#,
    )
    .unwrap();
    let manifest = LaunchManifest::from_config(&config).unwrap();
    let mut boot = launch(manifest, ScriptedHost::new(), RecordingLoader::new());

    assert_eq!(run_scripted(&mut boot).unwrap(), StepOutcome::Proceeded);
    assert_eq!(
        ids(&boot.host().requests()[0]),
        vec!["com.oculus.permission.HAND_TRACKING"]
    );

    let mut dump = String::new();
    boot.dump(&mut dump).unwrap();
    assert!(dump.contains("========== CUSTOM =========="));
    assert!(dump.contains("launches: 1"));
}
