//! Launch manifests and the built-in application variants.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use xrgate_common::LaunchConfig;

use crate::types::{
    NativeLibraryList, RequestCode, RequiredPermissionSet, EYE_TRACKING, FACE_TRACKING,
    RECORD_AUDIO, USE_SCENE,
};
use crate::{BootError, BootResult};

const OPENXR_LOADER: &str = "openxr_loader";

const TRACKING_PERMISSIONS: &[&str] = &[EYE_TRACKING, FACE_TRACKING, RECORD_AUDIO];
const SCENE_PERMISSIONS: &[&str] = &[USE_SCENE];
const NO_PERMISSIONS: &[&str] = &[];

/// Everything a bootstrapper needs to know about one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchManifest {
    pub app_name: String,
    pub request_code: RequestCode,
    pub permissions: RequiredPermissionSet,
    pub libraries: NativeLibraryList,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_activity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dump_title: Option<String>,
}

impl LaunchManifest {
    pub fn from_config(config: &LaunchConfig) -> BootResult<Self> {
        config
            .validate()
            .map_err(|e| BootError::Config(e.to_string()))?;
        Ok(Self {
            app_name: config.app_name.clone(),
            request_code: RequestCode(config.request_code),
            permissions: RequiredPermissionSet::new(config.permissions.iter().cloned()),
            libraries: NativeLibraryList::new(config.native_libraries.iter().cloned()),
            native_activity: config.native_activity.clone(),
            dump_title: config.dump_title.clone(),
        })
    }

    /// Editable launch configuration equivalent to this manifest.
    pub fn to_config(&self) -> LaunchConfig {
        LaunchConfig {
            app_name: self.app_name.clone(),
            request_code: self.request_code.0,
            permissions: self
                .permissions
                .iter()
                .map(|p| p.as_str().to_string())
                .collect(),
            native_libraries: self.libraries.names().to_vec(),
            native_activity: self.native_activity.clone(),
            dump_title: self.dump_title.clone(),
        }
    }
}

impl TryFrom<&LaunchConfig> for LaunchManifest {
    type Error = BootError;

    fn try_from(config: &LaunchConfig) -> BootResult<Self> {
        Self::from_config(config)
    }
}

/// The sample applications shipped with the OpenXR mobile SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    BodyFaceEyeSocial,
    FaceTrackingFb,
    PassthroughOcclusion,
    SceneModel,
    ControllersEmulator,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::BodyFaceEyeSocial,
        Variant::FaceTrackingFb,
        Variant::PassthroughOcclusion,
        Variant::SceneModel,
        Variant::ControllersEmulator,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Variant::BodyFaceEyeSocial => "body-face-eye-social",
            Variant::FaceTrackingFb => "face-tracking-fb",
            Variant::PassthroughOcclusion => "passthrough-occlusion",
            Variant::SceneModel => "scene-model",
            Variant::ControllersEmulator => "controllers-emulator",
        }
    }

    pub fn manifest(self) -> LaunchManifest {
        let (app_name, permissions, library, native_activity, dump_title) = match self {
            Variant::BodyFaceEyeSocial => {
                ("XrBodyFaceEyeSocial", TRACKING_PERMISSIONS, "xrbodyfaceeyesocial", None, None)
            }
            Variant::FaceTrackingFb => {
                ("XrFaceTrackingFB", TRACKING_PERMISSIONS, "xrfacetrackingfb", None, None)
            }
            Variant::PassthroughOcclusion => (
                "XrPassthroughOcclusion",
                SCENE_PERMISSIONS,
                "xrpassthroughocclusion",
                Some("com/oculus/xrpassthroughocclusion/MainNativeActivity"),
                None,
            ),
            Variant::SceneModel => ("XrSceneModel", SCENE_PERMISSIONS, "scenemodel", None, None),
            Variant::ControllersEmulator => (
                "XrControllersEmulator",
                NO_PERMISSIONS,
                "xrcontrollers_emulator",
                None,
                Some("CONTROLLER EMULATOR"),
            ),
        };

        LaunchManifest {
            app_name: app_name.to_string(),
            request_code: RequestCode(xrgate_common::config::DEFAULT_REQUEST_CODE),
            permissions: RequiredPermissionSet::new(permissions.iter().copied()),
            libraries: NativeLibraryList::new([OPENXR_LOADER, library]),
            native_activity: native_activity.map(str::to_string),
            dump_title: dump_title.map(str::to_string),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = BootError;

    fn from_str(s: &str) -> BootResult<Self> {
        Variant::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| BootError::Config(format!("unknown variant: {s}")))
    }
}
