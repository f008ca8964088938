//! Launch configuration loaded from JSON.
//!
//! A launch configuration declares, for one application variant, which
//! permissions must be granted before native startup and which native
//! libraries to load once they are.
//!
//! ```json
//! {
//!   "app_name": "XrSceneModel",
//!   "permissions": ["com.oculus.permission.USE_SCENE"],
//!   "native_libraries": ["openxr_loader", "scenemodel"]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Request code used when a configuration does not specify one.
pub const DEFAULT_REQUEST_CODE: i32 = 1;

fn default_request_code() -> i32 {
    DEFAULT_REQUEST_CODE
}

/// Declarative description of a gated launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Name used as log tag and in status messages.
    pub app_name: String,
    /// Code attached to the batched permission request.
    #[serde(default = "default_request_code")]
    pub request_code: i32,
    /// Permission identifiers in declaration order.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Native library names in load order.
    pub native_libraries: Vec<String>,
    /// Fully qualified Java class of the native activity to start after
    /// loading. `None` runs native code inside the launching activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_activity: Option<String>,
    /// Title of the diagnostic dump block, if the native side provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_title: Option<String>,
}

impl LaunchConfig {
    /// Parse and validate a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading launch configuration from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check structural constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            return Err(Error::config("app_name must not be empty"));
        }
        if self.native_libraries.is_empty() {
            return Err(Error::config("native_libraries must list at least one library"));
        }
        if let Some(blank) = self.native_libraries.iter().position(|l| l.trim().is_empty()) {
            return Err(Error::config(format!(
                "native_libraries[{blank}] must not be blank"
            )));
        }
        if let Some(blank) = self.permissions.iter().position(|p| p.trim().is_empty()) {
            return Err(Error::config(format!("permissions[{blank}] must not be blank")));
        }
        if matches!(&self.native_activity, Some(class) if class.trim().is_empty()) {
            return Err(Error::config("native_activity must not be blank when set"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"{
        "app_name": "XrSceneModel",
        "permissions": ["com.oculus.permission.USE_SCENE"],
        "native_libraries": ["openxr_loader", "scenemodel"]
    }"#;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config = LaunchConfig::from_json_str(SCENE).unwrap();
        assert_eq!(config.app_name, "XrSceneModel");
        assert_eq!(config.request_code, DEFAULT_REQUEST_CODE);
        assert_eq!(config.permissions, vec!["com.oculus.permission.USE_SCENE"]);
        assert_eq!(config.native_libraries, vec!["openxr_loader", "scenemodel"]);
        assert_eq!(config.native_activity, None);
        assert_eq!(config.dump_title, None);
    }

    #[test]
    fn permissions_may_be_omitted() {
        let config = LaunchConfig::from_json_str(
            r#"{"app_name": "Emulator", "native_libraries": ["xrcontrollers_emulator"]}"#,
        )
        .unwrap();
        assert!(config.permissions.is_empty());
    }

    #[test]
    fn rejects_missing_libraries() {
        let err = LaunchConfig::from_json_str(r#"{"app_name": "x", "native_libraries": []}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_blank_entries() {
        let err = LaunchConfig::from_json_str(
            r#"{"app_name": "x", "permissions": [" "], "native_libraries": ["a"]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("permissions[0]"));

        let err = LaunchConfig::from_json_str(
            r#"{"app_name": "x", "native_libraries": ["a", ""]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("native_libraries[1]"));

        let err =
            LaunchConfig::from_json_str(r#"{"app_name": "", "native_libraries": ["a"]}"#)
                .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = LaunchConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "xrgate-config-test-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, SCENE).unwrap();
        let config = LaunchConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.native_libraries.len(), 2);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = LaunchConfig::load("/nonexistent/xrgate/launch.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn pretty_json_omits_unset_optionals() {
        let config = LaunchConfig::from_json_str(SCENE).unwrap();
        let json = config.to_json_pretty().unwrap();
        assert!(!json.contains("native_activity"));
        assert!(!json.contains("dump_title"));
        assert_eq!(LaunchConfig::from_json_str(&json).unwrap(), config);
    }
}
