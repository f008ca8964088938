#![forbid(unsafe_code)]

pub mod bootstrap;
pub mod finish;
pub mod host;
pub mod loader;
pub mod manifest;
pub mod status;
pub mod types;

pub use bootstrap::Bootstrapper;
pub use finish::{clear_finish_handler, register_finish_handler, request_native_finish};
pub use host::{LibraryLoader, NativeEntry, PermissionHost};
pub use loader::LoadRegistry;
pub use manifest::{LaunchManifest, Variant};
pub use status::launch_status;
pub use types::{
    BootstrapState, NativeLibraryList, PendingPermissionSet, Permission, PermissionResult,
    PermissionStatus, RequestCode, RequiredPermissionSet, StepOutcome,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootError {
    #[error("failed to load native library {name}: {reason}")]
    LibraryLoad { name: String, reason: String },
    #[error("platform error: {0}")]
    Platform(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("native entry failed: {0}")]
    Native(String),
}

impl BootError {
    pub fn library_load(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::LibraryLoad {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn platform(msg: impl std::fmt::Display) -> Self {
        Self::Platform(msg.to_string())
    }
}

pub type BootResult<T> = Result<T, BootError>;
