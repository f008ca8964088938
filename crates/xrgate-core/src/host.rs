use crate::{
    types::{Permission, PermissionStatus, RequestCode},
    BootResult,
};

/// The platform side of a launch: answers grant queries, accepts batched
/// requests and can finish the hosting activity.
pub trait PermissionHost {
    fn check_permission(&self, permission: &Permission) -> BootResult<PermissionStatus>;

    // Must return without waiting for the user; the answer arrives later as a
    // result event carrying `code`.
    fn request_permissions(&mut self, permissions: &[Permission], code: RequestCode)
        -> BootResult<()>;

    fn finish(&mut self);
}

/// Loads one native library by name through the platform mechanism.
pub trait LibraryLoader {
    fn load(&mut self, name: &str) -> BootResult<()>;
}

/// The native application taking over once its libraries are loaded.
pub trait NativeEntry {
    fn launch(&mut self) -> BootResult<()>;

    fn dump_state(&self) -> Option<String> {
        None
    }
}
