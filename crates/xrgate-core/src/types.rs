use std::fmt;

use serde::Serialize;

pub const EYE_TRACKING: &str = "com.oculus.permission.EYE_TRACKING";
pub const FACE_TRACKING: &str = "com.oculus.permission.FACE_TRACKING";
pub const RECORD_AUDIO: &str = "android.permission.RECORD_AUDIO";
pub const USE_SCENE: &str = "com.oculus.permission.USE_SCENE";

/// Platform-defined identifier of a user-authorized capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Permission {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Permission {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Tag attached to a batched permission request and echoed in its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestCode(pub i32);

impl fmt::Display for RequestCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// One entry of a permission result batch delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionResult {
    pub permission: Permission,
    pub status: PermissionStatus,
}

impl PermissionResult {
    pub fn granted(permission: impl Into<Permission>) -> Self {
        Self {
            permission: permission.into(),
            status: PermissionStatus::Granted,
        }
    }

    pub fn denied(permission: impl Into<Permission>) -> Self {
        Self {
            permission: permission.into(),
            status: PermissionStatus::Denied,
        }
    }
}

/// Ordered, duplicate-free set of permissions an application declares.
///
/// Immutable once built. Duplicates keep their first position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequiredPermissionSet(Vec<Permission>);

impl RequiredPermissionSet {
    pub fn new<I, P>(permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        let mut ordered: Vec<Permission> = Vec::new();
        for permission in permissions.into_iter().map(Into::into) {
            if !ordered.contains(&permission) {
                ordered.push(permission);
            }
        }
        Self(ordered)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Permission> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, permission: &Permission) -> bool {
        self.0.contains(permission)
    }
}

impl<'a> IntoIterator for &'a RequiredPermissionSet {
    type Item = &'a Permission;
    type IntoIter = std::slice::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Permissions still awaiting a grant. Shrinks as grants arrive and keeps
/// declaration order so the batched request mirrors the declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingPermissionSet(Vec<Permission>);

impl PendingPermissionSet {
    pub fn as_slice(&self) -> &[Permission] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, permission: &Permission) -> bool {
        self.0.contains(permission)
    }

    /// Remove a granted permission. Returns whether it was pending.
    pub fn resolve(&mut self, permission: &Permission) -> bool {
        match self.0.iter().position(|p| p == permission) {
            Some(idx) => {
                self.0.remove(idx);
                true
            }
            None => false,
        }
    }
}

impl FromIterator<Permission> for PendingPermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        let mut pending = Self::default();
        for permission in iter {
            if !pending.contains(&permission) {
                pending.0.push(permission);
            }
        }
        pending
    }
}

/// Native libraries in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NativeLibraryList(Vec<String>);

impl NativeLibraryList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Phase of a bootstrap sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapState {
    Init,
    Checking,
    Requesting,
    Proceeding,
    Done,
    Terminated,
}

impl BootstrapState {
    /// `Done` and `Terminated` admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Terminated)
    }
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Checking => "checking",
            Self::Requesting => "requesting",
            Self::Proceeding => "proceeding",
            Self::Done => "done",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// What a single lifecycle event did to the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// A permission request is outstanding.
    Waiting,
    /// Libraries were loaded and the native entry was started.
    Proceeded,
    /// A permission was denied and the host was finished.
    Terminated,
    /// The event did not apply to the current state and was dropped.
    Ignored,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_set_keeps_first_occurrence_order() {
        let set = RequiredPermissionSet::new([FACE_TRACKING, EYE_TRACKING, FACE_TRACKING]);
        let ids: Vec<&str> = set.iter().map(Permission::as_str).collect();
        assert_eq!(ids, vec![FACE_TRACKING, EYE_TRACKING]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn pending_resolve_removes_only_known_entries() {
        let mut pending: PendingPermissionSet =
            [Permission::from(EYE_TRACKING), Permission::from(RECORD_AUDIO)]
                .into_iter()
                .collect();
        assert!(!pending.resolve(&Permission::from(USE_SCENE)));
        assert_eq!(pending.len(), 2);
        assert!(pending.resolve(&Permission::from(EYE_TRACKING)));
        assert_eq!(pending.as_slice(), &[Permission::from(RECORD_AUDIO)]);
        assert!(pending.resolve(&Permission::from(RECORD_AUDIO)));
        assert!(pending.is_empty());
    }

    #[test]
    fn terminal_states() {
        assert!(BootstrapState::Done.is_terminal());
        assert!(BootstrapState::Terminated.is_terminal());
        assert!(!BootstrapState::Requesting.is_terminal());
        assert!(!BootstrapState::Init.is_terminal());
    }
}
