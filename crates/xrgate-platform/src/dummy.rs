use std::collections::HashSet;

use tracing::info;
use xrgate_core::{
    BootError, BootResult, Bootstrapper, LibraryLoader, NativeEntry, Permission,
    PermissionHost, PermissionResult, PermissionStatus, RequestCode, StepOutcome,
};

/// Host whose grant state and user answers are fixed up front.
///
/// Permissions in `granted` pass the initial check. A request for anything
/// else is answered with a grant, unless the permission was marked with
/// [`ScriptedHost::deny_on_request`].
#[derive(Debug, Default)]
pub struct ScriptedHost {
    granted: HashSet<String>,
    denied_on_request: HashSet<String>,
    outstanding: Option<(RequestCode, Vec<Permission>)>,
    requests: Vec<Vec<Permission>>,
    finished: bool,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, permission: impl Into<String>) -> Self {
        self.granted.insert(permission.into());
        self
    }

    pub fn deny_on_request(mut self, permission: impl Into<String>) -> Self {
        self.denied_on_request.insert(permission.into());
        self
    }

    /// Every batch passed to `request_permissions`, in order.
    pub fn requests(&self) -> &[Vec<Permission>] {
        &self.requests
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Play the user's answer to the outstanding request, if there is one.
    pub fn take_answer(&mut self) -> Option<(RequestCode, Vec<PermissionResult>)> {
        let (code, permissions) = self.outstanding.take()?;
        let results = permissions
            .into_iter()
            .map(|permission| {
                if self.denied_on_request.contains(permission.as_str()) {
                    PermissionResult::denied(permission)
                } else {
                    self.granted.insert(permission.as_str().to_string());
                    PermissionResult::granted(permission)
                }
            })
            .collect();
        Some((code, results))
    }
}

impl PermissionHost for ScriptedHost {
    fn check_permission(&self, permission: &Permission) -> BootResult<PermissionStatus> {
        Ok(if self.granted.contains(permission.as_str()) {
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
        info!("ScriptedHost: request {code} for {} permission(s)", permissions.len());
        self.requests.push(permissions.to_vec());
        self.outstanding = Some((code, permissions.to_vec()));
        Ok(())
    }

    fn finish(&mut self) {
        info!("ScriptedHost: finish");
        self.finished = true;
    }
}

/// Loader that records names instead of opening files.
#[derive(Debug, Default)]
pub struct RecordingLoader {
    loaded: Vec<String>,
    fail_on: Option<String>,
}

impl RecordingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(name: impl Into<String>) -> Self {
        Self {
            loaded: Vec::new(),
            fail_on: Some(name.into()),
        }
    }

    pub fn loaded(&self) -> &[String] {
        &self.loaded
    }
}

impl LibraryLoader for RecordingLoader {
    fn load(&mut self, name: &str) -> BootResult<()> {
        if self.fail_on.as_deref() == Some(name) {
            return Err(BootError::library_load(name, "refused by RecordingLoader"));
        }
        info!("RecordingLoader: load {name}");
        self.loaded.push(name.to_string());
        Ok(())
    }
}

/// Entry that counts launches and reports them in its dump.
#[derive(Debug, Default)]
pub struct RecordingEntry {
    launches: usize,
}

impl RecordingEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launches(&self) -> usize {
        self.launches
    }
}

impl NativeEntry for RecordingEntry {
    fn launch(&mut self) -> BootResult<()> {
        info!("RecordingEntry: launch");
        self.launches += 1;
        Ok(())
    }

    fn dump_state(&self) -> Option<String> {
        Some(format!("launches: {}", self.launches))
    }
}

/// Run a launch against a [`ScriptedHost`] until it stops changing: create,
/// then answer requests until the sequence proceeds or terminates.
pub fn run_scripted<L, N>(boot: &mut Bootstrapper<ScriptedHost, L, N>) -> BootResult<StepOutcome>
where
    L: LibraryLoader,
    N: NativeEntry,
{
    let mut outcome = boot.on_create()?;
    while outcome == StepOutcome::Waiting {
        let Some((code, results)) = boot.host_mut().take_answer() else {
            break;
        };
        outcome = boot.on_permission_result(code, &results)?;
    }
    Ok(outcome)
}
