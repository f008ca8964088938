//! Permission-gated bootstrap sequence.
//!
//! The host drives a [`Bootstrapper`] with lifecycle events; the bootstrapper
//! answers by querying and requesting permissions through the host and, once
//! nothing is pending, by loading the native libraries and starting the
//! native entry.
//!
//! ```text
//! Init -> Checking -> Proceeding -> Done
//!            |            ^
//!            v            |
//!        Requesting ------+
//!            |
//!            v
//!        Terminated
//! ```
//!
//! `Done` and `Terminated` are terminal. A denial is final for the process.
//!
//! # Thread Safety
//!
//! Events must be delivered from one serialized callback queue. The type is
//! driven through `&mut self` and holds no locks of its own.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::host::{LibraryLoader, NativeEntry, PermissionHost};
use crate::loader::LoadRegistry;
use crate::manifest::LaunchManifest;
use crate::status::{record_failure, record_state};
use crate::types::{
    BootstrapState, PendingPermissionSet, PermissionResult, PermissionStatus, RequestCode,
    StepOutcome,
};
use crate::BootResult;

pub struct Bootstrapper<H, L, N> {
    manifest: LaunchManifest,
    host: H,
    loader: L,
    entry: N,
    registry: Arc<LoadRegistry>,
    state: BootstrapState,
    pending: PendingPermissionSet,
    outstanding: Option<RequestCode>,
}

impl<H, L, N> Bootstrapper<H, L, N>
where
    H: PermissionHost,
    L: LibraryLoader,
    N: NativeEntry,
{
    /// Create a bootstrapper sharing the process-wide library registry.
    pub fn new(manifest: LaunchManifest, host: H, loader: L, entry: N) -> Self {
        Self::with_registry(manifest, host, loader, entry, LoadRegistry::global())
    }

    pub fn with_registry(
        manifest: LaunchManifest,
        host: H,
        loader: L,
        entry: N,
        registry: Arc<LoadRegistry>,
    ) -> Self {
        Self {
            manifest,
            host,
            loader,
            entry,
            registry,
            state: BootstrapState::Init,
            pending: PendingPermissionSet::default(),
            outstanding: None,
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    pub fn pending(&self) -> &PendingPermissionSet {
        &self.pending
    }

    pub fn manifest(&self) -> &LaunchManifest {
        &self.manifest
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn entry(&self) -> &N {
        &self.entry
    }

    /// Permissions from the manifest the host does not currently grant, in
    /// declaration order.
    pub fn compute_missing(&self) -> BootResult<PendingPermissionSet> {
        let mut missing = Vec::new();
        for permission in &self.manifest.permissions {
            debug!("{}: checking permission {permission}", self.manifest.app_name);
            if !self.host.check_permission(permission)?.is_granted() {
                debug!("{}: permission {permission} missing", self.manifest.app_name);
                missing.push(permission.clone());
            }
        }
        Ok(missing.into_iter().collect())
    }

    /// Lifecycle entry point. Proceeds immediately when every permission is
    /// granted, otherwise issues one batched request and waits.
    pub fn on_create(&mut self) -> BootResult<StepOutcome> {
        if self.state != BootstrapState::Init {
            warn!(
                "{}: create delivered in state {}, ignoring",
                self.manifest.app_name, self.state
            );
            return Ok(StepOutcome::Ignored);
        }

        info!("{}: bootstrap starting", self.manifest.app_name);
        self.transition(BootstrapState::Checking);

        let missing = match self.compute_missing() {
            Ok(missing) => missing,
            Err(err) => {
                self.terminate();
                return Err(err);
            }
        };

        if missing.is_empty() {
            return self.proceed();
        }
        self.request_async(missing)
    }

    fn request_async(&mut self, pending: PendingPermissionSet) -> BootResult<StepOutcome> {
        let code = self.manifest.request_code;
        info!(
            "{}: requesting {} permission(s) with code {code}",
            self.manifest.app_name,
            pending.len()
        );
        if let Err(err) = self.host.request_permissions(pending.as_slice(), code) {
            self.terminate();
            return Err(err);
        }
        self.pending = pending;
        self.outstanding = Some(code);
        self.transition(BootstrapState::Requesting);
        Ok(StepOutcome::Waiting)
    }

    /// Handle a permission result batch from the host.
    ///
    /// Grants shrink the pending set; the first denial finishes the host.
    /// Batches for any other request code, or arriving outside
    /// `Requesting`, are dropped.
    pub fn on_permission_result(
        &mut self,
        code: RequestCode,
        results: &[PermissionResult],
    ) -> BootResult<StepOutcome> {
        if self.state != BootstrapState::Requesting || self.outstanding != Some(code) {
            trace!(
                "{}: dropping result for code {code} in state {}",
                self.manifest.app_name,
                self.state
            );
            return Ok(StepOutcome::Ignored);
        }

        if results.is_empty() {
            // Android delivers an empty batch when the request dialog is interrupted.
            debug!("{}: empty result batch, still waiting", self.manifest.app_name);
            return Ok(StepOutcome::Waiting);
        }

        for result in results {
            match result.status {
                PermissionStatus::Granted => {
                    if !self.manifest.permissions.contains(&result.permission) {
                        trace!(
                            "{}: grant for undeclared permission {}",
                            self.manifest.app_name,
                            result.permission
                        );
                        continue;
                    }
                    debug!("{}: permission {} granted", self.manifest.app_name, result.permission);
                    self.pending.resolve(&result.permission);
                }
                PermissionStatus::Denied => {
                    warn!("{}: permission {} DENIED", self.manifest.app_name, result.permission);
                    self.terminate();
                    return Ok(StepOutcome::Terminated);
                }
            }
        }

        if !self.pending.is_empty() {
            debug!(
                "{}: {} permission(s) still pending",
                self.manifest.app_name,
                self.pending.len()
            );
            return Ok(StepOutcome::Waiting);
        }

        self.outstanding = None;
        self.proceed()
    }

    /// The hosting activity is going away. An outstanding request is
    /// abandoned and any later result is ignored.
    pub fn on_destroy(&mut self) {
        debug!("{}: destroy in state {}", self.manifest.app_name, self.state);
        if self.state.is_terminal() {
            return;
        }
        if self.state == BootstrapState::Requesting {
            info!(
                "{}: destroyed with {} permission(s) outstanding",
                self.manifest.app_name,
                self.pending.len()
            );
        }
        self.pending = PendingPermissionSet::default();
        self.outstanding = None;
        self.transition(BootstrapState::Terminated);
    }

    fn proceed(&mut self) -> BootResult<StepOutcome> {
        debug_assert!(self.pending.is_empty());
        self.transition(BootstrapState::Proceeding);
        info!("{}: starting native activity", self.manifest.app_name);

        let loaded = self.registry.ensure_loaded(&self.manifest.libraries, &mut self.loader);
        let launched = loaded.and_then(|_| self.entry.launch());
        if let Err(err) = launched {
            self.terminate();
            record_failure(&self.manifest.app_name, &err);
            return Err(err);
        }

        self.transition(BootstrapState::Done);
        Ok(StepOutcome::Proceeded)
    }

    fn terminate(&mut self) {
        self.pending = PendingPermissionSet::default();
        self.outstanding = None;
        self.transition(BootstrapState::Terminated);
        self.host.finish();
    }

    fn transition(&mut self, next: BootstrapState) {
        trace!("{}: {} -> {next}", self.manifest.app_name, self.state);
        self.state = next;
        record_state(&self.manifest.app_name, next);
    }

    /// Write the native diagnostic block, if this application declares one.
    pub fn dump(&self, out: &mut impl fmt::Write) -> fmt::Result {
        let Some(title) = &self.manifest.dump_title else {
            return Ok(());
        };
        writeln!(out)?;
        writeln!(out, "========== {title} ==========")?;
        writeln!(out, "Native Events Begin")?;
        if let Some(state) = self.entry.dump_state() {
            writeln!(out, "{state}")?;
        }
        writeln!(out, "Native Events End")
    }
}
