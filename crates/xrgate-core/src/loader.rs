//! Process-wide registry of loaded native libraries.
//!
//! Library loading is idempotent per process: a name that is already loaded,
//! or is being loaded further up the call stack (a native library whose
//! initializer pulls in one of its own dependents), is skipped instead of
//! being loaded again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::{debug, error};

use crate::{host::LibraryLoader, types::NativeLibraryList, BootResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Loading,
    Loaded,
}

/// Names of native libraries loaded (or loading) in this process.
#[derive(Debug, Default)]
pub struct LoadRegistry {
    libraries: Mutex<HashMap<String, LoadState>>,
}

static GLOBAL_REGISTRY: OnceLock<Arc<LoadRegistry>> = OnceLock::new();

impl LoadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every bootstrapper in the process.
    pub fn global() -> Arc<LoadRegistry> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(LoadRegistry::new()))
            .clone()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, LoadState>> {
        match self.libraries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[cfg(test)]
    fn is_loaded(&self, name: &str) -> bool {
        self.lock().get(name) == Some(&LoadState::Loaded)
    }

    /// Load every library in `libraries`, in order, that this registry has
    /// not seen yet. Returns the names that were newly loaded.
    ///
    /// Stops at the first failure; the failing name is forgotten so a later
    /// attempt is not mistaken for a duplicate.
    pub fn ensure_loaded<L>(
        &self,
        libraries: &NativeLibraryList,
        loader: &mut L,
    ) -> BootResult<Vec<String>>
    where
        L: LibraryLoader + ?Sized,
    {
        let mut newly_loaded = Vec::new();
        for name in libraries.names() {
            {
                let mut libs = self.lock();
                if let Some(state) = libs.get(name) {
                    debug!("native library {name} already {state:?}, skipping");
                    continue;
                }
                libs.insert(name.clone(), LoadState::Loading);
            }

            debug!("loading native library {name}");
            match loader.load(name) {
                Ok(()) => {
                    self.lock().insert(name.clone(), LoadState::Loaded);
                    newly_loaded.push(name.clone());
                }
                Err(err) => {
                    self.lock().remove(name);
                    error!("failed to load native library {name}: {err}");
                    return Err(err);
                }
            }
        }
        Ok(newly_loaded)
    }
}
