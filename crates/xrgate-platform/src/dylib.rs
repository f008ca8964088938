//! Shared-library loading through `dlopen`/`LoadLibrary`, for running a
//! launch off-device.

use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::{debug, info};
use xrgate_core::{BootError, BootResult, LibraryLoader, NativeEntry};

use crate::symbols;

/// Platform file name for a bare library name (`scenemodel` ->
/// `libscenemodel.so` on Linux).
pub fn library_file_name(name: &str) -> PathBuf {
    PathBuf::from(libloading::library_filename(name))
}

/// Loads libraries from a list of directories, falling back to the system
/// search path when none are configured. Handles stay open for the life of
/// the loader.
#[derive(Debug, Default)]
pub struct DylibLoader {
    search_dirs: Vec<PathBuf>,
    libraries: Vec<(String, Library)>,
}

impl DylibLoader {
    pub fn new(search_dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            search_dirs: search_dirs.into_iter().collect(),
            libraries: Vec::new(),
        }
    }

    fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let file = library_file_name(name);
        if self.search_dirs.is_empty() {
            return vec![file];
        }
        self.search_dirs
            .iter()
            .map(|dir| dir.join(&file))
            .filter(|path| path.exists())
            .collect()
    }
}

impl LibraryLoader for DylibLoader {
    fn load(&mut self, name: &str) -> BootResult<()> {
        let mut last_error = None;
        for path in self.candidates(name) {
            debug!("trying {}", path.display());
            match unsafe { Library::new(&path) } {
                Ok(library) => {
                    info!("loaded {name} from {}", path.display());
                    self.libraries.push((name.to_string(), library));
                    return Ok(());
                }
                Err(err) => last_error = Some(err.to_string()),
            }
        }
        Err(BootError::library_load(
            name,
            last_error.unwrap_or_else(|| "not found in search path".to_string()),
        ))
    }
}

/// Calls `xrgate_main` in the application library once it is loaded.
#[derive(Debug)]
pub struct DylibEntry {
    path: PathBuf,
    library: Option<Library>,
}

impl DylibEntry {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            library: None,
        }
    }
}

impl NativeEntry for DylibEntry {
    fn launch(&mut self) -> BootResult<()> {
        let name = self.path.display().to_string();
        // Already resident after the loader ran; this only bumps the refcount.
        let library = unsafe { Library::new(&self.path) }
            .map_err(|e| BootError::library_load(&name, e))?;
        symbols::call_entry(&library, &name)?;
        self.library = Some(library);
        Ok(())
    }

    fn dump_state(&self) -> Option<String> {
        self.library.as_ref().and_then(symbols::read_dump)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_reports_search_failure() {
        let dir = std::env::temp_dir().join("xrgate-dylib-test-empty");
        std::fs::create_dir_all(&dir).unwrap();
        let mut loader = DylibLoader::new([dir]);

        let err = loader.load("xrgate_definitely_missing").unwrap_err();
        match err {
            BootError::LibraryLoad { name, reason } => {
                assert_eq!(name, "xrgate_definitely_missing");
                assert_eq!(reason, "not found in search path");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(loader.libraries.is_empty());
    }

    #[test]
    fn file_name_uses_platform_convention() {
        let file = library_file_name("scenemodel");
        let file = file.to_string_lossy();
        assert!(file.contains("scenemodel"));
        #[cfg(target_os = "linux")]
        assert_eq!(file, "libscenemodel.so");
    }

    #[test]
    fn entry_for_missing_library_fails_as_load_error() {
        let mut entry = DylibEntry::new("/nonexistent/libxrgate_app.so");
        assert!(matches!(entry.launch(), Err(BootError::LibraryLoad { .. })));
        assert!(entry.dump_state().is_none());
    }
}
