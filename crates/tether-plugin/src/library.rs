//! Dynamic library facility for plugin binaries.
//!
//! Failures are not fatal: the boolean API records a diagnostic retrievable
//! with [`PluginLibrary::last_error`].

use crate::error::{BridgeError, Result};
use std::ffi::c_void;
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct PluginLibrary {
    library: Option<libloading::Library>,
    path: Option<PathBuf>,
    last_error: String,
}

impl PluginLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path`, returning the error instead of recording it.
    pub fn load(path: &Path) -> Result<Self> {
        let mut library = Self::new();
        if library.open(path) {
            Ok(library)
        } else {
            Err(BridgeError::LibraryLoad {
                path: path.to_path_buf(),
                reason: library.last_error,
            })
        }
    }

    /// Open `path`, replacing any library already open.
    pub fn open(&mut self, path: &Path) -> bool {
        if self.is_open() {
            self.close();
        }

        // Runs the library initialisers
        match unsafe { libloading::Library::new(path) } {
            Ok(library) => {
                self.library = Some(library);
                self.path = Some(path.to_path_buf());
                self.last_error.clear();
                true
            }
            Err(e) => {
                tracing::debug!("Failed to open {:?}: {}", path, e);
                self.last_error = e.to_string();
                false
            }
        }
    }

    pub fn close(&mut self) -> bool {
        let Some(library) = self.library.take() else {
            self.last_error = "library is not open".to_string();
            return false;
        };
        self.path = None;

        match library.close() {
            Ok(()) => true,
            Err(e) => {
                self.last_error = e.to_string();
                false
            }
        }
    }

    /// Address of `name`, or `None` (with [`Self::last_error`] set).
    pub fn symbol(&mut self, name: &str) -> Option<*const c_void> {
        let Some(library) = self.library.as_ref() else {
            self.last_error = "library is not open".to_string();
            return None;
        };

        // Only the address is read
        match unsafe { library.get::<*const c_void>(name.as_bytes()) } {
            Ok(symbol) => Some(*symbol),
            Err(e) => {
                self.last_error = e.to_string();
                None
            }
        }
    }

    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    pub fn is_open(&self) -> bool {
        self.library.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
