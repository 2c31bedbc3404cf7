//! Symbol table loader
//!
//! Opens the inference dylib and resolves the six `node_mlx_*` entry points
//! exactly once. The resulting [`NativeLibrary`] keeps the library mapped for
//! as long as the resolved function pointers are reachable.

use crate::error::{BridgeError, Result};
use crate::ffi::{
    self, EntryPoints, FreeStringFn, GenerateFn, GetVersionFn, IsAvailableFn, LoadModelFn,
    UnloadModelFn,
};
use libloading::Library;
use std::path::{Path, PathBuf};

/// An opened inference library together with its entry-point table
pub struct NativeLibrary {
    path: PathBuf,
    entry_points: EntryPoints,
    // The fn pointers in entry_points point into this; None for static tables
    library: Option<Library>,
}

impl NativeLibrary {
    /// Open a dynamic library and resolve its entry points
    ///
    /// On Unix the library is opened with `RTLD_NOW | RTLD_LOCAL`: every
    /// relocation is resolved up front so a broken library fails here rather
    /// than on first use, and its symbols stay out of the global namespace.
    ///
    /// # Errors
    /// * [`BridgeError::LoadFailure`] if the library cannot be opened
    /// * [`BridgeError::MissingSymbols`] if any of `node_mlx_load_model`,
    ///   `node_mlx_generate` or `node_mlx_free_string` is absent. The library
    ///   is closed again before returning.
    ///
    /// # Example
    /// ```no_run
    /// use mlx_bridge::NativeLibrary;
    ///
    /// let library = NativeLibrary::open("build/libnode_mlx.dylib")?;
    /// println!("missing optional: {:?}", library.entry_points().missing_optional());
    /// # Ok::<(), mlx_bridge::BridgeError>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let library = open_library(path).map_err(|e| BridgeError::LoadFailure {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        // SAFETY: each symbol is looked up with the exact signature declared
        // in node_mlx.h. The pointers are only used while `library` is alive,
        // which NativeLibrary guarantees by owning it.
        let (load_model, generate, free_string, unload_model, is_available, get_version) = unsafe {
            (
                resolve::<LoadModelFn>(&library, ffi::SYM_LOAD_MODEL),
                resolve::<GenerateFn>(&library, ffi::SYM_GENERATE),
                resolve::<FreeStringFn>(&library, ffi::SYM_FREE_STRING),
                resolve::<UnloadModelFn>(&library, ffi::SYM_UNLOAD_MODEL),
                resolve::<IsAvailableFn>(&library, ffi::SYM_IS_AVAILABLE),
                resolve::<GetVersionFn>(&library, ffi::SYM_GET_VERSION),
            )
        };

        let entry_points = match (load_model, generate, free_string) {
            (Some(load_model), Some(generate), Some(free_string)) => EntryPoints {
                load_model,
                generate,
                free_string,
                unload_model,
                is_available,
                get_version,
            },
            _ => {
                let mut missing = Vec::new();
                if load_model.is_none() {
                    missing.push(ffi::symbol_name(ffi::SYM_LOAD_MODEL).to_string());
                }
                if generate.is_none() {
                    missing.push(ffi::symbol_name(ffi::SYM_GENERATE).to_string());
                }
                if free_string.is_none() {
                    missing.push(ffi::symbol_name(ffi::SYM_FREE_STRING).to_string());
                }
                drop(library);
                log::debug!("Closed {} after failed symbol resolution", path.display());
                return Err(BridgeError::MissingSymbols { symbols: missing });
            }
        };

        let missing_optional = entry_points.missing_optional();
        if missing_optional.is_empty() {
            log::info!("Loaded inference library: {}", path.display());
        } else {
            log::info!(
                "Loaded inference library: {} (optional entry points absent: {})",
                path.display(),
                missing_optional.join(", ")
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            entry_points,
            library: Some(library),
        })
    }

    /// Wrap an entry-point table that does not come from a dynamic library
    ///
    /// Used for statically linked engines and in-process test doubles. The
    /// validity of the pointers was vouched for when the table was built
    /// through the `unsafe` [`EntryPoints`] constructors.
    pub fn from_entry_points<P: AsRef<Path>>(label: P, entry_points: EntryPoints) -> Self {
        Self {
            path: label.as_ref().to_path_buf(),
            entry_points,
            library: None,
        }
    }

    /// Path the library was opened from (or the label it was created with)
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolved entry points
    pub fn entry_points(&self) -> &EntryPoints {
        &self.entry_points
    }

    /// Whether this table is backed by a dynamically opened library
    pub fn is_dynamic(&self) -> bool {
        self.library.is_some()
    }
}

impl std::fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.path)
            .field("entry_points", &self.entry_points)
            .field("dynamic", &self.is_dynamic())
            .finish()
    }
}

#[cfg(unix)]
fn open_library(path: &Path) -> std::result::Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_LOCAL, RTLD_NOW};

    // SAFETY: loading a library runs its initializers. The path is supplied
    // by the caller, who vouches for the library it points to.
    unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_LOCAL) }.map(Library::from)
}

#[cfg(not(unix))]
fn open_library(path: &Path) -> std::result::Result<Library, libloading::Error> {
    // SAFETY: see the unix variant. LoadLibraryExW resolves imports eagerly
    // and never exports into a global namespace, so the defaults match.
    unsafe { Library::new(path) }
}

/// Look up one symbol, recording absence instead of failing
///
/// # Safety
/// `T` must be the exact function-pointer type the library exports under
/// `symbol`.
unsafe fn resolve<T: Copy>(library: &Library, symbol: &[u8]) -> Option<T> {
    match library.get::<T>(symbol) {
        Ok(sym) => Some(*sym),
        Err(e) => {
            log::debug!("Symbol {} not found: {}", ffi::symbol_name(symbol), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_nonexistent_path_is_load_failure() {
        let err = NativeLibrary::open("/definitely/not/here/libnode_mlx.so").unwrap_err();
        match err {
            BridgeError::LoadFailure { path, reason } => {
                assert_eq!(path, "/definitely/not/here/libnode_mlx.so");
                assert!(!reason.is_empty());
            }
            other => panic!("expected LoadFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_open_non_library_file_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join(libloading::library_filename("node_mlx"));
        std::fs::write(&bogus, b"not a shared object").unwrap();

        let err = NativeLibrary::open(&bogus).unwrap_err();
        assert_eq!(err.kind(), "LoadFailure");
        assert!(err.to_string().contains(&bogus.display().to_string()));
    }

    // glibc is always present and exports none of the node_mlx symbols
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn test_open_library_without_entry_points_reports_all_missing() {
        let err = NativeLibrary::open("libc.so.6").unwrap_err();
        assert_eq!(
            err,
            BridgeError::MissingSymbols {
                symbols: vec![
                    "node_mlx_load_model".to_string(),
                    "node_mlx_generate".to_string(),
                    "node_mlx_free_string".to_string(),
                ],
            }
        );
    }
}
