//! Bridge configuration
//!
//! Sources, highest priority first:
//! - explicit values set in code
//! - environment variables (`MLX_BRIDGE_LIBRARY`, `MLX_BRIDGE_SEARCH_PATH`)
//! - defaults (no path, no search directories)

use crate::error::{BridgeError, Result};
use crate::platform;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Explicit path to the inference library
pub const ENV_LIBRARY: &str = "MLX_BRIDGE_LIBRARY";

/// Platform path-list of directories searched for the library
pub const ENV_SEARCH_PATH: &str = "MLX_BRIDGE_SEARCH_PATH";

/// Where to find the inference library
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Path to the library file; wins over the search directories
    pub library_path: Option<PathBuf>,

    /// Directories searched for the platform library file name
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
}

impl BridgeConfig {
    /// Config pointing at one library file
    pub fn with_library_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            library_path: Some(path.into()),
            search_paths: Vec::new(),
        }
    }

    /// Read configuration from the environment
    pub fn from_env() -> Self {
        Self::from_vars(
            env::var_os(ENV_LIBRARY).map(PathBuf::from),
            env::var_os(ENV_SEARCH_PATH),
        )
    }

    fn from_vars(library: Option<PathBuf>, search: Option<std::ffi::OsString>) -> Self {
        let library_path = library.filter(|p| !p.as_os_str().is_empty());
        let search_paths: Vec<PathBuf> = search
            .map(|s| env::split_paths(&s).filter(|p| !p.as_os_str().is_empty()).collect())
            .unwrap_or_default();
        Self {
            library_path,
            search_paths,
        }
    }

    /// Add a directory to search
    pub fn add_search_path<P: Into<PathBuf>>(&mut self, path: P) {
        self.search_paths.push(path.into());
    }

    /// Resolve the library file to open
    ///
    /// An explicit path is returned as-is (the loader reports it if it does
    /// not exist). Otherwise the first search directory containing the
    /// platform library name wins.
    pub fn resolve_library_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.library_path {
            return Ok(path.clone());
        }

        let file_name = platform::default_library_name();
        self.search_paths
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| {
                BridgeError::invalid(format!(
                    "no library path configured and {} not found in {} search path(s); set {}",
                    file_name.to_string_lossy(),
                    self.search_paths.len(),
                    ENV_LIBRARY
                ))
            })
    }
}
