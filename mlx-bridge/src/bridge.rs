//! Bridge façade
//!
//! [`Bridge`] owns at most one [`NativeLibrary`] for its whole lifetime.
//! `initialize` performs the check-and-set under a write lock, so concurrent
//! first calls open the library once. Forwarding calls only hold the read
//! lock long enough to clone the `Arc`; the native call itself runs unlocked
//! and blocks the calling thread until the engine returns.

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::loader::NativeLibrary;
use crate::options::GenerateOptions;
use crate::platform;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Version reported when the library cannot tell us its own
pub const FALLBACK_VERSION: &str = "0.1.0";

/// Context object holding the loaded library and its entry points
#[derive(Debug, Default)]
pub struct Bridge {
    library: RwLock<Option<Arc<NativeLibrary>>>,
}

impl Bridge {
    /// An uninitialized bridge
    pub fn new() -> Self {
        Self::default()
    }

    /// A bridge that is already initialized with `library`
    pub fn with_library(library: NativeLibrary) -> Self {
        Self {
            library: RwLock::new(Some(Arc::new(library))),
        }
    }

    /// Open the inference library at `path`
    ///
    /// Idempotent: once a library is loaded, later calls succeed immediately
    /// without reopening anything, even when `path` differs. On failure the
    /// bridge stays uninitialized and the call may be retried.
    pub fn initialize<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut slot = self.library.write();

        if let Some(existing) = slot.as_ref() {
            if existing.path() != path {
                log::warn!(
                    "initialize({}) ignored: already initialized with {}",
                    path.display(),
                    existing.path().display()
                );
            }
            return Ok(());
        }

        let library = NativeLibrary::open(path)?;
        *slot = Some(Arc::new(library));
        Ok(())
    }

    /// Initialize from a [`BridgeConfig`] (explicit path or search directories)
    pub fn initialize_with_config(&self, config: &BridgeConfig) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }
        let path = config.resolve_library_path()?;
        self.initialize(path)
    }

    /// Whether a library is currently loaded
    pub fn is_initialized(&self) -> bool {
        self.library.read().is_some()
    }

    /// Path of the loaded library, if any
    pub fn library_path(&self) -> Option<PathBuf> {
        self.library.read().as_ref().map(|lib| lib.path().to_path_buf())
    }

    /// Fail with [`BridgeError::NotInitialized`] unless a library is loaded
    pub fn require_initialized(&self, operation: &'static str) -> Result<()> {
        self.library(operation).map(|_| ())
    }

    fn library(&self, operation: &'static str) -> Result<Arc<NativeLibrary>> {
        self.library
            .read()
            .clone()
            .ok_or(BridgeError::NotInitialized { operation })
    }

    /// Load a model by HuggingFace id or local path
    ///
    /// Returns the engine's handle unchanged.
    pub fn load_model(&self, model_id: &str) -> Result<i32> {
        let library = self.library("loadModel")?;
        library.load_model(model_id)
    }

    /// Unload a model
    ///
    /// Handles are forwarded as-is. When the library lacks
    /// `node_mlx_unload_model` this is a no-op that only logs a warning; the
    /// model stays resident in the engine.
    pub fn unload_model(&self, handle: i32) -> Result<()> {
        let library = self.library("unloadModel")?;
        if !library.unload_model(handle) {
            log::warn!(
                "unloadModel({}) skipped: {} does not export node_mlx_unload_model",
                handle,
                library.path().display()
            );
        }
        Ok(())
    }

    /// Generate text and return the engine's JSON result verbatim
    ///
    /// Blocks the calling thread for the whole generation. There is no
    /// timeout or cancellation.
    pub fn generate(&self, handle: i32, prompt: &str, options: &GenerateOptions) -> Result<String> {
        let library = self.library("generate")?;
        library.generate(handle, prompt, options)
    }

    /// Whether MLX can run here
    ///
    /// Asks the engine when it exports `node_mlx_is_available`, otherwise
    /// falls back to the static platform check. Works before `initialize`.
    pub fn is_available(&self) -> bool {
        let library = self.library.read().clone();
        library
            .and_then(|lib| lib.is_available())
            .unwrap_or_else(platform::is_supported_platform)
    }

    /// Engine version, or [`FALLBACK_VERSION`]; never fails
    pub fn get_version(&self) -> String {
        let library = self.library.read().clone();
        library
            .and_then(|lib| lib.version())
            .unwrap_or_else(|| FALLBACK_VERSION.to_string())
    }
}
