//! Call marshalling across the native boundary
//!
//! Converts Rust arguments into C primitives, invokes the resolved entry
//! point and converts the result back. The wrappers live on
//! [`NativeLibrary`] so every call borrows the library that owns the code. Strings returned by the engine are
//! wrapped in [`NativeString`] the moment they cross the boundary, so they are
//! copied and released through `node_mlx_free_string` exactly once.

use crate::error::{BridgeError, Result};
use crate::ffi::FreeStringFn;
use crate::loader::NativeLibrary;
use crate::options::GenerateOptions;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr::NonNull;

/// A string allocated by the engine, released by the engine's free function
///
/// Dropping the guard frees the string. The raw pointer never leaves this
/// type, so it cannot be read after release or freed twice.
pub struct NativeString {
    ptr: NonNull<c_char>,
    free: FreeStringFn,
}

impl NativeString {
    /// Take ownership of a string returned by the engine
    ///
    /// Returns `None` for a null pointer; there is nothing to free then.
    ///
    /// # Safety
    /// `ptr` must be null or a NUL-terminated string that the engine expects
    /// to be released with `free`, and nobody else may release it.
    pub unsafe fn from_raw(ptr: *mut c_char, free: FreeStringFn) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr, free })
    }

    /// Copy the contents into a host-owned string (invalid UTF-8 is replaced)
    pub fn to_string_lossy(&self) -> String {
        // SAFETY: ptr is non-null, NUL-terminated and not yet freed (we own it)
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    /// Copy the contents and release the native allocation
    pub fn into_string(self) -> String {
        self.to_string_lossy()
    }
}

impl Drop for NativeString {
    fn drop(&mut self) {
        // SAFETY: ptr came from the engine paired with this free function and
        // Drop runs at most once.
        unsafe { (self.free)(self.ptr.as_ptr()) }
    }
}

impl std::fmt::Debug for NativeString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NativeString").field(&self.to_string_lossy()).finish()
    }
}

fn c_string(what: &str, value: &str) -> Result<CString> {
    if value.is_empty() {
        return Err(BridgeError::invalid(format!("{} must be a non-empty string", what)));
    }
    CString::new(value)
        .map_err(|e| BridgeError::invalid(format!("{} contains a NUL byte: {}", what, e)))
}

impl NativeLibrary {
    /// Forward to `node_mlx_load_model`
    ///
    /// The identifier is passed through untouched (HuggingFace id or local
    /// path, the engine decides). A negative return is the only failure signal.
    pub fn load_model(&self, model_id: &str) -> Result<i32> {
        let id = c_string("model id", model_id)?;

        // SAFETY: `id` is a valid NUL-terminated string that outlives the call
        let handle = unsafe { (self.entry_points().load_model)(id.as_ptr()) };

        if handle < 0 {
            return Err(BridgeError::ModelLoadRejected {
                model_id: model_id.to_string(),
                code: handle,
            });
        }

        log::debug!("Loaded model {} as handle {}", model_id, handle);
        Ok(handle)
    }

    /// Forward to `node_mlx_unload_model`
    ///
    /// Returns `false` when the library has no unload entry point and the call
    /// was skipped.
    pub fn unload_model(&self, handle: i32) -> bool {
        match self.entry_points().unload_model {
            Some(unload) => {
                // SAFETY: plain integer argument; handle validity is the engine's concern
                unsafe { unload(handle) };
                log::debug!("Unloaded model handle {}", handle);
                true
            }
            None => false,
        }
    }

    /// Forward to `node_mlx_generate` and return its JSON verbatim
    ///
    /// Blocks the calling thread until the engine finishes.
    pub fn generate(&self, handle: i32, prompt: &str, options: &GenerateOptions) -> Result<String> {
        options.validate()?;
        let prompt = c_string("prompt", prompt)?;

        log::debug!(
            "generate(handle={}, max_tokens={}, temperature={}, top_p={})",
            handle,
            options.max_tokens,
            options.temperature,
            options.top_p
        );

        // SAFETY: prompt outlives the call; the returned pointer is either
        // null or a string to be released with free_string, which the guard
        // takes over immediately.
        let table = self.entry_points();
        let result = unsafe {
            let raw = (table.generate)(
                handle,
                prompt.as_ptr(),
                options.max_tokens,
                options.temperature,
                options.top_p,
            );
            NativeString::from_raw(raw, table.free_string)
        };

        match result {
            Some(json) => Ok(json.into_string()),
            None => Err(BridgeError::GenerationFailure("Generate returned null".to_string())),
        }
    }

    /// Forward to `node_mlx_is_available`, if exported
    pub fn is_available(&self) -> Option<bool> {
        // SAFETY: no arguments, no ownership transfer
        self.entry_points().is_available.map(|f| unsafe { f() })
    }

    /// Forward to `node_mlx_version`, if exported and non-null
    pub fn version(&self) -> Option<String> {
        let table = self.entry_points();
        let get_version = table.get_version?;
        // SAFETY: the returned pointer is null or owned by us until freed
        let version = unsafe { NativeString::from_raw(get_version(), table.free_string) };
        version.map(NativeString::into_string)
    }
}
