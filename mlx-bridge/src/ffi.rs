//! Low-level FFI bindings to the node_mlx C API
//!
//! All function signatures match `node_mlx.h` exactly. Nothing in here is
//! safe to call directly; go through the typed wrappers in [`crate::marshal`].

use std::os::raw::{c_char, c_float};

/// `int32_t node_mlx_load_model(const char* model_id)`
///
/// Returns a model handle (>0) on success, negative on error.
pub type LoadModelFn = unsafe extern "C" fn(model_id: *const c_char) -> i32;

/// `void node_mlx_unload_model(int32_t handle)`
pub type UnloadModelFn = unsafe extern "C" fn(handle: i32);

/// `char* node_mlx_generate(int32_t, const char*, int32_t, float, float)`
///
/// Returns a JSON string owned by the library, or null.
pub type GenerateFn = unsafe extern "C" fn(
    handle: i32,
    prompt: *const c_char,
    max_tokens: i32,
    temperature: c_float,
    top_p: c_float,
) -> *mut c_char;

/// `void node_mlx_free_string(char* str)`
pub type FreeStringFn = unsafe extern "C" fn(s: *mut c_char);

/// `bool node_mlx_is_available(void)`
pub type IsAvailableFn = unsafe extern "C" fn() -> bool;

/// `char* node_mlx_version(void)` - caller frees with `node_mlx_free_string`
pub type GetVersionFn = unsafe extern "C" fn() -> *mut c_char;

// Exported symbol names (NUL-terminated for libloading)
pub const SYM_LOAD_MODEL: &[u8] = b"node_mlx_load_model\0";
pub const SYM_UNLOAD_MODEL: &[u8] = b"node_mlx_unload_model\0";
pub const SYM_GENERATE: &[u8] = b"node_mlx_generate\0";
pub const SYM_FREE_STRING: &[u8] = b"node_mlx_free_string\0";
pub const SYM_IS_AVAILABLE: &[u8] = b"node_mlx_is_available\0";
pub const SYM_GET_VERSION: &[u8] = b"node_mlx_version\0";

/// Human-readable symbol name (without the trailing NUL)
pub fn symbol_name(symbol: &[u8]) -> &str {
    let bytes = symbol.strip_suffix(b"\0").unwrap_or(symbol);
    std::str::from_utf8(bytes).unwrap_or("<invalid symbol>")
}

/// Entry points resolved from the inference library.
///
/// Built once at initialization and immutable afterwards. The three
/// mandatory entry points are plain function pointers; the optional ones
/// are `None` when the library does not export them.
///
/// The table is neither `Clone` nor `Copy` and its pointers are private: it
/// only becomes callable inside a [`crate::NativeLibrary`], which keeps the
/// library that owns the code mapped. It cannot be copied out of one:
///
/// ```compile_fail
/// use mlx_bridge::{EntryPoints, NativeLibrary};
///
/// fn escape(library: NativeLibrary) -> EntryPoints {
///     *library.entry_points()
/// }
/// ```
pub struct EntryPoints {
    pub(crate) load_model: LoadModelFn,
    pub(crate) generate: GenerateFn,
    pub(crate) free_string: FreeStringFn,
    pub(crate) unload_model: Option<UnloadModelFn>,
    pub(crate) is_available: Option<IsAvailableFn>,
    pub(crate) get_version: Option<GetVersionFn>,
}

impl EntryPoints {
    /// Table with only the mandatory entry points
    ///
    /// Building a table from raw pointers requires `unsafe`:
    ///
    /// ```compile_fail
    /// use mlx_bridge::EntryPoints;
    /// use mock_engine::{node_mlx_free_string, node_mlx_generate, node_mlx_load_model};
    ///
    /// let table = EntryPoints::mandatory(node_mlx_load_model, node_mlx_generate, node_mlx_free_string);
    /// ```
    ///
    /// # Safety
    /// Every pointer must implement the matching `node_mlx_*` contract from
    /// `node_mlx.h`, `free_string` must release exactly the strings returned
    /// by `generate` and `get_version`, and all of them must stay callable for
    /// as long as the table (or a [`crate::NativeLibrary`] built from it)
    /// exists. Function items compiled into the process always qualify.
    pub unsafe fn mandatory(
        load_model: LoadModelFn,
        generate: GenerateFn,
        free_string: FreeStringFn,
    ) -> Self {
        Self {
            load_model,
            generate,
            free_string,
            unload_model: None,
            is_available: None,
            get_version: None,
        }
    }

    /// # Safety
    /// Same contract as [`EntryPoints::mandatory`].
    pub unsafe fn with_unload_model(mut self, f: UnloadModelFn) -> Self {
        self.unload_model = Some(f);
        self
    }

    /// # Safety
    /// Same contract as [`EntryPoints::mandatory`].
    pub unsafe fn with_is_available(mut self, f: IsAvailableFn) -> Self {
        self.is_available = Some(f);
        self
    }

    /// # Safety
    /// Same contract as [`EntryPoints::mandatory`]; the returned string is
    /// released with this table's `free_string`.
    pub unsafe fn with_get_version(mut self, f: GetVersionFn) -> Self {
        self.get_version = Some(f);
        self
    }

    /// Names of optional entry points the library does not provide
    pub fn missing_optional(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.unload_model.is_none() {
            missing.push(symbol_name(SYM_UNLOAD_MODEL));
        }
        if self.is_available.is_none() {
            missing.push(symbol_name(SYM_IS_AVAILABLE));
        }
        if self.get_version.is_none() {
            missing.push(symbol_name(SYM_GET_VERSION));
        }
        missing
    }
}

impl std::fmt::Debug for EntryPoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryPoints")
            .field("unload_model", &self.unload_model.is_some())
            .field("is_available", &self.is_available.is_some())
            .field("get_version", &self.get_version.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_name_strips_nul() {
        assert_eq!(symbol_name(SYM_LOAD_MODEL), "node_mlx_load_model");
        assert_eq!(symbol_name(SYM_GET_VERSION), "node_mlx_version");
    }
}
