//! Static platform checks
//!
//! MLX only runs on Apple Silicon macOS. When the library does not export
//! `node_mlx_is_available` (or has not been loaded at all) the bridge answers
//! availability from the compile target alone.

/// Base name of the inference library, without platform prefix/suffix
pub const LIBRARY_BASE_NAME: &str = "node_mlx";

/// Whether this process runs on the hardware/OS combination MLX targets
pub fn is_supported_platform() -> bool {
    cfg!(all(target_os = "macos", target_arch = "aarch64"))
}

/// Platform-specific library file name (`libnode_mlx.dylib` on macOS)
pub fn default_library_name() -> std::ffi::OsString {
    libloading::library_filename(LIBRARY_BASE_NAME)
}
