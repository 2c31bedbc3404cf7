//! MLX Bridge - runtime bindings to the node_mlx inference library
//!
//! The inference engine is built separately as a shared library exporting a
//! small C API (`node_mlx_load_model`, `node_mlx_generate`, ...). This crate
//! opens that library at runtime, resolves its entry points once and exposes
//! them through safe, typed calls.
//!
//! # Entry points
//!
//! ```text
//! node_mlx_load_model    (const char*) -> int32          mandatory
//! node_mlx_generate      (int32, const char*, int32,
//!                         float, float) -> char*         mandatory
//! node_mlx_free_string   (char*) -> void                 mandatory
//! node_mlx_unload_model  (int32) -> void                 optional: no-op
//! node_mlx_is_available  () -> bool                      optional: platform check
//! node_mlx_version       () -> char*                     optional: "0.1.0"
//! ```
//!
//! Every `char*` the engine returns is copied and released with
//! `node_mlx_free_string` before the call returns.
//!
//! # Example
//! ```no_run
//! use mlx_bridge::GenerateOptions;
//!
//! mlx_bridge::initialize("build/libnode_mlx.dylib")?;
//! let handle = mlx_bridge::load_model("mlx-community/Llama-3.2-1B-Instruct-4bit")?;
//! let json = mlx_bridge::generate(handle, "Hello", &GenerateOptions::default().with_max_tokens(32))?;
//! println!("{}", json);
//! mlx_bridge::unload_model(handle)?;
//! # Ok::<(), mlx_bridge::BridgeError>(())
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod ffi;
pub mod host;
pub mod loader;
pub mod marshal;
pub mod options;
pub mod platform;
pub mod result;

use once_cell::sync::Lazy;
use std::path::Path;

pub use bridge::{Bridge, FALLBACK_VERSION};
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use ffi::EntryPoints;
pub use loader::NativeLibrary;
pub use marshal::NativeString;
pub use options::GenerateOptions;
pub use result::GenerationResult;

/// Process-wide bridge shared by the free functions below
static GLOBAL_BRIDGE: Lazy<Bridge> = Lazy::new(Bridge::new);

/// The process-wide bridge
pub fn global() -> &'static Bridge {
    &GLOBAL_BRIDGE
}

/// Open the inference library for the whole process (see [`Bridge::initialize`])
pub fn initialize<P: AsRef<Path>>(path: P) -> Result<()> {
    global().initialize(path)
}

/// Open the library located through `MLX_BRIDGE_LIBRARY` / `MLX_BRIDGE_SEARCH_PATH`
pub fn initialize_from_env() -> Result<()> {
    global().initialize_with_config(&BridgeConfig::from_env())
}

pub fn is_initialized() -> bool {
    global().is_initialized()
}

pub fn load_model(model_id: &str) -> Result<i32> {
    global().load_model(model_id)
}

pub fn unload_model(handle: i32) -> Result<()> {
    global().unload_model(handle)
}

pub fn generate(handle: i32, prompt: &str, options: &GenerateOptions) -> Result<String> {
    global().generate(handle, prompt, options)
}

pub fn is_available() -> bool {
    global().is_available()
}

pub fn get_version() -> String {
    global().get_version()
}
