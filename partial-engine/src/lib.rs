//! Incomplete node_mlx library
//!
//! Exports `node_mlx_load_model` and `node_mlx_generate` but no
//! `node_mlx_free_string`, so the loader must refuse it and name exactly the
//! one missing entry point. Never linked into a test binary: the symbols
//! would clash with mock-engine's.

use std::os::raw::{c_char, c_float};

#[no_mangle]
pub extern "C" fn node_mlx_load_model(_model_id: *const c_char) -> i32 {
    -1
}

#[no_mangle]
pub extern "C" fn node_mlx_generate(
    _handle: i32,
    _prompt: *const c_char,
    _max_tokens: i32,
    _temperature: c_float,
    _top_p: c_float,
) -> *mut c_char {
    std::ptr::null_mut()
}
