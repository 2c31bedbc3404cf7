//! Mock node_mlx engine
//!
//! Exports the same C ABI as the real MLX library so the bridge can be
//! exercised without Apple Silicon. Every string handed out is counted, as is
//! every string released, so tests can check the ownership protocol.
//!
//! Accounting is per thread: the bridge calls the engine synchronously on the
//! caller's thread, which keeps parallel tests from seeing each other's calls.
//!
//! Model ids:
//! - ids starting with `bad` are rejected with -1
//! - `good-id` always loads as handle 3
//! - anything else gets a fresh handle starting at 10

use serde_json::json;
use std::cell::{Cell, RefCell};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_float};

pub const MOCK_VERSION: &str = "mock-1.2.3";
pub const GOOD_MODEL_HANDLE: i32 = 3;

/// Snapshot of the engine's bookkeeping for the calling thread
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MockStats {
    pub load_calls: u32,
    pub unload_calls: u32,
    pub generate_calls: u32,
    pub strings_allocated: u32,
    pub strings_freed: u32,
    pub last_unloaded: i32,
    pub last_handle: i32,
    pub last_max_tokens: i32,
    pub last_temperature: c_float,
    pub last_top_p: c_float,
}

thread_local! {
    static STATS: Cell<MockStats> = Cell::new(MockStats::default());
    static NEXT_HANDLE: Cell<i32> = const { Cell::new(10) };
    static GENERATE_RETURNS_NULL: Cell<bool> = const { Cell::new(false) };
    static LAST_PROMPT: RefCell<String> = const { RefCell::new(String::new()) };
}

fn update(f: impl FnOnce(&mut MockStats)) {
    STATS.with(|cell| {
        let mut stats = cell.get();
        f(&mut stats);
        cell.set(stats);
    });
}

fn hand_out(s: String) -> *mut c_char {
    // serde_json output and the version constant never contain NUL
    match CString::new(s) {
        Ok(c) => {
            update(|st| st.strings_allocated += 1);
            c.into_raw()
        }
        Err(_) => std::ptr::null_mut(),
    }
}

/// # Safety
/// `model_id` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn node_mlx_load_model(model_id: *const c_char) -> i32 {
    update(|st| st.load_calls += 1);
    if model_id.is_null() {
        return -1;
    }
    let id = CStr::from_ptr(model_id).to_string_lossy();
    if id.starts_with("bad") {
        -1
    } else if id == "good-id" {
        GOOD_MODEL_HANDLE
    } else {
        NEXT_HANDLE.with(|h| {
            let handle = h.get();
            h.set(handle + 1);
            handle
        })
    }
}

#[no_mangle]
pub extern "C" fn node_mlx_unload_model(handle: i32) {
    update(|st| {
        st.unload_calls += 1;
        st.last_unloaded = handle;
    });
}

/// # Safety
/// `prompt` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn node_mlx_generate(
    handle: i32,
    prompt: *const c_char,
    max_tokens: i32,
    temperature: c_float,
    top_p: c_float,
) -> *mut c_char {
    update(|st| {
        st.generate_calls += 1;
        st.last_handle = handle;
        st.last_max_tokens = max_tokens;
        st.last_temperature = temperature;
        st.last_top_p = top_p;
    });

    let prompt = if prompt.is_null() {
        String::new()
    } else {
        CStr::from_ptr(prompt).to_string_lossy().into_owned()
    };
    LAST_PROMPT.with(|p| *p.borrow_mut() = prompt.clone());

    if GENERATE_RETURNS_NULL.with(Cell::get) {
        return std::ptr::null_mut();
    }

    let payload = if handle <= 0 {
        json!({
            "success": false,
            "text": "",
            "tokenCount": 0,
            "tokensPerSecond": 0.0,
            "error": format!("Invalid model handle: {}", handle),
        })
    } else {
        let text = format!("echo: {}", prompt);
        let token_count = text.split_whitespace().count().min(max_tokens.max(0) as usize);
        json!({
            "success": true,
            "text": text,
            "tokenCount": token_count,
            "tokensPerSecond": 100.0,
        })
    };
    hand_out(payload.to_string())
}

/// # Safety
/// `s` must be null or a pointer previously returned by this library and not
/// yet freed.
#[no_mangle]
pub unsafe extern "C" fn node_mlx_free_string(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    update(|st| st.strings_freed += 1);
    drop(CString::from_raw(s));
}

#[no_mangle]
pub extern "C" fn node_mlx_is_available() -> bool {
    true
}

#[no_mangle]
pub extern "C" fn node_mlx_version() -> *mut c_char {
    hand_out(MOCK_VERSION.to_string())
}

// ---------------------------------------------------------------------------
// Test controls (exported so dlopen-based tests can reach them too)
// ---------------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn mock_engine_stats() -> MockStats {
    STATS.with(Cell::get)
}

#[no_mangle]
pub extern "C" fn mock_engine_reset() {
    STATS.with(|s| s.set(MockStats::default()));
    NEXT_HANDLE.with(|h| h.set(10));
    GENERATE_RETURNS_NULL.with(|g| g.set(false));
    LAST_PROMPT.with(|p| p.borrow_mut().clear());
}

/// Make `node_mlx_generate` return null on this thread
#[no_mangle]
pub extern "C" fn mock_engine_set_generate_null(enabled: bool) {
    GENERATE_RETURNS_NULL.with(|g| g.set(enabled));
}

/// Last prompt seen by `node_mlx_generate` on this thread
pub fn last_prompt() -> String {
    LAST_PROMPT.with(|p| p.borrow().clone())
}
