//! Host-facing call surface
//!
//! Embedders (a JS addon, a Python extension, an RPC shim) receive loosely
//! typed arguments. [`dispatch`] validates their shape, converts them to the
//! native types and forwards to a [`Bridge`]. Host values are modelled as
//! `serde_json::Value`:
//!
//! | Host value | Native type |
//! |---|---|
//! | string | `const char*` (UTF-8, no interior NUL) |
//! | number | `int32_t` (truncated) or `float` |
//! | object | generate options |

use crate::bridge::Bridge;
use crate::error::{BridgeError, Result};
use crate::options::GenerateOptions;
use serde_json::Value;

/// Method names exposed to the host, in registration order
pub const EXPORTS: [&str; 7] = [
    "initialize",
    "isInitialized",
    "loadModel",
    "unloadModel",
    "generate",
    "isAvailable",
    "getVersion",
];

const GENERATE_USAGE: &str = "Usage: generate(handle, prompt, options?)";

/// Invoke `method` on `bridge` with host arguments
///
/// Forwarding methods check initialization before looking at their
/// arguments, so an uninitialized bridge always reports `NotInitialized`.
pub fn dispatch(bridge: &Bridge, method: &str, args: &[Value]) -> Result<Value> {
    match method {
        "initialize" => {
            let path = string_arg(args, 0, "dylibPath argument required")?;
            bridge.initialize(path)?;
            Ok(Value::Bool(true))
        }
        "isInitialized" => Ok(Value::Bool(bridge.is_initialized())),
        "loadModel" => {
            bridge.require_initialized("loadModel")?;
            let model_id = string_arg(args, 0, "Model ID string required")?;
            Ok(Value::from(bridge.load_model(model_id)?))
        }
        "unloadModel" => {
            bridge.require_initialized("unloadModel")?;
            let handle = int32_arg(args, 0, "Model handle number required")?;
            bridge.unload_model(handle)?;
            Ok(Value::Null)
        }
        "generate" => {
            bridge.require_initialized("generate")?;
            let handle = int32_arg(args, 0, GENERATE_USAGE)?;
            let prompt = string_arg(args, 1, GENERATE_USAGE)?;
            let options = GenerateOptions::from_value(args.get(2))?;
            Ok(Value::String(bridge.generate(handle, prompt, &options)?))
        }
        "isAvailable" => Ok(Value::Bool(bridge.is_available())),
        "getVersion" => Ok(Value::String(bridge.get_version())),
        other => Err(BridgeError::invalid(format!("unknown method: {}", other))),
    }
}

fn string_arg<'a>(args: &'a [Value], index: usize, usage: &str) -> Result<&'a str> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| BridgeError::invalid(usage))
}

fn int32_arg(args: &[Value], index: usize, usage: &str) -> Result<i32> {
    args.get(index)
        .and_then(Value::as_f64)
        .map(|n| n as i32)
        .ok_or_else(|| BridgeError::invalid(usage))
}
