/// Dynamic loading against the mock engine cdylib
///
/// Cargo builds mock-engine's cdylib next to this test binary (it is a
/// dev-dependency). When it cannot be found, e.g. on a cross-compiled run,
/// the tests print a warning and skip. Set MOCK_ENGINE_LIB or
/// PARTIAL_ENGINE_LIB to point at the artifacts explicitly.

use libloading::Library;
use mlx_bridge::{Bridge, BridgeError, GenerateOptions, NativeLibrary};
use mock_engine::{MockStats, GOOD_MODEL_HANDLE, MOCK_VERSION};
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::{Path, PathBuf};

/// Locate a fixture cdylib built by Cargo, e.g. `libmock_engine.so`
fn find_fixture(env_var: &str, lib_name: &str) -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(env_var) {
        return Some(PathBuf::from(path));
    }

    let exe = std::env::current_exe().ok()?;
    let deps_dir = exe.parent()?;
    let exact = format!("{}{}{}", DLL_PREFIX, lib_name, DLL_SUFFIX);
    let hashed = format!("{}{}-", DLL_PREFIX, lib_name);

    let found = [Some(deps_dir), deps_dir.parent()]
        .into_iter()
        .flatten()
        .filter_map(|dir| std::fs::read_dir(dir).ok())
        .flat_map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()))
        .find(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n == exact || (n.starts_with(&hashed) && n.ends_with(DLL_SUFFIX)))
                .unwrap_or(false)
        });
    found
}

macro_rules! fixture_or_skip {
    ($env_var:expr, $lib_name:expr) => {
        match find_fixture($env_var, $lib_name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "Warning: {} cdylib not found, skipping dynamic loading test",
                    $lib_name
                );
                return;
            }
        }
    };
}

macro_rules! mock_library_or_skip {
    () => {
        fixture_or_skip!("MOCK_ENGINE_LIB", "mock_engine")
    };
}

macro_rules! partial_library_or_skip {
    () => {
        fixture_or_skip!("PARTIAL_ENGINE_LIB", "partial_engine")
    };
}

/// Reads the mock's per-thread counters through a second handle on the same
/// library (the loader hands back the already-mapped image).
struct StatsProbe {
    library: Library,
}

impl StatsProbe {
    fn open(path: &Path) -> Self {
        let library = unsafe { Library::new(path) }.expect("reopen mock engine");
        let probe = Self { library };
        probe.reset();
        probe
    }

    fn reset(&self) {
        unsafe {
            let reset = self
                .library
                .get::<unsafe extern "C" fn()>(b"mock_engine_reset\0")
                .unwrap();
            reset();
        }
    }

    fn stats(&self) -> MockStats {
        unsafe {
            let stats = self
                .library
                .get::<unsafe extern "C" fn() -> MockStats>(b"mock_engine_stats\0")
                .unwrap();
            stats()
        }
    }
}

#[test]
fn test_open_mock_resolves_all_entry_points() {
    let path = mock_library_or_skip!();

    let library = NativeLibrary::open(&path).unwrap();
    assert!(library.is_dynamic());
    assert_eq!(library.path(), path.as_path());
    assert!(library.entry_points().missing_optional().is_empty());
}

#[test]
fn test_calls_go_through_the_owning_library() {
    let path = mock_library_or_skip!();
    let library = NativeLibrary::open(&path).unwrap();
    let probe = StatsProbe::open(&path);

    assert_eq!(library.load_model("good-id").unwrap(), GOOD_MODEL_HANDLE);
    assert_eq!(library.version().as_deref(), Some(MOCK_VERSION));
    assert_eq!(library.is_available(), Some(true));
    assert!(library.unload_model(GOOD_MODEL_HANDLE));

    let stats = probe.stats();
    assert_eq!(stats.load_calls, 1);
    assert_eq!(stats.last_unloaded, GOOD_MODEL_HANDLE);
    assert_eq!(stats.strings_allocated, stats.strings_freed);
}

#[test]
fn test_missing_free_string_is_named_alone() {
    let path = partial_library_or_skip!();

    let err = NativeLibrary::open(&path).unwrap_err();
    assert_eq!(
        err,
        BridgeError::MissingSymbols {
            symbols: vec!["node_mlx_free_string".to_string()],
        }
    );
    assert_eq!(err.to_string(), "Failed to load functions: node_mlx_free_string");
}

#[test]
fn test_missing_symbols_leaves_bridge_retryable() {
    let _ = env_logger::builder().is_test(true).try_init();
    let partial = partial_library_or_skip!();
    let mock = mock_library_or_skip!();
    let bridge = Bridge::new();

    let err = bridge.initialize(&partial).unwrap_err();
    assert_eq!(err.kind(), "MissingSymbols");
    assert!(!bridge.is_initialized());
    assert_eq!(bridge.library_path(), None);
    assert_eq!(
        bridge.load_model("good-id").unwrap_err(),
        BridgeError::NotInitialized { operation: "loadModel" }
    );

    // the same bad library fails the same way on retry
    assert_eq!(bridge.initialize(&partial).unwrap_err().kind(), "MissingSymbols");
    assert!(!bridge.is_initialized());

    bridge.initialize(&mock).unwrap();
    assert!(bridge.is_initialized());
    assert_eq!(bridge.library_path(), Some(mock));
    assert_eq!(bridge.load_model("good-id").unwrap(), GOOD_MODEL_HANDLE);
}

#[test]
fn test_initialize_twice_keeps_first_library() {
    let path = mock_library_or_skip!();
    let bridge = Bridge::new();

    bridge.initialize(&path).unwrap();
    bridge.initialize(&path).unwrap();
    bridge.initialize("/a/different/libnode_mlx.so").unwrap();

    assert!(bridge.is_initialized());
    assert_eq!(bridge.library_path(), Some(path));
}

#[test]
fn test_generate_through_dlopen_frees_exactly_once() {
    let path = mock_library_or_skip!();
    let bridge = Bridge::new();
    bridge.initialize(&path).unwrap();
    let probe = StatsProbe::open(&path);

    let handle = bridge.load_model("good-id").unwrap();
    assert_eq!(handle, GOOD_MODEL_HANDLE);

    let json = bridge
        .generate(handle, "hello", &GenerateOptions::default().with_max_tokens(10))
        .unwrap();
    assert!(json.contains("\"success\":true"));

    let stats = probe.stats();
    assert_eq!(stats.last_max_tokens, 10);
    assert_eq!(stats.last_temperature, 0.7);
    assert_eq!(stats.last_top_p, 0.9);
    assert_eq!(stats.strings_allocated, 1);
    assert_eq!(stats.strings_freed, 1);

    assert_eq!(bridge.get_version(), MOCK_VERSION);
    assert!(bridge.is_available());

    bridge.unload_model(handle).unwrap();
    let stats = probe.stats();
    assert_eq!(stats.unload_calls, 1);
    assert_eq!(stats.strings_allocated, 2);
    assert_eq!(stats.strings_freed, 2);
}
