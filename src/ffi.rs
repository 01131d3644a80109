//! C ABI exports
//!
//! One process-wide `SessionManager` driven from a dedicated multi-thread
//! runtime. Every export blocks until its operation finishes and returns a
//! heap string the caller must release with `FreeString`.
//!
//! String arguments must be null or valid NUL-terminated strings that stay
//! alive for the duration of the call.

#![allow(non_snake_case)]
// The C ABI contract above covers every pointer argument; hosts cannot call `unsafe fn`
#![allow(clippy::not_unsafe_ptr_arg_deref)]

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::OnceLock;

use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::commands;
use crate::config::{BridgeConfig, ConfigStorage};
use crate::session::SessionManager;

struct Bridge {
    runtime: Runtime,
    manager: SessionManager,
}

static BRIDGE: OnceLock<Result<Bridge, String>> = OnceLock::new();

fn load_config(runtime: &Runtime) -> BridgeConfig {
    let storage = match ConfigStorage::new() {
        Ok(storage) => storage,
        Err(e) => {
            warn!("No config location, using defaults: {}", e);
            return BridgeConfig::default();
        }
    };
    match runtime.block_on(storage.load()) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load {}: {}", storage.path().display(), e);
            BridgeConfig::default()
        }
    }
}

fn bridge() -> Result<&'static Bridge, String> {
    BRIDGE
        .get_or_init(|| {
            crate::init_logging();
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .thread_name("sftp-bridge")
                .build()
                .map_err(|e| format!("failed to start runtime: {}", e))?;
            let config = load_config(&runtime);
            info!("sftp-bridge {} ready", env!("CARGO_PKG_VERSION"));
            Ok(Bridge {
                runtime,
                manager: SessionManager::with_ssh(&config),
            })
        })
        .as_ref()
        .map_err(Clone::clone)
}

/// Run a command future against the global manager
fn run<F, Fut>(command: F) -> *mut c_char
where
    F: FnOnce(&'static SessionManager) -> Fut,
    Fut: std::future::Future<Output = String>,
{
    let output = match bridge() {
        Ok(bridge) => bridge.runtime.block_on(command(&bridge.manager)),
        Err(e) => commands::render_error(e),
    };
    return_string(output)
}

fn c_str_to_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: the caller passes a valid NUL-terminated string or null
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

fn return_string(s: String) -> *mut c_char {
    let bytes: Vec<u8> = s.into_bytes().into_iter().filter(|b| *b != 0).collect();
    match CString::new(bytes) {
        Ok(c) => c.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

#[no_mangle]
pub extern "C" fn SSHLogin(
    url: *const c_char,
    port: *const c_char,
    username: *const c_char,
    password: *const c_char,
) -> *mut c_char {
    let host = c_str_to_string(url);
    let port = c_str_to_string(port);
    let username = c_str_to_string(username);
    let password = c_str_to_string(password);
    run(|manager| async move { commands::login(manager, &host, &port, &username, &password).await })
}

#[no_mangle]
pub extern "C" fn SftpList(path: *const c_char) -> *mut c_char {
    let path = c_str_to_string(path);
    run(|manager| async move { commands::list(manager, &path).await })
}

#[no_mangle]
pub extern "C" fn SftpDownload(path: *const c_char, local: *const c_char) -> *mut c_char {
    let remote = c_str_to_string(path);
    let local = c_str_to_string(local);
    run(|manager| async move { commands::download(manager, &remote, &local).await })
}

#[no_mangle]
pub extern "C" fn SftpUpload(path: *const c_char, local: *const c_char) -> *mut c_char {
    let remote = c_str_to_string(path);
    let local = c_str_to_string(local);
    run(|manager| async move { commands::upload(manager, &remote, &local).await })
}

#[no_mangle]
pub extern "C" fn SftpDelete(path: *const c_char) -> *mut c_char {
    let path = c_str_to_string(path);
    run(|manager| async move { commands::delete(manager, &path).await })
}

#[no_mangle]
pub extern "C" fn SftpRename(path: *const c_char, new_name: *const c_char) -> *mut c_char {
    let old_path = c_str_to_string(path);
    let new_name = c_str_to_string(new_name);
    run(|manager| async move { commands::rename(manager, &old_path, &new_name).await })
}

#[no_mangle]
pub extern "C" fn Disconnect() -> *mut c_char {
    run(|manager| async move { commands::disconnect(manager).await })
}

/// Close the connection and forget the stored login
#[no_mangle]
pub extern "C" fn Shutdown() -> *mut c_char {
    run(|manager| async move { commands::shutdown(manager).await })
}

/// Release a string returned by any export.
///
/// `ptr` must be null or a pointer returned by an export of this library,
/// released at most once.
#[no_mangle]
pub extern "C" fn FreeString(ptr: *mut c_char) {
    if !ptr.is_null() {
        // SAFETY: `ptr` came from `CString::into_raw` in `return_string`
        unsafe {
            drop(CString::from_raw(ptr));
        }
    }
}
