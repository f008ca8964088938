//! Platform hosts for the xrgate bootstrapper.
//!
//! - `dummy`: scripted host, recording loader and entry for simulation and
//!   tests.
//! - [`dylib`]: `libloading`-backed loader and entry for desktop runs.
//! - `android`: JNI glue exported to the Java launcher activity.

use std::ffi::c_int;

mod dummy;
pub mod dylib;
mod slot;
mod symbols;

#[cfg(target_os = "android")]
pub mod android;

pub use dummy::{run_scripted, RecordingEntry, RecordingLoader, ScriptedHost};
pub use dylib::{library_file_name, DylibEntry, DylibLoader};

/// Called by native application code to close its hosting window.
///
/// Returns `0` when a host handler ran, `-1` when no host is attached.
#[no_mangle]
pub extern "C" fn xrgate_native_finish() -> c_int {
    if xrgate_core::request_native_finish() {
        0
    } else {
        -1
    }
}
