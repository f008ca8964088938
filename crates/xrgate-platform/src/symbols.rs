//! Optional C symbols a native application library may export.
//!
//! - `int xrgate_main(void)`: native entry point, `0` on success.
//! - `const char *xrgate_dump_state(void)`: NUL-terminated diagnostic text
//!   owned by the library.

use std::ffi::{c_char, c_int, CStr};

use libloading::{Library, Symbol};
use tracing::debug;
use xrgate_core::{BootError, BootResult};

const ENTRY_SYMBOL: &[u8] = b"xrgate_main\0";
const DUMP_SYMBOL: &[u8] = b"xrgate_dump_state\0";

pub(crate) fn call_entry(library: &Library, name: &str) -> BootResult<()> {
    let entry: Symbol<unsafe extern "C" fn() -> c_int> = unsafe { library.get(ENTRY_SYMBOL) }
        .map_err(|e| BootError::Native(format!("{name}: missing xrgate_main: {e}")))?;

    debug!("calling xrgate_main in {name}");
    let code = unsafe { entry() };
    if code != 0 {
        return Err(BootError::Native(format!(
            "{name}: xrgate_main returned {code}"
        )));
    }
    Ok(())
}

pub(crate) fn read_dump(library: &Library) -> Option<String> {
    let dump: Symbol<unsafe extern "C" fn() -> *const c_char> =
        unsafe { library.get(DUMP_SYMBOL) }.ok()?;
    let ptr = unsafe { dump() };
    if ptr.is_null() {
        return None;
    }
    let text = unsafe { CStr::from_ptr(ptr) };
    Some(text.to_string_lossy().into_owned())
}
