//! Hook through which native code asks the host to close its window.
//!
//! The platform glue registers a handler once its activity exists; native
//! libraries reach it through the C export in `xrgate-platform`.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::{debug, warn};

type FinishHandler = Arc<dyn Fn() + Send + Sync>;

static FINISH_HANDLER: OnceLock<Mutex<Option<FinishHandler>>> = OnceLock::new();

fn lock_handler() -> MutexGuard<'static, Option<FinishHandler>> {
    let cell = FINISH_HANDLER.get_or_init(|| Mutex::new(None));
    match cell.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Install the handler, replacing any previous one.
pub fn register_finish_handler(handler: impl Fn() + Send + Sync + 'static) {
    *lock_handler() = Some(Arc::new(handler));
}

pub fn clear_finish_handler() {
    *lock_handler() = None;
}

/// Invoke the registered handler. Returns `false` when none is installed.
///
/// The handler runs without the slot locked and may call back into this
/// module.
pub fn request_native_finish() -> bool {
    let handler = lock_handler().clone();
    match handler {
        Some(handler) => {
            debug!("native code requested finish");
            handler();
            true
        }
        None => {
            warn!("native finish requested but no host handler is registered");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Single test: the handler slot is process-global.
    #[test]
    fn handler_lifecycle() {
        clear_finish_handler();
        assert!(!request_native_finish());

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        register_finish_handler(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert!(request_native_finish());
        assert!(request_native_finish());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        clear_finish_handler();
        assert!(!request_native_finish());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // a handler that unregisters itself must not deadlock
        let seen = calls.clone();
        register_finish_handler(move || {
            seen.fetch_add(1, Ordering::SeqCst);
            clear_finish_handler();
        });
        assert!(request_native_finish());
        assert!(!request_native_finish());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
