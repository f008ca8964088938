//! Process-wide launch status line.
//!
//! Every bootstrapper transition records `<app>: <state>` here, so the CLI
//! report and on-device diagnostics can show where the last launch stopped.

use std::sync::{Mutex, OnceLock};

use crate::types::BootstrapState;
use crate::BootError;

const IDLE_STATUS: &str = "launch: idle";

static LAUNCH_STATUS: OnceLock<Mutex<String>> = OnceLock::new();

fn store(line: String) {
    let cell = LAUNCH_STATUS.get_or_init(|| Mutex::new(IDLE_STATUS.to_string()));
    let mut guard = match cell.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = line;
}

/// Last recorded status, or `launch: idle` before any bootstrapper ran.
pub fn launch_status() -> String {
    match LAUNCH_STATUS.get() {
        Some(cell) => match cell.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        },
        None => IDLE_STATUS.to_string(),
    }
}

fn state_line(app: &str, state: BootstrapState) -> String {
    match state {
        BootstrapState::Requesting => format!("{app}: {state} (waiting for user)"),
        BootstrapState::Done => format!("{app}: {state} (native running)"),
        _ => format!("{app}: {state}"),
    }
}

pub(crate) fn record_state(app: &str, state: BootstrapState) {
    store(state_line(app, state));
}

pub(crate) fn record_failure(app: &str, err: &BootError) {
    store(format!("{app}: launch failed: {err}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_and_running_states_are_annotated() {
        assert_eq!(
            state_line("XrSceneModel", BootstrapState::Requesting),
            "XrSceneModel: requesting (waiting for user)"
        );
        assert_eq!(
            state_line("XrSceneModel", BootstrapState::Done),
            "XrSceneModel: done (native running)"
        );
        assert_eq!(
            state_line("XrSceneModel", BootstrapState::Terminated),
            "XrSceneModel: terminated"
        );
    }
}
