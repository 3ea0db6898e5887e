//! Host import definitions for the Wasmtime runtime.
//!
//! This module defines all the host functions imported by guest modules under the "env"
//! module, plus the host-provided `memory` when the guest asks for one.

use crate::{
    abi::{IMPORT_MODULE, MEMORY, host_imports},
    error::BridgeError,
    input,
    memory::MemoryView,
    state::{self, HostState, OutOfBoundsPolicy},
};

use wasmtime::{Caller, Linker, Memory, Store};

/// Define all host imports expected by guests under module `"env"`.
///
/// `memory` is only defined when the host supplies it. Must be called before
/// instantiating the module.
pub fn define_imports(
    linker: &mut Linker<HostState>,
    store: &Store<HostState>,
    memory: Option<Memory>,
) -> Result<(), anyhow::Error> {
    if let Some(memory) = memory {
        linker.define(store, IMPORT_MODULE, MEMORY, memory)?;
    }

    // --- System ---
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::CONSOLE_LOG,
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> wasmtime::Result<()> {
            match console_log(&mut caller, ptr, len) {
                Ok(()) => Ok(()),
                Err(err) => on_bridge_error(caller.data().out_of_bounds, err),
            }
        },
    )?;

    // --- Input ---
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::GAMEPAD_PRESSED,
        |caller: Caller<'_, HostState>, button: i32| -> i32 {
            input::gamepad_pressed(&caller.data().gamepad, button)
        },
    )?;

    Ok(())
}

/// Validate, decode and forward one guest log line.
fn console_log(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> Result<(), BridgeError> {
    let memory = state::caller_memory(caller).ok_or(BridgeError::MissingMemory)?;
    let hooks = caller.data().hooks.clone();

    let view = MemoryView::of(&memory, &*caller);
    let message = view.read_utf8(ptr, len)?;
    hooks.console_log(message);
    Ok(())
}

/// Decide whether a failed bridge call traps the guest.
///
/// Decode failures never trap: the line is dropped and the guest keeps running.
fn on_bridge_error(policy: OutOfBoundsPolicy, err: BridgeError) -> wasmtime::Result<()> {
    match (&err, policy) {
        (BridgeError::Decode { .. }, _) | (_, OutOfBoundsPolicy::Log) => {
            tracing::warn!(error = %err, "dropping guest console_log call");
            Ok(())
        }
        (_, OutOfBoundsPolicy::Trap) => Err(wasmtime::Error::new(err)),
    }
}
