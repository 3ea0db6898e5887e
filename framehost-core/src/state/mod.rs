//! Host-side state stored in the wasmtime `Store`.
//!
//! Import closures receive this through `Caller::data()`. It is created once per guest
//! by the bridge and lives exactly as long as the store.

use crate::hooks::HostHooks;
use crate::input::VirtualGamepad;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use wasmtime::{Caller, Extern, Memory, StoreLimits, StoreLimitsBuilder};

/// What a host import does when the guest passes a range outside its memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfBoundsPolicy {
    /// Fail the guest call with a trap.
    #[default]
    Trap,
    /// Emit a warning and return to the guest as if the call were a no-op.
    Log,
}

pub struct HostState {
    pub hooks: Arc<dyn HostHooks>,
    pub gamepad: Arc<VirtualGamepad>,

    /// Linear memory, once known. Host-provided memory is set before instantiation,
    /// guest-exported memory right after.
    pub memory: Option<Memory>,

    pub out_of_bounds: OutOfBoundsPolicy,
    pub limits: StoreLimits,
}

impl HostState {
    pub fn new(
        hooks: Arc<dyn HostHooks>,
        gamepad: Arc<VirtualGamepad>,
        out_of_bounds: OutOfBoundsPolicy,
        max_memory_bytes: usize,
    ) -> Self {
        Self {
            hooks,
            gamepad,
            memory: None,
            out_of_bounds,
            limits: StoreLimitsBuilder::new()
                .memory_size(max_memory_bytes)
                .build(),
        }
    }
}

/// The memory visible to a host call.
///
/// Falls back to the caller's `memory` export, which covers calls made from the guest's
/// start function before the instance has been registered.
pub fn caller_memory(caller: &mut Caller<'_, HostState>) -> Option<Memory> {
    caller.data().memory.or_else(|| {
        caller
            .get_export(crate::abi::MEMORY)
            .and_then(Extern::into_memory)
    })
}
