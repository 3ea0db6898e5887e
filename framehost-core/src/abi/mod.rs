//! framehost ABI module
//!
//! This module defines the ABI contract between:
//! - **Host**: `framehost-core`
//! - **Guest**: the loaded WASM module ("game/app")
//!
//! ## Imports (guest -> host)
//! Imported from module `"env"`.
//!
//! - `memory`: only when the guest does not define and export its own memory.
//!   The host then supplies one sized by `MemoryConfig` (256 / 512 pages by default).
//! - `console_log(ptr: i32, len: i32)`: UTF-8 text in guest memory.
//! - `gamepad_pressed(button: i32) -> i32`: 1 while the virtual button is held.
//!
//! ## Exports (host -> guest)
//! Required:
//! - `init(width: i32, height: i32)`
//! - `cls(color: i32)`
//! - `update()`
//! - `draw()`
//!
//! Optional:
//! - `memory`: guest-owned linear memory
//! - `alloc(len: i32) -> i32` and `load(ptr: i32, len: i32)`: together they let the
//!   host hand a resource from the virtual filesystem to the guest.
//!
//! The guest's internal state is opaque; the host only ever touches these names.

use wasmtime::{ExternType, Instance, MemoryType, Module, Store, TypedFunc};

/// Import module name used by the guest.
pub const IMPORT_MODULE: &str = "env";

/// Name of the linear memory, whether imported or exported.
pub const MEMORY: &str = "memory";

/// Guest export names (entrypoints).
pub mod guest_exports {
    pub const INIT: &str = "init";
    pub const CLS: &str = "cls";
    pub const UPDATE: &str = "update";
    pub const DRAW: &str = "draw";

    // Optional resource hand-off.
    pub const ALLOC: &str = "alloc";
    pub const LOAD: &str = "load";

    /// Every export a guest must provide.
    pub const REQUIRED: [&str; 4] = [INIT, CLS, UPDATE, DRAW];
}

/// Host import names provided to the guest under [`IMPORT_MODULE`].
pub mod host_imports {
    pub const CONSOLE_LOG: &str = "console_log";
    pub const GAMEPAD_PRESSED: &str = "gamepad_pressed";
}

/// Where the guest's linear memory comes from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MemoryOrigin {
    /// The guest defines and exports `memory`; the host binds to it.
    Exported,
    /// The guest imports `env.memory`; the host constructs it before instantiation.
    Provided,
}

/// The memory type a module imports as `env.memory`, if any.
pub fn imported_memory(module: &Module) -> Option<MemoryType> {
    module.imports().find_map(|import| {
        if import.module() != IMPORT_MODULE || import.name() != MEMORY {
            return None;
        }
        match import.ty() {
            ExternType::Memory(ty) => Some(ty),
            _ => None,
        }
    })
}

/// Whether a module exports a memory named `memory`.
pub fn exports_memory(module: &Module) -> bool {
    module
        .exports()
        .any(|export| export.name() == MEMORY && matches!(export.ty(), ExternType::Memory(_)))
}

/// Helpers for validating guest exports.
pub mod validate {
    use super::guest_exports;
    use wasmtime::{ExternType, Module};

    /// Validate that a compiled module exports every required entrypoint as a function.
    ///
    /// Checked before instantiation so a bad guest never runs its start function.
    pub fn required_exports_present(module: &Module) -> Result<(), MissingExport> {
        for name in guest_exports::REQUIRED {
            let found = module
                .exports()
                .any(|e| e.name() == name && matches!(e.ty(), ExternType::Func(_)));
            if !found {
                return Err(MissingExport(name));
            }
        }
        Ok(())
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MissingExport(pub &'static str);

    impl core::fmt::Display for MissingExport {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            write!(f, "guest is missing required export `{}`", self.0)
        }
    }

    impl std::error::Error for MissingExport {}
}

/// A guest's entrypoints resolved once after instantiation into typed functions.
#[derive(Clone)]
pub struct GuestEntrypoints {
    pub init: TypedFunc<(i32, i32), ()>,
    pub cls: TypedFunc<i32, ()>,
    pub update: TypedFunc<(), ()>,
    pub draw: TypedFunc<(), ()>,
    pub resources: Option<ResourceExports>,
}

/// Optional `alloc` + `load` pair. Only used when both are present.
#[derive(Clone)]
pub struct ResourceExports {
    pub alloc: TypedFunc<i32, i32>,
    pub load: TypedFunc<(i32, i32), ()>,
}

impl GuestEntrypoints {
    /// Resolve entrypoint exports from an instance, checking their signatures.
    pub fn resolve<T>(instance: &Instance, store: &mut Store<T>) -> Result<Self, wasmtime::Error> {
        let init = instance.get_typed_func::<(i32, i32), ()>(&mut *store, guest_exports::INIT)?;
        let cls = instance.get_typed_func::<i32, ()>(&mut *store, guest_exports::CLS)?;
        let update = instance.get_typed_func::<(), ()>(&mut *store, guest_exports::UPDATE)?;
        let draw = instance.get_typed_func::<(), ()>(&mut *store, guest_exports::DRAW)?;

        let alloc = instance
            .get_typed_func::<i32, i32>(&mut *store, guest_exports::ALLOC)
            .ok();
        let load = instance
            .get_typed_func::<(i32, i32), ()>(&mut *store, guest_exports::LOAD)
            .ok();
        let resources = match (alloc, load) {
            (Some(alloc), Some(load)) => Some(ResourceExports { alloc, load }),
            _ => None,
        };

        Ok(Self {
            init,
            cls,
            update,
            draw,
            resources,
        })
    }
}
