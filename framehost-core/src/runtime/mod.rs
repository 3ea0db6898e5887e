//! Wasmtime-backed runtime glue for framehost-core.
//!
//! - `runtime`: Engine/Store/Linker setup and instantiation into a [`Guest`].
//! - `imports`: the `"env"` host imports (the guest's import namespace).

pub mod imports;
#[allow(clippy::module_inception)]
pub mod runtime;

pub use runtime::{Guest, WasmtimeRuntime};
