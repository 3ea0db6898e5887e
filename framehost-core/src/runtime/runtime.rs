//! Wasmtime-backed runtime glue for framehost-core.
//!
//! Responsibilities:
//! - Create a Wasmtime `Engine`/`Store`/`Linker` with feature flags enabled.
//! - Supply `env.memory` when the guest imports it, bind to the export otherwise.
//! - Instantiate a compiled `wasmtime::Module` into a [`Guest`].

use crate::abi::{self, GuestEntrypoints, MemoryOrigin};
use crate::error::LoadError;
use crate::memory::MemoryConfig;
use crate::state::HostState;

use wasmtime::{Linker, Memory, MemoryType, Module, Store};

/// Host-side runtime container, consumed by [`WasmtimeRuntime::instantiate`].
pub struct WasmtimeRuntime {
    pub engine: wasmtime::Engine,
    pub store: Store<HostState>,
    pub linker: Linker<HostState>,
}

impl WasmtimeRuntime {
    /// Create a new Wasmtime runtime with a broad set of WebAssembly features enabled.
    pub fn new(state: HostState) -> Result<Self, anyhow::Error> {
        let mut cfg = wasmtime::Config::new();

        // Broadly supported/expected features for "modern" Wasm modules.
        cfg.wasm_multi_value(true);
        cfg.wasm_bulk_memory(true);
        cfg.wasm_reference_types(true);
        cfg.wasm_simd(true);
        cfg.wasm_multi_memory(true);
        cfg.wasm_tail_call(true);

        let engine = wasmtime::Engine::new(&cfg)?;
        let mut store = Store::new(&engine, state);
        store.limiter(|state| &mut state.limits);
        let linker = Linker::new(&engine);

        Ok(Self {
            engine,
            store,
            linker,
        })
    }

    /// Build the import namespace for `module`: host memory if it wants one, plus all
    /// host callbacks. Returns where the memory will come from.
    pub fn define_imports(
        &mut self,
        module: &Module,
        memory: &MemoryConfig,
    ) -> Result<MemoryOrigin, LoadError> {
        let provided = match abi::imported_memory(module) {
            Some(declared) => {
                tracing::debug!(
                    declared_min = declared.minimum(),
                    declared_max = ?declared.maximum(),
                    initial_pages = memory.initial_pages,
                    maximum_pages = memory.maximum_pages,
                    "guest imports memory; constructing it"
                );
                let ty = provided_memory_type(&declared, memory)?;
                let mem = Memory::new(&mut self.store, ty)
                    .map_err(|e| LoadError::Instantiate(format!("cannot create memory: {e:#}")))?;
                self.store.data_mut().memory = Some(mem);
                Some(mem)
            }
            None if abi::exports_memory(module) => None,
            None => {
                return Err(LoadError::Instantiate(
                    "guest neither imports nor exports `memory`".into(),
                ));
            }
        };

        super::imports::define_imports(&mut self.linker, &self.store, provided)
            .map_err(|e| LoadError::Instantiate(format!("cannot define imports: {e:#}")))?;

        Ok(match provided {
            Some(_) => MemoryOrigin::Provided,
            None => MemoryOrigin::Exported,
        })
    }

    /// Instantiate a module and wire up exports/memory.
    ///
    /// Consumes the runtime; the linker is not reused.
    pub fn instantiate(mut self, module: &Module, origin: MemoryOrigin) -> Result<Guest, LoadError> {
        abi::validate::required_exports_present(module)
            .map_err(|e| LoadError::Instantiate(e.to_string()))?;

        let instance = self
            .linker
            .instantiate(&mut self.store, module)
            .map_err(|e| LoadError::Instantiate(format!("{e:#}")))?;

        let memory = match origin {
            MemoryOrigin::Provided => self.store.data().memory,
            MemoryOrigin::Exported => instance.get_memory(&mut self.store, abi::MEMORY),
        }
        .ok_or_else(|| LoadError::Instantiate("guest memory export is missing".into()))?;
        self.store.data_mut().memory = Some(memory);

        let entrypoints = GuestEntrypoints::resolve(&instance, &mut self.store)
            .map_err(|e| LoadError::Instantiate(format!("{e:#}")))?;

        tracing::info!(
            memory_origin = ?origin,
            memory_bytes = memory.data_size(&self.store),
            resource_exports = entrypoints.resources.is_some(),
            "guest instantiated"
        );

        Ok(Guest {
            store: self.store,
            entrypoints,
            memory,
            origin,
        })
    }
}

/// Bounds for host-provided memory: the configured size, narrowed to what the guest declares.
///
/// The maximum is the smaller of the configured and declared maximum. The initial size is
/// the configured size raised to the declared minimum and capped at that maximum.
fn provided_memory_type(declared: &MemoryType, memory: &MemoryConfig) -> Result<MemoryType, LoadError> {
    let clamp = |pages: u64| u32::try_from(pages).unwrap_or(u32::MAX);
    let declared_min = clamp(declared.minimum());
    let maximum = declared
        .maximum()
        .map_or(memory.maximum_pages, |max| memory.maximum_pages.min(clamp(max)));

    if declared_min > maximum {
        return Err(LoadError::Instantiate(format!(
            "guest memory import needs {declared_min} pages, which exceeds the maximum of {maximum} pages"
        )));
    }
    let initial = memory.initial_pages.max(declared_min).min(maximum);
    Ok(MemoryType::new(initial, Some(maximum)))
}

/// The single live guest: its store, typed entrypoints and linear memory.
pub struct Guest {
    pub(crate) store: Store<HostState>,
    pub(crate) entrypoints: GuestEntrypoints,
    pub(crate) memory: Memory,
    pub(crate) origin: MemoryOrigin,
}

impl Guest {
    pub fn memory_origin(&self) -> MemoryOrigin {
        self.origin
    }

    /// Current size of linear memory in bytes.
    pub fn memory_size(&self) -> usize {
        self.memory.data_size(&self.store)
    }
}
