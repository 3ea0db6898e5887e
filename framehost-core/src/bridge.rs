//! The bridge: owns the guest source, the host capabilities and the readiness gate.
//!
//! `ready()` drives the whole bootstrap sequence exactly once:
//!
//! 1. fetch and compile the guest module,
//! 2. supply or locate linear memory and define the `env` imports,
//! 3. instantiate (the guest's start function may already call imports here),
//! 4. bootstrap the virtual filesystem and enter the working directory,
//!
//! and only then hands out an [`Api`]. Concurrent and later callers share the result.

use crate::api::{Api, Session};
use crate::config::HostConfig;
use crate::error::{BootError, GateError, LoadError};
use crate::gate::{Phase, ReadinessGate};
use crate::hooks::{HostHooks, TracingHooks};
use crate::input::VirtualGamepad;
use crate::loader::{self, ModuleSource};
use crate::runtime::WasmtimeRuntime;
use crate::state::HostState;
use crate::vfs::VirtualFilesystem;
use std::sync::{Arc, Mutex};

pub struct Bridge {
    config: HostConfig,
    source: ModuleSource,
    hooks: Arc<dyn HostHooks>,
    gamepad: Arc<VirtualGamepad>,
    gate: ReadinessGate<Mutex<Session>>,
}

impl Bridge {
    /// A bridge for `source` using `TracingHooks`. Nothing is loaded until [`Bridge::ready`].
    pub fn new(source: ModuleSource, config: HostConfig) -> Self {
        Self {
            config,
            source,
            hooks: Arc::new(TracingHooks),
            gamepad: Arc::new(VirtualGamepad::new()),
            gate: ReadinessGate::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn HostHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.gate.phase()
    }

    /// The gamepad the guest's `gamepad_pressed` import reads. Usable before readiness.
    pub fn gamepad(&self) -> Arc<VirtualGamepad> {
        self.gamepad.clone()
    }

    /// Wait for the guest to be ready, bootstrapping it on first call.
    pub async fn ready(&self) -> Result<Api, BootError> {
        let session = self.gate.ready(|| self.bootstrap()).await?;
        Ok(Api::new(session))
    }

    /// The API if bootstrap already completed; `NotReady` otherwise.
    pub fn try_api(&self) -> Result<Api, GateError> {
        self.gate.get().map(Api::new)
    }

    async fn bootstrap(&self) -> Result<Mutex<Session>, BootError> {
        self.gate.advance(Phase::Uninitialized, Phase::Instantiating)?;
        tracing::info!(source = %self.source, "loading guest");

        let bytes = loader::fetch(&self.source, self.config.fetch_retries).await?;

        let state = HostState::new(
            self.hooks.clone(),
            self.gamepad.clone(),
            self.config.out_of_bounds,
            self.config.memory.maximum_bytes(),
        );
        let mut runtime = WasmtimeRuntime::new(state)
            .map_err(|e| LoadError::Instantiate(format!("cannot create engine: {e:#}")))?;
        let module = loader::compile_module(&runtime.engine, &bytes)?;
        let origin = runtime.define_imports(&module, &self.config.memory)?;
        let guest = runtime.instantiate(&module, origin)?;

        self.gate.advance(Phase::Instantiating, Phase::Bootstrapping)?;

        let mut vfs = VirtualFilesystem::new();
        vfs.bootstrap(&self.config.root)?;
        if let Some(asset_dir) = &self.config.asset_dir {
            let copied = vfs.import_host_dir(asset_dir, &self.config.root).await?;
            tracing::info!(asset_dir = %asset_dir.display(), copied, "assets imported");
        }

        tracing::info!(root = %vfs.cwd(), "guest ready");
        Ok(Mutex::new(Session::new(guest, vfs, self.gamepad.clone())))
    }
}
