//! framehost-core: a host that loads a WebAssembly guest and drives its frame loop.
//!
//! The guest ABI is small and fixed:
//! - Imports (module `env`): `console_log(ptr, len)`, `gamepad_pressed(button) -> i32`,
//!   and `memory` when the guest asks the host to supply it.
//! - Required exports: `init(width, height)`, `cls(color)`, `update()`, `draw()`.
//! - Optional exports: `memory`, `alloc(len) -> ptr`, `load(ptr, len)`.
//!
//! A [`Bridge`] fetches, compiles and instantiates the guest, then bootstraps the
//! virtual filesystem. Only after that does it hand out an [`Api`]; the
//! [`FrameScheduler`] ticks that API at the host's pace. The ABI surface is defined in
//! `crate::abi` and mirrored by `framehost-sdk`.

pub mod abi;
pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod gate;
pub mod hooks;
pub mod input;
pub mod loader;
pub mod memory;
pub mod runtime;
pub mod scheduler;
pub mod state;
pub mod vfs;

pub use api::{Api, Resource};
pub use bridge::Bridge;
pub use config::HostConfig;
pub use error::{ApiError, BootError, BridgeError, FileError, GateError, InitError, LoadError};
pub use gate::Phase;
pub use hooks::{HostHooks, RecordingHooks, TracingHooks};
pub use input::{Button, VirtualGamepad};
pub use loader::ModuleSource;
pub use scheduler::{FrameScheduler, IntervalPacer, Pacer, SchedulerState, StopHandle};
