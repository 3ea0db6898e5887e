//! Typed operations on the ready guest.
//!
//! An [`Api`] can only be obtained from the bridge once the readiness gate has resolved,
//! so none of these calls can reach the guest before bootstrap finished. Every call
//! returns only after the guest export it forwards to has returned.

use crate::abi::{MemoryOrigin, guest_exports};
use crate::error::{ApiError, BridgeError, InitError};
use crate::input::VirtualGamepad;
use crate::memory::MemoryViewMut;
use crate::runtime::Guest;
use crate::vfs::VirtualFilesystem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum InitState {
    Pending,
    Done { width: i32, height: i32 },
    /// The guest's `init` trapped; it is never called again.
    Failed,
}

/// Everything that exists once the gate is ready: the guest and its filesystem.
pub struct Session {
    guest: Guest,
    vfs: VirtualFilesystem,
    gamepad: Arc<VirtualGamepad>,
    init: InitState,
}

impl Session {
    pub(crate) fn new(guest: Guest, vfs: VirtualFilesystem, gamepad: Arc<VirtualGamepad>) -> Self {
        Self {
            guest,
            vfs,
            gamepad,
            init: InitState::Pending,
        }
    }
}

/// A resource handed out by [`Api::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Absolute virtual path the request resolved to.
    pub path: String,
    pub len: usize,
    /// Whether the bytes were copied into guest memory and passed to its `load` export.
    pub delivered: bool,
}

/// Handle on the single live session. Clones share the same guest.
#[derive(Clone)]
pub struct Api {
    session: Arc<Mutex<Session>>,
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api").finish_non_exhaustive()
    }
}

impl Api {
    pub(crate) fn new(session: Arc<Mutex<Session>>) -> Self {
        Self { session }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether both handles drive the same guest instance.
    pub fn same_instance(&self, other: &Api) -> bool {
        Arc::ptr_eq(&self.session, &other.session)
    }

    /// Set up the guest's screen. Legal exactly once.
    pub fn init(&self, width: i32, height: i32) -> Result<(), ApiError> {
        let mut session = self.lock();
        if session.init != InitState::Pending {
            return Err(InitError::AlreadyInitialized.into());
        }

        let Session { guest, init, .. } = &mut *session;
        match guest.entrypoints.init.call(&mut guest.store, (width, height)) {
            Ok(()) => {
                *init = InitState::Done { width, height };
                tracing::info!(width, height, "guest initialized");
                Ok(())
            }
            Err(e) => {
                *init = InitState::Failed;
                Err(ApiError::trap(guest_exports::INIT, e))
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.lock().init, InitState::Done { .. })
    }

    /// Screen size passed to `init`, once it succeeded.
    pub fn screen_size(&self) -> Option<(i32, i32)> {
        match self.lock().init {
            InitState::Done { width, height } => Some((width, height)),
            _ => None,
        }
    }

    /// Clear the display buffer to `color`. Requires a successful `init`.
    pub fn cls(&self, color: i32) -> Result<(), ApiError> {
        let mut session = self.lock();
        if !matches!(session.init, InitState::Done { .. }) {
            return Err(InitError::NotInitialized.into());
        }
        let guest = &mut session.guest;
        guest
            .entrypoints
            .cls
            .call(&mut guest.store, color)
            .map_err(|e| ApiError::trap(guest_exports::CLS, e))
    }

    pub fn update(&self) -> Result<(), ApiError> {
        let mut session = self.lock();
        let guest = &mut session.guest;
        guest
            .entrypoints
            .update
            .call(&mut guest.store, ())
            .map_err(|e| ApiError::trap(guest_exports::UPDATE, e))
    }

    pub fn draw(&self) -> Result<(), ApiError> {
        let mut session = self.lock();
        let guest = &mut session.guest;
        guest
            .entrypoints
            .draw
            .call(&mut guest.store, ())
            .map_err(|e| ApiError::trap(guest_exports::DRAW, e))
    }

    /// Resolve `path` against the working directory and hand the resource to the guest.
    ///
    /// When the guest exports `alloc` and `load`, the bytes are copied into a buffer it
    /// allocates and `load(ptr, len)` is called. Otherwise the resource is only resolved.
    pub fn load(&self, path: &str) -> Result<Resource, ApiError> {
        let mut session = self.lock();
        let Session { guest, vfs, .. } = &mut *session;

        let path = vfs.resolve(path);
        let bytes = vfs.read(&path)?;
        let len = bytes.len();

        let Some(resources) = guest.entrypoints.resources.clone() else {
            tracing::debug!(path = %path, len, "resource resolved; guest has no load export");
            return Ok(Resource {
                path,
                len,
                delivered: false,
            });
        };

        let len_i32 = i32::try_from(len).map_err(|_| BridgeError::OutOfBounds {
            ptr: 0,
            len: len as i64,
            byte_len: guest.memory.data_size(&guest.store),
        })?;
        let ptr = resources
            .alloc
            .call(&mut guest.store, len_i32)
            .map_err(|e| ApiError::trap(guest_exports::ALLOC, e))?;

        // `alloc` may have grown memory; take a fresh view.
        MemoryViewMut::of(&guest.memory, &mut guest.store).write(ptr, bytes)?;

        resources
            .load
            .call(&mut guest.store, (ptr, len_i32))
            .map_err(|e| ApiError::trap(guest_exports::LOAD, e))?;

        tracing::debug!(path = %path, len, ptr, "resource delivered to guest");
        Ok(Resource {
            path,
            len,
            delivered: true,
        })
    }

    /// Write `data` to `path` (relative to the working directory). Returns the absolute path.
    pub fn save(&self, path: &str, data: &[u8]) -> Result<String, ApiError> {
        let mut session = self.lock();
        let path = session.vfs.resolve(path);
        session.vfs.write(&path, data)?;
        Ok(path)
    }

    pub fn cwd(&self) -> String {
        self.lock().vfs.cwd().to_string()
    }

    pub fn chdir(&self, path: &str) -> Result<(), ApiError> {
        Ok(self.lock().vfs.chdir(path)?)
    }

    /// Run `f` against the virtual filesystem, e.g. to seed resources.
    pub fn with_fs<R>(&self, f: impl FnOnce(&mut VirtualFilesystem) -> R) -> R {
        f(&mut self.lock().vfs)
    }

    pub fn gamepad(&self) -> Arc<VirtualGamepad> {
        self.lock().gamepad.clone()
    }

    pub fn memory_origin(&self) -> MemoryOrigin {
        self.lock().guest.memory_origin()
    }

    pub fn memory_size(&self) -> usize {
        self.lock().guest.memory_size()
    }
}
