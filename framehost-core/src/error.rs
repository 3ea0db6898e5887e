//! Error taxonomy for the host.
//!
//! Every error here is `Clone` so the readiness gate can hand the same boot
//! failure to every caller that awaited it.

use thiserror::Error;

/// Failures while obtaining, compiling or instantiating the guest.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// The guest bytes could not be fetched.
    #[error("failed to fetch guest module from {source_name}: {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    /// The bytes are not a module the engine accepts (including WAT parse failures).
    #[error("failed to compile guest module: {0}")]
    Compile(String),

    /// Linking or instantiation failed (missing import, bad export, start trap).
    #[error("failed to instantiate guest module: {0}")]
    Instantiate(String),
}

/// Failures crossing the shared linear memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("guest range ptr={ptr} len={len} is outside linear memory of {byte_len} bytes")]
    OutOfBounds { ptr: i64, len: i64, byte_len: usize },

    #[error("guest bytes at ptr={ptr} are not valid UTF-8 (valid up to {valid_up_to})")]
    Decode { ptr: i64, valid_up_to: usize },

    #[error("guest has no linear memory to read from")]
    MissingMemory,

    #[error("cannot grow linear memory from {current_pages} by {delta_pages} pages: {message}")]
    GrowFailed {
        current_pages: u64,
        delta_pages: u64,
        message: String,
    },
}

/// Failures of the virtual filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileError {
    #[error("no such file or directory: {0}")]
    NotFound(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Reading the host side of an asset import failed.
    #[error("host filesystem error at {path}: {message}")]
    Host { path: String, message: String },
}

/// Lifecycle misuse of `init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("init was already called for this guest")]
    AlreadyInitialized,

    #[error("init must be called before this operation")]
    NotInitialized,
}

/// Misuse of the readiness gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("guest is not ready yet")]
    NotReady,

    #[error("bootstrap phase {from:?} -> {to:?} is out of order (current {current:?})")]
    PhaseOrder {
        from: crate::gate::Phase,
        to: crate::gate::Phase,
        current: crate::gate::Phase,
    },
}

/// Anything that stops the bootstrap sequence from reaching `Ready`.
#[derive(Debug, Clone, Error)]
pub enum BootError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("filesystem bootstrap failed: {0}")]
    Filesystem(#[from] FileError),

    #[error(transparent)]
    Gate(#[from] GateError),
}

/// Errors returned by the typed guest API.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error(transparent)]
    Init(#[from] InitError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("guest export `{export}` trapped: {message}")]
    Trap {
        export: &'static str,
        message: String,
    },
}

impl ApiError {
    pub(crate) fn trap(export: &'static str, err: impl std::fmt::Display) -> Self {
        ApiError::Trap {
            export,
            message: format!("{err:#}"),
        }
    }
}
