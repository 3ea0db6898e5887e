//! Host capabilities handed to the guest through imports.

use std::sync::Mutex;

/// Capability object behind the guest's host-callback imports.
///
/// Passed to the bridge explicitly; import closures reach it through the store state.
pub trait HostHooks: Send + Sync {
    /// A complete, already-validated UTF-8 line from `console_log`.
    fn console_log(&self, message: &str);
}

/// Default hooks: guest log lines become `tracing` events under target `guest`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHooks;

impl HostHooks for TracingHooks {
    fn console_log(&self, message: &str) {
        tracing::info!(target: "guest", "{message}");
    }
}

/// Hooks that keep every guest log line. Handy for embedding and tests.
#[derive(Debug, Default)]
pub struct RecordingHooks {
    lines: Mutex<Vec<String>>,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl HostHooks for RecordingHooks {
    fn console_log(&self, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(message.to_owned());
    }
}
