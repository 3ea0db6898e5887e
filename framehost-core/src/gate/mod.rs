//! One-shot readiness gate.
//!
//! The gate owns the bootstrap result. `ready` runs the bootstrap future at most once;
//! every caller, concurrent or late, gets the same `Arc` (or the same error). The phase
//! only ever moves forward: `Uninitialized → Instantiating → Bootstrapping → Ready`.

use crate::error::{BootError, GateError};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::OnceCell;

#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum Phase {
    Uninitialized = 0,
    Instantiating = 1,
    Bootstrapping = 2,
    Ready = 3,
}

impl Phase {
    fn from_u8(value: u8) -> Phase {
        match value {
            0 => Phase::Uninitialized,
            1 => Phase::Instantiating,
            2 => Phase::Bootstrapping,
            _ => Phase::Ready,
        }
    }
}

pub struct ReadinessGate<T> {
    phase: AtomicU8,
    cell: OnceCell<Result<Arc<T>, BootError>>,
}

impl<T> Default for ReadinessGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReadinessGate<T> {
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Uninitialized as u8),
            cell: OnceCell::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Move from `from` to the next phase `to`. Skipping or repeating a phase is refused.
    pub fn advance(&self, from: Phase, to: Phase) -> Result<(), GateError> {
        if to as u8 != from as u8 + 1 {
            return Err(GateError::PhaseOrder {
                from,
                to,
                current: self.phase(),
            });
        }
        self.phase
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|current| GateError::PhaseOrder {
                from,
                to,
                current: Phase::from_u8(current),
            })
    }

    /// Wait for readiness, running `bootstrap` if nobody has started it yet.
    ///
    /// The bootstrap future is responsible for advancing the phase up to `Bootstrapping`;
    /// the gate performs the final step to `Ready` once it succeeds. A failed bootstrap is
    /// kept and returned to every later caller.
    ///
    /// Dropping the caller that is driving the bootstrap abandons that attempt: the phase
    /// goes back to `Uninitialized` and the next caller starts over.
    pub async fn ready<F, Fut>(&self, bootstrap: F) -> Result<Arc<T>, BootError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BootError>>,
    {
        self.cell
            .get_or_init(|| async move {
                // Holding the cell's init slot means no other attempt is live.
                self.phase
                    .store(Phase::Uninitialized as u8, Ordering::Release);
                let mut abandoned = ResetOnDrop {
                    phase: &self.phase,
                    armed: true,
                };

                let outcome = bootstrap().await;
                abandoned.armed = false;

                let value = outcome?;
                self.advance(Phase::Bootstrapping, Phase::Ready)?;
                Ok::<_, BootError>(Arc::new(value))
            })
            .await
            .clone()
    }

    /// The ready value without waiting. Anything short of `Ready` is refused.
    pub fn get(&self) -> Result<Arc<T>, GateError> {
        match self.cell.get() {
            Some(Ok(value)) => Ok(value.clone()),
            _ => Err(GateError::NotReady),
        }
    }
}

/// Rewinds the phase when a bootstrap attempt is dropped before it finishes.
struct ResetOnDrop<'a> {
    phase: &'a AtomicU8,
    armed: bool,
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.phase
                .store(Phase::Uninitialized as u8, Ordering::Release);
            tracing::debug!("bootstrap abandoned before completion");
        }
    }
}
