//! Frame loop: one `update` then one `draw` per tick, paced by the host.
//!
//! The scheduler never sleeps on its own; it awaits a [`Pacer`] between ticks. Stopping
//! the pacer is the only way to cancel, and it only prevents the next tick from starting.

use crate::api::Api;
use crate::error::ApiError;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};

/// Something that can be ticked: the guest facade, or a stand-in.
pub trait FrameTarget {
    fn update(&mut self) -> Result<(), ApiError>;
    fn draw(&mut self) -> Result<(), ApiError>;
}

impl FrameTarget for Api {
    fn update(&mut self) -> Result<(), ApiError> {
        Api::update(self)
    }

    fn draw(&mut self) -> Result<(), ApiError> {
        Api::draw(self)
    }
}

/// The host's frame-pacing primitive.
pub trait Pacer {
    /// Wait until the next tick may start. `false` means pacing has stopped.
    fn next_frame(&mut self) -> impl Future<Output = bool>;
}

/// Cancels an [`IntervalPacer`] from anywhere.
#[derive(Clone, Debug)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Fixed-rate pacing on `tokio::time::interval`.
pub struct IntervalPacer {
    interval: Interval,
    stop: watch::Receiver<bool>,
    frame_limit: Option<u64>,
    frames: u64,
}

impl IntervalPacer {
    /// Pace at `frame_rate` ticks per second. Late ticks are skipped, not bunched up.
    pub fn new(frame_rate: u32) -> (Self, StopHandle) {
        let period = Duration::from_secs(1) / frame_rate.max(1);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let (tx, stop) = watch::channel(false);
        (
            Self {
                interval,
                stop,
                frame_limit: None,
                frames: 0,
            },
            StopHandle { tx },
        )
    }

    /// Stop on its own after `frames` ticks.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }
}

impl Pacer for IntervalPacer {
    async fn next_frame(&mut self) -> bool {
        if *self.stop.borrow() {
            return false;
        }
        if self.frame_limit.is_some_and(|limit| self.frames >= limit) {
            return false;
        }

        tokio::select! {
            _ = self.interval.tick() => {
                self.frames += 1;
                true
            }
            // Dropping every `StopHandle` disables this branch; pacing continues.
            Ok(_) = self.stop.wait_for(|stopped| *stopped) => false,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug)]
pub struct FrameScheduler {
    state: SchedulerState,
    ticks: u64,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
            ticks: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Completed ticks (each one `update` followed by one `draw`).
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run until the pacer stops. Returns the number of ticks completed by this run.
    ///
    /// A failing `update` ends the loop before its `draw`; a failing `draw` ends it after
    /// the tick. Either way the scheduler ends `Stopped` and the error is returned. An
    /// aborted tick always ends the loop, so a `draw` is never skipped while frames go on.
    pub async fn run<T, P>(&mut self, target: &mut T, pacer: &mut P) -> Result<u64, ApiError>
    where
        T: FrameTarget,
        P: Pacer,
    {
        if self.state == SchedulerState::Stopped {
            return Ok(0);
        }
        self.state = SchedulerState::Running;
        tracing::debug!("frame loop running");

        let started = self.ticks;
        let result = loop {
            if !pacer.next_frame().await {
                break Ok(self.ticks - started);
            }
            if let Err(e) = target.update().and_then(|()| target.draw()) {
                tracing::warn!(error = %e, tick = self.ticks, "frame loop aborted");
                break Err(e);
            }
            self.ticks += 1;
        };

        self.state = SchedulerState::Stopped;
        tracing::debug!(ticks = self.ticks, "frame loop stopped");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        fail_update_at: Option<usize>,
    }

    impl FrameTarget for Recorder {
        fn update(&mut self) -> Result<(), ApiError> {
            let n = self.calls.iter().filter(|c| **c == "update").count();
            if self.fail_update_at == Some(n) {
                return Err(ApiError::trap("update", "boom"));
            }
            self.calls.push("update");
            Ok(())
        }

        fn draw(&mut self) -> Result<(), ApiError> {
            self.calls.push("draw");
            Ok(())
        }
    }

    struct Ticks(u64);

    impl Pacer for Ticks {
        async fn next_frame(&mut self) -> bool {
            if self.0 == 0 {
                return false;
            }
            self.0 -= 1;
            true
        }
    }

    #[tokio::test]
    async fn n_ticks_alternate_update_and_draw() {
        let mut scheduler = FrameScheduler::new();
        let mut target = Recorder::default();

        let ticks = scheduler.run(&mut target, &mut Ticks(4)).await.unwrap();

        assert_eq!(ticks, 4);
        assert_eq!(
            target.calls,
            ["update", "draw", "update", "draw", "update", "draw", "update", "draw"]
        );
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn failed_update_skips_its_draw_and_stops() {
        let mut scheduler = FrameScheduler::new();
        let mut target = Recorder {
            fail_update_at: Some(2),
            ..Default::default()
        };

        let err = scheduler.run(&mut target, &mut Ticks(10)).await.unwrap_err();

        assert!(matches!(err, ApiError::Trap { export: "update", .. }));
        assert_eq!(target.calls, ["update", "draw", "update", "draw"]);
        assert_eq!(scheduler.ticks(), 2);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn stopped_scheduler_does_not_restart() {
        let mut scheduler = FrameScheduler::new();
        let mut target = Recorder::default();
        scheduler.run(&mut target, &mut Ticks(1)).await.unwrap();

        assert_eq!(scheduler.run(&mut target, &mut Ticks(5)).await.unwrap(), 0);
        assert_eq!(target.calls.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_pacer_honours_frame_limit() {
        let (pacer, _stop) = IntervalPacer::new(30);
        let mut pacer = pacer.with_frame_limit(3);
        let mut scheduler = FrameScheduler::new();
        let mut target = Recorder::default();

        assert_eq!(scheduler.run(&mut target, &mut pacer).await.unwrap(), 3);
        assert_eq!(target.calls.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_handle_cancels_the_next_tick() {
        let (mut pacer, stop) = IntervalPacer::new(60);
        assert!(pacer.next_frame().await);

        stop.stop();
        assert!(stop.is_stopped());
        assert!(!pacer.next_frame().await);
    }
}
