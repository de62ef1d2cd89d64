//! Timer engine implementation.
//!
//! The timer engine is a tick-driven state machine. It owns no thread and no
//! timer of its own - the caller (see [`TimerDriver`](super::TimerDriver))
//! is responsible for calling `tick()` once per second while it is running.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused -> Finished
//!         Running/Paused -> Idle   (early stop or reset)
//! ```
//!
//! Every operation appends the events it generates to an outbox; drain it
//! with [`TimerEngine::take_events`].
//!
//! ## Usage
//!
//! ```
//! use focustimer_core::timer::{TimerEngine, TimerState};
//!
//! let mut engine = TimerEngine::new();
//! engine.start("study", 3).unwrap();
//! for _ in 0..3 {
//!     engine.tick();
//! }
//! assert_eq!(engine.state(), TimerState::Finished);
//! ```

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use crate::error::TimerError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    /// The last run counted down to zero. A new run may be started.
    Finished,
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
            TimerState::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Serializable view of the engine at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub timer_type: String,
    pub total_duration: u64,
    pub remaining_time: u64,
    pub elapsed_time: u64,
    pub progress: f64,
    pub start_time: Option<NaiveDateTime>,
    pub total_pause_duration: u64,
}

/// Core timer engine.
///
/// All durations are whole seconds. While a run is active,
/// `elapsed_time + remaining_time == total_duration` holds after every call.
pub struct TimerEngine<C: Clock = SystemClock> {
    clock: C,
    state: TimerState,
    timer_type: String,
    total_duration: u64,
    remaining_time: u64,
    elapsed_time: u64,
    /// Captured on `start`, not on `resume`.
    start_time: Option<NaiveDateTime>,
    pause_time: Option<NaiveDateTime>,
    /// Seconds spent paused during the current run.
    total_pause_duration: u64,
    outbox: Vec<Event>,
}

impl TimerEngine<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for TimerEngine<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TimerEngine<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            state: TimerState::Idle,
            timer_type: String::new(),
            total_duration: 0,
            remaining_time: 0,
            elapsed_time: 0,
            start_time: None,
            pause_time: None,
            total_pause_duration: 0,
            outbox: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn timer_type(&self) -> &str {
        &self.timer_type
    }

    pub fn total_duration(&self) -> u64 {
        self.total_duration
    }

    pub fn remaining_time(&self) -> u64 {
        self.remaining_time
    }

    pub fn elapsed_time(&self) -> u64 {
        self.elapsed_time
    }

    pub fn start_time(&self) -> Option<NaiveDateTime> {
        self.start_time
    }

    pub fn total_pause_duration(&self) -> u64 {
        self.total_pause_duration
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, TimerState::Running | TimerState::Paused)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// 0.0 .. 1.0 progress of the current run; 0.0 when there is no duration.
    pub fn progress(&self) -> f64 {
        if self.total_duration == 0 {
            return 0.0;
        }
        self.elapsed_time as f64 / self.total_duration as f64
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state,
            timer_type: self.timer_type.clone(),
            total_duration: self.total_duration,
            remaining_time: self.remaining_time,
            elapsed_time: self.elapsed_time,
            progress: self.progress(),
            start_time: self.start_time,
            total_pause_duration: self.total_pause_duration,
        }
    }

    /// Drain the events generated since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, timer_type: &str, duration_secs: u64) -> Result<(), TimerError> {
        if self.is_active() {
            return Err(self.reject("start"));
        }
        if duration_secs == 0 {
            warn!(timer_type, "refusing to start a zero-length run");
            return Err(TimerError::ZeroDuration);
        }

        let now = self.clock.now();
        self.timer_type = timer_type.to_string();
        self.total_duration = duration_secs;
        self.remaining_time = duration_secs;
        self.elapsed_time = 0;
        self.start_time = Some(now);
        self.pause_time = None;
        self.total_pause_duration = 0;

        self.outbox.push(Event::Started {
            timer_type: self.timer_type.clone(),
            planned_duration: duration_secs,
            start_time: now,
        });
        self.set_state(TimerState::Running);
        // Progress is reported immediately, before the first tick.
        self.emit_progress();

        info!(timer_type, duration_secs, "timer started");
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), TimerError> {
        if self.state != TimerState::Running {
            return Err(self.reject("pause"));
        }
        self.pause_time = Some(self.clock.now());
        self.set_state(TimerState::Paused);
        info!(remaining = self.remaining_time, "timer paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), TimerError> {
        if self.state != TimerState::Paused {
            return Err(self.reject("resume"));
        }
        self.fold_pause();
        self.set_state(TimerState::Running);
        info!(
            total_pause_duration = self.total_pause_duration,
            "timer resumed"
        );
        Ok(())
    }

    /// End the run. `completed` is true only when the countdown reached zero.
    ///
    /// Always emits `Finished`; an early stop also clears the run.
    pub fn stop(&mut self, completed: bool) -> Result<(), TimerError> {
        if self.state == TimerState::Idle {
            return Err(self.reject("stop"));
        }
        if self.state == TimerState::Paused {
            self.fold_pause();
        }

        let timer_type = self.timer_type.clone();
        let elapsed_seconds = self.elapsed_time;

        self.set_state(if completed {
            TimerState::Finished
        } else {
            TimerState::Idle
        });
        self.outbox.push(Event::Finished {
            timer_type: timer_type.clone(),
            elapsed_seconds,
            completed,
        });

        info!(
            timer_type = %timer_type,
            elapsed_seconds,
            completed,
            total_pause_duration = self.total_pause_duration,
            "timer stopped"
        );

        if !completed {
            self.clear_run();
        }
        Ok(())
    }

    /// Force the timer back to Idle. Emits no `Finished` event.
    pub fn reset(&mut self) {
        self.clear_run();
        self.set_state(TimerState::Idle);
        debug!("timer reset");
    }

    /// Lengthen or shorten the current run by `delta_secs`.
    ///
    /// Remaining time saturates at zero and at `u64::MAX - elapsed`; elapsed
    /// time is unchanged and the total is rebuilt from the two.
    pub fn add_time(&mut self, delta_secs: i64) -> Result<(), TimerError> {
        if !self.is_active() {
            return Err(self.reject("add time"));
        }

        let remaining = if delta_secs >= 0 {
            self.remaining_time.saturating_add(delta_secs.unsigned_abs())
        } else {
            self.remaining_time.saturating_sub(delta_secs.unsigned_abs())
        };

        self.remaining_time = remaining.min(u64::MAX - self.elapsed_time);
        self.total_duration = self.elapsed_time + self.remaining_time;

        self.emit_progress();
        info!(
            delta_secs,
            remaining = self.remaining_time,
            total = self.total_duration,
            "timer adjusted"
        );
        Ok(())
    }

    /// Advance by one second. Ticks outside `Running` are ignored.
    pub fn tick(&mut self) {
        if self.state != TimerState::Running {
            debug!(state = %self.state, "ignoring tick");
            return;
        }

        // add_time may already have brought the run to zero.
        if self.remaining_time > 0 {
            self.remaining_time -= 1;
            self.elapsed_time += 1;
            self.emit_progress();
        }

        if self.remaining_time == 0 {
            let _ = self.stop(true);
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn reject(&self, op: &'static str) -> TimerError {
        warn!(op, state = %self.state, "rejected timer operation");
        TimerError::InvalidTransition {
            op,
            state: self.state,
        }
    }

    fn fold_pause(&mut self) {
        if let Some(paused_at) = self.pause_time.take() {
            let paused = (self.clock.now() - paused_at).num_seconds().max(0) as u64;
            self.total_pause_duration += paused;
        }
    }

    fn set_state(&mut self, new_state: TimerState) {
        if self.state != new_state {
            debug!(from = %self.state, to = %new_state, "timer state changed");
            self.state = new_state;
            self.outbox.push(Event::StateChanged { state: new_state });
        }
    }

    fn emit_progress(&mut self) {
        self.outbox.push(Event::Progress {
            remaining: self.remaining_time,
            total: self.total_duration,
            progress: self.progress(),
        });
    }

    fn clear_run(&mut self) {
        self.timer_type.clear();
        self.total_duration = 0;
        self.remaining_time = 0;
        self.elapsed_time = 0;
        self.start_time = None;
        self.pause_time = None;
        self.total_pause_duration = 0;
    }
}
