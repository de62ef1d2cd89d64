//! Application-level timer coordinator.
//!
//! [`TimerService`] owns the engine, the session recorder, the store and the
//! event sink. Every command drains the engine's outbox and routes each event
//! to the recorder first and the sink second, so the sink never sees a
//! `Finished` before the session for it has been written.

use tracing::{info, warn};

use super::recorder::{RecordedSession, RecorderPolicy, SessionRecorder};
use super::store::SessionStore;
use crate::error::{CoreError, TimerError};
use crate::events::{Event, EventSink};
use crate::storage::{Flag, SettingsProvider, REST, STUDY};
use crate::timer::{Clock, SystemClock, TimerEngine, TimerSnapshot, TimerState};

pub struct TimerService<S, N, P, C = SystemClock>
where
    S: SessionStore,
    N: EventSink,
    P: SettingsProvider,
    C: Clock,
{
    engine: TimerEngine<C>,
    recorder: SessionRecorder,
    store: S,
    sink: N,
    settings: P,
    selected_type: String,
    last_recorded: Option<RecordedSession>,
}

impl<S, N, P> TimerService<S, N, P, SystemClock>
where
    S: SessionStore,
    N: EventSink,
    P: SettingsProvider,
{
    pub fn new(store: S, sink: N, settings: P) -> Self {
        Self::with_clock(SystemClock, store, sink, settings)
    }
}

impl<S, N, P, C> TimerService<S, N, P, C>
where
    S: SessionStore,
    N: EventSink,
    P: SettingsProvider,
    C: Clock,
{
    pub fn with_clock(clock: C, store: S, sink: N, settings: P) -> Self {
        Self {
            engine: TimerEngine::with_clock(clock),
            recorder: SessionRecorder::new(),
            store,
            sink,
            settings,
            selected_type: STUDY.to_string(),
            last_recorded: None,
        }
    }

    pub fn with_policy(mut self, policy: RecorderPolicy) -> Self {
        self.recorder = SessionRecorder::with_policy(policy);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn engine(&self) -> &TimerEngine<C> {
        &self.engine
    }

    pub fn state(&self) -> TimerState {
        self.engine.state()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.engine.snapshot()
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut N {
        &mut self.sink
    }

    pub fn settings(&self) -> &P {
        &self.settings
    }

    /// Timer type used by the next [`start_selected`](Self::start_selected).
    pub fn selected_type(&self) -> &str {
        &self.selected_type
    }

    /// The most recent session written by the recorder.
    pub fn last_recorded(&self) -> Option<&RecordedSession> {
        self.last_recorded.as_ref()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn select_type(&mut self, type_id: &str) -> Result<(), TimerError> {
        if self.settings.get_timer_type(type_id).is_none() {
            return Err(unknown_type(type_id));
        }
        self.selected_type = type_id.to_string();
        Ok(())
    }

    /// Start a run of `type_id` with its configured duration.
    pub fn start(&mut self, type_id: &str) -> Result<(), TimerError> {
        let timer_type = self
            .settings
            .get_timer_type(type_id)
            .ok_or_else(|| unknown_type(type_id))?;
        self.begin(type_id, timer_type.duration)
    }

    pub fn start_selected(&mut self) -> Result<(), TimerError> {
        let type_id = self.selected_type.clone();
        self.start(&type_id)
    }

    /// Start a run of `type_id` with an explicit duration.
    pub fn start_with_duration(&mut self, type_id: &str, secs: u64) -> Result<(), TimerError> {
        if self.settings.get_timer_type(type_id).is_none() {
            return Err(unknown_type(type_id));
        }
        self.begin(type_id, secs)
    }

    pub fn pause(&mut self) -> Result<(), TimerError> {
        self.engine.pause()?;
        self.dispatch();
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), TimerError> {
        self.engine.resume()?;
        self.dispatch();
        Ok(())
    }

    pub fn stop(&mut self, completed: bool) -> Result<(), TimerError> {
        self.engine.stop(completed)?;
        self.dispatch();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.engine.reset();
        self.recorder.discard_pending();
        self.dispatch();
    }

    pub fn add_time(&mut self, delta_secs: i64) -> Result<(), TimerError> {
        self.engine.add_time(delta_secs)?;
        self.dispatch();
        Ok(())
    }

    pub fn tick(&mut self) {
        self.engine.tick();
        self.dispatch();
    }

    /// Attach notes and/or a todo to the last recorded session.
    pub fn annotate_last(
        &mut self,
        notes: Option<&str>,
        todo_id: Option<i64>,
    ) -> Result<(), CoreError> {
        let id = self
            .last_recorded
            .as_ref()
            .map(|s| s.id)
            .ok_or_else(|| CoreError::Custom("no session has been recorded yet".into()))?;
        self.store.annotate_session(id, notes, todo_id)?;
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin(&mut self, type_id: &str, secs: u64) -> Result<(), TimerError> {
        self.engine.start(type_id, secs)?;
        self.selected_type = type_id.to_string();
        self.dispatch();
        Ok(())
    }

    fn dispatch(&mut self) {
        let mut entered_finished = false;
        let mut completion = None;
        let mut recorded_id = None;

        for event in self.engine.take_events() {
            if let Some(recorded) = self.recorder.handle(&event, &mut self.store) {
                recorded_id = Some(recorded.id);
                self.last_recorded = Some(recorded);
            }
            self.sink.emit(&event);

            match &event {
                Event::StateChanged {
                    state: TimerState::Finished,
                } => entered_finished = true,
                Event::Finished {
                    timer_type,
                    elapsed_seconds,
                    completed: true,
                } => completion = Some((timer_type.clone(), *elapsed_seconds)),
                _ => {}
            }
        }

        // A repeated stop from Finished re-emits Finished without a transition.
        if let (true, Some((timer_type, elapsed))) = (entered_finished, completion) {
            self.after_completion(&timer_type, elapsed, recorded_id);
        }
    }

    /// Sound request, completion notice and auto-switch after a run ended
    /// in Finished.
    fn after_completion(&mut self, timer_type: &str, elapsed: u64, session_id: Option<i64>) {
        if self.settings.get_flag(Flag::SoundEnabled) {
            self.sink.emit(&Event::PlaySound {
                timer_type: timer_type.to_string(),
                sound_file: self.settings.sound_file(),
            });
        }

        if self.settings.get_flag(Flag::PopupEnabled) {
            let timer_name = self
                .settings
                .get_timer_type(timer_type)
                .map(|t| t.name)
                .unwrap_or_else(|| timer_type.to_string());
            self.sink.emit(&Event::Notify {
                timer_type: timer_type.to_string(),
                timer_name,
                elapsed_seconds: elapsed,
                session_id,
            });
        }

        if !self.settings.get_flag(Flag::AutoSwitch) {
            return;
        }

        let next = match timer_type {
            STUDY => REST,
            REST => STUDY,
            other => other,
        };
        if self.settings.get_timer_type(next).is_none() {
            warn!(next, "auto-switch target is not configured");
            return;
        }
        self.selected_type = next.to_string();
        info!(from = timer_type, to = next, "timer type switched");

        if self.settings.get_flag(Flag::AutoStartNext) {
            let next = next.to_string();
            if let Err(e) = self.start(&next) {
                warn!(error = %e, next = %next, "failed to auto-start next run");
            }
        }
    }
}

fn unknown_type(type_id: &str) -> TimerError {
    warn!(type_id, "unknown timer type");
    TimerError::UnknownTimerType(type_id.to_string())
}
