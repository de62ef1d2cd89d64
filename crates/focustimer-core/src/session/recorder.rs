//! Bridges timer events to persisted sessions.
//!
//! A session row is not written when a run starts. The recorder keeps the
//! start parameters as a pending record and materialises the session only
//! when the run finishes with some elapsed time: `create_session` and
//! `finalize_session` are issued back to back, followed by a recompute of
//! the date's statistics.
//!
//! Recording is best effort. Store errors are logged and dropped; they never
//! reach the timer.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::store::SessionStore;
use crate::events::Event;
use crate::storage::STUDY;

/// Which runs are persisted, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderPolicy {
    /// Timer types that produce history rows.
    pub recorded_types: Vec<String>,
    /// Store the run's own `completed` flag instead of always `true`.
    pub keep_completion_flag: bool,
}

impl Default for RecorderPolicy {
    fn default() -> Self {
        Self {
            recorded_types: vec![STUDY.to_string()],
            keep_completion_flag: false,
        }
    }
}

/// Start parameters of the run in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSession {
    pub timer_type: String,
    pub planned_duration: u64,
    pub start_time: NaiveDateTime,
}

/// A session that was written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedSession {
    pub id: i64,
    pub date: NaiveDate,
    pub timer_type: String,
    pub actual_duration: u64,
}

#[derive(Debug, Default)]
pub struct SessionRecorder {
    policy: RecorderPolicy,
    pending: Option<PendingSession>,
}

impl SessionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: RecorderPolicy) -> Self {
        Self {
            policy,
            pending: None,
        }
    }

    pub fn policy(&self) -> &RecorderPolicy {
        &self.policy
    }

    pub fn pending(&self) -> Option<&PendingSession> {
        self.pending.as_ref()
    }

    /// Forget the run in progress. Used when the timer is reset, which ends
    /// a run without a `Finished` event.
    pub fn discard_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(timer_type = %pending.timer_type, "pending session discarded");
        }
    }

    /// Feed one timer event. Returns the session if this event caused one to
    /// be written.
    pub fn handle<S: SessionStore + ?Sized>(
        &mut self,
        event: &Event,
        store: &mut S,
    ) -> Option<RecordedSession> {
        match event {
            Event::Started {
                timer_type,
                planned_duration,
                start_time,
            } => {
                if let Some(stale) = self.pending.take() {
                    warn!(timer_type = %stale.timer_type, "dropping pending session without finish");
                }
                self.pending = Some(PendingSession {
                    timer_type: timer_type.clone(),
                    planned_duration: *planned_duration,
                    start_time: *start_time,
                });
                None
            }
            Event::Finished {
                elapsed_seconds,
                completed,
                ..
            } => {
                let Some(pending) = self.pending.take() else {
                    debug!("finish without a pending session");
                    return None;
                };
                self.record(pending, *elapsed_seconds, *completed, store)
            }
            _ => None,
        }
    }

    fn record<S: SessionStore + ?Sized>(
        &self,
        pending: PendingSession,
        elapsed: u64,
        completed: bool,
        store: &mut S,
    ) -> Option<RecordedSession> {
        if !self.policy.recorded_types.contains(&pending.timer_type) {
            debug!(timer_type = %pending.timer_type, "timer type is not recorded");
            return None;
        }
        if elapsed == 0 {
            debug!(timer_type = %pending.timer_type, "nothing elapsed, session not recorded");
            return None;
        }

        let id = match store.create_session(
            &pending.timer_type,
            pending.planned_duration,
            pending.start_time,
        ) {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, timer_type = %pending.timer_type, "failed to create session");
                return None;
            }
        };

        let completed = completed || !self.policy.keep_completion_flag;
        if let Err(e) = store.finalize_session(id, completed, elapsed) {
            error!(error = %e, id, "failed to finalise session");
            return None;
        }

        // `Database::finalize_session` already recomputes its date; other
        // stores may not. Recompute is idempotent.
        let date = pending.start_time.date();
        if let Err(e) = store.recompute_daily_aggregate(date) {
            error!(error = %e, %date, "failed to recompute daily statistics");
        }

        info!(id, timer_type = %pending.timer_type, elapsed, "session recorded");
        Some(RecordedSession {
            id,
            date,
            timer_type: pending.timer_type,
            actual_duration: elapsed,
        })
    }
}
