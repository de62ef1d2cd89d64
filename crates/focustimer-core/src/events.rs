use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::timer::TimerState;

/// Every observable change in the timer produces an Event.
///
/// Events are delivered in the order they are generated. Within one run,
/// `Finished` is always the last event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new run began. Carries what the session recorder needs to
    /// materialise a record later.
    Started {
        timer_type: String,
        planned_duration: u64,
        start_time: NaiveDateTime,
    },
    StateChanged {
        state: TimerState,
    },
    Progress {
        remaining: u64,
        total: u64,
        /// 0.0 .. 1.0
        progress: f64,
    },
    /// The run ended, either by reaching zero (`completed`) or by an early stop.
    Finished {
        timer_type: String,
        elapsed_seconds: u64,
        completed: bool,
    },
    /// Request for the audio collaborator after an auto-completed run.
    PlaySound {
        timer_type: String,
        sound_file: Option<String>,
    },
    /// Completion notice for a popup or tray collaborator.
    Notify {
        timer_type: String,
        timer_name: String,
        elapsed_seconds: u64,
        /// Session written for this run, so a note can be attached to it.
        session_id: Option<i64>,
    },
}

impl Event {
    pub fn is_finished(&self) -> bool {
        matches!(self, Event::Finished { .. })
    }
}

/// Receiver for timer events (UI, tray, audio, logging...).
pub trait EventSink {
    fn emit(&mut self, event: &Event);
}

/// Discards every event.
impl EventSink for () {
    fn emit(&mut self, _event: &Event) {}
}

/// Collects events, mostly useful in tests and for batch output.
impl EventSink for Vec<Event> {
    fn emit(&mut self, event: &Event) {
        self.push(event.clone());
    }
}

/// Forwards events over a channel. A closed receiver is ignored.
impl EventSink for tokio::sync::mpsc::UnboundedSender<Event> {
    fn emit(&mut self, event: &Event) {
        let _ = self.send(event.clone());
    }
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn emit(&mut self, event: &Event) {
        (**self).emit(event);
    }
}
