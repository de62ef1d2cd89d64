//! Session recording: the bridge between timer runs and the store.

mod recorder;
mod service;
mod store;

pub use recorder::{PendingSession, RecordedSession, RecorderPolicy, SessionRecorder};
pub use service::TimerService;
pub use store::SessionStore;
