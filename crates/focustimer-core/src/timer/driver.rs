//! Tokio tick source for a [`TimerService`].
//!
//! The driver serialises every mutation through one async mutex around the
//! service. While the timer is Running a background task ticks it once per
//! period; the task is aborted whenever the timer leaves Running, and it
//! checks the state under the lock before each tick so a late wake-up does
//! nothing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::debug;

use super::{Clock, SystemClock, TimerSnapshot, TimerState};
use crate::error::TimerError;
use crate::events::EventSink;
use crate::session::{SessionStore, TimerService};
use crate::storage::SettingsProvider;

type SharedService<S, N, P, C> = Arc<Mutex<TimerService<S, N, P, C>>>;

pub struct TimerDriver<S, N, P, C = SystemClock>
where
    S: SessionStore,
    N: EventSink,
    P: SettingsProvider,
    C: Clock,
{
    service: SharedService<S, N, P, C>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl<S, N, P, C> TimerDriver<S, N, P, C>
where
    S: SessionStore + Send + 'static,
    N: EventSink + Send + 'static,
    P: SettingsProvider + Send + 'static,
    C: Clock + 'static,
{
    pub fn new(service: TimerService<S, N, P, C>) -> Self {
        Self::with_interval(service, Duration::from_secs(1))
    }

    pub fn with_interval(service: TimerService<S, N, P, C>, tick_interval: Duration) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval,
        }
    }

    /// Shared handle to the service, for queries and annotation.
    pub fn service(&self) -> SharedService<S, N, P, C> {
        self.service.clone()
    }

    pub async fn snapshot(&self) -> TimerSnapshot {
        self.service.lock().await.snapshot()
    }

    pub async fn state(&self) -> TimerState {
        self.service.lock().await.state()
    }

    pub async fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub async fn start(&self, type_id: &str) -> Result<(), TimerError> {
        self.service.lock().await.start(type_id)?;
        self.spawn_ticker().await;
        Ok(())
    }

    pub async fn start_with_duration(&self, type_id: &str, secs: u64) -> Result<(), TimerError> {
        self.service
            .lock()
            .await
            .start_with_duration(type_id, secs)?;
        self.spawn_ticker().await;
        Ok(())
    }

    pub async fn pause(&self) -> Result<(), TimerError> {
        self.service.lock().await.pause()?;
        self.cancel_ticker().await;
        Ok(())
    }

    pub async fn resume(&self) -> Result<(), TimerError> {
        self.service.lock().await.resume()?;
        self.spawn_ticker().await;
        Ok(())
    }

    pub async fn stop(&self, completed: bool) -> Result<(), TimerError> {
        let state = {
            let mut service = self.service.lock().await;
            service.stop(completed)?;
            service.state()
        };
        // A completed stop may auto-start the next run.
        if state == TimerState::Running {
            self.spawn_ticker().await;
        } else {
            self.cancel_ticker().await;
        }
        Ok(())
    }

    pub async fn reset(&self) {
        self.service.lock().await.reset();
        self.cancel_ticker().await;
    }

    pub async fn add_time(&self, delta_secs: i64) -> Result<(), TimerError> {
        self.service.lock().await.add_time(delta_secs)
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let service = self.service.clone();
        let period = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;

                let mut guard = service.lock().await;
                if guard.state() != TimerState::Running {
                    break;
                }
                guard.tick();
                // Stays Running when the next run was auto-started.
                if guard.state() != TimerState::Running {
                    break;
                }
            }
            debug!("ticker stopped");
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}
