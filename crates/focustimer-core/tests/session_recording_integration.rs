//! Integration tests for session recording.
//!
//! Drives a full `TimerService` over an in-memory database with a manual
//! clock, from start to persisted session and daily statistics.

use chrono::{NaiveDate, NaiveDateTime};
use focustimer_core::storage::TimerType;
use focustimer_core::{
    Config, DailyAggregate, Database, DatabaseError, Event, ManualClock, SessionStore,
    TimerService, TimerState,
};

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 9, 2)
        .unwrap()
        .and_hms_opt(14, 0, 0)
        .unwrap()
}

fn config(study_secs: u64) -> Config {
    let mut cfg = Config::default();
    cfg.timer.types = vec![
        TimerType::new("study", "Study", study_secs, "#4CAF50"),
        TimerType::new("rest", "Rest", 5, "#2196F3"),
    ];
    cfg
}

/// Counts store calls while delegating to a real database.
struct CountingStore {
    db: Database,
    creates: usize,
    finalizes: usize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            db: Database::open_memory().unwrap(),
            creates: 0,
            finalizes: 0,
        }
    }
}

impl SessionStore for CountingStore {
    fn create_session(
        &mut self,
        timer_type: &str,
        planned_duration: u64,
        start_time: NaiveDateTime,
    ) -> Result<i64, DatabaseError> {
        self.creates += 1;
        self.db.create_session(timer_type, planned_duration, start_time)
    }

    fn finalize_session(
        &mut self,
        session_id: i64,
        completed: bool,
        actual_duration: u64,
    ) -> Result<(), DatabaseError> {
        self.finalizes += 1;
        self.db.finalize_session(session_id, completed, actual_duration)
    }

    fn recompute_daily_aggregate(
        &mut self,
        date: NaiveDate,
    ) -> Result<DailyAggregate, DatabaseError> {
        self.db.recompute_daily_aggregate(date)
    }

    fn annotate_session(
        &mut self,
        session_id: i64,
        notes: Option<&str>,
        todo_id: Option<i64>,
    ) -> Result<(), DatabaseError> {
        self.db.annotate_session(session_id, notes, todo_id)
    }
}

fn counting_service(
    clock: &ManualClock,
    study_secs: u64,
) -> TimerService<CountingStore, Vec<Event>, Config, ManualClock> {
    TimerService::with_clock(clock.clone(), CountingStore::new(), Vec::new(), config(study_secs))
}

fn tick_n<S: SessionStore>(
    svc: &mut TimerService<S, Vec<Event>, Config, ManualClock>,
    clock: &ManualClock,
    n: u32,
) {
    for _ in 0..n {
        clock.advance_secs(1);
        svc.tick();
    }
}

#[test]
fn test_pause_accounting_is_recorded_as_running_time() {
    let clock = ManualClock::new(t0());
    let mut svc = counting_service(&clock, 20);

    svc.start("study").unwrap();
    tick_n(&mut svc, &clock, 5);
    svc.pause().unwrap();
    clock.advance_secs(3);
    svc.resume().unwrap();
    tick_n(&mut svc, &clock, 7);
    svc.stop(true).unwrap();

    let engine = svc.engine();
    assert_eq!(engine.elapsed_time(), 12);
    assert_eq!(engine.remaining_time(), 8);
    assert_eq!(engine.total_pause_duration(), 3);

    let recorded = svc.last_recorded().unwrap().clone();
    assert_eq!(recorded.actual_duration, 12);
    assert_eq!(recorded.date, t0().date());

    let session = svc.store().db.get_session(recorded.id).unwrap().unwrap();
    assert_eq!(session.start_time, t0());
    assert_eq!(session.planned_duration, 20);
}

#[test]
fn test_exactly_one_create_finalize_pair_per_run() {
    let clock = ManualClock::new(t0());
    let mut svc = counting_service(&clock, 30);

    svc.start("study").unwrap();
    tick_n(&mut svc, &clock, 2);
    for _ in 0..3 {
        svc.pause().unwrap();
        clock.advance_secs(10);
        svc.resume().unwrap();
        tick_n(&mut svc, &clock, 1);
    }
    svc.stop(true).unwrap();

    assert_eq!(svc.store().creates, 1);
    assert_eq!(svc.store().finalizes, 1);

    // A second stop is allowed from Finished but must not record again.
    svc.stop(true).unwrap();
    assert_eq!(svc.store().creates, 1);
    assert_eq!(svc.store().finalizes, 1);
}

#[test]
fn test_tick_completion_without_explicit_stop() {
    let clock = ManualClock::new(t0());
    let mut svc = counting_service(&clock, 3);

    svc.start("study").unwrap();
    tick_n(&mut svc, &clock, 3);

    assert_eq!(svc.state(), TimerState::Finished);
    let finished: Vec<_> = svc.sink().iter().filter(|e| e.is_finished()).collect();
    assert_eq!(
        finished,
        vec![&Event::Finished {
            timer_type: "study".into(),
            elapsed_seconds: 3,
            completed: true,
        }]
    );
    assert_eq!(svc.store().creates, 1);
}

#[test]
fn test_immediate_cancel_creates_no_session() {
    let clock = ManualClock::new(t0());
    let mut svc = counting_service(&clock, 30);

    svc.start("study").unwrap();
    svc.stop(false).unwrap();

    assert_eq!(svc.store().creates, 0);
    assert!(svc.last_recorded().is_none());
    assert!(svc
        .store()
        .db
        .get_daily_aggregate(t0().date())
        .unwrap()
        .is_none());
}

#[test]
fn test_two_study_sessions_roll_up_into_daily_stats() {
    let clock = ManualClock::new(t0());
    let mut svc = TimerService::with_clock(
        clock.clone(),
        Database::open_memory().unwrap(),
        Vec::new(),
        config(600),
    );

    svc.start("study").unwrap();
    tick_n(&mut svc, &clock, 600);
    assert_eq!(svc.state(), TimerState::Finished);

    svc.start_with_duration("study", 300).unwrap();
    tick_n(&mut svc, &clock, 300);

    let agg = svc
        .store()
        .get_daily_aggregate(t0().date())
        .unwrap()
        .unwrap();
    assert_eq!(agg.total_study_time, 900);
    assert_eq!(agg.session_count, 2);
    assert_eq!(agg.completion_rate, 1.0);

    let sessions = svc.store().get_daily_sessions(t0().date()).unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].actual_duration, Some(300));
}

#[test]
fn test_rest_runs_are_not_persisted() {
    let clock = ManualClock::new(t0());
    let mut svc = counting_service(&clock, 30);

    svc.start("rest").unwrap();
    tick_n(&mut svc, &clock, 5);

    assert_eq!(svc.state(), TimerState::Finished);
    assert_eq!(svc.store().creates, 0);
    assert!(svc.recorder().pending().is_none());
}
