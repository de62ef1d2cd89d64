use chrono::{NaiveDate, NaiveDateTime};

use crate::error::DatabaseError;
use crate::stats::DailyAggregate;
use crate::storage::Database;

/// Persistence interface used by the session recorder.
///
/// [`Database`] is the production implementation; tests substitute mocks.
pub trait SessionStore {
    /// Insert an unfinalised session and return its id.
    fn create_session(
        &mut self,
        timer_type: &str,
        planned_duration: u64,
        start_time: NaiveDateTime,
    ) -> Result<i64, DatabaseError>;

    fn finalize_session(
        &mut self,
        session_id: i64,
        completed: bool,
        actual_duration: u64,
    ) -> Result<(), DatabaseError>;

    fn recompute_daily_aggregate(&mut self, date: NaiveDate)
        -> Result<DailyAggregate, DatabaseError>;

    /// Attach notes and/or a todo link to an already finalised session.
    fn annotate_session(
        &mut self,
        session_id: i64,
        notes: Option<&str>,
        todo_id: Option<i64>,
    ) -> Result<(), DatabaseError>;
}

impl SessionStore for Database {
    fn create_session(
        &mut self,
        timer_type: &str,
        planned_duration: u64,
        start_time: NaiveDateTime,
    ) -> Result<i64, DatabaseError> {
        Database::create_session(self, timer_type, planned_duration, start_time)
    }

    fn finalize_session(
        &mut self,
        session_id: i64,
        completed: bool,
        actual_duration: u64,
    ) -> Result<(), DatabaseError> {
        Database::finalize_session(self, session_id, completed, actual_duration)
    }

    fn recompute_daily_aggregate(
        &mut self,
        date: NaiveDate,
    ) -> Result<DailyAggregate, DatabaseError> {
        Database::recompute_daily_aggregate(self, date)
    }

    fn annotate_session(
        &mut self,
        session_id: i64,
        notes: Option<&str>,
        todo_id: Option<i64>,
    ) -> Result<(), DatabaseError> {
        Database::annotate_session(self, session_id, notes, todo_id)
    }
}

impl<S: SessionStore + ?Sized> SessionStore for &mut S {
    fn create_session(
        &mut self,
        timer_type: &str,
        planned_duration: u64,
        start_time: NaiveDateTime,
    ) -> Result<i64, DatabaseError> {
        (**self).create_session(timer_type, planned_duration, start_time)
    }

    fn finalize_session(
        &mut self,
        session_id: i64,
        completed: bool,
        actual_duration: u64,
    ) -> Result<(), DatabaseError> {
        (**self).finalize_session(session_id, completed, actual_duration)
    }

    fn recompute_daily_aggregate(
        &mut self,
        date: NaiveDate,
    ) -> Result<DailyAggregate, DatabaseError> {
        (**self).recompute_daily_aggregate(date)
    }

    fn annotate_session(
        &mut self,
        session_id: i64,
        notes: Option<&str>,
        todo_id: Option<i64>,
    ) -> Result<(), DatabaseError> {
        (**self).annotate_session(session_id, notes, todo_id)
    }
}
