//! SQLite-based session storage and statistics.
//!
//! Provides persistent storage for:
//! - Timer sessions (created and finalised by the session recorder)
//! - Daily and per-type statistics, recomputed from the sessions of a date
//! - Todo items that sessions can be linked to

use std::path::Path;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{data_dir, migrations, STUDY};
use crate::error::DatabaseError;
use crate::stats::{compute_daily_aggregate, DailyAggregate};

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

const SESSION_COLUMNS: &str = "id, date, start_time, end_time, timer_type, planned_duration,
     actual_duration, completed, notes, todo_id, todo_content";

/// A persisted timer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub start_time: NaiveDateTime,
    /// `None` until the session is finalised.
    pub end_time: Option<NaiveDateTime>,
    pub timer_type: String,
    pub planned_duration: u64,
    /// Running time in seconds, set at finalisation.
    pub actual_duration: Option<u64>,
    pub completed: bool,
    pub notes: Option<String>,
    pub todo_id: Option<i64>,
    /// Copied from the todo when the link was made.
    pub todo_content: Option<String>,
}

/// Filter for [`Database::get_session_history`].
#[derive(Debug, Clone)]
pub struct SessionFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub timer_type: Option<String>,
    pub limit: u32,
}

impl Default for SessionFilter {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            timer_type: None,
            limit: 100,
        }
    }
}

/// Usage of one timer type over a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerTypeUsage {
    pub timer_type: String,
    pub total_usage: u64,
    pub total_time: u64,
    pub avg_daily_usage: f64,
}

/// Which daily total a series is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    Study,
    Rest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: i64,
    pub date: NaiveDate,
    pub content: String,
    pub completed: bool,
    pub priority: i64,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

/// Partial update for a todo item.
#[derive(Debug, Clone, Default)]
pub struct TodoUpdate {
    pub content: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<i64>,
}

/// Rows removed by [`Database::clean_old_data`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupSummary {
    pub sessions_deleted: usize,
    pub daily_deleted: usize,
    pub type_deleted: usize,
}

fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

fn fmt_datetime(at: NaiveDateTime) -> String {
    at.format(DATETIME_FMT).to_string()
}

fn parse_date(idx: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_datetime(idx: usize, s: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    let end_time: Option<String> = row.get(3)?;
    Ok(SessionRecord {
        id: row.get(0)?,
        date: parse_date(1, &row.get::<_, String>(1)?)?,
        start_time: parse_datetime(2, &row.get::<_, String>(2)?)?,
        end_time: end_time.as_deref().map(|s| parse_datetime(3, s)).transpose()?,
        timer_type: row.get(4)?,
        planned_duration: row.get(5)?,
        actual_duration: row.get(6)?,
        completed: row.get(7)?,
        notes: row.get(8)?,
        todo_id: row.get(9)?,
        todo_content: row.get(10)?,
    })
}

fn row_to_todo(row: &Row<'_>) -> rusqlite::Result<TodoItem> {
    let completed_at: Option<String> = row.get(6)?;
    Ok(TodoItem {
        id: row.get(0)?,
        date: parse_date(1, &row.get::<_, String>(1)?)?,
        content: row.get(2)?,
        completed: row.get(3)?,
        priority: row.get(4)?,
        created_at: parse_datetime(5, &row.get::<_, String>(5)?)?,
        completed_at: completed_at
            .as_deref()
            .map(|s| parse_datetime(6, s))
            .transpose()?,
    })
}

fn row_to_daily(row: &Row<'_>) -> rusqlite::Result<DailyAggregate> {
    Ok(DailyAggregate {
        date: parse_date(0, &row.get::<_, String>(0)?)?,
        total_study_time: row.get(1)?,
        total_rest_time: row.get(2)?,
        session_count: row.get(3)?,
        completion_rate: row.get(4)?,
    })
}

/// First day of a `days`-long window ending on `today` (inclusive).
fn window_start(days: u32, today: NaiveDate) -> NaiveDate {
    today - Duration::days(i64::from(days.max(1)) - 1)
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/focustimer.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let dir = data_dir().map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Self::open_at(&dir.join("focustimer.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        debug!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        migrations::migrate(&self.conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    // ── Sessions ─────────────────────────────────────────────────────

    /// Insert an unfinalised session. The date is derived from `start_time`.
    pub fn create_session(
        &self,
        timer_type: &str,
        planned_duration: u64,
        start_time: NaiveDateTime,
    ) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO study_sessions (date, start_time, timer_type, planned_duration, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                fmt_date(start_time.date()),
                fmt_datetime(start_time),
                timer_type,
                planned_duration,
                fmt_datetime(now()),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(id, timer_type, planned_duration, "session created");
        Ok(id)
    }

    /// Close a session with its running time and refresh that date's statistics.
    pub fn finalize_session(
        &self,
        session_id: i64,
        completed: bool,
        actual_duration: u64,
    ) -> Result<(), DatabaseError> {
        let date = self.session_date(session_id)?;
        self.conn.execute(
            "UPDATE study_sessions
             SET end_time = ?1, actual_duration = ?2, completed = ?3
             WHERE id = ?4",
            params![fmt_datetime(now()), actual_duration, completed, session_id],
        )?;
        self.recompute_daily_aggregate(date)?;
        info!(id = session_id, actual_duration, completed, "session finalised");
        Ok(())
    }

    /// Attach notes and/or a todo link to a session after the fact.
    ///
    /// The todo's current content is copied into the session.
    pub fn annotate_session(
        &self,
        session_id: i64,
        notes: Option<&str>,
        todo_id: Option<i64>,
    ) -> Result<(), DatabaseError> {
        self.session_date(session_id)?;

        if let Some(notes) = notes {
            self.update_session_notes(session_id, notes)?;
        }
        if let Some(todo_id) = todo_id {
            let todo = self.get_todo_item(todo_id)?.ok_or(DatabaseError::NotFound {
                entity: "todo",
                id: todo_id,
            })?;
            self.conn.execute(
                "UPDATE study_sessions SET todo_id = ?1, todo_content = ?2 WHERE id = ?3",
                params![todo.id, todo.content, session_id],
            )?;
            info!(id = session_id, todo_id, "session linked to todo");
        }
        Ok(())
    }

    pub fn update_session_notes(&self, session_id: i64, notes: &str) -> Result<(), DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE study_sessions SET notes = ?1 WHERE id = ?2",
            params![notes, session_id],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "session",
                id: session_id,
            });
        }
        Ok(())
    }

    /// Delete a session and refresh the statistics of its date.
    pub fn delete_session(&self, session_id: i64) -> Result<(), DatabaseError> {
        let date = self.session_date(session_id)?;
        self.conn
            .execute("DELETE FROM study_sessions WHERE id = ?1", params![session_id])?;
        self.recompute_daily_aggregate(date)?;
        info!(id = session_id, %date, "session deleted");
        Ok(())
    }

    pub fn get_session(&self, session_id: i64) -> Result<Option<SessionRecord>, DatabaseError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM study_sessions WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![session_id], row_to_session)
            .optional()?)
    }

    /// Study sessions of `date`, newest first.
    pub fn get_daily_sessions(&self, date: NaiveDate) -> Result<Vec<SessionRecord>, DatabaseError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM study_sessions
             WHERE date = ?1 AND timer_type = ?2
             ORDER BY start_time DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![fmt_date(date), STUDY], row_to_session)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Sessions matching `filter`, newest first.
    pub fn get_session_history(
        &self,
        filter: &SessionFilter,
    ) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut conditions = vec!["1=1".to_string()];
        let mut values: Vec<Value> = Vec::new();

        if let Some(start) = filter.start_date {
            values.push(Value::Text(fmt_date(start)));
            conditions.push(format!("date >= ?{}", values.len()));
        }
        if let Some(end) = filter.end_date {
            values.push(Value::Text(fmt_date(end)));
            conditions.push(format!("date <= ?{}", values.len()));
        }
        if let Some(timer_type) = &filter.timer_type {
            values.push(Value::Text(timer_type.clone()));
            conditions.push(format!("timer_type = ?{}", values.len()));
        }
        values.push(Value::Integer(i64::from(filter.limit)));

        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM study_sessions
             WHERE {}
             ORDER BY start_time DESC, id DESC
             LIMIT ?{}",
            conditions.join(" AND "),
            values.len()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_session)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn session_date(&self, session_id: i64) -> Result<NaiveDate, DatabaseError> {
        let date: Option<String> = self
            .conn
            .query_row(
                "SELECT date FROM study_sessions WHERE id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?;
        let date = date.ok_or(DatabaseError::NotFound {
            entity: "session",
            id: session_id,
        })?;
        Ok(parse_date(0, &date)?)
    }

    // ── Aggregates ───────────────────────────────────────────────────

    /// Rebuild the daily and per-type statistics of `date` from its sessions.
    ///
    /// Replaces whatever was stored for the date before.
    pub fn recompute_daily_aggregate(
        &self,
        date: NaiveDate,
    ) -> Result<DailyAggregate, DatabaseError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM study_sessions
             WHERE date = ?1 AND actual_duration IS NOT NULL"
        );
        let sessions = {
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params![fmt_date(date)], row_to_session)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let (daily, per_type) = compute_daily_aggregate(date, &sessions);
        let day = fmt_date(date);

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM timer_type_stats WHERE date = ?1", params![day])?;
        for group in &per_type {
            tx.execute(
                "INSERT INTO timer_type_stats (timer_type, date, usage_count, total_time)
                 VALUES (?1, ?2, ?3, ?4)",
                params![group.timer_type, day, group.session_count, group.completed_time],
            )?;
        }
        tx.execute(
            "INSERT OR REPLACE INTO daily_stats
             (date, total_study_time, total_rest_time, session_count, completion_rate, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                day,
                daily.total_study_time,
                daily.total_rest_time,
                daily.session_count,
                daily.completion_rate,
                fmt_datetime(now()),
            ],
        )?;
        tx.commit()?;

        debug!(%date, sessions = daily.session_count, "daily statistics recomputed");
        Ok(daily)
    }

    pub fn get_daily_aggregate(
        &self,
        date: NaiveDate,
    ) -> Result<Option<DailyAggregate>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT date, total_study_time, total_rest_time, session_count, completion_rate
                 FROM daily_stats WHERE date = ?1",
                params![fmt_date(date)],
                row_to_daily,
            )
            .optional()?)
    }

    /// Stored daily statistics between `start` and `end` inclusive, oldest first.
    pub fn get_daily_stats(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyAggregate>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT date, total_study_time, total_rest_time, session_count, completion_rate
             FROM daily_stats
             WHERE date BETWEEN ?1 AND ?2
             ORDER BY date",
        )?;
        let rows = stmt.query_map(params![fmt_date(start), fmt_date(end)], row_to_daily)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Daily statistics of the last `days` days ending on `today`.
    pub fn get_recent_stats(
        &self,
        days: u32,
        today: NaiveDate,
    ) -> Result<Vec<DailyAggregate>, DatabaseError> {
        self.get_daily_stats(window_start(days, today), today)
    }

    pub fn get_completion_rate_trend(
        &self,
        days: u32,
        today: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, DatabaseError> {
        Ok(self
            .get_recent_stats(days, today)?
            .into_iter()
            .map(|d| (d.date, d.completion_rate))
            .collect())
    }

    /// Per-type usage over the last `days` days, ordered by type.
    pub fn get_timer_type_stats(
        &self,
        days: u32,
        today: NaiveDate,
    ) -> Result<Vec<TimerTypeUsage>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT timer_type,
                    COALESCE(SUM(usage_count), 0),
                    COALESCE(SUM(total_time), 0),
                    COALESCE(AVG(usage_count), 0.0)
             FROM timer_type_stats
             WHERE date BETWEEN ?1 AND ?2
             GROUP BY timer_type
             ORDER BY timer_type",
        )?;
        let rows = stmt.query_map(
            params![fmt_date(window_start(days, today)), fmt_date(today)],
            |row| {
                Ok(TimerTypeUsage {
                    timer_type: row.get(0)?,
                    total_usage: row.get(1)?,
                    total_time: row.get(2)?,
                    avg_daily_usage: row.get(3)?,
                })
            },
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Seconds of completed study, optionally bounded by date.
    pub fn get_total_study_time(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<u64, DatabaseError> {
        let mut sql = String::from(
            "SELECT COALESCE(SUM(actual_duration), 0) FROM study_sessions
             WHERE timer_type = ?1 AND completed = 1",
        );
        let mut values: Vec<Value> = vec![Value::Text(STUDY.to_string())];
        if let Some(start) = start {
            values.push(Value::Text(fmt_date(start)));
            sql.push_str(&format!(" AND date >= ?{}", values.len()));
        }
        if let Some(end) = end {
            values.push(Value::Text(fmt_date(end)));
            sql.push_str(&format!(" AND date <= ?{}", values.len()));
        }
        Ok(self
            .conn
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?)
    }

    /// One entry per day of the window, oldest first; days without data are 0.
    pub fn get_last_n_days(
        &self,
        days: u32,
        today: NaiveDate,
        kind: StatKind,
    ) -> Result<Vec<(NaiveDate, u64)>, DatabaseError> {
        let stats = self.get_recent_stats(days, today)?;
        let mut series = Vec::new();
        let mut day = window_start(days, today);
        while day <= today {
            let value = stats
                .iter()
                .find(|s| s.date == day)
                .map(|s| match kind {
                    StatKind::Study => s.total_study_time,
                    StatKind::Rest => s.total_rest_time,
                })
                .unwrap_or(0);
            series.push((day, value));
            day += Duration::days(1);
        }
        Ok(series)
    }

    // ── Todos ────────────────────────────────────────────────────────

    pub fn add_todo_item(
        &self,
        content: &str,
        date: NaiveDate,
        priority: i64,
    ) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO todo_items (date, content, priority, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![fmt_date(date), content, priority, fmt_datetime(now())],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_todo_item(&self, todo_id: i64) -> Result<Option<TodoItem>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, date, content, completed, priority, created_at, completed_at
                 FROM todo_items WHERE id = ?1",
                params![todo_id],
                row_to_todo,
            )
            .optional()?)
    }

    /// Todos of `date`: open items first, then by priority (high first).
    pub fn get_todo_items(
        &self,
        date: NaiveDate,
        include_completed: bool,
    ) -> Result<Vec<TodoItem>, DatabaseError> {
        let filter = if include_completed {
            ""
        } else {
            " AND completed = 0"
        };
        let sql = format!(
            "SELECT id, date, content, completed, priority, created_at, completed_at
             FROM todo_items
             WHERE date = ?1{filter}
             ORDER BY completed ASC, priority DESC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![fmt_date(date)], row_to_todo)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn update_todo_item(&self, todo_id: i64, update: TodoUpdate) -> Result<(), DatabaseError> {
        if self.get_todo_item(todo_id)?.is_none() {
            return Err(DatabaseError::NotFound {
                entity: "todo",
                id: todo_id,
            });
        }

        let tx = self.conn.unchecked_transaction()?;
        if let Some(content) = update.content {
            tx.execute(
                "UPDATE todo_items SET content = ?1 WHERE id = ?2",
                params![content, todo_id],
            )?;
        }
        if let Some(completed) = update.completed {
            let completed_at = completed.then(|| fmt_datetime(now()));
            tx.execute(
                "UPDATE todo_items SET completed = ?1, completed_at = ?2 WHERE id = ?3",
                params![completed, completed_at, todo_id],
            )?;
        }
        if let Some(priority) = update.priority {
            tx.execute(
                "UPDATE todo_items SET priority = ?1 WHERE id = ?2",
                params![priority, todo_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Sessions linked to the todo keep their copied content.
    pub fn delete_todo_item(&self, todo_id: i64) -> Result<(), DatabaseError> {
        let changed = self
            .conn
            .execute("DELETE FROM todo_items WHERE id = ?1", params![todo_id])?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "todo",
                id: todo_id,
            });
        }
        Ok(())
    }

    // ── Maintenance ──────────────────────────────────────────────────

    /// Delete sessions and statistics older than `retention_days` before `today`.
    pub fn clean_old_data(
        &self,
        retention_days: u32,
        today: NaiveDate,
    ) -> Result<CleanupSummary, DatabaseError> {
        let cutoff = fmt_date(today - Duration::days(i64::from(retention_days)));

        let tx = self.conn.unchecked_transaction()?;
        let summary = CleanupSummary {
            sessions_deleted: tx
                .execute("DELETE FROM study_sessions WHERE date < ?1", params![cutoff])?,
            daily_deleted: tx.execute("DELETE FROM daily_stats WHERE date < ?1", params![cutoff])?,
            type_deleted: tx.execute(
                "DELETE FROM timer_type_stats WHERE date < ?1",
                params![cutoff],
            )?,
        };
        tx.commit()?;
        self.conn.execute_batch("VACUUM")?;

        info!(
            sessions = summary.sessions_deleted,
            daily = summary.daily_deleted,
            types = summary.type_deleted,
            "old data cleaned"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn at(d: u32, h: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, 0, 0).unwrap()
    }

    fn record(db: &Database, timer_type: &str, start: NaiveDateTime, secs: u64, done: bool) -> i64 {
        let id = db.create_session(timer_type, 1500, start).unwrap();
        db.finalize_session(id, done, secs).unwrap();
        id
    }

    #[test]
    fn create_then_finalize() {
        let db = Database::open_memory().unwrap();
        let id = db.create_session("study", 1500, at(3, 9)).unwrap();

        let pending = db.get_session(id).unwrap().unwrap();
        assert_eq!(pending.date, day(3));
        assert!(pending.end_time.is_none());
        assert!(pending.actual_duration.is_none());

        db.finalize_session(id, true, 1200).unwrap();
        let done = db.get_session(id).unwrap().unwrap();
        assert_eq!(done.actual_duration, Some(1200));
        assert!(done.completed);
        assert!(done.end_time.is_some());
    }

    #[test]
    fn finalize_unknown_session_is_not_found() {
        let db = Database::open_memory().unwrap();
        assert!(matches!(
            db.finalize_session(42, true, 10),
            Err(DatabaseError::NotFound { id: 42, .. })
        ));
    }

    #[test]
    fn aggregate_follows_finalize_and_delete() {
        let db = Database::open_memory().unwrap();
        let first = record(&db, "study", at(3, 9), 600, true);
        record(&db, "study", at(3, 11), 300, true);

        let agg = db.get_daily_aggregate(day(3)).unwrap().unwrap();
        assert_eq!(agg.total_study_time, 900);
        assert_eq!(agg.session_count, 2);
        assert_eq!(agg.completion_rate, 1.0);

        db.delete_session(first).unwrap();
        let agg = db.get_daily_aggregate(day(3)).unwrap().unwrap();
        assert_eq!(agg.total_study_time, 300);
        assert_eq!(agg.session_count, 1);
    }

    #[test]
    fn unfinalised_sessions_do_not_count() {
        let db = Database::open_memory().unwrap();
        db.create_session("study", 1500, at(3, 9)).unwrap();
        let agg = db.recompute_daily_aggregate(day(3)).unwrap();
        assert_eq!(agg, DailyAggregate::empty(day(3)));
    }

    #[test]
    fn recompute_is_idempotent_and_replaces_type_rows() {
        let db = Database::open_memory().unwrap();
        record(&db, "study", at(4, 9), 600, true);
        let id = record(&db, "reading", at(4, 10), 100, true);

        let a = db.recompute_daily_aggregate(day(4)).unwrap();
        let b = db.recompute_daily_aggregate(day(4)).unwrap();
        assert_eq!(a, b);
        assert_eq!(db.get_timer_type_stats(7, day(4)).unwrap().len(), 2);

        db.delete_session(id).unwrap();
        let types = db.get_timer_type_stats(7, day(4)).unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].timer_type, "study");
    }

    #[test]
    fn daily_sessions_are_study_only_newest_first() {
        let db = Database::open_memory().unwrap();
        record(&db, "study", at(5, 8), 100, true);
        record(&db, "rest", at(5, 9), 100, true);
        record(&db, "study", at(5, 10), 100, false);

        let sessions = db.get_daily_sessions(day(5)).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].start_time, at(5, 10));
        assert!(sessions.iter().all(|s| s.timer_type == "study"));
    }

    #[test]
    fn history_filters_by_range_type_and_limit() {
        let db = Database::open_memory().unwrap();
        for d in 1..=5 {
            record(&db, "study", at(d, 9), 60, true);
        }
        record(&db, "rest", at(3, 10), 60, true);

        let filtered = db
            .get_session_history(&SessionFilter {
                start_date: Some(day(2)),
                end_date: Some(day(4)),
                timer_type: Some("study".into()),
                limit: 2,
            })
            .unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].date, day(4));
        assert_eq!(filtered[1].date, day(3));

        let all = db.get_session_history(&SessionFilter::default()).unwrap();
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn annotate_copies_todo_content() {
        let db = Database::open_memory().unwrap();
        let todo = db.add_todo_item("Read chapter 3", day(6), 1).unwrap();
        let id = record(&db, "study", at(6, 9), 900, true);

        db.annotate_session(id, Some("good focus"), Some(todo)).unwrap();
        db.delete_todo_item(todo).unwrap();

        let session = db.get_session(id).unwrap().unwrap();
        assert_eq!(session.notes.as_deref(), Some("good focus"));
        assert_eq!(session.todo_id, Some(todo));
        assert_eq!(session.todo_content.as_deref(), Some("Read chapter 3"));
    }

    #[test]
    fn annotate_rejects_missing_rows() {
        let db = Database::open_memory().unwrap();
        assert!(db.annotate_session(1, Some("x"), None).is_err());
        let id = record(&db, "study", at(6, 9), 900, true);
        assert!(matches!(
            db.annotate_session(id, None, Some(99)),
            Err(DatabaseError::NotFound { entity: "todo", .. })
        ));
    }

    #[test]
    fn todo_ordering_and_updates() {
        let db = Database::open_memory().unwrap();
        let low = db.add_todo_item("low", day(7), 0).unwrap();
        let high = db.add_todo_item("high", day(7), 2).unwrap();
        db.add_todo_item("other day", day(8), 0).unwrap();

        let items = db.get_todo_items(day(7), true).unwrap();
        assert_eq!(items.iter().map(|t| t.id).collect::<Vec<_>>(), vec![high, low]);

        db.update_todo_item(
            high,
            TodoUpdate {
                completed: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        let items = db.get_todo_items(day(7), true).unwrap();
        assert_eq!(items[0].id, low);
        assert!(items[1].completed);
        assert!(items[1].completed_at.is_some());

        assert_eq!(db.get_todo_items(day(7), false).unwrap().len(), 1);

        db.update_todo_item(
            low,
            TodoUpdate {
                content: Some("renamed".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(db.get_todo_item(low).unwrap().unwrap().content, "renamed");
        assert!(db.update_todo_item(999, TodoUpdate::default()).is_err());
    }

    #[test]
    fn last_n_days_is_zero_filled() {
        let db = Database::open_memory().unwrap();
        record(&db, "study", at(10, 9), 600, true);
        record(&db, "rest", at(12, 9), 120, true);

        let study = db.get_last_n_days(3, day(12), StatKind::Study).unwrap();
        assert_eq!(study, vec![(day(10), 600), (day(11), 0), (day(12), 0)]);
        let rest = db.get_last_n_days(3, day(12), StatKind::Rest).unwrap();
        assert_eq!(rest[2], (day(12), 120));
    }

    #[test]
    fn totals_and_trend() {
        let db = Database::open_memory().unwrap();
        record(&db, "study", at(10, 9), 600, true);
        record(&db, "study", at(11, 9), 400, false);
        record(&db, "study", at(12, 9), 200, true);

        assert_eq!(db.get_total_study_time(None, None).unwrap(), 800);
        assert_eq!(db.get_total_study_time(Some(day(11)), None).unwrap(), 200);

        let trend = db.get_completion_rate_trend(3, day(12)).unwrap();
        assert_eq!(trend, vec![(day(10), 1.0), (day(11), 0.0), (day(12), 1.0)]);
    }

    #[test]
    fn clean_old_data_drops_rows_before_cutoff() {
        let db = Database::open_memory().unwrap();
        record(&db, "study", at(1, 9), 60, true);
        record(&db, "study", at(20, 9), 60, true);

        let summary = db.clean_old_data(10, day(25)).unwrap();
        assert_eq!(summary.sessions_deleted, 1);
        assert_eq!(summary.daily_deleted, 1);
        assert_eq!(summary.type_deleted, 1);
        assert_eq!(db.get_session_history(&SessionFilter::default()).unwrap().len(), 1);
    }
}
