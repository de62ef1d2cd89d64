//! Per-date rollup of sessions.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::storage::{SessionRecord, REST, STUDY};

/// Derived statistics for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    /// Seconds of completed `study` sessions.
    pub total_study_time: u64,
    /// Seconds of completed `rest` sessions.
    pub total_rest_time: u64,
    pub session_count: u64,
    /// Unweighted mean of the per-type completion rates (0.0 to 1.0).
    pub completion_rate: f64,
}

impl DailyAggregate {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_study_time: 0,
            total_rest_time: 0,
            session_count: 0,
            completion_rate: 0.0,
        }
    }
}

/// Statistics for one timer type on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAggregate {
    pub timer_type: String,
    pub session_count: u64,
    /// Sum of `actual_duration` over completed sessions.
    pub completed_time: u64,
    /// Sum of `actual_duration` over all sessions.
    pub total_time: u64,
    pub completion_rate: f64,
}

/// Roll up the finalised sessions of `date`.
///
/// Sessions from other dates, and sessions without an `actual_duration`
/// (not finalised yet), are ignored. Groups are ordered by timer type.
pub fn compute_daily_aggregate(
    date: NaiveDate,
    sessions: &[SessionRecord],
) -> (DailyAggregate, Vec<TypeAggregate>) {
    // (count, completed_count, completed_time, total_time)
    let mut groups: BTreeMap<&str, (u64, u64, u64, u64)> = BTreeMap::new();

    for session in sessions.iter().filter(|s| s.date == date) {
        let Some(actual) = session.actual_duration else {
            continue;
        };
        let entry = groups.entry(session.timer_type.as_str()).or_default();
        entry.0 += 1;
        entry.3 += actual;
        if session.completed {
            entry.1 += 1;
            entry.2 += actual;
        }
    }

    let per_type: Vec<TypeAggregate> = groups
        .into_iter()
        .map(|(timer_type, (count, completed, completed_time, total_time))| TypeAggregate {
            timer_type: timer_type.to_string(),
            session_count: count,
            completed_time,
            total_time,
            completion_rate: completed as f64 / count as f64,
        })
        .collect();

    let mut daily = DailyAggregate::empty(date);
    for group in &per_type {
        match group.timer_type.as_str() {
            STUDY => daily.total_study_time += group.completed_time,
            REST => daily.total_rest_time += group.completed_time,
            _ => {}
        }
        daily.session_count += group.session_count;
    }
    if !per_type.is_empty() {
        let sum: f64 = per_type.iter().map(|g| g.completion_rate).sum();
        daily.completion_rate = sum / per_type.len() as f64;
    }

    (daily, per_type)
}
