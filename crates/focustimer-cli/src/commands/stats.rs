use chrono::NaiveDate;
use clap::Subcommand;
use focustimer_core::storage::{Database, StatKind};
use focustimer_core::DailyAggregate;
use serde_json::json;

use super::today;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today,
    /// Stats for one date (YYYY-MM-DD)
    Day { date: NaiveDate },
    /// Daily stats for the last N days
    Recent {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Completion rate per day
    Trend {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Usage per timer type
    Types {
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// Per-day study (or rest) seconds, including empty days
    Series {
        #[arg(long, default_value_t = 7)]
        days: u32,
        /// Rest time instead of study time
        #[arg(long)]
        rest: bool,
    },
    /// Total completed study time
    Total {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

fn day_stats(db: &Database, date: NaiveDate) -> Result<DailyAggregate, Box<dyn std::error::Error>> {
    Ok(db
        .get_daily_aggregate(date)?
        .unwrap_or_else(|| DailyAggregate::empty(date)))
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        StatsAction::Today => {
            let stats = day_stats(&db, today())?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Day { date } => {
            let stats = day_stats(&db, date)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Recent { days } => {
            let stats = db.get_recent_stats(days, today())?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Trend { days } => {
            let trend: Vec<_> = db
                .get_completion_rate_trend(days, today())?
                .into_iter()
                .map(|(date, rate)| json!({ "date": date, "completion_rate": rate }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&trend)?);
        }
        StatsAction::Types { days } => {
            let usage = db.get_timer_type_stats(days, today())?;
            println!("{}", serde_json::to_string_pretty(&usage)?);
        }
        StatsAction::Series { days, rest } => {
            let kind = if rest { StatKind::Rest } else { StatKind::Study };
            let series: Vec<_> = db
                .get_last_n_days(days, today(), kind)?
                .into_iter()
                .map(|(date, seconds)| json!({ "date": date, "seconds": seconds }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&series)?);
        }
        StatsAction::Total { from, to } => {
            let seconds = db.get_total_study_time(from, to)?;
            println!("{}", json!({ "total_study_time": seconds }));
        }
    }
    Ok(())
}
