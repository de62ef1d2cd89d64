//! Statistics for recorded sessions.
//!
//! Daily figures are never updated incrementally: they are recomputed from
//! the session rows of a date, so recomputing twice gives the same result.

mod daily;

pub use daily::{compute_daily_aggregate, DailyAggregate, TypeAggregate};
