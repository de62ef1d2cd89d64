pub mod config;
pub mod data;
pub mod sessions;
pub mod stats;
pub mod timer;
pub mod todo;

/// Today's date in local time.
pub fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
