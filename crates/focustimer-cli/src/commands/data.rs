use clap::Subcommand;
use focustimer_core::storage::{Config, Database};

use super::today;

#[derive(Subcommand)]
pub enum DataAction {
    /// Delete sessions and stats older than the retention period
    Clean {
        /// Defaults to statistics.data_retention_days
        #[arg(long)]
        retention_days: Option<u32>,
    },
}

pub fn run(action: DataAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        DataAction::Clean { retention_days } => {
            let days = match retention_days {
                Some(days) => days,
                None => Config::load()?.statistics.data_retention_days,
            };
            let summary = Database::open()?.clean_old_data(days, today())?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
