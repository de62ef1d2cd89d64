use clap::Subcommand;
use focustimer_core::storage::{Config, TimerType, TimerTypeUpdate};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "timer.auto_switch", "ui.show_seconds")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
    /// Manage timer types
    Type {
        #[command(subcommand)]
        action: TypeAction,
    },
}

#[derive(Subcommand)]
pub enum TypeAction {
    /// Add a timer type
    Add {
        id: String,
        name: String,
        #[arg(long)]
        minutes: u64,
        #[arg(long, default_value = "#9E9E9E")]
        color: String,
    },
    /// Change a timer type
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        minutes: Option<u64>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Remove a timer type (study and rest are built in)
    Remove { id: String },
    /// Make a timer type the current one
    Select { id: String },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => {
                    eprintln!("unknown key: {key}");
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
        ConfigAction::Type { action } => run_type(action)?,
    }
    Ok(())
}

fn run_type(action: TypeAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;

    match action {
        TypeAction::Add {
            id,
            name,
            minutes,
            color,
        } => {
            if minutes == 0 {
                return Err("duration must be at least one minute".into());
            }
            config.add_timer_type(TimerType::new(&id, &name, minutes * 60, &color))?;
            println!("timer type {id} added");
        }
        TypeAction::Edit {
            id,
            name,
            minutes,
            color,
        } => {
            let update = TimerTypeUpdate {
                name,
                duration: minutes.map(|m| m * 60),
                color,
            };
            if !config.update_timer_type(&id, update) {
                return Err(format!("unknown timer type: {id}").into());
            }
            println!("timer type {id} updated");
        }
        TypeAction::Remove { id } => {
            config.remove_timer_type(&id)?;
            println!("timer type {id} removed");
        }
        TypeAction::Select { id } => {
            config.set_current_timer_type(&id)?;
            println!("current timer type: {id}");
        }
    }

    config.save()?;
    Ok(())
}
