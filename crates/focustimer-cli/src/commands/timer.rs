use std::io::Write;

use clap::Subcommand;
use focustimer_core::storage::{Config, Database};
use focustimer_core::{format_time, Event, TimerDriver, TimerService, TimerState};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run a timer in the foreground until it finishes (Ctrl-C stops early)
    Run {
        /// Timer type id (defaults to the configured current type)
        timer_type: Option<String>,
        /// Override the configured duration, in seconds
        #[arg(long)]
        duration: Option<u64>,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// List configured timer types
    Types,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Run {
            timer_type,
            duration,
            json,
        } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(run_foreground(timer_type, duration, json))
        }
        TimerAction::Types => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(config.timer_types())?);
            Ok(())
        }
    }
}

async fn run_foreground(
    timer_type: Option<String>,
    duration: Option<u64>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let show_seconds = config.ui.show_seconds;
    let type_id = timer_type.unwrap_or_else(|| config.timer.current_type.clone());

    debug!(type_id = %type_id, ?duration, "running timer in foreground");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let driver = TimerDriver::new(TimerService::new(Database::open()?, tx, config));

    match duration {
        Some(secs) => driver.start_with_duration(&type_id, secs).await?,
        None => driver.start(&type_id).await?,
    }

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                print_event(&event, json, show_seconds)?;
                if event.is_finished() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted, stopping timer");
                driver.stop(false).await?;
            }
        }
    }

    // Completion side effects or an auto-started next run follow the finish.
    if matches!(driver.state().await, TimerState::Running | TimerState::Paused) {
        driver.reset().await;
    }
    while let Ok(event) = rx.try_recv() {
        if matches!(event, Event::PlaySound { .. } | Event::Notify { .. }) {
            print_event(&event, json, show_seconds)?;
        }
    }

    let service = driver.service();
    let service = service.lock().await;
    if let Some(recorded) = service.last_recorded() {
        if json {
            println!("{}", serde_json::to_string(recorded)?);
        } else {
            println!(
                "recorded session #{} ({})",
                recorded.id,
                format_time(recorded.actual_duration as i64, true)
            );
        }
    }
    Ok(())
}

fn print_event(
    event: &Event,
    json: bool,
    show_seconds: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    match event {
        Event::Started {
            timer_type,
            planned_duration,
            ..
        } => println!(
            "started {timer_type} ({})",
            format_time(*planned_duration as i64, show_seconds)
        ),
        Event::StateChanged { state } => println!("state: {state}"),
        Event::Progress {
            remaining,
            progress,
            ..
        } => println!(
            "{}  {:>3.0}%",
            format_time(*remaining as i64, show_seconds),
            progress * 100.0
        ),
        Event::Finished {
            timer_type,
            elapsed_seconds,
            completed,
        } => println!(
            "{} {timer_type} after {}",
            if *completed { "finished" } else { "stopped" },
            format_time(*elapsed_seconds as i64, true)
        ),
        Event::PlaySound { .. } => {
            print!("\x07");
            std::io::stdout().flush()?;
        }
        Event::Notify {
            timer_name,
            elapsed_seconds,
            ..
        } => println!(
            "{timer_name} complete ({})",
            format_time(*elapsed_seconds as i64, true)
        ),
    }
    Ok(())
}
