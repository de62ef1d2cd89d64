use chrono::NaiveDate;
use clap::Subcommand;
use focustimer_core::storage::{Database, TodoUpdate};
use serde_json::json;

use super::today;

#[derive(Subcommand)]
pub enum TodoAction {
    /// Add a todo item
    Add {
        content: String,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Higher comes first
        #[arg(long, default_value_t = 0)]
        priority: i64,
    },
    /// List todo items of a date
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Include completed items
        #[arg(long)]
        all: bool,
    },
    /// Mark an item as done
    Done { id: i64 },
    /// Mark an item as not done
    Undo { id: i64 },
    /// Change an item's content and/or priority
    Edit {
        id: i64,
        content: Option<String>,
        #[arg(long)]
        priority: Option<i64>,
    },
    /// Remove an item
    Rm { id: i64 },
}

pub fn run(action: TodoAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        TodoAction::Add {
            content,
            date,
            priority,
        } => {
            let id = db.add_todo_item(&content, date.unwrap_or_else(today), priority)?;
            println!("{}", json!({ "id": id }));
        }
        TodoAction::List { date, all } => {
            let items = db.get_todo_items(date.unwrap_or_else(today), all)?;
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        TodoAction::Done { id } => {
            db.update_todo_item(
                id,
                TodoUpdate {
                    completed: Some(true),
                    ..Default::default()
                },
            )?;
            println!("todo {id} done");
        }
        TodoAction::Undo { id } => {
            db.update_todo_item(
                id,
                TodoUpdate {
                    completed: Some(false),
                    ..Default::default()
                },
            )?;
            println!("todo {id} reopened");
        }
        TodoAction::Edit {
            id,
            content,
            priority,
        } => {
            db.update_todo_item(
                id,
                TodoUpdate {
                    content,
                    completed: None,
                    priority,
                },
            )?;
            println!("todo {id} updated");
        }
        TodoAction::Rm { id } => {
            db.delete_todo_item(id)?;
            println!("todo {id} removed");
        }
    }
    Ok(())
}
