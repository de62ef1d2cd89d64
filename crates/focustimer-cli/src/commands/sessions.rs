use chrono::NaiveDate;
use clap::Subcommand;
use focustimer_core::storage::{Database, SessionFilter};
use focustimer_core::DatabaseError;

#[derive(Subcommand)]
pub enum SessionsAction {
    /// List sessions, newest first
    List {
        /// Only this date (YYYY-MM-DD)
        #[arg(long, conflicts_with_all = ["from", "to"])]
        date: Option<NaiveDate>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Timer type id
        #[arg(long = "type")]
        timer_type: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Show one session
    Show { id: i64 },
    /// Delete a session and refresh that day's stats
    Delete { id: i64 },
    /// Attach notes and/or a todo item to a session
    Annotate {
        id: i64,
        #[arg(long)]
        notes: Option<String>,
        /// Todo item id
        #[arg(long)]
        todo: Option<i64>,
    },
}

pub fn run(action: SessionsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        SessionsAction::List {
            date,
            from,
            to,
            timer_type,
            limit,
        } => {
            let filter = SessionFilter {
                start_date: date.or(from),
                end_date: date.or(to),
                timer_type,
                limit,
            };
            let sessions = db.get_session_history(&filter)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        SessionsAction::Show { id } => {
            let session = db.get_session(id)?.ok_or(DatabaseError::NotFound {
                entity: "session",
                id,
            })?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        SessionsAction::Delete { id } => {
            db.delete_session(id)?;
            println!("session {id} deleted");
        }
        SessionsAction::Annotate { id, notes, todo } => {
            if notes.is_none() && todo.is_none() {
                return Err("nothing to annotate: pass --notes and/or --todo".into());
            }
            db.annotate_session(id, notes.as_deref(), todo)?;
            println!("session {id} updated");
        }
    }
    Ok(())
}
