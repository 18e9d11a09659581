//! Subcommand entry points wiring the CLI to the repository and engine.

use std::sync::Arc;

use chrono::Utc;

use crate::cli::{Command, CLI};
#[cfg(not(test))]
use crate::db::Database;
#[cfg(test)]
use crate::db::MockDatabase as Database;
use crate::engine::{self, Engine};
use crate::err::Error;
use crate::notify::StdoutNotifier;
use crate::reminder::NewReminder;

pub(crate) async fn run() -> Result<(), Error> {
    let db = Database::new_with_path(&CLI.database).await?;
    db.apply_migrations().await?;
    match &CLI.command {
        Command::Add {
            utterance,
            timezone,
        } => add_reminder(db, utterance, timezone).await,
        Command::List => list_reminders(db).await,
        Command::Delete { id } => delete_reminder(db, id).await,
        Command::Sweep => sweep_reminders(db).await,
        Command::Dispatch => dispatch_due_reminders(db).await,
        Command::Run => run_engine(db).await,
    }
}

async fn add_reminder(
    db: Database,
    utterance: &str,
    timezone: &str,
) -> Result<(), Error> {
    let tz = oye_parser::infer_timezone(timezone)?;
    let new_reminder = NewReminder::infer(utterance, Utc::now(), tz)?;
    let reminder = engine::create_reminder(&db, new_reminder).await?;
    println!(
        "Created reminder {}: {}",
        reminder.id, reminder.description
    );
    Ok(())
}

async fn list_reminders(db: Database) -> Result<(), Error> {
    let reminders = db.get_all_reminders().await?;
    if reminders.is_empty() {
        println!("There are no reminders");
        return Ok(());
    }
    println!("Reminders:");
    for reminder in reminders {
        println!("  {}  {}", reminder.id, reminder.description);
    }
    Ok(())
}

async fn delete_reminder(db: Database, id: &str) -> Result<(), Error> {
    match db.delete_reminder(id).await? {
        Some(reminder) => println!(
            "Successfully deleted reminder {}: {}",
            reminder.id, reminder.description
        ),
        None => println!("There is no reminder with id {id}"),
    }
    Ok(())
}

async fn sweep_reminders(db: Database) -> Result<(), Error> {
    engine::sweep_reminders(&db, Utc::now()).await?;
    Ok(())
}

async fn dispatch_due_reminders(db: Database) -> Result<(), Error> {
    engine::dispatch_due_reminders(&db, &StdoutNotifier, Utc::now()).await
}

async fn run_engine(db: Database) -> Result<(), Error> {
    let mut engine = Engine::new(
        Arc::new(db),
        Box::new(StdoutNotifier),
        CLI.tick_interval,
        Utc::now(),
    )?;
    engine.reload().await?;
    engine.run().await
}
