use std::{ffi::OsString, path::PathBuf};

use clap::{Parser, Subcommand};
use directories::BaseDirs;

lazy_static::lazy_static! {
    pub(crate) static ref CLI: Cli = parse_args();
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    #[arg(
        short,
        long,
        env = "OYE_DB",
        value_name = "FILE",
        help = "Path to the SQLite database file (tries to create if not exists)",
        default_value = get_default_database_file()
    )]
    pub(crate) database: PathBuf,
    #[arg(
        short,
        long,
        env = "OYE_SQLITE_MAX_CONNECTIONS",
        value_name = "NUMBER",
        help = "Maximum number of connections to the SQLite database",
        default_value = "1"
    )]
    pub(crate) sqlite_max_connections: u32,
    #[arg(
        short,
        long,
        env = "OYE_TICK_INTERVAL",
        value_name = "SECONDS",
        help = "Seconds between scheduler ticks",
        default_value = "5"
    )]
    pub(crate) tick_interval: u64,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Create a reminder from a plain-text utterance
    Add {
        utterance: String,
        #[arg(
            short,
            long,
            value_name = "OFFSET",
            help = "UTC offset anchoring absolute times, e.g. +02:00 or Z",
            default_value_t = local_utc_offset()
        )]
        timezone: String,
    },
    /// List all reminders
    List,
    /// Delete a reminder by its id
    Delete { id: String },
    /// Recalculate the lifecycle state of every stored reminder
    Sweep,
    /// Notify about every reminder currently due, then exit
    Dispatch,
    /// Run the scheduler daemon
    Run,
}

pub(crate) fn parse_args() -> Cli {
    Cli::parse()
}

fn get_default_database_file() -> OsString {
    let db_name = "oye_db.sqlite";
    match BaseDirs::new() {
        Some(base_dirs) => base_dirs.data_dir().join(db_name).into(),
        None => db_name.into(),
    }
}

/// The machine's own UTC offset, taken from the fixed-width suffix of an
/// RFC 3339 local timestamp.
fn local_utc_offset() -> String {
    let now = chrono::Local::now().to_rfc3339();
    now[now.len() - 6..].to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_local_utc_offset_is_a_valid_timezone() {
        let offset = local_utc_offset();
        assert!(oye_parser::infer_timezone(&offset).is_ok());
    }

    #[test]
    fn test_args_parse() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
