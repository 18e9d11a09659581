use chrono::Utc;
#[cfg(test)]
use mockall::automock;

use crate::err::Error;
use crate::reminder::Reminder;

/// Delivery channel for due reminders. Implementations must be safe to
/// share across the engine's ticks.
#[cfg_attr(test, automock)]
pub(crate) trait Notifier: Send + Sync {
    fn notify(&self, reminder: &Reminder) -> Result<(), Error>;
}

/// Prints reminders to standard output, one line per delivery.
pub(crate) struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notify(&self, reminder: &Reminder) -> Result<(), Error> {
        println!("{} - {}", Utc::now().to_rfc3339(), reminder.description);
        Ok(())
    }
}
