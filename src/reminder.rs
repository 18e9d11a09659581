//! Domain model: reminders, their schedules and the lifecycle scenarios a
//! persisted reminder can be found in.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use oye_parser::InferenceError;

/// Opaque reminder identity, `rem_` followed by ten lowercase letters.
pub(crate) type ReminderId = String;

/// Moment in which the user gets notified regarding a specific reminder.
/// Two occurrences are equal iff they are the same instant.
pub(crate) type Occurrence = DateTime<Utc>;

const ID_PREFIX: &str = "rem";
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxz";
const ID_SUFFIX_LEN: usize = 10;

pub(crate) fn generate_reminder_id() -> ReminderId {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{ID_PREFIX}_{suffix}")
}

/// When a reminder's notifications must be triggered. Only single-shot
/// schedules exist today; a recurring variant is reserved and adding it
/// forces handling at every match site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum Schedule {
    Once { at: Occurrence },
}

impl Schedule {
    pub(crate) fn next_occurrence(&self) -> Occurrence {
        match self {
            Self::Once { at } => *at,
        }
    }
}

/// A `(description, schedule)` pair that has not been assigned an id yet.
/// It becomes a [`Reminder`] only at the moment of persistence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NewReminder {
    pub(crate) description: String,
    pub(crate) schedule: Schedule,
}

impl NewReminder {
    pub(crate) fn infer(
        utterance: &str,
        now: DateTime<Utc>,
        tz: chrono::FixedOffset,
    ) -> Result<Self, InferenceError> {
        let inference = oye_parser::infer_schedule(utterance, now, tz)?;
        Ok(Self {
            description: inference.description,
            schedule: Schedule::Once { at: inference.at },
        })
    }

    pub(crate) fn into_reminder(self, id: ReminderId) -> Reminder {
        Reminder {
            id,
            description: self.description,
            schedule: self.schedule,
            next_occurrence: None,
            dispatched: false,
        }
    }
}

/// A task the user must be reminded about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Reminder {
    pub(crate) id: ReminderId,
    pub(crate) description: String,
    pub(crate) schedule: Schedule,
    pub(crate) next_occurrence: Option<Occurrence>,
    pub(crate) dispatched: bool,
}

/// Lifecycle classification of a persisted reminder, derived purely from
/// `(next_occurrence, dispatched, now)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scenario {
    /// `next_occurrence` has not been calculated yet.
    AwaitingNextOccurrence,
    /// Due or pending; eligible for dispatch once `now >= next_occurrence`.
    ReminderToBeDispatched,
    /// Already notified, nothing to do.
    DispatchedReminder,
    /// A state that must never occur: dispatched without an occurrence, or
    /// dispatched before its occurrence arrived.
    InvalidReminder,
}

pub(crate) fn identify_scenario(
    reminder: &Reminder,
    now: Occurrence,
) -> Scenario {
    match (reminder.next_occurrence, reminder.dispatched) {
        (None, true) => Scenario::InvalidReminder,
        (None, false) => Scenario::AwaitingNextOccurrence,
        (Some(next), true) if now >= next => Scenario::DispatchedReminder,
        (Some(_), true) => Scenario::InvalidReminder,
        (Some(_), false) => Scenario::ReminderToBeDispatched,
    }
}

/// Fill in `next_occurrence` from the schedule. For a `Once` schedule the
/// next occurrence is always its instant.
pub(crate) fn calculate_next_occurrence(reminder: &Reminder) -> Reminder {
    Reminder {
        next_occurrence: Some(reminder.schedule.next_occurrence()),
        ..reminder.clone()
    }
}

/// Push `next_occurrence` until a specific timestamp, as opposed to a time
/// delta from the instant the user requests the snooze. Description and
/// schedule are untouched.
pub(crate) fn snooze_until(
    reminder: &Reminder,
    until: Occurrence,
) -> Reminder {
    Reminder {
        next_occurrence: Some(until),
        dispatched: false,
        ..reminder.clone()
    }
}
