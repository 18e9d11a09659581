//! Dispatch orchestrator: sweeps persisted reminders into a consistent
//! state, keeps an in-memory queue of pending occurrences and notifies the
//! user when their instants arrive.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

#[cfg(not(test))]
use crate::db::Database;
#[cfg(test)]
use crate::db::MockDatabase as Database;
use crate::err::Error;
use crate::notify::Notifier;
use crate::queue::UniqueHeapQueue;
use crate::reminder::{
    self, NewReminder, Occurrence, Reminder, Scenario,
};

const CREATE_MAX_ATTEMPTS: u32 = 10;

/// Persist a new reminder under a freshly generated id, regenerating the
/// id on a uniqueness conflict. Any other storage error aborts the loop.
pub(crate) async fn create_reminder(
    db: &Database,
    new_reminder: NewReminder,
) -> Result<Reminder, Error> {
    for _ in 0..CREATE_MAX_ATTEMPTS {
        let rem = new_reminder
            .clone()
            .into_reminder(reminder::generate_reminder_id());
        match db.insert_reminder(&rem).await {
            Ok(()) => return Ok(rem),
            Err(Error::ReminderIdMustBeUnique(id)) => {
                log::warn!("reminder id {id} is already taken, retrying");
            }
            Err(err) => return Err(err),
        }
    }
    Err(Error::UnexpectedScenario(format!(
        "could not generate a unique reminder id in {CREATE_MAX_ATTEMPTS} attempts"
    )))
}

/// Walk every persisted reminder and repair its lifecycle state: reminders
/// awaiting an occurrence get one calculated and stored, invalid reminders
/// are deleted. Returns the occurrences calculated along the way so the
/// caller can queue them.
pub(crate) async fn sweep_reminders(
    db: &Database,
    now: Occurrence,
) -> Result<Vec<Occurrence>, Error> {
    log::info!("processing reminders: started");
    let mut calculated = Vec::new();
    for rem in db.get_all_reminders().await? {
        match reminder::identify_scenario(&rem, now) {
            Scenario::AwaitingNextOccurrence => {
                let updated = reminder::calculate_next_occurrence(&rem);
                db.upsert_reminder(&updated).await?;
                if let Some(occurrence) = updated.next_occurrence {
                    calculated.push(occurrence);
                }
            }
            Scenario::InvalidReminder => {
                log::error!(
                    "deleting reminder {} found in an invalid state",
                    rem.id
                );
                db.delete_reminder(&rem.id).await?;
            }
            Scenario::ReminderToBeDispatched
            | Scenario::DispatchedReminder => {}
        }
    }
    log::info!("processing reminders: ended");
    Ok(calculated)
}

/// Notify about one reminder and mark it dispatched. Returns whether the
/// notification went out; a failed dispatch-mark is logged but does not
/// undo a delivered notification.
pub(crate) async fn dispatch_one(
    db: &Database,
    notifier: &dyn Notifier,
    rem: &Reminder,
) -> bool {
    if let Err(err) = notifier.notify(rem) {
        log::error!("failed to notify about reminder {}: {err}", rem.id);
        return false;
    }
    let dispatched = Reminder {
        dispatched: true,
        ..rem.clone()
    };
    if let Err(err) = db.upsert_reminder(&dispatched).await {
        log::error!(
            "failed to mark reminder {} as dispatched: {err}",
            rem.id
        );
    }
    true
}

/// One-shot dispatch of everything already due, bypassing the queue.
pub(crate) async fn dispatch_due_reminders(
    db: &Database,
    notifier: &dyn Notifier,
    now: Occurrence,
) -> Result<(), Error> {
    for rem in db.get_due_reminders(now).await? {
        dispatch_one(db, notifier, &rem).await;
    }
    Ok(())
}

pub(crate) struct Engine {
    db: Arc<Database>,
    notifier: Box<dyn Notifier>,
    queue: UniqueHeapQueue,
    tick_delta: Duration,
    last_tick: DateTime<Utc>,
}

impl Engine {
    /// The first tick covers occurrences up to `now`, so anything already
    /// overdue at startup is dispatched immediately.
    pub(crate) fn new(
        db: Arc<Database>,
        notifier: Box<dyn Notifier>,
        tick_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<Self, Error> {
        let tick_delta = i64::try_from(tick_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                Error::UnexpectedScenario(format!(
                    "tick interval of {tick_seconds}s is out of range"
                ))
            })?;
        Ok(Self {
            db,
            notifier,
            queue: UniqueHeapQueue::new(),
            tick_delta,
            last_tick: now - tick_delta,
        })
    }

    /// Rebuild the queue from the repository. Reminders that have not been
    /// swept yet fall back to the occurrence their schedule implies.
    pub(crate) async fn reload(&mut self) -> Result<(), Error> {
        let occurrences = self
            .db
            .get_all_reminders()
            .await?
            .into_iter()
            .filter(|rem| !rem.dispatched)
            .map(|rem| {
                rem.next_occurrence
                    .unwrap_or_else(|| rem.schedule.next_occurrence())
            })
            .collect();
        self.queue.add(occurrences);
        Ok(())
    }

    pub(crate) async fn create(
        &mut self,
        new_reminder: NewReminder,
    ) -> Result<Reminder, Error> {
        let rem = create_reminder(&self.db, new_reminder).await?;
        self.queue.add(vec![rem.schedule.next_occurrence()]);
        Ok(rem)
    }

    #[allow(dead_code)]
    pub(crate) async fn snooze(
        &mut self,
        id: &str,
        until: Occurrence,
    ) -> Result<Option<Reminder>, Error> {
        let Some(rem) = self.db.get_reminder(id).await? else {
            return Ok(None);
        };
        let snoozed = reminder::snooze_until(&rem, until);
        self.db.upsert_reminder(&snoozed).await?;
        self.queue.add(vec![until]);
        Ok(Some(snoozed))
    }

    pub(crate) async fn sweep(
        &mut self,
        now: Occurrence,
    ) -> Result<(), Error> {
        let calculated = sweep_reminders(&self.db, now).await?;
        self.queue.add(calculated);
        Ok(())
    }

    /// Advance one tick: pop every occurrence up to the tick boundary,
    /// resolve them to their still-undispatched reminders and notify. An
    /// occurrence whose notification failed goes back on the queue, so
    /// delivery is at-least-once rather than silently dropped.
    pub(crate) async fn tick(&mut self) -> Result<(), Error> {
        let next_tick = self.last_tick + self.tick_delta;
        let due = self.queue.pop_occurrences(next_tick);
        let reminders = match self.db.get_undispatched_at(&due).await {
            Ok(reminders) => reminders,
            Err(err) => {
                // The pop already happened; put the occurrences back so
                // the next tick retries them.
                self.queue.add(due);
                return Err(err);
            }
        };
        for rem in &reminders {
            let delivered =
                dispatch_one(&self.db, self.notifier.as_ref(), rem).await;
            if !delivered {
                if let Some(occurrence) = rem.next_occurrence {
                    self.queue.add(vec![occurrence]);
                }
            }
        }
        self.last_tick = next_tick;
        Ok(())
    }

    /// Sweep-then-tick forever. Transient failures are logged and retried
    /// on the next iteration instead of taking the daemon down.
    pub(crate) async fn run(mut self) -> Result<(), Error> {
        let period = self.tick_delta.to_std().map_err(|err| {
            Error::UnexpectedScenario(format!(
                "tick interval is not a valid sleep period: {err}"
            ))
        })?;
        loop {
            if let Err(err) = self.sweep(Utc::now()).await {
                log::error!("sweep failed: {err}");
            }
            if let Err(err) = self.tick().await {
                log::error!("tick failed: {err}");
            }
            tokio::time::sleep(period).await;
        }
    }
}
