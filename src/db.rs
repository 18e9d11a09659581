use std::path::Path;

use chrono::NaiveDateTime;
#[cfg(test)]
use mockall::automock;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectOptions, Database as SeaOrmDatabase,
    DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, SqlErr,
};

use crate::cli::CLI;
use crate::entity::reminder;
use crate::err::Error;
use crate::migration::{Migrator, MigratorTrait};
use crate::reminder::{Occurrence, Reminder};

async fn get_db_pool(db_path: &Path) -> Result<DatabaseConnection, Error> {
    let db_str = format!("sqlite:{}?mode=rwc", db_path.display());
    let mut opts = ConnectOptions::new(&db_str);
    opts.max_connections(CLI.sqlite_max_connections);
    let pool = SeaOrmDatabase::connect(opts).await?;
    Ok(pool)
}

fn to_domain(model: reminder::Model) -> Result<Reminder, Error> {
    let schedule =
        serde_json::from_str(&model.schedule).map_err(|err| {
            Error::DataIntegrity(format!(
                "reminder {} has an undecodable schedule: {err}",
                model.id
            ))
        })?;
    Ok(Reminder {
        id: model.id,
        description: model.description,
        schedule,
        next_occurrence: model.next_occurrence.map(|t| t.and_utc()),
        dispatched: model.dispatched,
    })
}

fn to_active_model(
    rem: &Reminder,
) -> Result<reminder::ActiveModel, Error> {
    let schedule = serde_json::to_string(&rem.schedule).map_err(|err| {
        Error::DataIntegrity(format!(
            "reminder {} has an unencodable schedule: {err}",
            rem.id
        ))
    })?;
    Ok(reminder::ActiveModel {
        id: Set(rem.id.clone()),
        description: Set(rem.description.clone()),
        schedule: Set(schedule),
        next_occurrence: Set(rem.next_occurrence.map(|t| t.naive_utc())),
        dispatched: Set(rem.dispatched),
    })
}

/// The reminder repository. Per-id uniqueness is enforced by the database
/// primary key, and both dispatch-marking and snoozing serialize through
/// the same upsert statement.
pub(crate) struct Database {
    pool: DatabaseConnection,
}

#[cfg_attr(test, automock, allow(dead_code))]
impl Database {
    pub(crate) async fn new_with_path(db_path: &Path) -> Result<Self, Error> {
        get_db_pool(db_path).await.map(|pool| Self { pool })
    }

    pub(crate) async fn apply_migrations(&self) -> Result<(), Error> {
        Ok(Migrator::up(&self.pool, None).await?)
    }

    /// Insert a new reminder, failing on an id conflict. The conflict is
    /// detected by the insert itself, never by a prior read.
    pub(crate) async fn insert_reminder(
        &self,
        rem: &Reminder,
    ) -> Result<(), Error> {
        let model = to_active_model(rem)?;
        match reminder::Entity::insert(model).exec(&self.pool).await {
            Ok(_) => Ok(()),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    Err(Error::ReminderIdMustBeUnique(rem.id.clone()))
                }
                _ => Err(err.into()),
            },
        }
    }

    /// Insert-or-update keyed by id.
    pub(crate) async fn upsert_reminder(
        &self,
        rem: &Reminder,
    ) -> Result<(), Error> {
        let model = to_active_model(rem)?;
        reminder::Entity::insert(model)
            .on_conflict(
                OnConflict::column(reminder::Column::Id)
                    .update_columns([
                        reminder::Column::Description,
                        reminder::Column::Schedule,
                        reminder::Column::NextOccurrence,
                        reminder::Column::Dispatched,
                    ])
                    .to_owned(),
            )
            .exec(&self.pool)
            .await?;
        Ok(())
    }

    pub(crate) async fn get_all_reminders(
        &self,
    ) -> Result<Vec<Reminder>, Error> {
        reminder::Entity::find()
            .all(&self.pool)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    pub(crate) async fn get_reminder(
        &self,
        id: &str,
    ) -> Result<Option<Reminder>, Error> {
        let mut models = reminder::Entity::find()
            .filter(reminder::Column::Id.eq(id))
            .all(&self.pool)
            .await?;
        if models.len() > 1 {
            return Err(Error::DataIntegrity(format!(
                "found {} reminders sharing id {id}",
                models.len()
            )));
        }
        models.pop().map(to_domain).transpose()
    }

    /// Delete a reminder and return the deleted record, or `None` if no
    /// such reminder existed.
    pub(crate) async fn delete_reminder(
        &self,
        id: &str,
    ) -> Result<Option<Reminder>, Error> {
        let Some(deleted) = self.get_reminder(id).await? else {
            return Ok(None);
        };
        reminder::Entity::delete_by_id(id).exec(&self.pool).await?;
        if self.get_reminder(id).await?.is_some() {
            return Err(Error::DataIntegrity(format!(
                "reminder {id} is still readable after deletion"
            )));
        }
        Ok(Some(deleted))
    }

    /// Every reminder eligible for dispatch at `now`: not yet dispatched
    /// and `next_occurrence <= now`, ascending by occurrence.
    pub(crate) async fn get_due_reminders(
        &self,
        now: Occurrence,
    ) -> Result<Vec<Reminder>, Error> {
        reminder::Entity::find()
            .filter(reminder::Column::Dispatched.eq(false))
            .filter(
                reminder::Column::NextOccurrence.lte(now.naive_utc()),
            )
            .order_by_asc(reminder::Column::NextOccurrence)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    /// Resolve popped queue occurrences back to the not-yet-dispatched
    /// reminders scheduled at those exact instants, ascending by occurrence.
    pub(crate) async fn get_undispatched_at(
        &self,
        occurrences: &[Occurrence],
    ) -> Result<Vec<Reminder>, Error> {
        if occurrences.is_empty() {
            return Ok(Vec::new());
        }
        let times: Vec<NaiveDateTime> =
            occurrences.iter().map(|t| t.naive_utc()).collect();
        reminder::Entity::find()
            .filter(reminder::Column::Dispatched.eq(false))
            .filter(reminder::Column::NextOccurrence.is_in(times))
            .order_by_asc(reminder::Column::NextOccurrence)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }
}
