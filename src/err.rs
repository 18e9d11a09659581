use std::fmt;

use oye_parser::InferenceError;
use sea_orm::DbErr;

use crate::reminder::ReminderId;

#[derive(Debug)]
pub(crate) enum Error {
    Database(DbErr),
    Inference(InferenceError),
    ReminderIdMustBeUnique(ReminderId),
    DataIntegrity(String),
    Notification(String),
    UnexpectedScenario(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Database(ref err) => write!(f, "Database error: {err}"),
            Self::Inference(ref err) => write!(f, "Inference error: {err}"),
            Self::ReminderIdMustBeUnique(ref id) => {
                write!(f, "A reminder with id {id} already exists")
            }
            Self::DataIntegrity(ref reason) => {
                write!(f, "Data integrity error: {reason}")
            }
            Self::Notification(ref reason) => {
                write!(f, "Notification error: {reason}")
            }
            Self::UnexpectedScenario(ref reason) => {
                write!(f, "Unexpected scenario: {reason}")
            }
        }
    }
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        Self::Database(err)
    }
}

impl From<InferenceError> for Error {
    fn from(err: InferenceError) -> Self {
        Self::Inference(err)
    }
}
