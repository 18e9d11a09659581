use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;

/// Persisted reminder row. The schedule is stored as a JSON blob and
/// occurrences are stored as naive UTC timestamps.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reminder")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Text")]
    pub schedule: String,
    pub next_occurrence: Option<NaiveDateTime>,
    pub dispatched: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
