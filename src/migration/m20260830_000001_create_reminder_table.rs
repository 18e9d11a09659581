use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reminder::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reminder::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Reminder::Description)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Reminder::Schedule).text().not_null())
                    .col(ColumnDef::new(Reminder::NextOccurrence).date_time())
                    .col(
                        ColumnDef::new(Reminder::Dispatched)
                            .boolean()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reminder::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Reminder {
    Table,
    Id,
    Description,
    Schedule,
    NextOccurrence,
    Dispatched,
}
