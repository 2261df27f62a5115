use sea_orm_migration::prelude::*;

/// Detail rows keep the position they had in the request.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(BookingDetails::Table)
                    .add_column(
                        ColumnDef::new(BookingDetails::LineNo)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_details_booking_line")
                    .table(BookingDetails::Table)
                    .col(BookingDetails::BookingId)
                    .col(BookingDetails::LineNo)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_booking_details_booking_line")
                    .table(BookingDetails::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(BookingDetails::Table)
                    .drop_column(BookingDetails::LineNo)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum BookingDetails {
    Table,
    BookingId,
    LineNo,
}
