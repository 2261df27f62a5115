use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Bookings::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Bookings::BookingCode)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Bookings::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Bookings::TotalAmount)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Bookings::Status)
                            .string_len(20)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(Bookings::PaymentStatus)
                            .string_len(20)
                            .not_null()
                            .default("UNPAID"),
                    )
                    .col(ColumnDef::new(Bookings::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Bookings::UpdatedAt).big_integer())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BookingDetails::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BookingDetails::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BookingDetails::BookingId).uuid().not_null())
                    .col(ColumnDef::new(BookingDetails::ProductId).uuid().not_null())
                    .col(ColumnDef::new(BookingDetails::ProductName).string_len(100))
                    .col(ColumnDef::new(BookingDetails::Qty).integer().not_null())
                    .col(
                        ColumnDef::new(BookingDetails::PricePerUnit)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BookingDetails::SubTotal).double().not_null())
                    .col(
                        ColumnDef::new(BookingDetails::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BookingDetails::UpdatedAt).big_integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_details_booking")
                            .from(BookingDetails::Table, BookingDetails::BookingId)
                            .to(Bookings::Table, Bookings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_details_booking_id")
                    .table(BookingDetails::Table)
                    .col(BookingDetails::BookingId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BookingDetails::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Bookings {
    Table,
    Id,
    BookingCode,
    UserId,
    TotalAmount,
    Status,
    PaymentStatus,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum BookingDetails {
    Table,
    Id,
    BookingId,
    ProductId,
    ProductName,
    Qty,
    PricePerUnit,
    SubTotal,
    CreatedAt,
    UpdatedAt,
}
