use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250512_000001_create_users::User;
use super::m20250512_000002_create_cabs::Cab;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(ReservationStatus::Enum)
                    .values([
                        ReservationStatus::Pending,
                        ReservationStatus::Active,
                        ReservationStatus::Completed,
                        ReservationStatus::Cancelled,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Reservation::Table)
                    .if_not_exists()
                    .col(uuid(Reservation::Id).primary_key())
                    .col(uuid(Reservation::TenantId).not_null())
                    .col(uuid(Reservation::CabId).not_null())
                    .col(uuid(Reservation::CustomerId).not_null())
                    .col(uuid_null(Reservation::DriverId))
                    .col(timestamp_with_time_zone(Reservation::StartsAt).not_null())
                    .col(timestamp_with_time_zone(Reservation::EndsAt).not_null())
                    .col(
                        ColumnDef::new(Reservation::Status)
                            .custom(ReservationStatus::Enum)
                            .not_null(),
                    )
                    .col(double(Reservation::TotalAmount).not_null())
                    .col(double(Reservation::AdvanceAmount).not_null())
                    .col(string_len_null(Reservation::IdempotencyKey, 64).unique_key())
                    .col(
                        timestamp_with_time_zone(Reservation::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Reservation::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_cab")
                            .from(Reservation::Table, Reservation::CabId)
                            .to(Cab::Table, Cab::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_customer")
                            .from(Reservation::Table, Reservation::CustomerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_driver")
                            .from(Reservation::Table, Reservation::DriverId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Conflict scans filter by resource and window; index both axes.
        manager
            .create_index(
                Index::create()
                    .name("idx_reservation_cab_window")
                    .table(Reservation::Table)
                    .col(Reservation::CabId)
                    .col(Reservation::StartsAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservation_driver_window")
                    .table(Reservation::Table)
                    .col(Reservation::DriverId)
                    .col(Reservation::StartsAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reservation::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(ReservationStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Reservation {
    Table,
    Id,
    TenantId,
    CabId,
    CustomerId,
    DriverId,
    StartsAt,
    EndsAt,
    Status,
    TotalAmount,
    AdvanceAmount,
    IdempotencyKey,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum ReservationStatus {
    #[sea_orm(iden = "reservation_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "active")]
    Active,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
}
