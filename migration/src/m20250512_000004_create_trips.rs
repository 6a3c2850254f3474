use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250512_000001_create_users::User;
use super::m20250512_000002_create_cabs::{Cab, VehicleClass};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(TripStatus::Enum)
                    .values([
                        TripStatus::Pending,
                        TripStatus::Accepted,
                        TripStatus::InProgress,
                        TripStatus::Completed,
                        TripStatus::Cancelled,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Trip::Table)
                    .if_not_exists()
                    .col(uuid(Trip::Id).primary_key())
                    .col(uuid(Trip::CustomerId).not_null())
                    .col(uuid_null(Trip::DriverId))
                    .col(uuid_null(Trip::CabId))
                    .col(double(Trip::PickupLat).not_null())
                    .col(double(Trip::PickupLng).not_null())
                    .col(double(Trip::DropoffLat).not_null())
                    .col(double(Trip::DropoffLng).not_null())
                    .col(
                        ColumnDef::new(Trip::VehicleClass)
                            .custom(VehicleClass::Enum)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Trip::Status)
                            .custom(TripStatus::Enum)
                            .not_null(),
                    )
                    .col(integer(Trip::Otp).not_null())
                    .col(double(Trip::DistanceKm).not_null())
                    .col(double(Trip::EstimatedFare).not_null())
                    .col(double_null(Trip::ActualFare))
                    .col(double(Trip::SurgeMultiplier).not_null())
                    .col(string_len_null(Trip::IdempotencyKey, 64).unique_key())
                    .col(
                        timestamp_with_time_zone(Trip::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(Trip::AcceptedAt))
                    .col(timestamp_with_time_zone_null(Trip::StartedAt))
                    .col(timestamp_with_time_zone_null(Trip::CompletedAt))
                    .col(timestamp_with_time_zone_null(Trip::CancelledAt))
                    .col(uuid_null(Trip::CancelledBy))
                    .col(string_len_null(Trip::CancelReason, 255))
                    .col(integer_null(Trip::CustomerRating))
                    .col(string_len_null(Trip::CustomerFeedback, 500))
                    .col(integer_null(Trip::DriverRating))
                    .col(string_len_null(Trip::DriverFeedback, 500))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trip_customer")
                            .from(Trip::Table, Trip::CustomerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trip_driver")
                            .from(Trip::Table, Trip::DriverId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trip_cab")
                            .from(Trip::Table, Trip::CabId)
                            .to(Cab::Table, Cab::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Trip::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(TripStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Trip {
    Table,
    Id,
    CustomerId,
    DriverId,
    CabId,
    PickupLat,
    PickupLng,
    DropoffLat,
    DropoffLng,
    VehicleClass,
    Status,
    Otp,
    DistanceKm,
    EstimatedFare,
    ActualFare,
    SurgeMultiplier,
    IdempotencyKey,
    CreatedAt,
    AcceptedAt,
    StartedAt,
    CompletedAt,
    CancelledAt,
    CancelledBy,
    CancelReason,
    CustomerRating,
    CustomerFeedback,
    DriverRating,
    DriverFeedback,
}

#[derive(DeriveIden)]
pub enum TripStatus {
    #[sea_orm(iden = "trip_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "accepted")]
    Accepted,
    #[sea_orm(iden = "in_progress")]
    InProgress,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
}
