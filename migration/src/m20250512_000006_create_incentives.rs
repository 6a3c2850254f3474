use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250512_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(IncentiveKind::Enum)
                    .values([IncentiveKind::Quest, IncentiveKind::PeakBonus])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(IncentiveStatus::Enum)
                    .values([
                        IncentiveStatus::Active,
                        IncentiveStatus::Completed,
                        IncentiveStatus::Claimed,
                        IncentiveStatus::Expired,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Incentive::Table)
                    .if_not_exists()
                    .col(uuid(Incentive::Id).primary_key())
                    .col(uuid(Incentive::DriverId).not_null())
                    .col(string_len(Incentive::Title, 100).not_null())
                    .col(
                        ColumnDef::new(Incentive::Kind)
                            .custom(IncentiveKind::Enum)
                            .not_null(),
                    )
                    .col(integer(Incentive::TargetValue).not_null())
                    .col(integer(Incentive::CurrentValue).not_null())
                    .col(double(Incentive::BonusAmount).not_null())
                    .col(
                        ColumnDef::new(Incentive::Status)
                            .custom(IncentiveStatus::Enum)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Incentive::PeakHours).json_binary().null())
                    .col(timestamp_with_time_zone(Incentive::StartsAt).not_null())
                    .col(timestamp_with_time_zone(Incentive::ExpiresAt).not_null())
                    .col(timestamp_with_time_zone_null(Incentive::CompletedAt))
                    .col(timestamp_with_time_zone_null(Incentive::ClaimedAt))
                    .col(
                        timestamp_with_time_zone(Incentive::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_incentive_driver")
                            .from(Incentive::Table, Incentive::DriverId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Incentive::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(IncentiveStatus::Enum).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(IncentiveKind::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Incentive {
    Table,
    Id,
    DriverId,
    Title,
    Kind,
    TargetValue,
    CurrentValue,
    BonusAmount,
    Status,
    PeakHours,
    StartsAt,
    ExpiresAt,
    CompletedAt,
    ClaimedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum IncentiveKind {
    #[sea_orm(iden = "incentive_kind")]
    Enum,
    #[sea_orm(iden = "quest")]
    Quest,
    #[sea_orm(iden = "peak_bonus")]
    PeakBonus,
}

#[derive(DeriveIden)]
pub enum IncentiveStatus {
    #[sea_orm(iden = "incentive_status")]
    Enum,
    #[sea_orm(iden = "active")]
    Active,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "claimed")]
    Claimed,
    #[sea_orm(iden = "expired")]
    Expired,
}
