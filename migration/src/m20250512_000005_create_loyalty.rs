use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250512_000001_create_users::User;
use super::m20250512_000004_create_trips::Trip;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(TierLevel::Enum)
                    .values([
                        TierLevel::Bronze,
                        TierLevel::Silver,
                        TierLevel::Gold,
                        TierLevel::Platinum,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(LoyaltyEntryType::Enum)
                    .values([LoyaltyEntryType::Earned, LoyaltyEntryType::Redeemed])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LoyaltyProfile::Table)
                    .if_not_exists()
                    .col(uuid(LoyaltyProfile::CustomerId).primary_key())
                    .col(big_integer(LoyaltyProfile::LifetimePoints).not_null())
                    .col(big_integer(LoyaltyProfile::AvailablePoints).not_null())
                    .col(double(LoyaltyProfile::TotalSpend).not_null())
                    .col(integer(LoyaltyProfile::TotalTrips).not_null())
                    .col(
                        ColumnDef::new(LoyaltyProfile::Tier)
                            .custom(TierLevel::Enum)
                            .not_null(),
                    )
                    .col(
                        timestamp_with_time_zone(LoyaltyProfile::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(LoyaltyProfile::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_loyalty_profile_customer")
                            .from(LoyaltyProfile::Table, LoyaltyProfile::CustomerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LoyaltyEntry::Table)
                    .if_not_exists()
                    .col(uuid(LoyaltyEntry::Id).primary_key())
                    .col(uuid(LoyaltyEntry::CustomerId).not_null())
                    .col(
                        ColumnDef::new(LoyaltyEntry::EntryType)
                            .custom(LoyaltyEntryType::Enum)
                            .not_null(),
                    )
                    .col(big_integer(LoyaltyEntry::Points).not_null())
                    .col(uuid_null(LoyaltyEntry::TripId))
                    .col(
                        timestamp_with_time_zone(LoyaltyEntry::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_loyalty_entry_customer")
                            .from(LoyaltyEntry::Table, LoyaltyEntry::CustomerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_loyalty_entry_trip")
                            .from(LoyaltyEntry::Table, LoyaltyEntry::TripId)
                            .to(Trip::Table, Trip::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LoyaltyEntry::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(LoyaltyProfile::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(LoyaltyEntryType::Enum).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(TierLevel::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum LoyaltyProfile {
    Table,
    CustomerId,
    LifetimePoints,
    AvailablePoints,
    TotalSpend,
    TotalTrips,
    Tier,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum LoyaltyEntry {
    Table,
    Id,
    CustomerId,
    EntryType,
    Points,
    TripId,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum TierLevel {
    #[sea_orm(iden = "tier_level")]
    Enum,
    #[sea_orm(iden = "bronze")]
    Bronze,
    #[sea_orm(iden = "silver")]
    Silver,
    #[sea_orm(iden = "gold")]
    Gold,
    #[sea_orm(iden = "platinum")]
    Platinum,
}

#[derive(DeriveIden)]
pub enum LoyaltyEntryType {
    #[sea_orm(iden = "loyalty_entry_type")]
    Enum,
    #[sea_orm(iden = "earned")]
    Earned,
    #[sea_orm(iden = "redeemed")]
    Redeemed,
}
