use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(CabStatus::Enum)
                    .values([CabStatus::Available, CabStatus::Rented, CabStatus::InMaintenance])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(VehicleClass::Enum)
                    .values([
                        VehicleClass::Economy,
                        VehicleClass::Sedan,
                        VehicleClass::Suv,
                        VehicleClass::Luxury,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Cab::Table)
                    .if_not_exists()
                    .col(uuid(Cab::Id).primary_key())
                    .col(uuid(Cab::TenantId).not_null())
                    .col(string_len(Cab::Plate, 20).not_null().unique_key())
                    .col(
                        ColumnDef::new(Cab::VehicleClass)
                            .custom(VehicleClass::Enum)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cab::Status)
                            .custom(CabStatus::Enum)
                            .not_null(),
                    )
                    .col(
                        timestamp_with_time_zone(Cab::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Cab::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(CabStatus::Enum).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(VehicleClass::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Cab {
    Table,
    Id,
    TenantId,
    Plate,
    VehicleClass,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum CabStatus {
    #[sea_orm(iden = "cab_status")]
    Enum,
    #[sea_orm(iden = "available")]
    Available,
    #[sea_orm(iden = "rented")]
    Rented,
    #[sea_orm(iden = "in_maintenance")]
    InMaintenance,
}

#[derive(DeriveIden)]
pub enum VehicleClass {
    #[sea_orm(iden = "vehicle_class")]
    Enum,
    #[sea_orm(iden = "economy")]
    Economy,
    #[sea_orm(iden = "sedan")]
    Sedan,
    #[sea_orm(iden = "suv")]
    Suv,
    #[sea_orm(iden = "luxury")]
    Luxury,
}
