use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "cab_status")]
pub enum CabStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "rented")]
    Rented,
    #[sea_orm(string_value = "in_maintenance")]
    InMaintenance,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "vehicle_class")]
pub enum VehicleClass {
    #[sea_orm(string_value = "economy")]
    Economy,
    #[sea_orm(string_value = "sedan")]
    Sedan,
    #[sea_orm(string_value = "suv")]
    Suv,
    #[sea_orm(string_value = "luxury")]
    Luxury,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cab")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[sea_orm(unique)]
    pub plate: String,
    pub vehicle_class: VehicleClass,
    pub status: CabStatus,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::reservation::Entity")]
    Reservations,
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
