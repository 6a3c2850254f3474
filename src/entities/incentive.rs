use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "incentive_kind")]
pub enum IncentiveKind {
    #[sea_orm(string_value = "quest")]
    Quest,
    #[sea_orm(string_value = "peak_bonus")]
    PeakBonus,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "incentive_status")]
pub enum IncentiveStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "claimed")]
    Claimed,
    #[sea_orm(string_value = "expired")]
    Expired,
}

impl IncentiveStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, IncentiveStatus::Claimed | IncentiveStatus::Expired)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "incentive")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub driver_id: Uuid,
    pub title: String,
    pub kind: IncentiveKind,
    pub target_value: i32,
    pub current_value: i32,
    pub bonus_amount: f64,
    pub status: IncentiveStatus,
    /// Peak-bonus only: JSON array of `{start_hour, end_hour}` windows.
    pub peak_hours: Option<Json>,
    pub starts_at: DateTimeWithTimeZone,
    pub expires_at: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub claimed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::DriverId",
        to = "super::user::Column::Id"
    )]
    Driver,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Driver.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
