use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "reservation_status")]
pub enum ReservationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl ReservationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Completed | ReservationStatus::Cancelled)
    }

    /// Statuses that hold the cab/driver exclusively for conflict purposes.
    pub fn blocks_resource(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Active)
    }

    pub fn can_transition_to(&self, next: &ReservationStatus) -> bool {
        matches!(
            (self, next),
            (ReservationStatus::Pending, ReservationStatus::Active)
                | (ReservationStatus::Pending, ReservationStatus::Cancelled)
                | (ReservationStatus::Active, ReservationStatus::Completed)
                | (ReservationStatus::Active, ReservationStatus::Cancelled)
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub cab_id: Uuid,
    pub customer_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub starts_at: DateTimeWithTimeZone,
    pub ends_at: DateTimeWithTimeZone,
    pub status: ReservationStatus,
    pub total_amount: f64,
    pub advance_amount: f64,
    #[sea_orm(unique)]
    pub idempotency_key: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cab::Entity",
        from = "Column::CabId",
        to = "super::cab::Column::Id"
    )]
    Cab,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CustomerId",
        to = "super::user::Column::Id"
    )]
    Customer,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::DriverId",
        to = "super::user::Column::Id"
    )]
    Driver,
}

impl Related<super::cab::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cab.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_activates_or_cancels_only() {
        let pending = ReservationStatus::Pending;
        assert!(pending.can_transition_to(&ReservationStatus::Active));
        assert!(pending.can_transition_to(&ReservationStatus::Cancelled));
        assert!(!pending.can_transition_to(&ReservationStatus::Completed));
        assert!(!pending.can_transition_to(&ReservationStatus::Pending));
    }

    #[test]
    fn terminal_statuses_are_final() {
        for terminal in [ReservationStatus::Completed, ReservationStatus::Cancelled] {
            for next in [
                ReservationStatus::Pending,
                ReservationStatus::Active,
                ReservationStatus::Completed,
                ReservationStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(&next));
            }
        }
    }

    #[test]
    fn only_pending_and_active_block_resources() {
        assert!(ReservationStatus::Pending.blocks_resource());
        assert!(ReservationStatus::Active.blocks_resource());
        assert!(!ReservationStatus::Completed.blocks_resource());
        assert!(!ReservationStatus::Cancelled.blocks_resource());
    }
}
