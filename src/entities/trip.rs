use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::cab::VehicleClass;

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "trip_status")]
pub enum TripStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl TripStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: &TripStatus) -> bool {
        match (self, next) {
            (TripStatus::Pending, TripStatus::Accepted) => true,
            (TripStatus::Accepted, TripStatus::InProgress) => true,
            (TripStatus::InProgress, TripStatus::Completed) => true,
            // Cancellation is allowed from any non-terminal state.
            (from, TripStatus::Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trip")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub cab_id: Option<Uuid>,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub vehicle_class: VehicleClass,
    pub status: TripStatus,
    #[serde(skip_serializing)]
    pub otp: i32,
    pub distance_km: f64,
    pub estimated_fare: f64,
    pub actual_fare: Option<f64>,
    pub surge_multiplier: f64,
    #[sea_orm(unique)]
    pub idempotency_key: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub accepted_at: Option<DateTimeWithTimeZone>,
    pub started_at: Option<DateTimeWithTimeZone>,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub cancelled_at: Option<DateTimeWithTimeZone>,
    pub cancelled_by: Option<Uuid>,
    pub cancel_reason: Option<String>,
    pub customer_rating: Option<i32>,
    pub customer_feedback: Option<String>,
    pub driver_rating: Option<i32>,
    pub driver_feedback: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
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
    #[sea_orm(
        belongs_to = "super::cab::Entity",
        from = "Column::CabId",
        to = "super::cab::Column::Id"
    )]
    Cab,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_lifecycle_moves_forward_only() {
        assert!(TripStatus::Pending.can_transition_to(&TripStatus::Accepted));
        assert!(TripStatus::Accepted.can_transition_to(&TripStatus::InProgress));
        assert!(TripStatus::InProgress.can_transition_to(&TripStatus::Completed));

        assert!(!TripStatus::Pending.can_transition_to(&TripStatus::InProgress));
        assert!(!TripStatus::Pending.can_transition_to(&TripStatus::Completed));
        assert!(!TripStatus::Accepted.can_transition_to(&TripStatus::Completed));
        assert!(!TripStatus::InProgress.can_transition_to(&TripStatus::Accepted));
    }

    #[test]
    fn cancellable_from_any_non_terminal_state() {
        assert!(TripStatus::Pending.can_transition_to(&TripStatus::Cancelled));
        assert!(TripStatus::Accepted.can_transition_to(&TripStatus::Cancelled));
        assert!(TripStatus::InProgress.can_transition_to(&TripStatus::Cancelled));

        assert!(!TripStatus::Completed.can_transition_to(&TripStatus::Cancelled));
        assert!(!TripStatus::Cancelled.can_transition_to(&TripStatus::Cancelled));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for terminal in [TripStatus::Completed, TripStatus::Cancelled] {
            for next in [
                TripStatus::Pending,
                TripStatus::Accepted,
                TripStatus::InProgress,
                TripStatus::Completed,
                TripStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(&next));
            }
        }
    }
}
