use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::cab::{self, CabStatus, VehicleClass};
use crate::entities::incentive::{self, IncentiveKind, IncentiveStatus};
use crate::entities::reservation::{self, ReservationStatus};
use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::services::incentives::PeakWindow;
use crate::utils::jwt::Claims;
use crate::AppState;

// ============ Fleet Management ============

#[derive(Debug, Deserialize)]
pub struct CreateCabRequest {
    pub plate: String,
    pub vehicle_class: VehicleClass,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCabStatusRequest {
    pub status: CabStatus,
}

#[derive(Debug, Serialize)]
pub struct CabResponse {
    pub id: Uuid,
    pub plate: String,
    pub vehicle_class: VehicleClass,
    pub status: CabStatus,
    pub created_at: DateTime<Utc>,
}

impl From<cab::Model> for CabResponse {
    fn from(m: cab::Model) -> Self {
        Self {
            id: m.id,
            plate: m.plate,
            vehicle_class: m.vehicle_class,
            status: m.status,
            created_at: m.created_at.with_timezone(&Utc),
        }
    }
}

/// Register a cab in the caller's tenant fleet
pub async fn create_cab(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCabRequest>,
) -> AppResult<Json<CabResponse>> {
    if payload.plate.trim().is_empty() {
        return Err(AppError::Validation("Plate must not be empty".to_string()));
    }

    let existing = cab::Entity::find()
        .filter(cab::Column::Plate.eq(payload.plate.trim()))
        .one(&state.db)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict("Plate already registered".to_string()));
    }

    let new_cab = cab::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(claims.tenant_id),
        plate: Set(payload.plate.trim().to_string()),
        vehicle_class: Set(payload.vehicle_class),
        status: Set(CabStatus::Available),
        ..Default::default()
    };

    let cab = new_cab.insert(&state.db).await?;

    Ok(Json(CabResponse::from(cab)))
}

/// List the tenant's cabs
pub async fn list_cabs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<CabResponse>>> {
    let cabs = cab::Entity::find()
        .filter(cab::Column::TenantId.eq(claims.tenant_id))
        .all(&state.db)
        .await?;

    Ok(Json(cabs.into_iter().map(CabResponse::from).collect()))
}

/// Put a cab into or out of maintenance. `rented` is derived from bookings
/// and cannot be set directly; leaving maintenance recomputes it from the
/// cab's active reservations.
pub async fn update_cab_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(cab_id): Path<Uuid>,
    Json(payload): Json<UpdateCabStatusRequest>,
) -> AppResult<Json<CabResponse>> {
    let cab = cab::Entity::find_by_id(cab_id)
        .one(&state.db)
        .await?
        .filter(|c| c.tenant_id == claims.tenant_id)
        .ok_or_else(|| AppError::NotFound("Cab not found".to_string()))?;

    let desired = match payload.status {
        CabStatus::Rented => {
            return Err(AppError::Validation(
                "Cab status 'rented' is derived from bookings".to_string(),
            ));
        }
        CabStatus::InMaintenance => CabStatus::InMaintenance,
        CabStatus::Available => {
            let active_count = reservation::Entity::find()
                .filter(reservation::Column::CabId.eq(cab_id))
                .filter(reservation::Column::Status.eq(ReservationStatus::Active))
                .count(&state.db)
                .await?;
            if active_count > 0 {
                CabStatus::Rented
            } else {
                CabStatus::Available
            }
        }
    };

    let mut active: cab::ActiveModel = cab.into();
    active.status = Set(desired);
    let updated = active.update(&state.db).await?;

    Ok(Json(CabResponse::from(updated)))
}

// ============ Drivers ============

#[derive(Debug, Serialize)]
pub struct DriverResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// List all drivers (admin)
pub async fn list_drivers(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<DriverResponse>>> {
    let drivers = user::Entity::find()
        .filter(user::Column::Role.eq(UserRole::Driver))
        .all(&state.db)
        .await?;

    let responses: Vec<DriverResponse> = drivers
        .into_iter()
        .map(|d| DriverResponse {
            id: d.id,
            email: d.email,
            name: d.name,
            created_at: d.created_at.with_timezone(&Utc),
        })
        .collect();

    Ok(Json(responses))
}

// ============ Incentive Campaigns ============

#[derive(Debug, Deserialize)]
pub struct CreateIncentiveRequest {
    pub driver_id: Uuid,
    pub title: String,
    pub kind: IncentiveKind,
    pub target_value: i32,
    pub bonus_amount: f64,
    pub peak_hours: Option<Vec<PeakWindow>>,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Set up a quest or peak-bonus campaign for a driver
pub async fn create_incentive(
    State(state): State<AppState>,
    Json(payload): Json<CreateIncentiveRequest>,
) -> AppResult<Json<incentive::Model>> {
    if payload.target_value <= 0 {
        return Err(AppError::Validation("Target must be positive".to_string()));
    }

    if payload.starts_at >= payload.expires_at {
        return Err(AppError::Validation(
            "Start time must be before expiry".to_string(),
        ));
    }

    let driver = user::Entity::find_by_id(payload.driver_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver not found".to_string()))?;

    if driver.role != UserRole::Driver {
        return Err(AppError::Validation("User is not a driver".to_string()));
    }

    let peak_hours = match (&payload.kind, &payload.peak_hours) {
        (IncentiveKind::PeakBonus, Some(windows)) => {
            if windows.is_empty() {
                return Err(AppError::Validation(
                    "Peak bonus requires at least one peak window".to_string(),
                ));
            }
            if windows.iter().any(|w| w.start_hour > 23 || w.end_hour > 23) {
                return Err(AppError::Validation(
                    "Peak window hours must be 0-23".to_string(),
                ));
            }
            Some(serde_json::to_value(windows).map_err(|e| {
                AppError::Internal(format!("Failed to encode peak windows: {}", e))
            })?)
        }
        (IncentiveKind::PeakBonus, None) => {
            return Err(AppError::Validation(
                "Peak bonus requires peak windows".to_string(),
            ));
        }
        (IncentiveKind::Quest, _) => None,
    };

    let new_incentive = incentive::ActiveModel {
        id: Set(Uuid::new_v4()),
        driver_id: Set(payload.driver_id),
        title: Set(payload.title.clone()),
        kind: Set(payload.kind.clone()),
        target_value: Set(payload.target_value),
        current_value: Set(0),
        bonus_amount: Set(payload.bonus_amount),
        status: Set(IncentiveStatus::Active),
        peak_hours: Set(peak_hours),
        starts_at: Set(payload.starts_at.into()),
        expires_at: Set(payload.expires_at.into()),
        ..Default::default()
    };

    let result = new_incentive.insert(&state.db).await?;
    Ok(Json(result))
}
