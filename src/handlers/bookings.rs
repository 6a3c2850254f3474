use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::cab::{self, CabStatus};
use crate::entities::reservation::{self, ReservationStatus};
use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::events::DomainEvent;
use crate::services::conflict::{self, ResourceKind};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub cab_id: Uuid,
    pub customer_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: Option<ReservationStatus>,
    pub total_amount: f64,
    pub advance_amount: Option<f64>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingRequest {
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub total_amount: Option<f64>,
    pub advance_amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ReservationStatus,
}

#[derive(Debug, Deserialize)]
pub struct AssignDriverRequest {
    pub driver_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub cab_id: Uuid,
    pub cab_plate: String,
    pub customer_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: ReservationStatus,
    pub total_amount: f64,
    pub advance_amount: f64,
    pub created_at: DateTime<Utc>,
}

impl BookingResponse {
    fn from_model(booking: reservation::Model, cab_plate: String) -> Self {
        Self {
            id: booking.id,
            cab_id: booking.cab_id,
            cab_plate,
            customer_id: booking.customer_id,
            driver_id: booking.driver_id,
            starts_at: booking.starts_at.with_timezone(&Utc),
            ends_at: booking.ends_at.with_timezone(&Utc),
            status: booking.status,
            total_amount: booking.total_amount,
            advance_amount: booking.advance_amount,
            created_at: booking.created_at.with_timezone(&Utc),
        }
    }
}

/// Recompute the cab's derived status from its remaining reservations. A cab
/// shows `rented` while at least one active reservation holds it; a cab in
/// maintenance is never flipped by booking paths.
async fn sync_cab_status(state: &AppState, cab_id: Uuid) -> AppResult<()> {
    let cab = cab::Entity::find_by_id(cab_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Cab not found".to_string()))?;

    if cab.status == CabStatus::InMaintenance {
        return Ok(());
    }

    let active_count = reservation::Entity::find()
        .filter(reservation::Column::CabId.eq(cab_id))
        .filter(reservation::Column::Status.eq(ReservationStatus::Active))
        .count(&state.db)
        .await?;

    let desired = if active_count > 0 {
        CabStatus::Rented
    } else {
        CabStatus::Available
    };

    if cab.status != desired {
        let mut active: cab::ActiveModel = cab.into();
        active.status = Set(desired);
        active.update(&state.db).await?;
    }

    Ok(())
}

async fn find_driver(state: &AppState, driver_id: Uuid) -> AppResult<user::Model> {
    let driver = user::Entity::find_by_id(driver_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver not found".to_string()))?;

    if driver.role != UserRole::Driver {
        return Err(AppError::Validation("User is not a driver".to_string()));
    }

    Ok(driver)
}

/// Create a booking (back-office dispatcher)
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<Json<BookingResponse>> {
    // Replay for a key the client already used
    if let Some(key) = &payload.idempotency_key {
        let existing = reservation::Entity::find()
            .filter(reservation::Column::IdempotencyKey.eq(key))
            .one(&state.db)
            .await?;
        if let Some(booking) = existing {
            let cab = cab::Entity::find_by_id(booking.cab_id).one(&state.db).await?;
            let plate = cab.map(|c| c.plate).unwrap_or_default();
            return Ok(Json(BookingResponse::from_model(booking, plate)));
        }
    }

    if payload.starts_at >= payload.ends_at {
        return Err(AppError::Validation(
            "Start time must be before end time".to_string(),
        ));
    }

    if payload.starts_at < Utc::now() {
        return Err(AppError::Validation(
            "Cannot create bookings in the past".to_string(),
        ));
    }

    let initial_status = payload.status.clone().unwrap_or(ReservationStatus::Pending);
    if !initial_status.blocks_resource() {
        return Err(AppError::Validation(
            "New bookings must be pending or active".to_string(),
        ));
    }

    let cab = cab::Entity::find_by_id(payload.cab_id)
        .one(&state.db)
        .await?
        .filter(|c| c.tenant_id == claims.tenant_id)
        .ok_or_else(|| AppError::NotFound("Cab not found".to_string()))?;

    if cab.status == CabStatus::InMaintenance {
        return Err(AppError::InvalidState("Cab is under maintenance".to_string()));
    }

    if let Some(driver_id) = payload.driver_id {
        find_driver(&state, driver_id).await?;
    }

    // Hold the resource locks across the conflict scan and the insert so a
    // concurrent request for the same window cannot slip between them.
    let _cab_guard = state.locks.acquire(payload.cab_id).await;
    let _driver_guard = match payload.driver_id {
        Some(driver_id) => Some(state.locks.acquire(driver_id).await),
        None => None,
    };

    conflict::ensure_no_conflict(
        &state.db,
        ResourceKind::Cab,
        payload.cab_id,
        claims.tenant_id,
        payload.starts_at,
        payload.ends_at,
        None,
    )
    .await?;

    if let Some(driver_id) = payload.driver_id {
        conflict::ensure_no_conflict(
            &state.db,
            ResourceKind::Driver,
            driver_id,
            claims.tenant_id,
            payload.starts_at,
            payload.ends_at,
            None,
        )
        .await?;
    }

    let booking_id = Uuid::new_v4();
    let new_booking = reservation::ActiveModel {
        id: Set(booking_id),
        tenant_id: Set(claims.tenant_id),
        cab_id: Set(payload.cab_id),
        customer_id: Set(payload.customer_id),
        driver_id: Set(payload.driver_id),
        starts_at: Set(payload.starts_at.into()),
        ends_at: Set(payload.ends_at.into()),
        status: Set(initial_status.clone()),
        total_amount: Set(payload.total_amount),
        advance_amount: Set(payload.advance_amount.unwrap_or(0.0)),
        idempotency_key: Set(payload.idempotency_key.clone()),
        ..Default::default()
    };

    let booking = new_booking.insert(&state.db).await?;

    if initial_status == ReservationStatus::Active {
        sync_cab_status(&state, booking.cab_id).await?;
    }

    state.events.publish(DomainEvent::BookingCreated {
        booking_id: booking.id,
        tenant_id: booking.tenant_id,
        cab_id: booking.cab_id,
    });

    tracing::info!(booking_id = %booking.id, cab_id = %booking.cab_id, "booking created");

    Ok(Json(BookingResponse::from_model(booking, cab.plate)))
}

/// List bookings in the caller's tenant
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = reservation::Entity::find()
        .filter(reservation::Column::TenantId.eq(claims.tenant_id))
        .all(&state.db)
        .await?;

    let cabs = cab::Entity::find()
        .filter(cab::Column::TenantId.eq(claims.tenant_id))
        .all(&state.db)
        .await?;

    let responses = bookings
        .into_iter()
        .map(|b| {
            let plate = cabs
                .iter()
                .find(|c| c.id == b.cab_id)
                .map(|c| c.plate.clone())
                .unwrap_or_default();
            BookingResponse::from_model(b, plate)
        })
        .collect();

    Ok(Json(responses))
}

/// Get a single booking
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let booking = find_tenant_booking(&state, &claims, booking_id).await?;

    let cab = cab::Entity::find_by_id(booking.cab_id).one(&state.db).await?;
    let plate = cab.map(|c| c.plate).unwrap_or_default();

    Ok(Json(BookingResponse::from_model(booking, plate)))
}

async fn find_tenant_booking(
    state: &AppState,
    claims: &Claims,
    booking_id: Uuid,
) -> AppResult<reservation::Model> {
    reservation::Entity::find_by_id(booking_id)
        .one(&state.db)
        .await?
        .filter(|b| b.tenant_id == claims.tenant_id)
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
}

/// Update a booking's window or amounts
pub async fn update_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<UpdateBookingRequest>,
) -> AppResult<Json<BookingResponse>> {
    let booking = find_tenant_booking(&state, &claims, booking_id).await?;

    if booking.status.is_terminal() {
        return Err(AppError::InvalidState(
            "Cannot modify a completed or cancelled booking".to_string(),
        ));
    }

    let new_start = payload
        .starts_at
        .unwrap_or_else(|| booking.starts_at.with_timezone(&Utc));
    let new_end = payload
        .ends_at
        .unwrap_or_else(|| booking.ends_at.with_timezone(&Utc));

    let window_changed = payload.starts_at.is_some() || payload.ends_at.is_some();

    // Guards must survive until after the write below.
    let mut _guards = Vec::new();

    if window_changed {
        if new_start >= new_end {
            return Err(AppError::Validation(
                "Start time must be before end time".to_string(),
            ));
        }

        _guards.push(state.locks.acquire(booking.cab_id).await);
        if let Some(driver_id) = booking.driver_id {
            _guards.push(state.locks.acquire(driver_id).await);
        }

        conflict::ensure_no_conflict(
            &state.db,
            ResourceKind::Cab,
            booking.cab_id,
            claims.tenant_id,
            new_start,
            new_end,
            Some(booking.id),
        )
        .await?;

        if let Some(driver_id) = booking.driver_id {
            conflict::ensure_no_conflict(
                &state.db,
                ResourceKind::Driver,
                driver_id,
                claims.tenant_id,
                new_start,
                new_end,
                Some(booking.id),
            )
            .await?;
        }
    }

    let cab_id = booking.cab_id;
    let mut active: reservation::ActiveModel = booking.into();
    active.starts_at = Set(new_start.into());
    active.ends_at = Set(new_end.into());
    if let Some(total) = payload.total_amount {
        active.total_amount = Set(total);
    }
    if let Some(advance) = payload.advance_amount {
        active.advance_amount = Set(advance);
    }
    active.updated_at = Set(Utc::now().into());

    let updated = active.update(&state.db).await?;

    let cab = cab::Entity::find_by_id(cab_id).one(&state.db).await?;
    let plate = cab.map(|c| c.plate).unwrap_or_default();

    Ok(Json(BookingResponse::from_model(updated, plate)))
}

/// Transition a booking's status, cascading the cab's derived status
pub async fn update_booking_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<BookingResponse>> {
    let booking = find_tenant_booking(&state, &claims, booking_id).await?;

    if !booking.status.can_transition_to(&payload.status) {
        return Err(AppError::InvalidState(format!(
            "Cannot transition booking from '{:?}' to '{:?}'",
            booking.status, payload.status
        )));
    }

    let from = booking.status.clone();
    let cab_id = booking.cab_id;

    let mut active: reservation::ActiveModel = booking.into();
    active.status = Set(payload.status.clone());
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.db).await?;

    // Derived cab status follows the reservation write.
    sync_cab_status(&state, cab_id).await?;

    state.events.publish(DomainEvent::BookingStatusChanged {
        booking_id: updated.id,
        from: from.clone(),
        to: payload.status.clone(),
    });

    tracing::info!(
        booking_id = %updated.id,
        from = ?from,
        to = ?payload.status,
        "booking status changed"
    );

    let cab = cab::Entity::find_by_id(cab_id).one(&state.db).await?;
    let plate = cab.map(|c| c.plate).unwrap_or_default();

    Ok(Json(BookingResponse::from_model(updated, plate)))
}

/// Assign or replace the booking's driver
pub async fn assign_driver(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<AssignDriverRequest>,
) -> AppResult<Json<BookingResponse>> {
    let booking = find_tenant_booking(&state, &claims, booking_id).await?;

    if booking.status.is_terminal() {
        return Err(AppError::InvalidState(
            "Cannot assign a driver to a completed or cancelled booking".to_string(),
        ));
    }

    find_driver(&state, payload.driver_id).await?;

    // The driver must be free over the booking's existing window.
    let _driver_guard = state.locks.acquire(payload.driver_id).await;

    conflict::ensure_no_conflict(
        &state.db,
        ResourceKind::Driver,
        payload.driver_id,
        claims.tenant_id,
        booking.starts_at.with_timezone(&Utc),
        booking.ends_at.with_timezone(&Utc),
        Some(booking.id),
    )
    .await?;

    let cab_id = booking.cab_id;
    let mut active: reservation::ActiveModel = booking.into();
    active.driver_id = Set(Some(payload.driver_id));
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.db).await?;

    state.events.publish(DomainEvent::BookingDriverAssigned {
        booking_id: updated.id,
        driver_id: payload.driver_id,
    });

    let cab = cab::Entity::find_by_id(cab_id).one(&state.db).await?;
    let plate = cab.map(|c| c.plate).unwrap_or_default();

    Ok(Json(BookingResponse::from_model(updated, plate)))
}

/// Delete a booking. Only pending and cancelled bookings can be removed.
pub async fn delete_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let booking = find_tenant_booking(&state, &claims, booking_id).await?;

    if matches!(
        booking.status,
        ReservationStatus::Active | ReservationStatus::Completed
    ) {
        return Err(AppError::InvalidState(
            "Cannot delete an active or completed booking".to_string(),
        ));
    }

    reservation::Entity::delete_by_id(booking_id)
        .exec(&state.db)
        .await?;

    state.events.publish(DomainEvent::BookingDeleted { booking_id });

    Ok(Json(serde_json::json!({ "message": "Booking deleted" })))
}
