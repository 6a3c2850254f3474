use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Timelike, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::cab::{self, CabStatus, VehicleClass};
use crate::entities::trip::{self, TripStatus};
use crate::entities::user::UserRole;
use crate::error::{AppError, AppResult};
use crate::events::DomainEvent;
use crate::services::{loyalty, pricing};
use crate::utils::geo::is_valid_coordinate;
use crate::utils::jwt::Claims;
use crate::utils::otp::generate_otp;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTripRequest {
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub vehicle_class: Option<VehicleClass>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptTripRequest {
    pub cab_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct StartTripRequest {
    pub otp: i32,
}

#[derive(Debug, Deserialize)]
pub struct CompleteTripRequest {
    pub actual_fare: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CancelTripRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RateTripRequest {
    pub rating: i32,
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TripResponse {
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
    /// Only present for the requesting customer; the driver learns it
    /// in person at pickup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<i32>,
    pub distance_km: f64,
    pub estimated_fare: f64,
    pub actual_fare: Option<f64>,
    pub surge_multiplier: f64,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub customer_rating: Option<i32>,
    pub driver_rating: Option<i32>,
}

impl TripResponse {
    fn from_model(trip: trip::Model, claims: &Claims) -> Self {
        let show_otp = claims.role == UserRole::Customer && claims.sub == trip.customer_id;
        Self {
            id: trip.id,
            customer_id: trip.customer_id,
            driver_id: trip.driver_id,
            cab_id: trip.cab_id,
            pickup_lat: trip.pickup_lat,
            pickup_lng: trip.pickup_lng,
            dropoff_lat: trip.dropoff_lat,
            dropoff_lng: trip.dropoff_lng,
            vehicle_class: trip.vehicle_class,
            status: trip.status,
            otp: show_otp.then_some(trip.otp),
            distance_km: trip.distance_km,
            estimated_fare: trip.estimated_fare,
            actual_fare: trip.actual_fare,
            surge_multiplier: trip.surge_multiplier,
            created_at: trip.created_at.with_timezone(&Utc),
            accepted_at: trip.accepted_at.map(|t| t.with_timezone(&Utc)),
            started_at: trip.started_at.map(|t| t.with_timezone(&Utc)),
            completed_at: trip.completed_at.map(|t| t.with_timezone(&Utc)),
            cancelled_at: trip.cancelled_at.map(|t| t.with_timezone(&Utc)),
            cancel_reason: trip.cancel_reason,
            customer_rating: trip.customer_rating,
            driver_rating: trip.driver_rating,
        }
    }
}

/// Request a trip (customer)
pub async fn create_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTripRequest>,
) -> AppResult<Json<TripResponse>> {
    if claims.role != UserRole::Customer {
        return Err(AppError::Forbidden("Only customers can request trips".to_string()));
    }

    if let Some(key) = &payload.idempotency_key {
        let existing = trip::Entity::find()
            .filter(trip::Column::IdempotencyKey.eq(key))
            .one(&state.db)
            .await?;
        if let Some(trip) = existing {
            return Ok(Json(TripResponse::from_model(trip, &claims)));
        }
    }

    if !is_valid_coordinate(payload.pickup_lat, payload.pickup_lng) {
        return Err(AppError::Validation("Invalid pickup coordinates".to_string()));
    }

    if !is_valid_coordinate(payload.dropoff_lat, payload.dropoff_lng) {
        return Err(AppError::Validation("Invalid dropoff coordinates".to_string()));
    }

    let vehicle_class = payload.vehicle_class.unwrap_or(VehicleClass::Economy);

    // Tier benefits discount the estimate up front.
    let profile = loyalty::get_or_create_profile(&state.db, claims.sub).await?;
    let discount_percent = loyalty::benefits(&profile.tier).discount_percent;
    let surge = pricing::surge_multiplier(chrono::Local::now().hour());

    let estimate = pricing::trip_estimate(
        payload.pickup_lat,
        payload.pickup_lng,
        payload.dropoff_lat,
        payload.dropoff_lng,
        &vehicle_class,
        surge,
        discount_percent,
    );

    let new_trip = trip::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(claims.sub),
        driver_id: Set(None),
        cab_id: Set(None),
        pickup_lat: Set(payload.pickup_lat),
        pickup_lng: Set(payload.pickup_lng),
        dropoff_lat: Set(payload.dropoff_lat),
        dropoff_lng: Set(payload.dropoff_lng),
        vehicle_class: Set(vehicle_class),
        status: Set(TripStatus::Pending),
        otp: Set(generate_otp()),
        distance_km: Set(estimate.distance_km),
        estimated_fare: Set(estimate.fare.total),
        surge_multiplier: Set(surge),
        idempotency_key: Set(payload.idempotency_key.clone()),
        ..Default::default()
    };

    let trip = new_trip.insert(&state.db).await?;

    tracing::info!(trip_id = %trip.id, customer_id = %claims.sub, "trip requested");

    Ok(Json(TripResponse::from_model(trip, &claims)))
}

/// List trips for the caller: customers see their own, drivers their
/// assignments, admins everything.
pub async fn list_trips(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<TripResponse>>> {
    let query = match claims.role {
        UserRole::Customer => {
            trip::Entity::find().filter(trip::Column::CustomerId.eq(claims.sub))
        }
        UserRole::Driver => trip::Entity::find().filter(trip::Column::DriverId.eq(claims.sub)),
        UserRole::Admin => trip::Entity::find(),
    };

    let trips = query.all(&state.db).await?;

    let responses = trips
        .into_iter()
        .map(|t| TripResponse::from_model(t, &claims))
        .collect();

    Ok(Json(responses))
}

/// Get a single trip
pub async fn get_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
) -> AppResult<Json<TripResponse>> {
    let trip = find_trip(&state, trip_id).await?;

    let is_participant =
        trip.customer_id == claims.sub || trip.driver_id == Some(claims.sub);
    if claims.role != UserRole::Admin && !is_participant {
        return Err(AppError::Forbidden("You are not part of this trip".to_string()));
    }

    Ok(Json(TripResponse::from_model(trip, &claims)))
}

async fn find_trip(state: &AppState, trip_id: Uuid) -> AppResult<trip::Model> {
    trip::Entity::find_by_id(trip_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))
}

fn ensure_transition(trip: &trip::Model, next: &TripStatus) -> AppResult<()> {
    if !trip.status.can_transition_to(next) {
        return Err(AppError::InvalidState(format!(
            "Cannot transition trip from '{:?}' to '{:?}'",
            trip.status, next
        )));
    }
    Ok(())
}

fn ensure_assigned_driver(trip: &trip::Model, claims: &Claims) -> AppResult<()> {
    if trip.driver_id != Some(claims.sub) {
        return Err(AppError::Forbidden(
            "You are not assigned to this trip".to_string(),
        ));
    }
    Ok(())
}

/// Accept a pending trip (driver)
pub async fn accept_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
    Json(payload): Json<AcceptTripRequest>,
) -> AppResult<Json<TripResponse>> {
    if claims.role != UserRole::Driver {
        return Err(AppError::Forbidden("Only drivers can accept trips".to_string()));
    }

    let trip = find_trip(&state, trip_id).await?;
    ensure_transition(&trip, &TripStatus::Accepted)?;

    let cab = cab::Entity::find_by_id(payload.cab_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Cab not found".to_string()))?;

    if cab.status == CabStatus::InMaintenance {
        return Err(AppError::InvalidState("Cab is under maintenance".to_string()));
    }

    let mut active: trip::ActiveModel = trip.into();
    active.driver_id = Set(Some(claims.sub));
    active.cab_id = Set(Some(payload.cab_id));
    active.status = Set(TripStatus::Accepted);
    active.accepted_at = Set(Some(Utc::now().into()));
    let updated = active.update(&state.db).await?;

    tracing::info!(trip_id = %updated.id, driver_id = %claims.sub, "trip accepted");

    Ok(Json(TripResponse::from_model(updated, &claims)))
}

/// Start an accepted trip after verifying the rider's OTP (driver)
pub async fn start_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
    Json(payload): Json<StartTripRequest>,
) -> AppResult<Json<TripResponse>> {
    let trip = find_trip(&state, trip_id).await?;
    ensure_assigned_driver(&trip, &claims)?;
    ensure_transition(&trip, &TripStatus::InProgress)?;

    if payload.otp != trip.otp {
        return Err(AppError::Validation("Invalid OTP".to_string()));
    }

    let mut active: trip::ActiveModel = trip.into();
    active.status = Set(TripStatus::InProgress);
    active.started_at = Set(Some(Utc::now().into()));
    let updated = active.update(&state.db).await?;

    tracing::info!(trip_id = %updated.id, "trip started");

    Ok(Json(TripResponse::from_model(updated, &claims)))
}

/// Complete an in-progress trip (driver). Publishes `trip.completed`, which
/// the loyalty and incentive consumers pick up independently.
pub async fn complete_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
    Json(payload): Json<CompleteTripRequest>,
) -> AppResult<Json<TripResponse>> {
    let trip = find_trip(&state, trip_id).await?;
    ensure_assigned_driver(&trip, &claims)?;
    ensure_transition(&trip, &TripStatus::Completed)?;

    if let Some(fare) = payload.actual_fare {
        if fare < 0.0 {
            return Err(AppError::Validation("Fare cannot be negative".to_string()));
        }
    }

    let settled_fare = payload.actual_fare.unwrap_or(trip.estimated_fare);

    let mut active: trip::ActiveModel = trip.into();
    active.status = Set(TripStatus::Completed);
    active.actual_fare = Set(Some(settled_fare));
    active.completed_at = Set(Some(Utc::now().into()));
    let updated = active.update(&state.db).await?;

    // Fired after the write; consumers settle the side ledgers eventually.
    state.events.publish(DomainEvent::TripCompleted {
        trip_id: updated.id,
        driver_id: updated.driver_id,
        customer_id: updated.customer_id,
        fare: settled_fare,
    });

    tracing::info!(trip_id = %updated.id, fare = settled_fare, "trip completed");

    Ok(Json(TripResponse::from_model(updated, &claims)))
}

/// Cancel a trip from any non-terminal state (participant or admin)
pub async fn cancel_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
    Json(payload): Json<CancelTripRequest>,
) -> AppResult<Json<TripResponse>> {
    let trip = find_trip(&state, trip_id).await?;

    let is_participant =
        trip.customer_id == claims.sub || trip.driver_id == Some(claims.sub);
    if claims.role != UserRole::Admin && !is_participant {
        return Err(AppError::Forbidden("You are not part of this trip".to_string()));
    }

    ensure_transition(&trip, &TripStatus::Cancelled)?;

    let mut active: trip::ActiveModel = trip.into();
    active.status = Set(TripStatus::Cancelled);
    active.cancelled_at = Set(Some(Utc::now().into()));
    active.cancelled_by = Set(Some(claims.sub));
    active.cancel_reason = Set(payload.reason.clone());
    let updated = active.update(&state.db).await?;

    tracing::info!(trip_id = %updated.id, cancelled_by = %claims.sub, "trip cancelled");

    Ok(Json(TripResponse::from_model(updated, &claims)))
}

/// Rate a completed trip. Customers rate the driver's slot and vice versa;
/// no state transition happens here.
pub async fn rate_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
    Json(payload): Json<RateTripRequest>,
) -> AppResult<Json<TripResponse>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::Validation("Rating must be between 1 and 5".to_string()));
    }

    let trip = find_trip(&state, trip_id).await?;

    if trip.status != TripStatus::Completed {
        return Err(AppError::InvalidState(
            "Only completed trips can be rated".to_string(),
        ));
    }

    let mut active: trip::ActiveModel = trip.clone().into();
    match claims.role {
        UserRole::Customer if trip.customer_id == claims.sub => {
            active.customer_rating = Set(Some(payload.rating));
            active.customer_feedback = Set(payload.feedback.clone());
        }
        UserRole::Driver if trip.driver_id == Some(claims.sub) => {
            active.driver_rating = Set(Some(payload.rating));
            active.driver_feedback = Set(payload.feedback.clone());
        }
        _ => {
            return Err(AppError::Forbidden("You are not part of this trip".to_string()));
        }
    }

    let updated = active.update(&state.db).await?;

    Ok(Json(TripResponse::from_model(updated, &claims)))
}
