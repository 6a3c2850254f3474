use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Timelike;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::cab::VehicleClass;
use crate::error::{AppError, AppResult};
use crate::services::{loyalty, pricing};
use crate::utils::geo::is_valid_coordinate;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FareQuery {
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub vehicle_class: Option<VehicleClass>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ClassEstimate {
    pub vehicle_class: VehicleClass,
    pub routes: Vec<pricing::RouteEstimate>,
}

#[derive(Debug, Serialize)]
pub struct FareEstimateResponse {
    pub surge_multiplier: f64,
    pub discount_percent: f64,
    pub estimates: Vec<ClassEstimate>,
}

/// Estimate fares between two points, for one vehicle class or all of them.
/// When the caller identifies a known customer their tier discount is
/// applied.
pub async fn estimate(
    State(state): State<AppState>,
    Query(query): Query<FareQuery>,
) -> AppResult<Json<FareEstimateResponse>> {
    if !is_valid_coordinate(query.pickup_lat, query.pickup_lng) {
        return Err(AppError::Validation("Invalid pickup coordinates".to_string()));
    }

    if !is_valid_coordinate(query.dropoff_lat, query.dropoff_lng) {
        return Err(AppError::Validation("Invalid dropoff coordinates".to_string()));
    }

    let discount_percent = match query.user_id {
        Some(user_id) => {
            let profile = loyalty::get_or_create_profile(&state.db, user_id).await?;
            loyalty::benefits(&profile.tier).discount_percent
        }
        None => 0.0,
    };

    let surge = pricing::surge_multiplier(chrono::Local::now().hour());

    let classes = match query.vehicle_class {
        Some(class) => vec![class],
        None => vec![
            VehicleClass::Economy,
            VehicleClass::Sedan,
            VehicleClass::Suv,
            VehicleClass::Luxury,
        ],
    };

    let estimates = classes
        .into_iter()
        .map(|class| {
            let routes = pricing::route_estimates(
                query.pickup_lat,
                query.pickup_lng,
                query.dropoff_lat,
                query.dropoff_lng,
                &class,
                surge,
                discount_percent,
            );
            ClassEstimate { vehicle_class: class, routes }
        })
        .collect();

    Ok(Json(FareEstimateResponse {
        surge_multiplier: surge,
        discount_percent,
        estimates,
    }))
}
