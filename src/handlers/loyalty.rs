use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::loyalty_entry::LoyaltyEntryType;
use crate::entities::loyalty_profile::TierLevel;
use crate::error::AppResult;
use crate::services::loyalty;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LoyaltyProfileResponse {
    pub customer_id: Uuid,
    pub lifetime_points: i64,
    pub available_points: i64,
    pub total_spend: f64,
    pub total_trips: i32,
    pub tier: TierLevel,
    pub tier_multiplier: f64,
    pub tier_discount_percent: f64,
    pub history: Vec<LedgerEntryResponse>,
}

#[derive(Debug, Serialize)]
pub struct LedgerEntryResponse {
    pub id: Uuid,
    pub entry_type: LoyaltyEntryType,
    pub points: i64,
    pub trip_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub points: i64,
}

/// The caller's loyalty profile with recent ledger history
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<LoyaltyProfileResponse>> {
    let profile = loyalty::get_or_create_profile(&state.db, claims.sub).await?;
    let entries = loyalty::recent_entries(&state.db, claims.sub, 20).await?;
    let benefits = loyalty::benefits(&profile.tier);

    Ok(Json(LoyaltyProfileResponse {
        customer_id: profile.customer_id,
        lifetime_points: profile.lifetime_points,
        available_points: profile.available_points,
        total_spend: profile.total_spend,
        total_trips: profile.total_trips,
        tier: profile.tier.clone(),
        tier_multiplier: benefits.multiplier,
        tier_discount_percent: benefits.discount_percent,
        history: entries
            .into_iter()
            .map(|e| LedgerEntryResponse {
                id: e.id,
                entry_type: e.entry_type,
                points: e.points,
                trip_id: e.trip_id,
                created_at: e.created_at.with_timezone(&Utc),
            })
            .collect(),
    }))
}

/// Redeem points from the available balance
pub async fn redeem(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<RedeemRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let profile = loyalty::redeem_points(&state.db, claims.sub, payload.points).await?;

    tracing::info!(
        customer_id = %claims.sub,
        points = payload.points,
        remaining = profile.available_points,
        "points redeemed"
    );

    Ok(Json(serde_json::json!({
        "message": "Points redeemed",
        "available_points": profile.available_points,
    })))
}
