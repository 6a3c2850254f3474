use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::incentive::{self, IncentiveKind, IncentiveStatus};
use crate::entities::trip::{self, TripStatus};
use crate::error::AppResult;
use crate::services::incentives;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct IncentiveResponse {
    pub id: Uuid,
    pub title: String,
    pub kind: IncentiveKind,
    pub target_value: i32,
    pub current_value: i32,
    pub bonus_amount: f64,
    pub status: IncentiveStatus,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub claimed_at: Option<DateTime<Utc>>,
}

impl From<incentive::Model> for IncentiveResponse {
    fn from(m: incentive::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            kind: m.kind,
            target_value: m.target_value,
            current_value: m.current_value,
            bonus_amount: m.bonus_amount,
            status: m.status,
            starts_at: m.starts_at.with_timezone(&Utc),
            expires_at: m.expires_at.with_timezone(&Utc),
            completed_at: m.completed_at.map(|t| t.with_timezone(&Utc)),
            claimed_at: m.claimed_at.map(|t| t.with_timezone(&Utc)),
        }
    }
}

/// List the caller's incentives. Overdue ones are expired on the way out.
pub async fn list_incentives(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<IncentiveResponse>>> {
    incentives::sweep_expired(&state.db).await?;

    let items = incentive::Entity::find()
        .filter(incentive::Column::DriverId.eq(claims.sub))
        .all(&state.db)
        .await?;

    Ok(Json(items.into_iter().map(IncentiveResponse::from).collect()))
}

/// Claim a completed incentive's bonus
pub async fn claim_incentive(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(incentive_id): Path<Uuid>,
) -> AppResult<Json<IncentiveResponse>> {
    let claimed = incentives::claim(&state.db, incentive_id, claims.sub).await?;

    tracing::info!(
        incentive_id = %claimed.id,
        driver_id = %claims.sub,
        bonus = claimed.bonus_amount,
        "incentive claimed"
    );

    Ok(Json(IncentiveResponse::from(claimed)))
}

#[derive(Debug, Default, Serialize)]
pub struct EarningsSummary {
    pub completed_trips: i64,
    pub trip_earnings: f64,
    pub bonus_earnings: f64,
    pub total_earnings: f64,
}

async fn load_earnings(db: &DatabaseConnection, driver_id: Uuid) -> Result<EarningsSummary, DbErr> {
    let trips = trip::Entity::find()
        .filter(trip::Column::DriverId.eq(driver_id))
        .filter(trip::Column::Status.eq(TripStatus::Completed))
        .all(db)
        .await?;

    let trip_earnings: f64 = trips
        .iter()
        .map(|t| t.actual_fare.unwrap_or(t.estimated_fare))
        .sum();

    let bonuses = incentive::Entity::find()
        .filter(incentive::Column::DriverId.eq(driver_id))
        .filter(incentive::Column::Status.eq(IncentiveStatus::Claimed))
        .all(db)
        .await?;

    let bonus_earnings: f64 = bonuses.iter().map(|i| i.bonus_amount).sum();

    Ok(EarningsSummary {
        completed_trips: trips.len() as i64,
        trip_earnings,
        bonus_earnings,
        total_earnings: trip_earnings + bonus_earnings,
    })
}

/// Earnings summary for the caller. This is a best-effort read: a failed
/// aggregation returns zeroed defaults instead of an error.
pub async fn my_earnings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<EarningsSummary>> {
    let summary = match load_earnings(&state.db, claims.sub).await {
        Ok(summary) => summary,
        Err(err) => {
            tracing::warn!(
                driver_id = %claims.sub,
                error = %err,
                "earnings aggregation failed, returning defaults"
            );
            EarningsSummary::default()
        }
    };

    Ok(Json(summary))
}
