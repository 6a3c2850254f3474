use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set};
use uuid::Uuid;

use crate::entities::loyalty_entry::{self, LoyaltyEntryType};
use crate::entities::loyalty_profile::{self, TierLevel};
use crate::error::{AppError, AppResult};

pub struct TierBenefits {
    pub tier: TierLevel,
    pub min_points: i64,
    pub min_trips: i32,
    pub multiplier: f64,
    pub discount_percent: f64,
}

/// Ascending thresholds. A customer holds the highest tier whose point and
/// trip minimums are both met; lifetime counters only grow, so the derived
/// tier never regresses.
pub static TIER_TABLE: [TierBenefits; 4] = [
    TierBenefits { tier: TierLevel::Bronze, min_points: 0, min_trips: 0, multiplier: 1.0, discount_percent: 0.0 },
    TierBenefits { tier: TierLevel::Silver, min_points: 500, min_trips: 10, multiplier: 1.25, discount_percent: 5.0 },
    TierBenefits { tier: TierLevel::Gold, min_points: 2000, min_trips: 50, multiplier: 1.5, discount_percent: 10.0 },
    TierBenefits { tier: TierLevel::Platinum, min_points: 5000, min_trips: 100, multiplier: 2.0, discount_percent: 15.0 },
];

pub fn tier_for(lifetime_points: i64, total_trips: i32) -> TierLevel {
    let mut tier = TierLevel::Bronze;
    for level in &TIER_TABLE {
        if lifetime_points >= level.min_points && total_trips >= level.min_trips {
            tier = level.tier.clone();
        }
    }
    tier
}

pub fn benefits(tier: &TierLevel) -> &'static TierBenefits {
    TIER_TABLE
        .iter()
        .find(|level| level.tier == *tier)
        .expect("every tier has a benefits row")
}

/// Points earned for a completed trip: floor(fare / 10), scaled by the tier
/// multiplier, floored again.
pub fn points_for(fare: f64, multiplier: f64) -> i64 {
    let base_points = (fare / 10.0).floor() as i64;
    (base_points as f64 * multiplier).floor() as i64
}

pub async fn get_or_create_profile(
    db: &DatabaseConnection,
    customer_id: Uuid,
) -> AppResult<loyalty_profile::Model> {
    if let Some(profile) = loyalty_profile::Entity::find_by_id(customer_id).one(db).await? {
        return Ok(profile);
    }

    let now = Utc::now();
    let profile = loyalty_profile::ActiveModel {
        customer_id: Set(customer_id),
        lifetime_points: Set(0),
        available_points: Set(0),
        total_spend: Set(0.0),
        total_trips: Set(0),
        tier: Set(TierLevel::Bronze),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(profile.insert(db).await?)
}

/// Apply a completed trip to the customer's ledger: append an earn entry,
/// bump the lifetime counters, and recompute the tier. Invoked from the
/// trip.completed consumer, so it runs after the trip write has committed.
pub async fn credit_completed_trip(
    db: &DatabaseConnection,
    customer_id: Uuid,
    trip_id: Uuid,
    fare: f64,
) -> AppResult<loyalty_profile::Model> {
    let profile = get_or_create_profile(db, customer_id).await?;
    let earned = points_for(fare, benefits(&profile.tier).multiplier);

    let now = Utc::now();
    let entry = loyalty_entry::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        entry_type: Set(LoyaltyEntryType::Earned),
        points: Set(earned),
        trip_id: Set(Some(trip_id)),
        created_at: Set(now.into()),
    };
    entry.insert(db).await?;

    let lifetime_points = profile.lifetime_points + earned;
    let total_trips = profile.total_trips + 1;
    let new_tier = tier_for(lifetime_points, total_trips);

    if new_tier != profile.tier {
        tracing::info!(
            customer_id = %customer_id,
            from = ?profile.tier,
            to = ?new_tier,
            "loyalty tier upgraded"
        );
    }

    let mut active: loyalty_profile::ActiveModel = profile.clone().into();
    active.lifetime_points = Set(lifetime_points);
    active.available_points = Set(profile.available_points + earned);
    active.total_spend = Set(profile.total_spend + fare);
    active.total_trips = Set(total_trips);
    active.tier = Set(new_tier);
    active.updated_at = Set(now.into());

    Ok(active.update(db).await?)
}

/// Deduct points from the available balance, recording a negative ledger
/// entry. Lifetime counters are untouched, so the tier cannot regress.
pub async fn redeem_points(
    db: &DatabaseConnection,
    customer_id: Uuid,
    points: i64,
) -> AppResult<loyalty_profile::Model> {
    if points <= 0 {
        return Err(AppError::Validation("Points to redeem must be positive".to_string()));
    }

    let profile = get_or_create_profile(db, customer_id).await?;
    if profile.available_points < points {
        return Err(AppError::InsufficientPoints {
            available: profile.available_points,
            requested: points,
        });
    }

    let now = Utc::now();
    let entry = loyalty_entry::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        entry_type: Set(LoyaltyEntryType::Redeemed),
        points: Set(-points),
        trip_id: Set(None),
        created_at: Set(now.into()),
    };
    entry.insert(db).await?;

    let mut active: loyalty_profile::ActiveModel = profile.clone().into();
    active.available_points = Set(profile.available_points - points);
    active.updated_at = Set(now.into());

    Ok(active.update(db).await?)
}

/// Most recent ledger entries, newest first.
pub async fn recent_entries(
    db: &DatabaseConnection,
    customer_id: Uuid,
    limit: u64,
) -> AppResult<Vec<loyalty_entry::Model>> {
    Ok(loyalty_entry::Entity::find()
        .filter(loyalty_entry::Column::CustomerId.eq(customer_id))
        .order_by_desc(loyalty_entry::Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn redeeming_more_than_the_balance_is_rejected() {
        let customer_id = Uuid::new_v4();
        let now = Utc::now();
        let profile = loyalty_profile::Model {
            customer_id,
            lifetime_points: 100,
            available_points: 10,
            total_spend: 1000.0,
            total_trips: 4,
            tier: TierLevel::Bronze,
            created_at: now.into(),
            updated_at: now.into(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![profile]])
            .into_connection();

        let err = redeem_points(&db, customer_id, 50).await.unwrap_err();
        match err {
            AppError::InsufficientPoints { available, requested } => {
                assert_eq!(available, 10);
                assert_eq!(requested, 50);
            }
            other => panic!("expected insufficient points, got {:?}", other),
        }
    }

    #[test]
    fn bronze_customer_earns_base_points() {
        // floor(250 / 10) * 1.0 = 25
        assert_eq!(points_for(250.0, 1.0), 25);
    }

    #[test]
    fn points_are_floored_at_each_step() {
        assert_eq!(points_for(259.99, 1.0), 25);
        // floor(250 / 10) = 25, floor(25 * 1.25) = 31
        assert_eq!(points_for(250.0, 1.25), 31);
        assert_eq!(points_for(9.99, 2.0), 0);
    }

    #[test]
    fn tier_requires_both_thresholds() {
        assert_eq!(tier_for(0, 0), TierLevel::Bronze);
        // Enough points for silver, not enough trips.
        assert_eq!(tier_for(600, 5), TierLevel::Bronze);
        assert_eq!(tier_for(600, 10), TierLevel::Silver);
        assert_eq!(tier_for(2500, 60), TierLevel::Gold);
        assert_eq!(tier_for(10_000, 200), TierLevel::Platinum);
        // Gold points with silver trips stays silver.
        assert_eq!(tier_for(3000, 20), TierLevel::Silver);
    }

    #[test]
    fn tier_is_monotone_in_lifetime_counters() {
        let mut lifetime_points = 0i64;
        let mut total_trips = 0i32;
        let mut last_rank = tier_for(lifetime_points, total_trips).rank();

        for _ in 0..250 {
            lifetime_points += points_for(250.0, 1.0);
            total_trips += 1;
            let rank = tier_for(lifetime_points, total_trips).rank();
            assert!(rank >= last_rank);
            last_rank = rank;
        }

        assert_eq!(tier_for(lifetime_points, total_trips), TierLevel::Platinum);
    }
}
