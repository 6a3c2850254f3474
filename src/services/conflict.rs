use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::entities::reservation::{self, ReservationStatus};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Cab,
    Driver,
}

impl ResourceKind {
    fn label(&self) -> &'static str {
        match self {
            ResourceKind::Cab => "Cab",
            ResourceKind::Driver => "Driver",
        }
    }
}

/// Half-open interval overlap: `[a_start, a_end)` intersects `[b_start, b_end)`.
/// Touching intervals (`a_end == b_start`) do not overlap.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Scan for a pending/active reservation on the given resource whose window
/// overlaps `[starts_at, ends_at)` within the tenant. `exclude` skips the
/// reservation being updated in place.
pub async fn find_conflict(
    db: &DatabaseConnection,
    kind: ResourceKind,
    resource_id: Uuid,
    tenant_id: Uuid,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> AppResult<Option<reservation::Model>> {
    let mut query = reservation::Entity::find()
        .filter(reservation::Column::TenantId.eq(tenant_id))
        .filter(reservation::Column::Status.is_in([
            ReservationStatus::Pending,
            ReservationStatus::Active,
        ]))
        .filter(reservation::Column::StartsAt.lt(ends_at))
        .filter(reservation::Column::EndsAt.gt(starts_at));

    query = match kind {
        ResourceKind::Cab => query.filter(reservation::Column::CabId.eq(resource_id)),
        ResourceKind::Driver => query.filter(reservation::Column::DriverId.eq(resource_id)),
    };

    if let Some(id) = exclude {
        query = query.filter(reservation::Column::Id.ne(id));
    }

    Ok(query.one(db).await?)
}

/// Like `find_conflict`, but converts a hit into a `Conflict` error carrying
/// the colliding window for user-facing messaging.
pub async fn ensure_no_conflict(
    db: &DatabaseConnection,
    kind: ResourceKind,
    resource_id: Uuid,
    tenant_id: Uuid,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    match find_conflict(db, kind, resource_id, tenant_id, starts_at, ends_at, exclude).await? {
        Some(existing) => Err(AppError::Conflict(format!(
            "{} is already reserved from {} to {}",
            kind.label(),
            existing.starts_at.with_timezone(&Utc),
            existing.ends_at.with_timezone(&Utc),
        ))),
        None => Ok(()),
    }
}

/// Per-resource async mutexes held across the conflict scan and the
/// subsequent write, so two requests for the same cab or driver cannot both
/// pass the scan before either inserts. The registry is bounded by fleet
/// size. Paths that lock a cab and a driver always take the cab lock first.
#[derive(Default)]
pub struct ResourceLocks {
    inner: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, resource_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().expect("resource lock registry poisoned");
            map.entry(resource_id)
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::Rng;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, d, 0, 0, 0).unwrap()
    }

    fn reservation_row(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> reservation::Model {
        reservation::Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            cab_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            driver_id: None,
            starts_at: starts_at.into(),
            ends_at: ends_at.into(),
            status: ReservationStatus::Pending,
            total_amount: 1000.0,
            advance_amount: 200.0,
            idempotency_key: None,
            created_at: starts_at.into(),
            updated_at: starts_at.into(),
        }
    }

    #[test]
    fn overlapping_windows_conflict() {
        assert!(overlaps(at(10), at(12), at(11), at(13)));
        assert!(overlaps(at(11), at(13), at(10), at(12)));
        assert!(overlaps(at(10), at(13), at(11), at(12)));
        assert!(overlaps(at(11), at(12), at(10), at(13)));
    }

    #[test]
    fn touching_windows_do_not_conflict() {
        assert!(!overlaps(at(10), at(11), at(11), at(12)));
        assert!(!overlaps(at(11), at(12), at(10), at(11)));
    }

    #[test]
    fn disjoint_windows_do_not_conflict() {
        assert!(!overlaps(at(8), at(9), at(11), at(12)));
        assert!(!overlaps(at(11), at(12), at(8), at(9)));
    }

    #[test]
    fn overlap_matches_nonempty_intersection_for_random_pairs() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let a_start = at(0) + chrono::Duration::minutes(rng.gen_range(0..500));
            let a_end = a_start + chrono::Duration::minutes(rng.gen_range(1..500));
            let b_start = at(0) + chrono::Duration::minutes(rng.gen_range(0..500));
            let b_end = b_start + chrono::Duration::minutes(rng.gen_range(1..500));

            let intersection_nonempty = a_start.max(b_start) < a_end.min(b_end);
            assert_eq!(overlaps(a_start, a_end, b_start, b_end), intersection_nonempty);
        }
    }

    #[tokio::test]
    async fn conflict_error_references_the_existing_window() {
        let existing = reservation_row(day(1), day(3));
        let tenant_id = existing.tenant_id;
        let cab_id = existing.cab_id;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing]])
            .into_connection();

        let err = ensure_no_conflict(&db, ResourceKind::Cab, cab_id, tenant_id, day(2), day(4), None)
            .await
            .unwrap_err();

        match err {
            AppError::Conflict(message) => {
                assert!(message.contains("2025-06-01"));
                assert!(message.contains("2025-06-03"));
            }
            other => panic!("expected conflict error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn no_rows_means_no_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<reservation::Model>::new()])
            .into_connection();

        let result = find_conflict(
            &db,
            ResourceKind::Driver,
            Uuid::new_v4(),
            Uuid::new_v4(),
            day(1),
            day(2),
            None,
        )
        .await
        .unwrap();

        assert!(result.is_none());
    }
}
