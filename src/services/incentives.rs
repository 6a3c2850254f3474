use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::incentive::{self, IncentiveKind, IncentiveStatus};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PeakWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

/// Whether `hour` falls inside any configured window. Windows are inclusive
/// on both ends and may wrap midnight (e.g. 22..=2).
pub fn in_peak_window(windows: &[PeakWindow], hour: u32) -> bool {
    windows.iter().any(|w| {
        if w.start_hour <= w.end_hour {
            (w.start_hour..=w.end_hour).contains(&hour)
        } else {
            hour >= w.start_hour || hour <= w.end_hour
        }
    })
}

/// One step of quest progress. Saturates at the target; the flag reports
/// whether the target has been reached.
pub fn apply_progress(current: i32, target: i32) -> (i32, bool) {
    let next = (current + 1).min(target);
    (next, next >= target)
}

/// Flip overdue active incentives to expired. Idempotent; terminal rows are
/// untouched. Runs lazily on reads and on event consumption since there is
/// no scheduler thread.
pub async fn sweep_expired(db: &DatabaseConnection) -> AppResult<u64> {
    let result = incentive::Entity::update_many()
        .col_expr(incentive::Column::Status, Expr::value(IncentiveStatus::Expired))
        .filter(incentive::Column::Status.eq(IncentiveStatus::Active))
        .filter(incentive::Column::ExpiresAt.lte(Utc::now()))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        tracing::info!(count = result.rows_affected, "expired overdue incentives");
    }

    Ok(result.rows_affected)
}

/// Advance every in-window active incentive for the driver after a completed
/// trip. Quests count every trip; peak bonuses only count trips completed
/// inside a configured peak hour window.
pub async fn record_completed_trip(
    db: &DatabaseConnection,
    driver_id: Uuid,
    completed_hour: u32,
) -> AppResult<()> {
    sweep_expired(db).await?;

    let now = Utc::now();
    let active = incentive::Entity::find()
        .filter(incentive::Column::DriverId.eq(driver_id))
        .filter(incentive::Column::Status.eq(IncentiveStatus::Active))
        .filter(incentive::Column::StartsAt.lte(now))
        .filter(incentive::Column::ExpiresAt.gt(now))
        .all(db)
        .await?;

    for item in active {
        if item.kind == IncentiveKind::PeakBonus {
            let windows: Vec<PeakWindow> = match &item.peak_hours {
                Some(value) => match serde_json::from_value(value.clone()) {
                    Ok(windows) => windows,
                    Err(err) => {
                        tracing::warn!(
                            incentive_id = %item.id,
                            error = %err,
                            "malformed peak hour windows, skipping incentive"
                        );
                        continue;
                    }
                },
                None => Vec::new(),
            };
            if !in_peak_window(&windows, completed_hour) {
                continue;
            }
        }

        let (next, reached) = apply_progress(item.current_value, item.target_value);
        let incentive_id = item.id;

        let mut model: incentive::ActiveModel = item.into();
        model.current_value = Set(next);
        if reached {
            model.status = Set(IncentiveStatus::Completed);
            model.completed_at = Set(Some(now.into()));
            tracing::info!(incentive_id = %incentive_id, driver_id = %driver_id, "incentive target reached");
        }
        model.update(db).await?;
    }

    Ok(())
}

/// Claim a completed incentive's bonus. Only valid from `completed`.
pub async fn claim(
    db: &DatabaseConnection,
    incentive_id: Uuid,
    driver_id: Uuid,
) -> AppResult<incentive::Model> {
    let item = incentive::Entity::find_by_id(incentive_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Incentive not found".to_string()))?;

    if item.driver_id != driver_id {
        return Err(AppError::Forbidden(
            "You can only claim your own incentives".to_string(),
        ));
    }

    if item.status != IncentiveStatus::Completed {
        return Err(AppError::InvalidState(format!(
            "Cannot claim an incentive in status '{:?}'",
            item.status
        )));
    }

    let mut model: incentive::ActiveModel = item.into();
    model.status = Set(IncentiveStatus::Claimed);
    model.claimed_at = Set(Some(Utc::now().into()));

    Ok(model.update(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn incentive_row(status: IncentiveStatus, driver_id: Uuid) -> incentive::Model {
        let starts = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        incentive::Model {
            id: Uuid::new_v4(),
            driver_id,
            title: "Weekly quest".to_string(),
            kind: IncentiveKind::Quest,
            target_value: 10,
            current_value: 10,
            bonus_amount: 500.0,
            status,
            peak_hours: None,
            starts_at: starts.into(),
            expires_at: (starts + chrono::Duration::days(7)).into(),
            completed_at: None,
            claimed_at: None,
            created_at: starts.into(),
        }
    }

    #[tokio::test]
    async fn claiming_an_active_incentive_is_rejected() {
        let driver_id = Uuid::new_v4();
        let item = incentive_row(IncentiveStatus::Active, driver_id);
        let incentive_id = item.id;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![item]])
            .into_connection();

        let err = claim(&db, incentive_id, driver_id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn claiming_a_completed_incentive_flips_it_to_claimed() {
        let driver_id = Uuid::new_v4();
        let item = incentive_row(IncentiveStatus::Completed, driver_id);
        let incentive_id = item.id;
        let mut claimed_row = item.clone();
        claimed_row.status = IncentiveStatus::Claimed;
        claimed_row.claimed_at = Some(Utc::now().into());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![item], vec![claimed_row]])
            .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 1 }])
            .into_connection();

        let claimed = claim(&db, incentive_id, driver_id).await.unwrap();
        assert_eq!(claimed.status, IncentiveStatus::Claimed);
        assert!(claimed.claimed_at.is_some());
    }

    #[tokio::test]
    async fn claiming_someone_elses_incentive_is_forbidden() {
        let item = incentive_row(IncentiveStatus::Completed, Uuid::new_v4());
        let incentive_id = item.id;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![item]])
            .into_connection();

        let err = claim(&db, incentive_id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn progress_saturates_at_target() {
        assert_eq!(apply_progress(0, 3), (1, false));
        assert_eq!(apply_progress(2, 3), (3, true));
        // Incrementing past the target clamps, never exceeds.
        assert_eq!(apply_progress(3, 3), (3, true));
        assert_eq!(apply_progress(10, 3), (3, true));
    }

    #[test]
    fn single_trip_quest_completes_immediately() {
        assert_eq!(apply_progress(0, 1), (1, true));
    }

    #[test]
    fn peak_window_contains_hours_inclusively() {
        let windows = [PeakWindow { start_hour: 17, end_hour: 20 }];
        assert!(in_peak_window(&windows, 17));
        assert!(in_peak_window(&windows, 20));
        assert!(!in_peak_window(&windows, 16));
        assert!(!in_peak_window(&windows, 21));
    }

    #[test]
    fn peak_window_may_wrap_midnight() {
        let windows = [PeakWindow { start_hour: 22, end_hour: 2 }];
        assert!(in_peak_window(&windows, 23));
        assert!(in_peak_window(&windows, 0));
        assert!(in_peak_window(&windows, 2));
        assert!(!in_peak_window(&windows, 12));
    }

    #[test]
    fn no_windows_means_no_match() {
        assert!(!in_peak_window(&[], 18));
    }
}
