use chrono::Timelike;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::entities::reservation::ReservationStatus;
use crate::services::{incentives, loyalty};

/// Domain events fanned out after the originating write has committed.
/// Payloads are plain values; consumers never reach back into the
/// publisher's state.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    TripCompleted {
        trip_id: Uuid,
        driver_id: Option<Uuid>,
        customer_id: Uuid,
        fare: f64,
    },
    BookingCreated {
        booking_id: Uuid,
        tenant_id: Uuid,
        cab_id: Uuid,
    },
    BookingStatusChanged {
        booking_id: Uuid,
        from: ReservationStatus,
        to: ReservationStatus,
    },
    BookingDriverAssigned {
        booking_id: Uuid,
        driver_id: Uuid,
    },
    BookingDeleted {
        booking_id: Uuid,
    },
}

/// Fans events out to one single-consumer queue per subscriber. Publishing is
/// fire-and-forget: the handler has usually already responded by the time a
/// consumer drains its queue, so side-ledger updates are eventually
/// consistent with the triggering write.
#[derive(Clone)]
pub struct EventPublisher {
    subscribers: Vec<mpsc::UnboundedSender<DomainEvent>>,
}

impl EventPublisher {
    /// A publisher with no subscribers, for tests.
    pub fn noop() -> Self {
        Self { subscribers: Vec::new() }
    }

    pub fn publish(&self, event: DomainEvent) {
        for tx in &self.subscribers {
            if tx.send(event.clone()).is_err() {
                tracing::warn!(event = ?event, "event consumer has shut down, dropping event");
            }
        }
    }
}

/// Spawn the loyalty and incentive consumers and return the publisher wired
/// to them. Each consumer owns its queue and applies its own aggregate
/// mutations; failures are logged, never propagated to the publisher.
pub fn spawn_consumers(db: DatabaseConnection) -> EventPublisher {
    let (loyalty_tx, mut loyalty_rx) = mpsc::unbounded_channel::<DomainEvent>();
    let loyalty_db = db.clone();
    tokio::spawn(async move {
        while let Some(event) = loyalty_rx.recv().await {
            if let DomainEvent::TripCompleted { trip_id, customer_id, fare, .. } = event {
                if let Err(err) =
                    loyalty::credit_completed_trip(&loyalty_db, customer_id, trip_id, fare).await
                {
                    tracing::error!(
                        trip_id = %trip_id,
                        customer_id = %customer_id,
                        error = %err,
                        "failed to credit loyalty points"
                    );
                }
            }
        }
    });

    let (incentive_tx, mut incentive_rx) = mpsc::unbounded_channel::<DomainEvent>();
    let incentive_db = db;
    tokio::spawn(async move {
        while let Some(event) = incentive_rx.recv().await {
            if let DomainEvent::TripCompleted { trip_id, driver_id: Some(driver_id), .. } = event {
                let hour = chrono::Local::now().hour();
                if let Err(err) =
                    incentives::record_completed_trip(&incentive_db, driver_id, hour).await
                {
                    tracing::error!(
                        trip_id = %trip_id,
                        driver_id = %driver_id,
                        error = %err,
                        "failed to update driver incentives"
                    );
                }
            }
        }
    });

    EventPublisher {
        subscribers: vec![loyalty_tx, incentive_tx],
    }
}
