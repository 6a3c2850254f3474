pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod events;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::events::EventPublisher;
use crate::services::conflict::ResourceLocks;

pub use config::Config;
pub use error::{AppError, AppResult};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub events: EventPublisher,
    pub locks: Arc<ResourceLocks>,
}
