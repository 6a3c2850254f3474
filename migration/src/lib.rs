pub use sea_orm_migration::prelude::*;

mod m20250512_000001_create_users;
mod m20250512_000002_create_cabs;
mod m20250512_000003_create_reservations;
mod m20250512_000004_create_trips;
mod m20250512_000005_create_loyalty;
mod m20250512_000006_create_incentives;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250512_000001_create_users::Migration),
            Box::new(m20250512_000002_create_cabs::Migration),
            Box::new(m20250512_000003_create_reservations::Migration),
            Box::new(m20250512_000004_create_trips::Migration),
            Box::new(m20250512_000005_create_loyalty::Migration),
            Box::new(m20250512_000006_create_incentives::Migration),
        ]
    }
}
