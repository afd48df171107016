pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20251001_000001_initial_schema;
mod m20251012_000001_csv_uploads;
mod m20251020_000001_profile_goals;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000001_initial_schema::Migration),
            Box::new(m20251012_000001_csv_uploads::Migration),
            Box::new(m20251020_000001_profile_goals::Migration),
        ]
    }
}
