pub use sea_orm_migration::prelude::*;

mod m20260110_120000_expenses;
mod m20260110_130000_settlements;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260110_120000_expenses::Migration),
            Box::new(m20260110_130000_settlements::Migration),
        ]
    }
}
