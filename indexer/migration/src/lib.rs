pub use sea_orm_migration::prelude::*;

mod m20240810_000001_create_pipeline_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(
            m20240810_000001_create_pipeline_tables::Migration,
        )]
    }
}
