pub use sea_orm_migration::prelude::*;

mod m20240210_153056_create_schema;
mod m20240211_174355_create_meeting_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240210_153056_create_schema::Migration),
            Box::new(m20240211_174355_create_meeting_tables::Migration),
        ]
    }
}
