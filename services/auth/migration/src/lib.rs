use sea_orm_migration::prelude::*;

mod m20260801_000001_create_users;
mod m20260801_000002_create_bridge_tokens;
mod m20260801_000003_create_trusted_devices;
mod m20260801_000004_create_otp_devices;
mod m20260801_000005_create_outbox_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260801_000001_create_users::Migration),
            Box::new(m20260801_000002_create_bridge_tokens::Migration),
            Box::new(m20260801_000003_create_trusted_devices::Migration),
            Box::new(m20260801_000004_create_otp_devices::Migration),
            Box::new(m20260801_000005_create_outbox_events::Migration),
        ]
    }
}
