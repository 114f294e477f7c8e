use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TrustedDevices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrustedDevices::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TrustedDevices::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(TrustedDevices::UserAgent)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TrustedDevices::IpAddress)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TrustedDevices::LastSeen)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TrustedDevices::Trusted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(TrustedDevices::Table, TrustedDevices::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Device identity is the exact triple; the unique index is what makes
        // concurrent get-or-create race-free.
        manager
            .create_index(
                Index::create()
                    .table(TrustedDevices::Table)
                    .col(TrustedDevices::UserId)
                    .col(TrustedDevices::UserAgent)
                    .col(TrustedDevices::IpAddress)
                    .unique()
                    .name("idx_trusted_devices_identity")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TrustedDevices::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum TrustedDevices {
    Table,
    Id,
    UserId,
    UserAgent,
    IpAddress,
    LastSeen,
    Trusted,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
