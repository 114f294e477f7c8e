use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OtpDevices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OtpDevices::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OtpDevices::UserId).uuid().not_null())
                    .col(ColumnDef::new(OtpDevices::Method).string().not_null())
                    .col(
                        ColumnDef::new(OtpDevices::Confirmed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(OtpDevices::Secret).string())
                    .col(ColumnDef::new(OtpDevices::Number).string())
                    .col(ColumnDef::new(OtpDevices::Code).string())
                    .col(ColumnDef::new(OtpDevices::CodeExpiresAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(OtpDevices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(OtpDevices::Table, OtpDevices::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One device per (user, method).
        manager
            .create_index(
                Index::create()
                    .table(OtpDevices::Table)
                    .col(OtpDevices::UserId)
                    .col(OtpDevices::Method)
                    .unique()
                    .name("idx_otp_devices_user_method")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OtpDevices::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum OtpDevices {
    Table,
    Id,
    UserId,
    Method,
    Confirmed,
    Secret,
    Number,
    Code,
    CodeExpiresAt,
    CreatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
