use sea_orm::entity::prelude::*;

/// User record owned by the auth service.
///
/// `email` is stored lowercase; identifier lookup matches either `email` or
/// `phone`. `password_hash` is an argon2 PHC string.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub phone: String,
    pub password_hash: String,
    pub enabled_2fa: bool,
    /// One of the registered OTP method names, or null when no default is set.
    pub default_2fa_method: Option<String>,
    pub last_login: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bridge_tokens::Entity")]
    BridgeTokens,
    #[sea_orm(has_many = "super::trusted_devices::Entity")]
    TrustedDevices,
    #[sea_orm(has_many = "super::otp_devices::Entity")]
    OtpDevices,
}

impl Related<super::bridge_tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BridgeTokens.def()
    }
}

impl Related<super::trusted_devices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrustedDevices.def()
    }
}

impl Related<super::otp_devices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OtpDevices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
