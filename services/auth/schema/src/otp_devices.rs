use sea_orm::entity::prelude::*;

/// Second-factor device, one row per (user, method).
///
/// Method-specific state shares the row: `secret` holds the TOTP base32
/// secret, `number` the SMS target, and `code`/`code_expires_at` the most
/// recently issued email/SMS challenge. Regenerating a challenge overwrites
/// the slot, which is what invalidates the prior code.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "otp_devices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub method: String,
    pub confirmed: bool,
    pub secret: Option<String>,
    pub number: Option<String>,
    pub code: Option<String>,
    pub code_expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
