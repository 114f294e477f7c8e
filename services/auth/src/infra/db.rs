use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use uuid::Uuid;

use opsgate_auth_schema::{bridge_tokens, otp_devices, outbox_events, trusted_devices, users};

use crate::domain::repository::{
    BridgeTokenRepository, OtpDeviceRepository, OutboxRepository, TrustedDeviceRepository,
    UserRepository,
};
use crate::domain::types::{AuthUser, BridgeToken, OtpDevice, OtpMethod, OutboxEvent, TrustedDevice};
use crate::error::AuthServiceError;

// ── User repository ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

impl UserRepository for DbUserRepository {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<AuthUser>, AuthServiceError> {
        // Emails are stored lowercased; phone numbers match verbatim.
        let model = users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Email.eq(identifier.to_lowercase()))
                    .add(users::Column::Phone.eq(identifier)),
            )
            .one(&self.db)
            .await
            .context("find user by identifier")?;
        Ok(model.map(user_from_model))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthServiceError> {
        let model = users::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find user by id")?;
        Ok(model.map(user_from_model))
    }

    async fn touch_last_login(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), AuthServiceError> {
        users::ActiveModel {
            id: Set(id),
            last_login: Set(Some(now)),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("touch last login")?;
        Ok(())
    }

    async fn update_two_factor(
        &self,
        id: Uuid,
        enabled_2fa: bool,
        default_2fa_method: Option<String>,
    ) -> Result<(), AuthServiceError> {
        users::ActiveModel {
            id: Set(id),
            enabled_2fa: Set(enabled_2fa),
            default_2fa_method: Set(default_2fa_method),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("update two-factor fields")?;
        Ok(())
    }
}

fn user_from_model(model: users::Model) -> AuthUser {
    AuthUser {
        id: model.id,
        email: model.email,
        phone: model.phone,
        password_hash: model.password_hash,
        enabled_2fa: model.enabled_2fa,
        default_2fa_method: model.default_2fa_method,
        last_login: model.last_login,
    }
}

// ── Bridge token repository ───────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbBridgeTokenRepository {
    pub db: DatabaseConnection,
}

impl BridgeTokenRepository for DbBridgeTokenRepository {
    async fn replace_for_user(&self, token: &BridgeToken) -> Result<(), AuthServiceError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let token = token.clone();
                Box::pin(async move {
                    bridge_tokens::Entity::delete_many()
                        .filter(bridge_tokens::Column::UserId.eq(token.user_id))
                        .exec(txn)
                        .await?;
                    bridge_tokens::ActiveModel {
                        key: Set(token.key.clone()),
                        user_id: Set(token.user_id),
                        created_at: Set(token.created_at),
                        expires_at: Set(token.expires_at),
                    }
                    .insert(txn)
                    .await?;
                    Ok(())
                })
            })
            .await
            .context("replace bridge token for user")?;
        Ok(())
    }

    async fn find(&self, key: &str) -> Result<Option<BridgeToken>, AuthServiceError> {
        let model = bridge_tokens::Entity::find_by_id(key.to_owned())
            .one(&self.db)
            .await
            .context("find bridge token")?;
        Ok(model.map(|m| BridgeToken {
            key: m.key,
            user_id: m.user_id,
            created_at: m.created_at,
            expires_at: m.expires_at,
        }))
    }

    async fn delete(&self, key: &str) -> Result<(), AuthServiceError> {
        bridge_tokens::Entity::delete_by_id(key.to_owned())
            .exec(&self.db)
            .await
            .context("delete bridge token")?;
        Ok(())
    }
}

// ── Trusted device repository ─────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbTrustedDeviceRepository {
    pub db: DatabaseConnection,
}

impl DbTrustedDeviceRepository {
    async fn find_exact(
        &self,
        user_id: Uuid,
        user_agent: &str,
        ip_address: &str,
    ) -> Result<Option<trusted_devices::Model>, AuthServiceError> {
        let model = trusted_devices::Entity::find()
            .filter(trusted_devices::Column::UserId.eq(user_id))
            .filter(trusted_devices::Column::UserAgent.eq(user_agent))
            .filter(trusted_devices::Column::IpAddress.eq(ip_address))
            .one(&self.db)
            .await
            .context("find trusted device")?;
        Ok(model)
    }
}

impl TrustedDeviceRepository for DbTrustedDeviceRepository {
    async fn record_login(
        &self,
        user_id: Uuid,
        user_agent: &str,
        ip_address: &str,
        now: DateTime<Utc>,
    ) -> Result<(TrustedDevice, bool), AuthServiceError> {
        if let Some(existing) = self.find_exact(user_id, user_agent, ip_address).await? {
            trusted_devices::ActiveModel {
                id: Set(existing.id),
                last_seen: Set(now),
                ..Default::default()
            }
            .update(&self.db)
            .await
            .context("bump device last_seen")?;
            let mut device = device_from_model(existing);
            device.last_seen = now;
            return Ok((device, false));
        }

        let insert = trusted_devices::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            user_agent: Set(user_agent.to_owned()),
            ip_address: Set(ip_address.to_owned()),
            last_seen: Set(now),
            trusted: Set(false),
        }
        .insert(&self.db)
        .await;

        match insert {
            Ok(model) => Ok((device_from_model(model), true)),
            // Concurrent login for the same triple won the insert; the
            // unique index guarantees the refetch finds it.
            Err(e) if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) => {
                let model = self
                    .find_exact(user_id, user_agent, ip_address)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("device row vanished after conflict"))?;
                Ok((device_from_model(model), false))
            }
            Err(e) => Err(AuthServiceError::Internal(
                anyhow::Error::new(e).context("insert trusted device"),
            )),
        }
    }

    async fn is_trusted(
        &self,
        user_id: Uuid,
        user_agent: &str,
        ip_address: &str,
    ) -> Result<bool, AuthServiceError> {
        let count = trusted_devices::Entity::find()
            .filter(trusted_devices::Column::UserId.eq(user_id))
            .filter(trusted_devices::Column::UserAgent.eq(user_agent))
            .filter(trusted_devices::Column::IpAddress.eq(ip_address))
            .filter(trusted_devices::Column::Trusted.eq(true))
            .count(&self.db)
            .await
            .context("check device trust")?;
        Ok(count > 0)
    }

    async fn latest_untrusted_id(
        &self,
        user_id: Uuid,
        user_agent: &str,
        ip_address: &str,
    ) -> Result<Option<Uuid>, AuthServiceError> {
        let model = trusted_devices::Entity::find()
            .filter(trusted_devices::Column::UserId.eq(user_id))
            .filter(trusted_devices::Column::UserAgent.eq(user_agent))
            .filter(trusted_devices::Column::IpAddress.eq(ip_address))
            .filter(trusted_devices::Column::Trusted.eq(false))
            .order_by_desc(trusted_devices::Column::LastSeen)
            .one(&self.db)
            .await
            .context("find latest untrusted device")?;
        Ok(model.map(|m| m.id))
    }
}

fn device_from_model(model: trusted_devices::Model) -> TrustedDevice {
    TrustedDevice {
        id: model.id,
        user_id: model.user_id,
        user_agent: model.user_agent,
        ip_address: model.ip_address,
        last_seen: model.last_seen,
        trusted: model.trusted,
    }
}

// ── OTP device repository ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOtpDeviceRepository {
    pub db: DatabaseConnection,
}

impl DbOtpDeviceRepository {
    async fn find_model(
        &self,
        user_id: Uuid,
        method: OtpMethod,
    ) -> Result<Option<otp_devices::Model>, AuthServiceError> {
        let model = otp_devices::Entity::find()
            .filter(otp_devices::Column::UserId.eq(user_id))
            .filter(otp_devices::Column::Method.eq(method.as_str()))
            .one(&self.db)
            .await
            .context("find otp device")?;
        Ok(model)
    }
}

impl OtpDeviceRepository for DbOtpDeviceRepository {
    async fn find(
        &self,
        user_id: Uuid,
        method: OtpMethod,
        device_id: Uuid,
    ) -> Result<Option<OtpDevice>, AuthServiceError> {
        let model = otp_devices::Entity::find_by_id(device_id)
            .filter(otp_devices::Column::UserId.eq(user_id))
            .filter(otp_devices::Column::Method.eq(method.as_str()))
            .one(&self.db)
            .await
            .context("find otp device by id")?;
        model.map(otp_device_from_model).transpose()
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        method: OtpMethod,
    ) -> Result<Option<OtpDevice>, AuthServiceError> {
        self.find_model(user_id, method)
            .await?
            .map(otp_device_from_model)
            .transpose()
    }

    async fn get_or_create(
        &self,
        user_id: Uuid,
        method: OtpMethod,
        secret: Option<&str>,
        number: Option<&str>,
    ) -> Result<OtpDevice, AuthServiceError> {
        if let Some(existing) = self.find_model(user_id, method).await? {
            return otp_device_from_model(existing);
        }

        let insert = otp_devices::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            method: Set(method.as_str().to_owned()),
            confirmed: Set(false),
            secret: Set(secret.map(str::to_owned)),
            number: Set(number.map(str::to_owned)),
            code: Set(None),
            code_expires_at: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await;

        match insert {
            Ok(model) => otp_device_from_model(model),
            Err(e) if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) => {
                let model = self
                    .find_model(user_id, method)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("otp device vanished after conflict"))?;
                otp_device_from_model(model)
            }
            Err(e) => Err(AuthServiceError::Internal(
                anyhow::Error::new(e).context("insert otp device"),
            )),
        }
    }

    async fn set_confirmed(
        &self,
        device_id: Uuid,
        confirmed: bool,
    ) -> Result<(), AuthServiceError> {
        otp_devices::ActiveModel {
            id: Set(device_id),
            confirmed: Set(confirmed),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("set otp device confirmed")?;
        Ok(())
    }

    async fn store_challenge(
        &self,
        device_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
        event: &OutboxEvent,
    ) -> Result<(), AuthServiceError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let code = code.to_owned();
                let event = event.clone();
                Box::pin(async move {
                    otp_devices::ActiveModel {
                        id: Set(device_id),
                        code: Set(Some(code)),
                        code_expires_at: Set(Some(expires_at)),
                        ..Default::default()
                    }
                    .update(txn)
                    .await?;
                    insert_outbox_event(txn, &event).await?;
                    Ok(())
                })
            })
            .await
            .context("store challenge with outbox")?;
        Ok(())
    }

    async fn delete_for_method(
        &self,
        user_id: Uuid,
        method: OtpMethod,
    ) -> Result<bool, AuthServiceError> {
        let result = otp_devices::Entity::delete_many()
            .filter(otp_devices::Column::UserId.eq(user_id))
            .filter(otp_devices::Column::Method.eq(method.as_str()))
            .exec(&self.db)
            .await
            .context("delete otp device")?;
        Ok(result.rows_affected > 0)
    }

    async fn any_confirmed(&self, user_id: Uuid) -> Result<bool, AuthServiceError> {
        let count = otp_devices::Entity::find()
            .filter(otp_devices::Column::UserId.eq(user_id))
            .filter(otp_devices::Column::Confirmed.eq(true))
            .count(&self.db)
            .await
            .context("count confirmed otp devices")?;
        Ok(count > 0)
    }
}

fn otp_device_from_model(model: otp_devices::Model) -> Result<OtpDevice, AuthServiceError> {
    let method = OtpMethod::parse(&model.method)
        .ok_or_else(|| anyhow::anyhow!("unknown otp method in row {}: {}", model.id, model.method))?;
    Ok(OtpDevice {
        id: model.id,
        user_id: model.user_id,
        method,
        confirmed: model.confirmed,
        secret: model.secret,
        number: model.number,
        code: model.code,
        code_expires_at: model.code_expires_at,
        created_at: model.created_at,
    })
}

// ── Outbox repository ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOutboxRepository {
    pub db: DatabaseConnection,
}

impl OutboxRepository for DbOutboxRepository {
    async fn enqueue(&self, event: &OutboxEvent) -> Result<(), AuthServiceError> {
        insert_outbox_event(&self.db, event)
            .await
            .context("enqueue outbox event")?;
        Ok(())
    }
}

async fn insert_outbox_event<C: ConnectionTrait>(
    conn: &C,
    event: &OutboxEvent,
) -> Result<(), sea_orm::DbErr> {
    let now = Utc::now();
    outbox_events::ActiveModel {
        id: Set(event.id),
        kind: Set(event.kind.clone()),
        payload: Set(event.payload.clone()),
        idempotency_key: Set(event.idempotency_key.clone()),
        attempts: Set(0),
        last_error: Set(None),
        created_at: Set(now),
        next_attempt_at: Set(now),
        processed_at: Set(None),
        failed_at: Set(None),
    }
    .insert(conn)
    .await?;
    Ok(())
}
