use jsonwebtoken::{EncodingKey, Header, encode};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use opsgate_auth_types::token::{AuthError, JwtClaims};

use crate::domain::repository::UserRepository;
use crate::domain::types::AuthUser;
use crate::error::AuthServiceError;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_secs()
}

impl From<AuthError> for AuthServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Expired => Self::TokenExpired,
            AuthError::InvalidSignature => Self::AuthenticationFailed,
            AuthError::Malformed => Self::InvalidToken,
        }
    }
}

fn issue_token(
    user: &AuthUser,
    secret: &str,
    ttl_secs: u64,
) -> Result<(String, u64), AuthServiceError> {
    let iat = now_secs();
    let exp = iat + ttl_secs;
    let claims = JwtClaims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        phone: user.phone.clone(),
        iat,
        exp,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthServiceError::Internal(e.into()))?;
    Ok((token, exp))
}

pub fn issue_access_token(
    user: &AuthUser,
    secret: &str,
    ttl_secs: u64,
) -> Result<(String, u64), AuthServiceError> {
    issue_token(user, secret, ttl_secs)
}

pub fn issue_refresh_token(
    user: &AuthUser,
    secret: &str,
    ttl_secs: u64,
) -> Result<(String, u64), AuthServiceError> {
    issue_token(user, secret, ttl_secs)
}

/// Signed token pair plus the device hint clients use to offer "trust this
/// device". Returned by every flow that ends in full authentication.
#[derive(Debug)]
pub struct TokenBundle {
    pub user: AuthUser,
    pub access_token: String,
    pub access_token_exp: u64,
    pub refresh_token: String,
    pub refresh_token_exp: u64,
    pub user_device_id: Option<Uuid>,
}

pub struct IssueTokens<'a> {
    pub jwt_secret: &'a str,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

impl IssueTokens<'_> {
    pub fn execute(
        &self,
        user: AuthUser,
        user_device_id: Option<Uuid>,
    ) -> Result<TokenBundle, AuthServiceError> {
        let (access_token, access_token_exp) =
            issue_access_token(&user, self.jwt_secret, self.access_ttl_secs)?;
        let (refresh_token, refresh_token_exp) =
            issue_refresh_token(&user, self.jwt_secret, self.refresh_ttl_secs)?;
        Ok(TokenBundle {
            user,
            access_token,
            access_token_exp,
            refresh_token,
            refresh_token_exp,
            user_device_id,
        })
    }
}

// ── RefreshToken ─────────────────────────────────────────────────────────────

/// Output of the refresh flow. Refresh tokens are not rotated: the presented
/// token is echoed back with its original expiry and only the access token is
/// reissued.
#[derive(Debug)]
pub struct RefreshTokenOutput {
    pub user: AuthUser,
    pub access_token: String,
    pub access_token_exp: u64,
    pub refresh_token: String,
    pub refresh_token_exp: u64,
}

pub struct RefreshTokenUseCase<U: UserRepository> {
    pub users: U,
    pub jwt_secret: String,
    pub access_ttl_secs: u64,
}

impl<U: UserRepository> RefreshTokenUseCase<U> {
    pub async fn execute(
        &self,
        refresh_token_value: &str,
    ) -> Result<RefreshTokenOutput, AuthServiceError> {
        // Validate refresh token (sig + exp); an expired access token is
        // irrelevant here.
        let claims = opsgate_auth_types::token::validate_token(refresh_token_value, &self.jwt_secret)?;

        let user_id = claims
            .sub
            .parse::<Uuid>()
            .map_err(|_| AuthServiceError::InvalidToken)?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthServiceError::AuthenticationFailed)?;

        let (access_token, access_token_exp) =
            issue_access_token(&user, &self.jwt_secret, self.access_ttl_secs)?;

        Ok(RefreshTokenOutput {
            user,
            access_token,
            access_token_exp,
            refresh_token: refresh_token_value.to_owned(),
            refresh_token_exp: claims.exp,
        })
    }
}

// ── CheckToken ───────────────────────────────────────────────────────────────

/// A validated access token: its live user row and its expiry.
#[derive(Debug)]
pub struct CheckedToken {
    pub user: AuthUser,
    pub access_token_exp: u64,
}

pub struct CheckTokenUseCase<U: UserRepository> {
    pub users: U,
    pub jwt_secret: String,
}

impl<U: UserRepository> CheckTokenUseCase<U> {
    /// Validate an access token and resolve its subject to a live user row.
    /// A valid signature over a deleted user still fails.
    pub async fn execute(&self, access_token_value: &str) -> Result<CheckedToken, AuthServiceError> {
        let info =
            opsgate_auth_types::token::validate_access_token(access_token_value, &self.jwt_secret)?;

        let user = self
            .users
            .find_by_id(info.user_id)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;

        Ok(CheckedToken {
            user,
            access_token_exp: info.access_token_exp,
        })
    }
}
