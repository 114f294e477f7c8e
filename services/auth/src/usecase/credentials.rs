use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::domain::repository::UserRepository;
use crate::domain::types::AuthUser;
use crate::error::AuthServiceError;

/// Argon2id hash of a throwaway password. Verified against when the
/// identifier matches no user, so the not-found path costs the same as a
/// wrong password and response timing does not leak which field failed.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$gZiV/M1gPc22ElAH/Jh1Hw$CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

/// Verify primary credentials.
///
/// `identifier` matches either email (case-insensitive) or phone number.
/// Fails with [`AuthServiceError::InvalidCredentials`] on any miss without
/// revealing which of the two checks failed; the hash comparison itself is
/// constant-time inside the argon2 crate.
pub async fn verify_credentials<U: UserRepository>(
    users: &U,
    identifier: &str,
    password: &str,
) -> Result<AuthUser, AuthServiceError> {
    let user = users.find_by_identifier(identifier).await?;

    let stored = user
        .as_ref()
        .map_or(DUMMY_HASH, |u| u.password_hash.as_str());
    let parsed =
        PasswordHash::new(stored).map_err(|e| anyhow::anyhow!("stored password hash: {e}"))?;

    let verified = Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok();

    match (user, verified) {
        (Some(user), true) => Ok(user),
        _ => Err(AuthServiceError::InvalidCredentials),
    }
}

/// Hash a plaintext password into an argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, AuthServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("hash password: {e}"))?;
    Ok(hash.to_string())
}
